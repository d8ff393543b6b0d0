//! Behaviour-driven tests for project file loading.

use camino::Utf8PathBuf;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::fs;
use tempfile::TempDir;
use uberjar::ProjectDescriptor;
use uberjar::project::{PROJECT_FILE, ProjectError};

#[derive(Default)]
struct ProjectWorld {
    temp_dir: Option<TempDir>,
    project_section: String,
    dependencies: String,
    loaded: Option<Result<ProjectDescriptor, ProjectError>>,
}

#[fixture]
fn world() -> ProjectWorld {
    ProjectWorld {
        temp_dir: Some(TempDir::new().expect("temp dir")),
        ..ProjectWorld::default()
    }
}

fn root(world: &ProjectWorld) -> Utf8PathBuf {
    let path = world.temp_dir.as_ref().expect("temp_dir set").path();
    Utf8PathBuf::try_from(path.to_path_buf()).expect("utf8 temp dir")
}

fn loaded(world: &ProjectWorld) -> &ProjectDescriptor {
    match world.loaded.as_ref().expect("project loaded") {
        Ok(project) => project,
        Err(error) => panic!("project failed to load: {error}"),
    }
}

#[given("a project file naming the project \"{name}\"")]
fn given_project_file(world: &mut ProjectWorld, name: String) {
    world.project_section = format!("[project]\nname = \"{name}\"\n");
}

#[given("the project file declares development dependency \"{coordinate}\" at \"{version}\"")]
fn given_dev_dependency(world: &mut ProjectWorld, coordinate: String, version: String) {
    world.dependencies.push_str(&format!(
        "\n[[dev-dependencies]]\ncoordinate = \"{coordinate}\"\nversion = \"{version}\"\n"
    ));
}

#[given("the project file contains the line \"{line}\"")]
fn given_extra_line(world: &mut ProjectWorld, line: String) {
    world.project_section.push_str(&line);
    world.project_section.push('\n');
}

#[when("the project file is loaded")]
fn when_loaded(world: &mut ProjectWorld) {
    let path = root(world).join(PROJECT_FILE);
    let contents = format!("{}{}", world.project_section, world.dependencies);
    fs::write(&path, contents).expect("write project file");
    world.loaded = Some(ProjectDescriptor::load(&path));
}

#[then("the project is named \"{name}\"")]
fn then_named(world: &mut ProjectWorld, name: String) {
    assert_eq!(loaded(world).name(), name);
}

#[then("the dependency directory is \"{dir}\"")]
fn then_library_dir(world: &mut ProjectWorld, dir: String) {
    assert_eq!(loaded(world).library_dir(), root(world).join(dir));
}

#[then("the standalone jar is \"{file}\"")]
fn then_standalone(world: &mut ProjectWorld, file: String) {
    assert_eq!(loaded(world).standalone_path(), root(world).join(file));
}

#[then("the project has {count} development dependency")]
fn then_dev_dependency_count(world: &mut ProjectWorld, count: usize) {
    assert_eq!(loaded(world).dev_dependencies().len(), count);
}

#[then("loading fails with a parse error")]
fn then_parse_error(world: &mut ProjectWorld) {
    let result = world.loaded.as_ref().expect("project loaded");
    assert!(
        matches!(result, Err(ProjectError::Parse { .. })),
        "expected a parse error, got {result:?}"
    );
}

#[scenario(
    path = "tests/features/project.feature",
    name = "A minimal project file uses the default layout"
)]
fn scenario_minimal_project(world: ProjectWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/project.feature",
    name = "Development dependencies are read from the project file"
)]
fn scenario_dev_dependencies(world: ProjectWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/project.feature",
    name = "Unknown keys are rejected"
)]
fn scenario_unknown_keys(world: ProjectWorld) {
    let _ = world;
}

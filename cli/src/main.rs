//! `uberjar` CLI entrypoint.
//!
//! Loads the project file, builds or locates the project's primary jar and
//! aggregates it with the dependency jars into `<name>-standalone.jar`.
//! Progress goes to stderr; `--json` output goes to stdout.

mod cli;

use clap::Parser;
use cli::Cli;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use uberjar::aggregate::{aggregate, plan};
use uberjar::error::AggregateError;
use uberjar::primary::{DirectoryJarBuilder, PrebuiltJar, PrimaryArchiveBuilder};
use uberjar::project::{ProjectDescriptor, ProjectError};
use uberjar::report::{AggregateReport, Progress};

/// Errors reported by the CLI.
#[derive(Debug, Error)]
enum CliError {
    /// The project file could not be loaded.
    #[error(transparent)]
    Project(#[from] ProjectError),

    /// The aggregation failed.
    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    /// The JSON output could not be rendered.
    #[error("cannot render JSON output: {0}")]
    Json(#[from] serde_json::Error),

    /// Writing to stdout failed.
    #[error("cannot write output: {0}")]
    Io(#[from] std::io::Error),
}

/// Progress observer writing one line per event to stderr.
struct StderrProgress<'a> {
    stderr: &'a mut dyn Write,
    quiet: bool,
}

impl Progress for StderrProgress<'_> {
    fn excluded(&mut self, archive: &Path) {
        if !self.quiet {
            write_stderr_line(self.stderr, format!("Excluding {}", display_name(archive)));
        }
    }

    fn including(&mut self, archive: &Path) {
        if !self.quiet {
            write_stderr_line(self.stderr, format!("Including {}", display_name(archive)));
        }
    }

    fn created(&mut self, output: &Path) {
        if !self.quiet {
            write_stderr_line(self.stderr, format!("Created {}", output.display()));
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stdout, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stdout: &mut dyn Write, stderr: &mut dyn Write) -> Result<(), CliError> {
    let project = ProjectDescriptor::load(&cli.project)?;
    let builder = primary_builder(cli);

    if cli.dry_run {
        return run_dry(cli, &project, builder.as_ref(), stdout, stderr);
    }

    let mut progress = StderrProgress {
        stderr,
        quiet: cli.quiet,
    };
    let report = aggregate(&project, builder.as_ref(), &mut progress)?;

    if cli.json {
        write_json(stdout, &report)?;
    } else if !cli.quiet {
        print_summary(&report, progress.stderr);
    }
    Ok(())
}

/// Selects a prebuilt jar when `--primary` is given, else packages the
/// project directories.
fn primary_builder(cli: &Cli) -> Box<dyn PrimaryArchiveBuilder> {
    match &cli.primary {
        Some(path) => Box::new(PrebuiltJar::new(path.as_std_path())),
        None => Box::new(DirectoryJarBuilder),
    }
}

/// Shows the archive plan without building or writing anything.
fn run_dry(
    cli: &Cli,
    project: &ProjectDescriptor,
    builder: &dyn PrimaryArchiveBuilder,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<(), CliError> {
    let plan = plan(project, builder.planned_path(project))?;

    if cli.json {
        return write_json(stdout, &plan);
    }

    write_stderr_line(stderr, "Dry run - no files will be modified");
    write_stderr_line(stderr, "");
    write_stderr_line(stderr, format!("Project: {} ({})", project.name(), project.root()));
    write_stderr_line(stderr, format!("Output: {}", plan.output.display()));
    write_stderr_line(stderr, "");
    write_stderr_line(stderr, "Archives to include:");
    for archive in &plan.archives {
        write_stderr_line(stderr, format!("  - {}", archive.display()));
    }
    if !plan.excluded.is_empty() {
        write_stderr_line(stderr, "");
        write_stderr_line(stderr, "Excluded development dependencies:");
        for archive in &plan.excluded {
            write_stderr_line(stderr, format!("  - {}", archive.display()));
        }
    }
    Ok(())
}

fn print_summary(report: &AggregateReport, stderr: &mut dyn Write) {
    write_stderr_line(
        stderr,
        format!(
            "{} entries from {} archive(s), {} merged component(s)",
            report.entries_written,
            report.archives.len(),
            report.components_merged
        ),
    );
    write_stderr_line(stderr, format!("SHA-256: {}", report.sha256));
}

fn write_json(stdout: &mut dyn Write, value: &impl Serialize) -> Result<(), CliError> {
    serde_json::to_writer_pretty(&mut *stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}

fn exit_code_for_run_result(result: Result<(), CliError>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            1
        }
    }
}

fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use rstest::{fixture, rstest};
    use std::fs;
    use tempfile::TempDir;
    use uberjar::descriptor::DESCRIPTOR_PATH;
    use uberjar::test_utils::{JarFixture, entry_names};

    #[fixture]
    fn project_dir() -> TempDir {
        let dir = TempDir::new().expect("temp dir creation succeeds");
        fs::write(
            dir.path().join("uberjar.toml"),
            concat!(
                "[project]\nname = \"demo\"\n\n",
                "[[dev-dependencies]]\ncoordinate = \"group/dev\"\nversion = \"1.0\"\n",
            ),
        )
        .expect("write project file");
        fs::create_dir_all(dir.path().join("classes/demo")).expect("mkdir classes");
        fs::write(dir.path().join("classes/demo/core.class"), b"core").expect("write class");
        fs::create_dir_all(dir.path().join("lib")).expect("mkdir lib");
        JarFixture::new()
            .entry("dep.class", b"dep")
            .descriptor(&["Dep"])
            .write(&dir.path().join("lib/dep-2.1.jar"));
        JarFixture::new()
            .entry("dev.class", b"dev")
            .write(&dir.path().join("lib/dev-1.0.jar"));
        dir
    }

    fn cli_for(dir: &TempDir, extra: &[&str]) -> Cli {
        let project = Utf8PathBuf::try_from(dir.path().join("uberjar.toml")).expect("utf8 path");
        let mut args = vec!["uberjar", "--project", project.as_str()];
        args.extend_from_slice(extra);
        Cli::parse_from(args)
    }

    #[test]
    fn exit_code_for_run_result_returns_zero_on_success() {
        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Ok(()), &mut stderr);
        assert_eq!(exit_code, 0);
        assert!(stderr.is_empty());
    }

    #[test]
    fn exit_code_for_run_result_prints_error_and_returns_one() {
        let err = CliError::Aggregate(AggregateError::DescriptorMalformed {
            path: "lib/broken.jar".into(),
            descriptor: DESCRIPTOR_PATH,
            reason: "unexpected end of document".to_owned(),
        });

        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Err(err), &mut stderr);
        assert_eq!(exit_code, 1);

        let stderr_text = String::from_utf8(stderr).expect("stderr was not UTF-8");
        assert!(stderr_text.contains("lib/broken.jar"));
    }

    #[rstest]
    fn run_builds_standalone_jar_and_reports_progress(project_dir: TempDir) {
        let cli = cli_for(&project_dir, &[]);
        let (mut stdout, mut stderr) = (Vec::new(), Vec::new());

        run(&cli, &mut stdout, &mut stderr).expect("run succeeds");

        let output = project_dir.path().join("demo-standalone.jar");
        let names = entry_names(&output);
        assert!(names.contains(&"demo/core.class".to_owned()));
        assert!(names.contains(&"dep.class".to_owned()));
        assert!(!names.contains(&"dev.class".to_owned()));

        let stderr_text = String::from_utf8(stderr).expect("UTF-8");
        assert!(stderr_text.contains("Including demo.jar"), "{stderr_text}");
        assert!(stderr_text.contains("Including dep-2.1.jar"), "{stderr_text}");
        assert!(stderr_text.contains("Excluding dev-1.0.jar"), "{stderr_text}");
        assert!(stderr_text.contains("Created "), "{stderr_text}");
        assert!(stdout.is_empty());
    }

    #[rstest]
    fn quiet_run_writes_nothing(project_dir: TempDir) {
        let cli = cli_for(&project_dir, &["--quiet"]);
        let (mut stdout, mut stderr) = (Vec::new(), Vec::new());

        run(&cli, &mut stdout, &mut stderr).expect("run succeeds");

        assert!(stderr.is_empty());
        assert!(stdout.is_empty());
    }

    #[rstest]
    fn json_run_prints_report(project_dir: TempDir) {
        let cli = cli_for(&project_dir, &["--json", "--quiet"]);
        let (mut stdout, mut stderr) = (Vec::new(), Vec::new());

        run(&cli, &mut stdout, &mut stderr).expect("run succeeds");

        let json: serde_json::Value = serde_json::from_slice(&stdout).expect("valid JSON");
        assert_eq!(json["components_merged"], 1);
        assert_eq!(json["archives"].as_array().map(Vec::len), Some(2));
        assert_eq!(json["sha256"].as_str().map(str::len), Some(64));
    }

    #[rstest]
    fn dry_run_writes_no_files(project_dir: TempDir) {
        let cli = cli_for(&project_dir, &["--dry-run"]);
        let (mut stdout, mut stderr) = (Vec::new(), Vec::new());

        run(&cli, &mut stdout, &mut stderr).expect("dry run succeeds");

        assert!(!project_dir.path().join("demo.jar").exists());
        assert!(!project_dir.path().join("demo-standalone.jar").exists());
        let stderr_text = String::from_utf8(stderr).expect("UTF-8");
        assert!(stderr_text.contains("Dry run"), "{stderr_text}");
        assert!(stderr_text.contains("Project: demo ("), "{stderr_text}");
        assert!(stderr_text.contains("dep-2.1.jar"), "{stderr_text}");
        assert!(stderr_text.contains("dev-1.0.jar"), "{stderr_text}");
    }

    #[rstest]
    fn missing_prebuilt_primary_fails(project_dir: TempDir) {
        let missing = project_dir.path().join("target/missing.jar");
        let missing = missing.to_str().expect("utf8 path").to_owned();
        let cli = cli_for(&project_dir, &["--primary", &missing]);
        let (mut stdout, mut stderr) = (Vec::new(), Vec::new());

        let result = run(&cli, &mut stdout, &mut stderr);
        assert!(matches!(
            result,
            Err(CliError::Aggregate(AggregateError::PrimaryBuild { .. }))
        ));
    }

    #[test]
    fn missing_project_file_fails() {
        let dir = TempDir::new().expect("temp dir");
        let cli = cli_for(&dir, &[]);
        let (mut stdout, mut stderr) = (Vec::new(), Vec::new());

        let result = run(&cli, &mut stdout, &mut stderr);
        assert!(matches!(
            result,
            Err(CliError::Project(ProjectError::NotFound { .. }))
        ));
    }
}

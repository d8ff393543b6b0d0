//! Production of the project's own primary jar.
//!
//! The aggregation always starts from the project's primary jar. It is either
//! packaged from the project's compiled output directories or supplied as a
//! prebuilt file; [`PrimaryArchiveBuilder`] is the seam between the two.

use crate::error::{AggregateError, Result};
use crate::output::OutputArchive;
use crate::project::ProjectDescriptor;
use crate::registry::EntryRegistry;
use glob::{Pattern, glob};
use log::{debug, info};
use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;

/// Entry name of the jar manifest.
pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

const MANIFEST_DIR: &str = "META-INF/";

const CHUNK_SIZE: usize = 8192;

/// Produces the primary jar of a project.
#[cfg_attr(test, mockall::automock)]
pub trait PrimaryArchiveBuilder {
    /// Path the primary jar has once built; used to plan without building.
    fn planned_path(&self, project: &ProjectDescriptor) -> PathBuf;

    /// Build the primary jar and return its path.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::PrimaryBuild`] or a write error when the jar
    /// cannot be produced.
    fn build(&self, project: &ProjectDescriptor) -> Result<PathBuf>;
}

/// Packages the project's classes, resources and sources into
/// `<root>/<name>.jar`.
///
/// The manifest is written first. Directories are packaged in the order
/// `classes`, `resources`, `source`; when two of them hold the same relative
/// path the earlier directory wins. Missing directories are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryJarBuilder;

impl PrimaryArchiveBuilder for DirectoryJarBuilder {
    fn planned_path(&self, project: &ProjectDescriptor) -> PathBuf {
        project.primary_path().into_std_path_buf()
    }

    fn build(&self, project: &ProjectDescriptor) -> Result<PathBuf> {
        let destination = self.planned_path(project);
        let mut sink = OutputArchive::staged(&destination)?;
        let mut registry = EntryRegistry::new();

        write_manifest(project, &mut registry, &mut sink)?;
        for dir in project.primary_dirs() {
            let dir = dir.into_std_path_buf();
            if dir.is_dir() {
                add_tree(&dir, &mut registry, &mut sink)?;
            } else {
                debug!("skipping missing directory {}", dir.display());
            }
        }

        let written = sink.entries_written();
        let path = sink.commit()?.path;
        info!("packaged {written} entries into {}", path.display());
        Ok(path)
    }
}

/// Uses a jar that was built elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrebuiltJar {
    path: PathBuf,
}

impl PrebuiltJar {
    /// Wrap the jar at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PrimaryArchiveBuilder for PrebuiltJar {
    fn planned_path(&self, _project: &ProjectDescriptor) -> PathBuf {
        self.path.clone()
    }

    fn build(&self, _project: &ProjectDescriptor) -> Result<PathBuf> {
        if self.path.is_file() {
            Ok(self.path.clone())
        } else {
            Err(AggregateError::PrimaryBuild {
                reason: format!("prebuilt jar {} does not exist", self.path.display()),
            })
        }
    }
}

/// Render the manifest text for `project`.
///
/// Lines end with CRLF as the jar format requires. A `main` namespace is
/// turned into a class name by replacing `-` with `_`.
#[must_use]
pub fn manifest_text(project: &ProjectDescriptor) -> String {
    let mut text = format!(
        "Manifest-Version: 1.0\r\nCreated-By: uberjar {}\r\nImplementation-Title: {}\r\n",
        env!("CARGO_PKG_VERSION"),
        project.name()
    );
    if let Some(version) = project.version() {
        text.push_str(&format!("Implementation-Version: {version}\r\n"));
    }
    if let Some(main) = project.main() {
        text.push_str(&format!("Main-Class: {}\r\n", main.replace('-', "_")));
    }
    text.push_str("\r\n");
    text
}

fn write_manifest<W: Write + Seek>(
    project: &ProjectDescriptor,
    registry: &mut EntryRegistry,
    sink: &mut OutputArchive<W>,
) -> Result<()> {
    sink.add_directory(MANIFEST_DIR, SimpleFileOptions::default())?;
    sink.add_bytes(
        MANIFEST_PATH,
        SimpleFileOptions::default(),
        manifest_text(project).as_bytes(),
    )?;
    registry.record(MANIFEST_DIR);
    registry.record(MANIFEST_PATH);
    Ok(())
}

/// Add every file and directory below `dir`, in sorted path order.
fn add_tree<W: Write + Seek>(
    dir: &Path,
    registry: &mut EntryRegistry,
    sink: &mut OutputArchive<W>,
) -> Result<()> {
    for path in list_tree(dir)? {
        let Some(name) = entry_name(dir, &path) else {
            continue;
        };
        if path.is_dir() {
            let name = format!("{name}/");
            if registry.record(&name) {
                sink.add_directory(&name, SimpleFileOptions::default())?;
            }
        } else if registry.record(&name) {
            sink.start_entry(&name, SimpleFileOptions::default())?;
            stream_file(&path, sink)?;
        } else {
            debug!("{name} already packaged; skipping {}", path.display());
        }
    }
    Ok(())
}

fn list_tree(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/**/*", Pattern::escape(&dir.to_string_lossy()));
    let walker = glob(&pattern).map_err(|error| AggregateError::PrimaryBuild {
        reason: format!("invalid pattern for {}: {error}", dir.display()),
    })?;
    let mut paths = walker
        .map(|entry| {
            entry.map_err(|error| AggregateError::PrimaryBuild {
                reason: error.to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    paths.sort();
    Ok(paths)
}

/// Jar entry name of `path` relative to `dir`, with `/` separators.
fn entry_name(dir: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(dir).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|part| part.as_os_str().to_string_lossy().into_owned())
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

fn stream_file<W: Write + Seek>(path: &Path, sink: &mut OutputArchive<W>) -> Result<()> {
    let read_error = |error: std::io::Error| AggregateError::PrimaryBuild {
        reason: format!("cannot read {}: {error}", path.display()),
    };
    let mut file = File::open(path).map_err(read_error)?;
    let mut buffer = [0u8; CHUNK_SIZE];
    loop {
        let bytes_read = file.read(&mut buffer).map_err(read_error)?;
        if bytes_read == 0 {
            return Ok(());
        }
        sink.write_chunk(buffer.get(..bytes_read).unwrap_or_default())?;
    }
}

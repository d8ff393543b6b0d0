//! The aggregation driver.
//!
//! Aggregation is a linear pipeline: build the primary jar, enumerate the
//! dependency jars, drop development-only ones, then fold every archive into
//! the output (primary first) and finish with the merged descriptor. The
//! fold state lives in an [`Aggregation`] that each step takes by value and
//! hands back, so one archive is fully processed before the next is opened.
//!
//! The output is staged in a temporary file next to its destination and only
//! renamed into place once everything succeeded.

use crate::copier::copy_entries;
use crate::descriptor::{self, MergedDescriptor};
use crate::error::{AggregateError, Result};
use crate::exclusion::ExclusionFilter;
use crate::output::{OutputArchive, Published};
use crate::primary::PrimaryArchiveBuilder;
use crate::project::{ARCHIVE_EXTENSION, ProjectDescriptor};
use crate::registry::EntryRegistry;
use crate::report::{AggregateReport, ArchiveContribution, NoProgress, Progress};
use glob::{Pattern, glob};
use log::{debug, info};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};
use zip::ZipArchive;
use zip::result::ZipError;

/// Ordered archive list and destination for one aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchivePlan {
    /// Final path of the standalone archive.
    pub output: PathBuf,
    /// Archives to fold, primary first.
    pub archives: Vec<PathBuf>,
    /// Dependency archives left out as development-only.
    pub excluded: Vec<PathBuf>,
}

/// Fold state threaded through the aggregation.
pub struct Aggregation<W: Write + Seek> {
    sink: OutputArchive<W>,
    registry: EntryRegistry,
    merged: MergedDescriptor,
    contributions: Vec<ArchiveContribution>,
}

impl<W: Write + Seek> Aggregation<W> {
    /// Start an aggregation writing into `sink`.
    pub fn new(sink: OutputArchive<W>) -> Self {
        Self {
            sink,
            registry: EntryRegistry::seeded(),
            merged: MergedDescriptor::default(),
            contributions: Vec::new(),
        }
    }

    /// Fold one archive into the output: collect its descriptor fragment and
    /// copy every entry not written yet. The archive is closed before this
    /// returns.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::ArchiveUnreadable`] if the archive cannot be
    /// opened, and propagates descriptor, entry and write errors.
    pub fn include(mut self, archive: &Path) -> Result<Self> {
        let mut source = open_archive(archive)?;

        let fragment = descriptor::extract(&mut source, archive)?.unwrap_or_default();
        let components = fragment.len();
        self.merged.push(fragment);

        let added = copy_entries(&mut source, archive, &mut self.registry, &mut self.sink)?;
        debug!(
            "{}: {} entries, {components} component(s)",
            archive.display(),
            added.len()
        );

        self.contributions.push(ArchiveContribution {
            archive: archive.to_path_buf(),
            entries_added: added.len(),
            components,
        });
        Ok(self)
    }

    /// Write the merged descriptor and hand back the still-open sink with the
    /// fold results.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::WriteFailed`] if the descriptor cannot be
    /// written.
    pub fn finalize(mut self) -> Result<Folded<W>> {
        descriptor::write(&self.merged, &mut self.sink)?;
        Ok(Folded {
            sink: self.sink,
            contributions: self.contributions,
            components_merged: self.merged.len(),
        })
    }
}

/// Result of a completed fold, before the sink is closed.
pub struct Folded<W: Write + Seek> {
    /// The output archive with every entry written.
    pub sink: OutputArchive<W>,
    /// Per-archive contributions in processing order.
    pub contributions: Vec<ArchiveContribution>,
    /// Components in the merged descriptor.
    pub components_merged: usize,
}

/// List every `*.jar` below `library_dir`, recursively, sorted by path.
///
/// A missing directory yields no archives.
///
/// # Errors
///
/// Returns [`AggregateError::Enumeration`] if the directory cannot be walked.
pub fn enumerate_dependency_archives(library_dir: &Path) -> Result<Vec<PathBuf>> {
    if !library_dir.is_dir() {
        debug!("no dependency directory at {}", library_dir.display());
        return Ok(Vec::new());
    }

    let enumeration_error = |reason: String| AggregateError::Enumeration {
        path: library_dir.to_path_buf(),
        reason,
    };
    let pattern = format!(
        "{}/**/*.{ARCHIVE_EXTENSION}",
        Pattern::escape(&library_dir.to_string_lossy())
    );
    let walker = glob(&pattern).map_err(|error| enumeration_error(error.to_string()))?;

    let mut archives = Vec::new();
    for entry in walker {
        let path = entry.map_err(|error| enumeration_error(error.to_string()))?;
        if path.is_file() {
            archives.push(path);
        }
    }
    archives.sort();
    Ok(archives)
}

/// Work out which archives an aggregation of `project` folds, given the path
/// of its primary jar. Nothing is written.
///
/// # Errors
///
/// Returns [`AggregateError::Enumeration`] if the dependency directory cannot
/// be walked and [`AggregateError::InvalidExclusion`] for an unusable
/// development dependency.
pub fn plan(project: &ProjectDescriptor, primary: PathBuf) -> Result<ArchivePlan> {
    let output = project.standalone_path().into_std_path_buf();
    let own = [resolved(&primary), resolved(&output)];
    let candidates = enumerate_dependency_archives(project.library_dir().as_std_path())?
        .into_iter()
        .filter(|candidate| !own.contains(&resolved(candidate)))
        .collect();

    let filter = ExclusionFilter::from_dependencies(
        project.dev_dependencies(),
        project.match_mode(),
    )?;
    let (kept, excluded) = filter.partition(candidates);

    let mut archives = Vec::with_capacity(kept.len() + 1);
    archives.push(primary);
    archives.extend(kept);

    Ok(ArchivePlan {
        output,
        archives,
        excluded,
    })
}

/// Build the standalone archive for `project`.
///
/// Builds the primary jar with `builder`, folds it and every non-excluded
/// dependency jar into `<root>/<name>-standalone.jar`, and reports progress
/// to `progress`.
///
/// # Errors
///
/// Any failure aborts the run; the final path is left untouched.
pub fn aggregate(
    project: &ProjectDescriptor,
    builder: &dyn PrimaryArchiveBuilder,
    progress: &mut dyn Progress,
) -> Result<AggregateReport> {
    let primary = builder.build(project)?;
    let plan = plan(project, primary)?;
    for archive in &plan.excluded {
        progress.excluded(archive);
    }

    let mut report = fold_archives(&plan.archives, &plan.output, progress)?;
    report.excluded = plan.excluded;
    Ok(report)
}

/// Fold `archives`, in order, into a new archive at `output_path`.
///
/// # Errors
///
/// Any failure aborts the run; `output_path` is left untouched.
pub fn aggregate_archives(archives: &[PathBuf], output_path: &Path) -> Result<AggregateReport> {
    fold_archives(archives, output_path, &mut NoProgress)
}

fn fold_archives(
    archives: &[PathBuf],
    output_path: &Path,
    progress: &mut dyn Progress,
) -> Result<AggregateReport> {
    let sink = OutputArchive::staged(output_path)?;
    let folded = archives
        .iter()
        .try_fold(Aggregation::new(sink), |aggregation, archive| {
            progress.including(archive);
            aggregation.include(archive)
        })?
        .finalize()?;

    let entries_written = folded.sink.entries_written();
    let Published {
        path: output,
        sha256,
    } = folded.sink.commit()?;
    info!(
        "created {} with {entries_written} entries from {} archive(s)",
        output.display(),
        archives.len()
    );
    progress.created(&output);

    Ok(AggregateReport {
        output,
        sha256,
        archives: folded.contributions,
        excluded: Vec::new(),
        entries_written,
        components_merged: folded.components_merged,
    })
}

/// Canonical form of `path` for identity checks; the path as given when it
/// cannot be resolved.
fn resolved(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn open_archive(path: &Path) -> Result<ZipArchive<File>> {
    let unreadable = |source: ZipError| AggregateError::ArchiveUnreadable {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(|error| unreadable(ZipError::Io(error)))?;
    ZipArchive::new(file).map_err(unreadable)
}

#[cfg(test)]
#[path = "aggregate_tests.rs"]
mod tests;

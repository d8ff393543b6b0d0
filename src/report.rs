//! Aggregation results and progress reporting.

use crate::digest::Sha256Digest;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// What one source archive contributed to the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveContribution {
    /// Path of the source archive.
    pub archive: PathBuf,
    /// Entries copied from this archive; duplicates of earlier entries are
    /// not counted.
    pub entries_added: usize,
    /// Descriptor components extracted from this archive.
    pub components: usize,
}

/// Summary of a completed aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateReport {
    /// Final path of the standalone archive.
    pub output: PathBuf,
    /// SHA-256 of the standalone archive.
    pub sha256: Sha256Digest,
    /// Archives folded into the output, in processing order.
    pub archives: Vec<ArchiveContribution>,
    /// Dependency archives left out as development-only.
    pub excluded: Vec<PathBuf>,
    /// Total number of entries in the output, including the merged
    /// descriptor.
    pub entries_written: usize,
    /// Number of components in the merged descriptor.
    pub components_merged: usize,
}

impl AggregateReport {
    /// Return the contribution recorded for `archive`, if it was processed.
    #[must_use]
    pub fn contribution(&self, archive: &Path) -> Option<&ArchiveContribution> {
        self.archives.iter().find(|entry| entry.archive == archive)
    }
}

/// Observer for user-facing progress messages.
///
/// Library code logs through `log`; this trait carries the handful of
/// messages a command-line user expects to see regardless of log level.
#[cfg_attr(test, mockall::automock)]
pub trait Progress {
    /// A dependency archive was left out.
    fn excluded(&mut self, archive: &Path);

    /// An archive is about to be folded into the output.
    fn including(&mut self, archive: &Path);

    /// The standalone archive was published at `output`.
    fn created(&mut self, output: &Path);
}

/// Progress observer that discards every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn excluded(&mut self, _archive: &Path) {}

    fn including(&mut self, _archive: &Path) {}

    fn created(&mut self, _output: &Path) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::compute_sha256;
    use tempfile::TempDir;

    fn report_for(dir: &TempDir) -> AggregateReport {
        let output = dir.path().join("demo-standalone.jar");
        std::fs::write(&output, b"jar bytes").expect("write");
        AggregateReport {
            sha256: compute_sha256(&output).expect("digest"),
            output,
            archives: vec![ArchiveContribution {
                archive: PathBuf::from("demo.jar"),
                entries_added: 2,
                components: 1,
            }],
            excluded: vec![PathBuf::from("lib/dev-1.0.jar")],
            entries_written: 3,
            components_merged: 1,
        }
    }

    #[test]
    fn report_serialises_to_json() {
        let dir = TempDir::new().expect("temp dir");
        let report = report_for(&dir);

        let json = serde_json::to_value(&report).expect("serialise");
        assert_eq!(json["sha256"], report.sha256.as_str());
        assert_eq!(json["archives"][0]["entries_added"], 2);
        assert_eq!(json["excluded"][0], "lib/dev-1.0.jar");
        assert_eq!(json["components_merged"], 1);
    }

    #[test]
    fn contribution_looks_up_by_archive() {
        let dir = TempDir::new().expect("temp dir");
        let report = report_for(&dir);

        assert!(report.contribution(Path::new("demo.jar")).is_some());
        assert!(report.contribution(Path::new("other.jar")).is_none());
    }
}

//! Error types for standalone archive aggregation.
//!
//! Every variant is fatal to an aggregation run. Variants carry the path of
//! the archive or file involved so the CLI can name the offender.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building a standalone archive.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// A source archive could not be opened or its central directory is
    /// malformed.
    #[error("cannot read archive {path}: {source}")]
    ArchiveUnreadable {
        /// Path of the offending archive.
        path: PathBuf,
        /// The underlying zip error.
        #[source]
        source: zip::result::ZipError,
    },

    /// A single entry of a source archive could not be opened or streamed.
    #[error("cannot read entry {entry} in {path}: {reason}")]
    EntryUnreadable {
        /// Path of the archive containing the entry.
        path: PathBuf,
        /// Name of the entry.
        entry: String,
        /// Description of the read failure.
        reason: String,
    },

    /// The reserved descriptor exists but is not a component list.
    #[error("malformed {descriptor} in {path}: {reason}")]
    DescriptorMalformed {
        /// Path of the archive carrying the descriptor.
        path: PathBuf,
        /// The reserved descriptor path.
        descriptor: &'static str,
        /// Description of the parse failure.
        reason: String,
    },

    /// The output archive could not be created or written.
    #[error("cannot write {path}: {reason}")]
    WriteFailed {
        /// Destination path of the output archive.
        path: PathBuf,
        /// Description of the write failure.
        reason: String,
    },

    /// The project's own primary archive could not be produced.
    #[error("primary archive build failed: {reason}")]
    PrimaryBuild {
        /// Description of the build failure.
        reason: String,
    },

    /// A development dependency produced an unusable exclusion pattern.
    #[error("invalid exclusion rule for {coordinate}: {source}")]
    InvalidExclusion {
        /// The dependency coordinate the rule was derived from.
        coordinate: String,
        /// The regex compilation error.
        #[source]
        source: regex::Error,
    },

    /// The dependency directory could not be enumerated.
    #[error("cannot enumerate dependency archives under {path}: {reason}")]
    Enumeration {
        /// The dependency directory.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AggregateError {
    /// Build a [`AggregateError::WriteFailed`] for `path` from any displayable
    /// cause.
    pub(crate) fn write_failed(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::WriteFailed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias using [`AggregateError`].
pub type Result<T> = std::result::Result<T, AggregateError>;

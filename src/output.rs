//! Append-only output archive.
//!
//! Wraps a [`ZipWriter`] so every write failure is reported against the
//! destination path. The staged variant writes into a temporary file next to
//! the destination and only renames it into place on [`commit`], so an
//! aborted run never leaves a partial archive at the final path.
//!
//! [`commit`]: OutputArchive::commit

use crate::digest::{Sha256Digest, compute_sha256};
use crate::error::{AggregateError, Result};
use log::debug;
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// An archive being written in a single forward pass.
///
/// Entries are written header first, then their bytes; starting the next
/// entry closes the previous one. [`OutputArchive::finish`] consumes the
/// archive, so nothing can be appended once it is closed.
pub struct OutputArchive<W: Write + Seek> {
    writer: ZipWriter<W>,
    path: PathBuf,
    entries: usize,
}

impl<W: Write + Seek> OutputArchive<W> {
    /// Start an archive over `inner`; `path` names the destination in errors.
    pub fn new(inner: W, path: impl Into<PathBuf>) -> Self {
        Self {
            writer: ZipWriter::new(inner),
            path: path.into(),
            entries: 0,
        }
    }

    /// Destination path of this archive.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries started so far.
    #[must_use]
    pub fn entries_written(&self) -> usize {
        self.entries
    }

    /// Write a directory entry.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::WriteFailed`] if the header cannot be written.
    pub fn add_directory(&mut self, name: &str, options: SimpleFileOptions) -> Result<()> {
        self.writer
            .add_directory(name, options)
            .map_err(|e| AggregateError::write_failed(&self.path, e))?;
        self.entries += 1;
        Ok(())
    }

    /// Write the header of a file entry; its bytes follow via
    /// [`OutputArchive::write_chunk`].
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::WriteFailed`] if the header cannot be written.
    pub fn start_entry(&mut self, name: &str, options: SimpleFileOptions) -> Result<()> {
        self.writer
            .start_file(name, options)
            .map_err(|e| AggregateError::write_failed(&self.path, e))?;
        self.entries += 1;
        Ok(())
    }

    /// Append bytes to the entry started last.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::WriteFailed`] if the bytes cannot be written.
    pub fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        self.writer
            .write_all(chunk)
            .map_err(|e| AggregateError::write_failed(&self.path, e))
    }

    /// Write a complete file entry from memory.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::WriteFailed`] if the entry cannot be written.
    pub fn add_bytes(&mut self, name: &str, options: SimpleFileOptions, bytes: &[u8]) -> Result<()> {
        self.start_entry(name, options)?;
        self.write_chunk(bytes)
    }

    /// Write the central directory and return the inner writer.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::WriteFailed`] if the directory cannot be
    /// written.
    pub fn finish(self) -> Result<W> {
        let Self { writer, path, .. } = self;
        writer
            .finish()
            .map_err(|e| AggregateError::write_failed(&path, e))
    }
}

impl OutputArchive<NamedTempFile> {
    /// Stage an archive for `destination` in a temporary file created in the
    /// same directory, so the final rename stays on one filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::WriteFailed`] if the temporary file cannot be
    /// created.
    pub fn staged(destination: &Path) -> Result<Self> {
        let dir = destination
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let temp = tempfile::Builder::new()
            .prefix(".uberjar-")
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|e| AggregateError::write_failed(destination, e))?;
        debug!("staging {} at {}", destination.display(), temp.path().display());
        Ok(Self::new(temp, destination))
    }

    /// Finish the archive, flush it to disk, digest it and move it to its
    /// destination. The rename is the last step, so any earlier failure
    /// leaves the destination untouched.
    ///
    /// Dropping a staged archive without committing removes the temporary
    /// file.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::WriteFailed`] if finishing, syncing or the
    /// rename fails, and [`AggregateError::Io`] if the staged file cannot be
    /// read back for its digest.
    pub fn commit(self) -> Result<Published> {
        let destination = self.path.clone();
        let temp = self.finish()?;
        temp.as_file()
            .sync_all()
            .map_err(|e| AggregateError::write_failed(&destination, e))?;
        set_readable(&temp, &destination)?;
        let sha256 = compute_sha256(temp.path())?;
        temp.persist(&destination)
            .map_err(|e| AggregateError::write_failed(&destination, e.error))?;
        Ok(Published {
            path: destination,
            sha256,
        })
    }
}

/// A committed archive at its final path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    /// Final path of the archive.
    pub path: PathBuf,
    /// SHA-256 of the archive, taken before it was moved into place.
    pub sha256: Sha256Digest,
}

/// Temporary files are created owner-only; give the published archive the
/// usual world-readable mode.
#[cfg(unix)]
fn set_readable(temp: &NamedTempFile, destination: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    temp.as_file()
        .set_permissions(std::fs::Permissions::from_mode(0o644))
        .map_err(|e| AggregateError::write_failed(destination, e))
}

#[cfg(not(unix))]
fn set_readable(_temp: &NamedTempFile, _destination: &Path) -> Result<()> {
    Ok(())
}

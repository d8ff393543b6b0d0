//! SHA-256 digests of produced archives.

use crate::error::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::Path;

/// A hex-encoded SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// Return the digest as a lowercase hex string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the SHA-256 digest of the file at `path`.
///
/// Reads the file in chunks so large archives are never held in memory.
///
/// # Errors
///
/// Returns [`crate::error::AggregateError::Io`] if the file cannot be read.
pub fn compute_sha256(path: &Path) -> Result<Sha256Digest> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(buffer.get(..bytes_read).unwrap_or_default());
    }
    Ok(Sha256Digest(format!("{:x}", hasher.finalize())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn digest_of_known_content() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("abc.txt");
        fs::write(&path, b"abc").expect("write");

        let digest = compute_sha256(&path).expect("digest");
        assert_eq!(
            digest.as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(digest.to_string(), digest.as_str());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = TempDir::new().expect("temp dir");
        let result = compute_sha256(&dir.path().join("missing"));
        assert!(matches!(
            result,
            Err(crate::error::AggregateError::Io(_))
        ));
    }
}

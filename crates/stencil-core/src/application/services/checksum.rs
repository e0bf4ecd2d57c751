//! Per-batch content digests.
//!
//! One `ChecksumStore` lives for exactly one batch run: digests are recorded
//! as targets are written and thrown away with the batch. Verification never
//! trusts the cache for the file under test; it always re-reads and
//! re-hashes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use sha2::{Digest as _, Sha256};

use crate::{
    application::{ApplicationError, ports::Filesystem},
    domain::Digest,
    error::StencilResult,
};

/// In-memory map of target path to last-written content digest.
#[derive(Debug, Clone, Default)]
pub struct ChecksumStore {
    entries: HashMap<PathBuf, Digest>,
}

impl ChecksumStore {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// SHA-256 of `content`.
    pub fn digest(content: &[u8]) -> Digest {
        let mut hasher = Sha256::new();
        hasher.update(content);
        Digest::from_bytes(hasher.finalize().into())
    }

    /// Hash the file's current bytes and record the result.
    ///
    /// Reads through the port, so the recorded digest reflects what is
    /// actually on disk, not what the caller intended to write.
    pub fn remember(&mut self, fs: &dyn Filesystem, path: &Path) -> StencilResult<Digest> {
        let content = fs.read_file(path)?;
        let digest = Self::digest(&content);
        self.entries.insert(path.to_path_buf(), digest);
        Ok(digest)
    }

    /// Re-read `path` and compare its digest against `expected`.
    pub fn verify(fs: &dyn Filesystem, path: &Path, expected: &Digest) -> StencilResult<()> {
        let actual = Self::digest(&fs.read_file(path)?);
        if actual == *expected {
            Ok(())
        } else {
            Err(ApplicationError::IntegrityCheckFailed {
                path: path.to_path_buf(),
                expected: *expected,
                actual,
            }
            .into())
        }
    }

    /// Digest recorded for `path` earlier in this batch, if any.
    pub fn recorded(&self, path: &Path) -> Option<&Digest> {
        self.entries.get(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the store, yielding the full path-to-digest map.
    pub fn into_digests(self) -> HashMap<PathBuf, Digest> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::output::MockFilesystem;
    use crate::error::StencilError;
    use std::str::FromStr;

    // ── digest ───────────────────────────────────────────────────────────────

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(
            ChecksumStore::digest(b"test content"),
            ChecksumStore::digest(b"test content")
        );
        assert_ne!(
            ChecksumStore::digest(b"content1"),
            ChecksumStore::digest(b"content2")
        );
    }

    #[test]
    fn digest_of_empty_input() {
        // SHA-256 of the empty string
        let expected =
            Digest::from_str("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
                .unwrap();
        assert_eq!(ChecksumStore::digest(b""), expected);
    }

    // ── remember / recorded ──────────────────────────────────────────────────

    #[test]
    fn remember_reads_through_the_port() {
        let mut fs = MockFilesystem::new();
        fs.expect_read_file()
            .returning(|_| Ok(b"fn main() {}".to_vec()));

        let mut store = ChecksumStore::new();
        let path = Path::new("/project/src/main.rs");
        let digest = store.remember(&fs, path).unwrap();

        assert_eq!(digest, ChecksumStore::digest(b"fn main() {}"));
        assert_eq!(store.recorded(path), Some(&digest));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn recorded_is_none_for_unknown_path() {
        let store = ChecksumStore::new();
        assert!(store.recorded(Path::new("/never/written")).is_none());
        assert!(store.is_empty());
    }

    // ── verify ───────────────────────────────────────────────────────────────

    #[test]
    fn verify_accepts_matching_content() {
        let mut fs = MockFilesystem::new();
        fs.expect_read_file().returning(|_| Ok(b"stable".to_vec()));

        let expected = ChecksumStore::digest(b"stable");
        assert!(ChecksumStore::verify(&fs, Path::new("/f"), &expected).is_ok());
    }

    #[test]
    fn verify_flags_drifted_content() {
        let mut fs = MockFilesystem::new();
        fs.expect_read_file().returning(|_| Ok(b"tampered".to_vec()));

        let expected = ChecksumStore::digest(b"original");
        let err = ChecksumStore::verify(&fs, Path::new("/f"), &expected).unwrap_err();
        assert!(matches!(
            err,
            StencilError::Application(ApplicationError::IntegrityCheckFailed { .. })
        ));
    }

    #[test]
    fn verify_propagates_read_failures() {
        let mut fs = MockFilesystem::new();
        fs.expect_read_file().returning(|p| {
            Err(ApplicationError::FilesystemError {
                path: p.to_path_buf(),
                reason: "gone".into(),
            }
            .into())
        });

        let expected = ChecksumStore::digest(b"whatever");
        let err = ChecksumStore::verify(&fs, Path::new("/f"), &expected).unwrap_err();
        assert!(matches!(
            err,
            StencilError::Application(ApplicationError::FilesystemError { .. })
        ));
    }
}

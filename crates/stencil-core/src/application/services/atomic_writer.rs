//! Atomic file writes over the `Filesystem` port.
//!
//! A write lands in a hidden temp file in the target's own directory, is
//! read back and compared byte-for-byte, and only then renamed over the
//! target. The target either keeps its previous content or holds the
//! complete new content; no intermediate state is ever visible at its path.

use std::path::{Path, PathBuf};

use tracing::{instrument, warn};
use uuid::Uuid;

use crate::{
    application::{ApplicationError, ports::Filesystem},
    error::StencilResult,
};

/// Writes one file at a time through the port, atomically.
pub struct AtomicWriter<'fs> {
    filesystem: &'fs dyn Filesystem,
}

impl<'fs> AtomicWriter<'fs> {
    pub fn new(filesystem: &'fs dyn Filesystem) -> Self {
        Self { filesystem }
    }

    /// Write `content` to `path` with read-back verification.
    ///
    /// On any failure the temp file is removed (best effort) and `path` is
    /// left exactly as it was.
    #[instrument(skip_all, fields(path = %path.display(), bytes = content.len()))]
    pub fn write(&self, path: &Path, content: &[u8]) -> StencilResult<()> {
        let temp = temp_path_for(path);
        let result = self.write_via_temp(path, &temp, content);
        if result.is_err() {
            self.discard_temp(&temp);
        }
        result
    }

    fn write_via_temp(&self, path: &Path, temp: &Path, content: &[u8]) -> StencilResult<()> {
        self.filesystem.write_file(temp, content)?;

        let written = self.filesystem.read_file(temp)?;
        if written != content {
            return Err(ApplicationError::WriteValidationFailed {
                path: path.to_path_buf(),
                reason: format!(
                    "read-back returned {} byte(s), expected {}",
                    written.len(),
                    content.len()
                ),
            }
            .into());
        }

        self.filesystem.rename(temp, path)
    }

    fn discard_temp(&self, temp: &Path) {
        if !self.filesystem.exists(temp) {
            return;
        }
        if let Err(e) = self.filesystem.remove_file(temp) {
            warn!(
                path = %temp.display(),
                error = %e,
                "Failed to remove temp file"
            );
        }
    }
}

/// Temp name beside the target: `.<basename>.<8-hex-tag>.tmp`.
///
/// Same directory as the target, so the final rename never crosses a
/// filesystem boundary.
pub(crate) fn temp_path_for(path: &Path) -> PathBuf {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("file");
    let tag = Uuid::new_v4().simple().to_string();
    let temp_name = format!(".{}.{}.tmp", name, &tag[..8]);
    match path.parent() {
        Some(parent) => parent.join(temp_name),
        None => PathBuf::from(temp_name),
    }
}

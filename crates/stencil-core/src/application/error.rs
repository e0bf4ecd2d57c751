//! Application layer errors.
//!
//! These errors represent failures in orchestration, not business logic.
//! Business logic errors are `DomainError` from `crate::domain`.

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::Digest;
use crate::error::ErrorCategory;

/// Errors that occur during application orchestration.
#[derive(Debug, Error, Clone)]
pub enum ApplicationError {
    /// Snapshotting a target into the vault failed.
    #[error("Backup creation failed for {path}: {reason}")]
    BackupCreationFailed { path: PathBuf, reason: String },

    /// Written bytes did not survive the read-back comparison.
    #[error("Write validation failed for {path}: {reason}")]
    WriteValidationFailed { path: PathBuf, reason: String },

    /// Recomputed digest disagrees with the recorded one.
    #[error("Integrity check failed for {path}: expected {expected}, got {actual}")]
    IntegrityCheckFailed {
        path: PathBuf,
        expected: Digest,
        actual: Digest,
    },

    /// Putting a backup back in place failed.
    #[error("Restore failed for {path}: {reason}")]
    RestoreFailed { path: PathBuf, reason: String },

    /// Filesystem operation failed.
    #[error("Filesystem error at {path}: {reason}")]
    FilesystemError { path: PathBuf, reason: String },

    /// A stop request was observed between operations.
    #[error("Batch interrupted after {completed} completed operation(s)")]
    Interrupted { completed: usize },

    /// The vault directory could not be opened or created.
    #[error("Backup vault unavailable at {path}: {reason}")]
    VaultUnavailable { path: PathBuf, reason: String },

    /// Adapter state access failed (lock poisoned).
    #[error("Adapter state lock poisoned")]
    LockPoisoned,

    /// Validation failed (application-level, not domain).
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

impl ApplicationError {
    /// Get user-actionable suggestions.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::BackupCreationFailed { path, .. } => vec![
                format!("Could not snapshot: {}", path.display()),
                "Check that the vault directory is writable".into(),
                "Nothing was overwritten; the target is untouched".into(),
            ],
            Self::WriteValidationFailed { path, .. } => vec![
                format!("Written content did not read back intact: {}", path.display()),
                "Check the disk for space or hardware issues".into(),
                "The target was left unchanged".into(),
            ],
            Self::IntegrityCheckFailed { path, .. } => vec![
                format!("Content changed outside this batch: {}", path.display()),
                "Something else modified the file mid-run".into(),
                "Re-run once no other process is writing to the tree".into(),
            ],
            Self::RestoreFailed { path, .. } => vec![
                format!("Could not put the backup back: {}", path.display()),
                "The vault entry is still on disk; restore it manually".into(),
            ],
            Self::FilesystemError { path, .. } => vec![
                format!("Failed to access: {}", path.display()),
                "Check that you have write permissions".into(),
                "Ensure the parent directory exists".into(),
            ],
            Self::Interrupted { completed } => vec![
                format!("Stopped after {} operation(s); rollback was attempted", completed),
                "Re-run the batch once it is safe to proceed".into(),
            ],
            Self::VaultUnavailable { path, .. } => vec![
                format!("Vault directory: {}", path.display()),
                "Check that your home directory exists and is writable".into(),
                "Or point VaultConfig at a writable directory".into(),
            ],
            Self::LockPoisoned => vec![
                "Adapter state was poisoned by an earlier panic".into(),
                "Recreate the adapter and try again".into(),
            ],
            _ => vec!["Check the error details above".into()],
        }
    }

    /// Get error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::WriteValidationFailed { .. } | Self::IntegrityCheckFailed { .. } => {
                ErrorCategory::Integrity
            }
            Self::VaultUnavailable { .. } => ErrorCategory::Configuration,
            Self::ValidationFailed(_) => ErrorCategory::Validation,
            Self::BackupCreationFailed { .. }
            | Self::RestoreFailed { .. }
            | Self::FilesystemError { .. }
            | Self::Interrupted { .. }
            | Self::LockPoisoned => ErrorCategory::Internal,
        }
    }
}

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    error::DomainError,
    value_objects::{BackupKind, BatchId, Digest, OperationKind},
};

/// One recorded mutation of the filesystem.
///
/// Operations are immutable once recorded. The ledger assigns `sequence`
/// monotonically from 0 within a batch; rollback walks them in reverse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub kind: OperationKind,
    pub target_path: PathBuf,
    pub backup: Option<BackupRecord>,
    pub sequence: u64,
    pub recorded_at: DateTime<Utc>,
    pub batch_id: BatchId,
}

impl Operation {
    /// Check the backup-presence invariant for this operation's kind.
    ///
    /// Overwrite kinds destroyed prior content and must reference the backup
    /// that preserves it; Create kinds had nothing to preserve.
    pub fn validate(&self) -> Result<(), DomainError> {
        match (self.kind.requires_backup(), &self.backup) {
            (true, None) => Err(DomainError::OperationWithoutBackup {
                kind: self.kind.to_string(),
                path: self.target_path.clone(),
            }),
            (false, Some(_)) => Err(DomainError::UnexpectedBackup {
                kind: self.kind.to_string(),
                path: self.target_path.clone(),
            }),
            _ => Ok(()),
        }
    }
}

/// Where a pre-change snapshot went and how to check it came back intact.
///
/// `digest` covers the *stored* bytes: the copied file for `BackupKind::File`,
/// the finished archive for `BackupKind::Directory`. Restore re-hashes the
/// vault entry against it before touching the source path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub source_path: PathBuf,
    pub backup_path: PathBuf,
    pub kind: BackupKind,
    pub digest: Digest,
    pub created_at: DateTime<Utc>,
}

//! Append-only record of applied operations, and the rollback pass over it.
//!
//! One ledger lives for exactly one batch. It moves through three phases:
//! `Recording` while the forward pass appends operations, `RollingBack`
//! during the single reverse pass, `Closed` forever after. A closed ledger
//! rejects further recording; there is no reopening.

use std::fmt;
use std::path::PathBuf;

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::{
    application::ports::{BackupVault, Filesystem},
    domain::{BackupRecord, BatchId, DomainError, Operation, OperationKind},
    error::{StencilError, StencilResult},
};

/// Lifecycle phase of a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerPhase {
    Recording,
    RollingBack,
    Closed,
}

impl LedgerPhase {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recording => "recording",
            Self::RollingBack => "rolling-back",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for LedgerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered list of everything a batch did to the filesystem.
#[derive(Debug)]
pub struct OperationLedger {
    batch_id: BatchId,
    operations: Vec<Operation>,
    phase: LedgerPhase,
}

impl OperationLedger {
    pub fn new(batch_id: BatchId) -> Self {
        Self {
            batch_id,
            operations: Vec::new(),
            phase: LedgerPhase::Recording,
        }
    }

    pub fn batch_id(&self) -> BatchId {
        self.batch_id
    }

    pub fn phase(&self) -> LedgerPhase {
        self.phase
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Append an operation, returning its assigned sequence number.
    ///
    /// Sequences are monotonic from 0 in recording order. The backup
    /// invariant is checked here: overwrite kinds must carry one, create
    /// kinds must not.
    pub fn record(
        &mut self,
        kind: OperationKind,
        target_path: PathBuf,
        backup: Option<BackupRecord>,
    ) -> Result<u64, DomainError> {
        if self.phase != LedgerPhase::Recording {
            return Err(DomainError::LedgerClosed {
                batch: self.batch_id.to_string(),
                phase: self.phase.to_string(),
            });
        }

        let operation = Operation {
            kind,
            target_path,
            backup,
            sequence: self.operations.len() as u64,
            recorded_at: Utc::now(),
            batch_id: self.batch_id,
        };
        operation.validate()?;

        let sequence = operation.sequence;
        self.operations.push(operation);
        Ok(sequence)
    }

    /// End recording without a rollback. Terminal.
    pub fn close(&mut self) {
        self.phase = LedgerPhase::Closed;
    }

    /// Consume the ledger, yielding the recorded operations in order.
    pub fn into_operations(self) -> Vec<Operation> {
        self.operations
    }

    /// Undo every recorded operation, newest first. Best effort.
    ///
    /// A failing step is captured in the report and the pass continues;
    /// rollback never aborts early and never returns an error itself.
    /// Leaves the ledger closed.
    #[instrument(skip_all, fields(batch = %self.batch_id, operations = self.operations.len()))]
    pub fn rollback(&mut self, fs: &dyn Filesystem, vault: &dyn BackupVault) -> RollbackReport {
        if self.phase == LedgerPhase::Closed {
            warn!("Rollback requested on a closed ledger; nothing to do");
            return RollbackReport::default();
        }
        self.phase = LedgerPhase::RollingBack;

        let mut report = RollbackReport::default();
        for operation in self.operations.iter().rev() {
            report.attempted += 1;
            match Self::undo(fs, vault, operation) {
                Ok(()) => report.undone.push(operation.clone()),
                Err(e) => {
                    warn!(
                        sequence = operation.sequence,
                        path = %operation.target_path.display(),
                        error = %e,
                        "Rollback step failed"
                    );
                    report.failures.push(RollbackFailure {
                        operation: operation.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        self.phase = LedgerPhase::Closed;
        info!(
            attempted = report.attempted,
            restored = report.restored(),
            failures = report.failures.len(),
            "Rollback pass finished"
        );
        report
    }

    fn undo(
        fs: &dyn Filesystem,
        vault: &dyn BackupVault,
        operation: &Operation,
    ) -> StencilResult<()> {
        match operation.kind {
            OperationKind::CreateFile => {
                if fs.exists(&operation.target_path) {
                    fs.remove_file(&operation.target_path)?;
                }
                Ok(())
            }
            OperationKind::CreateDir => {
                if fs.exists(&operation.target_path) {
                    fs.remove_dir_all(&operation.target_path)?;
                }
                Ok(())
            }
            OperationKind::OverwriteFile | OperationKind::OverwriteDir => {
                let Some(record) = &operation.backup else {
                    // record() rejects overwrites without a backup
                    return Err(StencilError::Internal {
                        message: format!(
                            "operation {} lost its backup record",
                            operation.sequence
                        ),
                    });
                };
                vault.restore(record)
            }
        }
    }
}

// ── Rollback reporting ───────────────────────────────────────────────────────

/// One failed rollback step.
#[derive(Debug, Clone)]
pub struct RollbackFailure {
    pub operation: Operation,
    pub reason: String,
}

/// Tally of one rollback pass.
#[derive(Debug, Clone, Default)]
pub struct RollbackReport {
    /// Operations the pass tried to undo.
    pub attempted: usize,
    /// Operations undone successfully, in rollback (reverse-sequence) order.
    pub undone: Vec<Operation>,
    /// Steps that failed, in rollback (reverse-sequence) order.
    pub failures: Vec<RollbackFailure>,
}

impl RollbackReport {
    pub fn restored(&self) -> usize {
        self.undone.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn into_outcome(self) -> RollbackOutcome {
        if self.is_clean() {
            RollbackOutcome::Clean(self)
        } else {
            RollbackOutcome::Partial(self)
        }
    }
}

/// How rollback went for a failed batch.
#[derive(Debug, Clone)]
pub enum RollbackOutcome {
    /// Every recorded operation was undone.
    Clean(RollbackReport),
    /// Some steps failed; the report lists them.
    Partial(RollbackReport),
    /// Nothing had been recorded yet, so there was nothing to undo.
    NotNeeded,
}

impl RollbackOutcome {
    pub fn report(&self) -> Option<&RollbackReport> {
        match self {
            Self::Clean(report) | Self::Partial(report) => Some(report),
            Self::NotNeeded => None,
        }
    }

    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Clean(_) | Self::NotNeeded)
    }
}

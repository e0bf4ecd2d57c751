// ============================================================================
// domain/error.rs - COMPREHENSIVE ERROR DOMAIN
// ============================================================================

use std::path::PathBuf;
use thiserror::Error;

/// Root domain error type.
///
/// All errors are:
/// - Cloneable (for retry logic)
/// - Categorizable (for host display)
/// - Actionable (provides suggestions)
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    // ========================================================================
    // Containment Errors
    // ========================================================================
    #[error("path '{path}' escapes the batch root '{root}'")]
    PathTraversal { path: PathBuf, root: PathBuf },

    #[error("root path must be absolute: {path}")]
    PathNotAbsolute { path: PathBuf },

    // ========================================================================
    // Plan Validation Errors
    // ========================================================================
    #[error("plan contains no entries")]
    EmptyPlan,

    #[error("duplicate path in plan: {path}")]
    DuplicatePath { path: String },

    #[error("absolute paths not allowed in plan entries: {path}")]
    AbsolutePathNotAllowed { path: String },

    // ========================================================================
    // Ledger State Errors
    // ========================================================================
    #[error("ledger for batch {batch} no longer accepts operations (phase: {phase})")]
    LedgerClosed { batch: String, phase: String },

    #[error("operation '{kind}' on {path} requires a backup and none was supplied")]
    OperationWithoutBackup { kind: String, path: PathBuf },

    #[error("operation '{kind}' on {path} must not carry a backup")]
    UnexpectedBackup { kind: String, path: PathBuf },

    // ========================================================================
    // Value Parsing Errors
    // ========================================================================
    #[error("invalid digest: {reason}")]
    InvalidDigest { reason: String },

    #[error("unknown operation kind: {value}")]
    InvalidOperationKind { value: String },
}

impl DomainError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::PathTraversal { path, root } => vec![
                format!("'{}' resolves outside '{}'", path.display(), root.display()),
                "Plan entries must stay inside the batch root".into(),
                "Remove '..' segments or use a path relative to the root".into(),
            ],
            Self::PathNotAbsolute { path } => vec![
                format!("Got: {}", path.display()),
                "Resolve the batch root to an absolute path before building a plan".into(),
            ],
            Self::EmptyPlan => vec![
                "A batch needs at least one file or directory entry".into(),
            ],
            Self::DuplicatePath { path } => vec![
                format!("'{}' appears more than once in the plan", path),
                "Each target may only be written once per batch".into(),
            ],
            Self::LedgerClosed { .. } => vec![
                "The ledger is single-use: one recording pass, at most one rollback".into(),
                "Start a new batch instead of reusing this one".into(),
            ],
            _ => vec!["See documentation for more details".into()],
        }
    }

    /// Error category for host display styling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::PathTraversal { .. } | Self::PathNotAbsolute { .. } => ErrorCategory::Containment,
            Self::EmptyPlan
            | Self::DuplicatePath { .. }
            | Self::AbsolutePathNotAllowed { .. }
            | Self::InvalidDigest { .. }
            | Self::InvalidOperationKind { .. } => ErrorCategory::Validation,
            Self::LedgerClosed { .. }
            | Self::OperationWithoutBackup { .. }
            | Self::UnexpectedBackup { .. } => ErrorCategory::State,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Containment,
    State,
}

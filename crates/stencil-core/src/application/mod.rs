//! Application layer for Stencil.
//!
//! This layer contains:
//! - **Services**: Use case orchestration (BatchService and its parts)
//! - **Ports**: Interface definitions (traits) for external dependencies
//! - **Events**: The structured event shape batches emit
//! - **Errors**: Application-specific error types
//!
//! The application layer coordinates the domain layer but contains no
//! business logic itself. All business rules live in `crate::domain`.

pub mod error;
pub mod event;
pub mod ports;
pub mod services;

// Re-export main services
pub use services::{
    AtomicWriter,
    BatchError,
    BatchReceipt, // DTO for a completed batch
    BatchService,
    ChecksumStore,
    OperationLedger,
    RollbackOutcome,
    RollbackReport,
};

// Re-export port traits (for adapter implementation)
pub use ports::{BackupVault, EventSink, Filesystem, PruneReport};

pub use event::{BatchEvent, EventLevel, NullEventSink};

pub use error::ApplicationError;

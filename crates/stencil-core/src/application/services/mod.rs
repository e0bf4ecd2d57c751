//! Application services - orchestrate use cases.
//!
//! Services coordinate the domain layer and ports to accomplish the
//! high-level use case "apply a batch of file operations transactionally",
//! plus the pieces it is built from (checksums, atomic writes, the ledger).

pub mod atomic_writer;
pub mod batch_service;
pub mod checksum;
pub mod ledger;

pub use atomic_writer::AtomicWriter;
pub use batch_service::{BatchError, BatchReceipt, BatchService};
pub use checksum::ChecksumStore;
pub use ledger::{
    LedgerPhase, OperationLedger, RollbackFailure, RollbackOutcome, RollbackReport,
};

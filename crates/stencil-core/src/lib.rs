//! Stencil Core - Hexagonal Architecture Implementation
//!
//! This crate provides the domain and application layers for Stencil's
//! transactional file-operation engine, following hexagonal (ports and
//! adapters) architecture.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          Host driver (external)         │
//! │     (Builds plans, consumes receipts)   │
//! └──────────────────┬──────────────────────┘
//!                    │ calls
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Application Services            │
//! │  (BatchService, AtomicWriter, Ledger)   │
//! │         Orchestrates Use Cases          │
//! └──────────────────┬──────────────────────┘
//!                    │ uses
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │      Application Ports (Traits)           │
//! │  (Driven: Filesystem, Vault, Events)    │
//! └──────────────────┬──────────────────────┘
//!                    │ implemented by
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │     stencil-adapters (Infrastructure)     │
//! │  (LocalFilesystem, LocalVault, sinks)   │
//! └─────────────────────────────────────────┘
//!                    │
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Domain Layer (Pure Logic)         │
//! │  (Operation, BatchPlan, path_guard)     │
//! │         No External Dependencies         │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use stencil_core::{
//!     application::{BatchService, NullEventSink},
//!     domain::BatchPlan,
//! };
//!
//! // 1. Describe what the batch should materialize
//! let plan = BatchPlan::new("/home/me/project")
//!     .with_directory("src")
//!     .with_file("src/main.rs", "fn main() {}\n");
//!
//! // 2. Use the batch service (with injected adapters)
//! let service = BatchService::new(filesystem, vault, Box::new(NullEventSink));
//! let receipt = service.apply(&plan).unwrap();
//! println!("applied {} operations", receipt.operation_count());
//! ```

// Re-export domain layer (stable, well-defined API)
pub mod domain;

// Re-export application layer (orchestration logic)
pub mod application;

// Re-export error types
pub mod error;

// Public API - what external crates should use
pub mod prelude {
    pub use crate::application::{
        BatchError, BatchReceipt, BatchService, NullEventSink, RollbackOutcome, RollbackReport,
        ports::{BackupVault, EventSink, Filesystem},
    };
    pub use crate::domain::{
        BackupKind, BackupRecord, BatchId, BatchPlan, Digest, Operation, OperationKind, PlanEntry,
    };
    pub use crate::error::{StencilError, StencilResult};
}

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

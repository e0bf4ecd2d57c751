//! Application ports (traits) for external dependencies.
//!
//! In hexagonal architecture, ports define interfaces that the application
//! needs from the outside world. Adapters in `stencil-adapters` implement these.
//!
//! ## Port Types
//!
//! - **Driven (Output) Ports**: Called by application, implemented by infrastructure
//!   - `Filesystem`: File operations
//!   - `BackupVault`: Snapshot storage and restore
//!   - `EventSink`: Structured batch event delivery
//!
//! - **Driving (Input) Ports**: Called by external world, implemented by application
//!   - (The scaffolding driver calls `BatchService::apply` directly)

pub mod output;

pub use output::{BackupVault, EventSink, Filesystem, PruneReport};

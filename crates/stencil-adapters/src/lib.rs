//! Infrastructure adapters for Stencil.
//!
//! This crate implements the ports defined in `stencil-core::application::ports`.
//! It contains all external dependencies and I/O operations.

pub mod events;
pub mod filesystem;
pub mod vault;

// Re-export commonly used adapters
pub use events::{MemoryEventSink, TracingEventSink};
pub use filesystem::{LocalFilesystem, MemoryFilesystem};
pub use vault::{LocalVault, VaultConfig};

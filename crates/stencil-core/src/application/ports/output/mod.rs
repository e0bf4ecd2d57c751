//! Driven (output) ports - implemented by infrastructure.
//!
//! These traits define what the application needs from external systems.
//! The `stencil-adapters` crate provides implementations.

use std::path::Path;
use std::time::Duration;

use crate::application::event::BatchEvent;
use crate::domain::{BackupKind, BackupRecord};
use crate::error::StencilResult;

/// Port for filesystem operations.
///
/// Implemented by:
/// - `stencil_adapters::filesystem::LocalFilesystem` (production)
/// - `stencil_adapters::filesystem::MemoryFilesystem` (testing)
///
/// ## Design Notes
///
/// - Content is bytes; callers decide on text encoding
/// - `rename` must be same-filesystem atomic on the production adapter
/// - `exists`/`is_dir` are probes and deliberately infallible
#[cfg_attr(test, mockall::automock)]
pub trait Filesystem: Send + Sync {
    /// Create a directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> StencilResult<()>;

    /// Write content to a file, replacing any previous content.
    fn write_file(&self, path: &Path, content: &[u8]) -> StencilResult<()>;

    /// Read a file's content.
    fn read_file(&self, path: &Path) -> StencilResult<Vec<u8>>;

    /// Rename a file or directory, replacing the destination if present.
    fn rename(&self, from: &Path, to: &Path) -> StencilResult<()>;

    /// Remove a single file.
    fn remove_file(&self, path: &Path) -> StencilResult<()>;

    /// Remove a directory and all contents.
    fn remove_dir_all(&self, path: &Path) -> StencilResult<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Check if path exists and is a directory.
    fn is_dir(&self, path: &Path) -> bool;
}

/// Port for snapshot storage.
///
/// Implemented by:
/// - `stencil_adapters::vault::LocalVault` (on-disk, copy + archive strategies)
///
/// The vault owns entry naming and on-disk layout; callers only hold the
/// returned `BackupRecord` and hand it back for restore.
#[cfg_attr(test, mockall::automock)]
pub trait BackupVault: Send + Sync {
    /// Snapshot `source` into the vault before it gets destroyed.
    ///
    /// Must be durable before returning: a record handed out refers to bytes
    /// already on disk.
    fn create_backup(&self, source: &Path, kind: BackupKind) -> StencilResult<BackupRecord>;

    /// Put a snapshot back at its original location.
    ///
    /// Replaces whatever currently occupies `record.source_path`.
    fn restore(&self, record: &BackupRecord) -> StencilResult<()>;

    /// Delete vault entries older than `max_age`.
    ///
    /// Best effort: entries that cannot be examined or removed are skipped,
    /// not fatal.
    fn prune_older_than(&self, max_age: Duration) -> StencilResult<PruneReport>;
}

/// Outcome of one pruning pass over the vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PruneReport {
    /// Entries looked at.
    pub examined: usize,
    /// Entries deleted.
    pub removed: usize,
    /// Entries that could not be examined or deleted.
    pub skipped: usize,
}

/// Port for structured batch event delivery.
///
/// Implemented by:
/// - `stencil_adapters::events::TracingEventSink` (production)
/// - `stencil_adapters::events::MemoryEventSink` (testing)
/// - `stencil_core::application::event::NullEventSink` (opt-out)
///
/// Emission is infallible: a sink that cannot deliver must drop the event
/// rather than fail the batch.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: BatchEvent);
}

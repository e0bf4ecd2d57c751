//! Batch Service - main application orchestrator.
//!
//! This service drives one transactional batch from plan to receipt:
//! 1. Validate the plan and contain every target under its root
//! 2. Snapshot whatever an operation is about to replace
//! 3. Record each operation in the ledger, then materialize it atomically
//! 4. On the first failure, run exactly one reverse-order rollback pass
//!
//! It implements the driving port (incoming) and uses driven ports (outgoing).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::{
    application::{
        ApplicationError,
        event::BatchEvent,
        ports::{BackupVault, EventSink, Filesystem},
        services::{
            atomic_writer::AtomicWriter,
            checksum::ChecksumStore,
            ledger::{OperationLedger, RollbackOutcome, RollbackReport},
        },
    },
    domain::{
        BackupKind, BackupRecord, BatchId, BatchPlan, Digest, Operation, OperationKind, PlanEntry,
        path_guard,
    },
    error::{StencilError, StencilResult},
};

/// What a completed batch did.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReceipt {
    pub batch_id: BatchId,
    /// Every recorded operation, in application order.
    pub operations: Vec<Operation>,
    /// Digest of each file written by the batch.
    pub digests: HashMap<PathBuf, Digest>,
}

impl BatchReceipt {
    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }

    pub fn digest_for(&self, path: &Path) -> Option<&Digest> {
        self.digests.get(path)
    }
}

/// A failed batch: the first error, where it happened, and how rollback went.
#[derive(Debug, Error)]
#[error("Batch failed: {source}")]
pub struct BatchError {
    /// Target being applied when the forward pass stopped, when there was one.
    pub failed_target: Option<PathBuf>,
    #[source]
    pub source: StencilError,
    pub rollback: RollbackOutcome,
}

impl BatchError {
    pub fn rollback_report(&self) -> Option<&RollbackReport> {
        self.rollback.report()
    }
}

/// Main batch service.
///
/// Owns the driven ports and applies one `BatchPlan` at a time. Construct
/// one per batch or reuse across batches; it holds no per-batch state.
pub struct BatchService {
    filesystem: Box<dyn Filesystem>,
    vault: Box<dyn BackupVault>,
    events: Box<dyn EventSink>,
    stop: Option<Arc<AtomicBool>>,
}

impl BatchService {
    /// Create a new batch service with the given adapters.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use stencil_core::application::{BatchService, NullEventSink};
    ///
    /// let service = BatchService::new(
    ///     filesystem,               // impl Filesystem
    ///     vault,                    // impl BackupVault
    ///     Box::new(NullEventSink),
    /// );
    /// ```
    pub fn new(
        filesystem: Box<dyn Filesystem>,
        vault: Box<dyn BackupVault>,
        events: Box<dyn EventSink>,
    ) -> Self {
        Self {
            filesystem,
            vault,
            events,
            stop: None,
        }
    }

    /// Observe a stop flag between operations.
    ///
    /// A flag raised mid-batch aborts the forward pass with `Interrupted`
    /// before the next operation starts and triggers the usual rollback.
    /// Writes already in flight are never cut short.
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Apply a plan transactionally.
    ///
    /// This is the main use case. On success every entry has been
    /// materialized and the receipt lists each operation with the digests of
    /// written content. On failure the filesystem has been rolled back to
    /// its pre-batch state (best effort; the error carries the report).
    #[instrument(
        skip_all,
        fields(root = %plan.root().display(), entries = plan.entry_count())
    )]
    pub fn apply(&self, plan: &BatchPlan) -> Result<BatchReceipt, BatchError> {
        let batch_id = BatchId::new();
        let mut ledger = OperationLedger::new(batch_id);
        let mut store = ChecksumStore::new();

        info!(%batch_id, "Applying batch");
        self.events.emit(
            BatchEvent::info(batch_id, "Batch started").with_context(json!({
                "root": plan.root().display().to_string(),
                "entries": plan.entry_count(),
            })),
        );

        match self.apply_entries(plan, &mut ledger, &mut store) {
            Ok(()) => {
                ledger.close();
                let operations = ledger.into_operations();
                info!(operations = operations.len(), "Batch completed");
                self.events.emit(
                    BatchEvent::info(batch_id, "Batch completed").with_context(json!({
                        "operations": operations.len(),
                    })),
                );
                Ok(BatchReceipt {
                    batch_id,
                    operations,
                    digests: store.into_digests(),
                })
            }
            Err((failed_target, source)) => {
                warn!(error = %source, "Batch failed, rolling back");
                self.events.emit(
                    BatchEvent::error(batch_id, format!("Batch failed: {source}")).with_context(
                        json!({
                            "failed_target": failed_target
                                .as_ref()
                                .map(|p| p.display().to_string()),
                        }),
                    ),
                );
                let rollback = self.roll_back(&mut ledger);
                Err(BatchError {
                    failed_target,
                    source,
                    rollback,
                })
            }
        }
    }

    // -------------------------------------------------------------------------
    // Forward pass
    // -------------------------------------------------------------------------

    fn apply_entries(
        &self,
        plan: &BatchPlan,
        ledger: &mut OperationLedger,
        store: &mut ChecksumStore,
    ) -> Result<(), (Option<PathBuf>, StencilError)> {
        plan.validate()
            .map_err(|e| (None, StencilError::from(e)))?;
        let root = path_guard::normalize(plan.root());

        self.create_missing_dirs(&root, ledger)
            .map_err(|e| (Some(root.clone()), e))?;

        for entry in plan.entries() {
            self.check_stop(ledger.len()).map_err(|e| (None, e))?;

            let target = path_guard::validate(entry.path(), &root)
                .map_err(|e| (Some(entry.path().to_path_buf()), StencilError::from(e)))?;

            self.ensure_parents(&target, ledger)
                .and_then(|()| match entry {
                    PlanEntry::File(file) => {
                        self.apply_file(&target, file.content.as_bytes(), ledger, store)
                    }
                    PlanEntry::Dir(_) => self.apply_dir(&target, ledger),
                })
                .map_err(|e| (Some(target.clone()), e))?;
        }

        Ok(())
    }

    /// Materialize one file entry, snapshotting whatever it replaces.
    ///
    /// Every operation enters the ledger before its first destructive step:
    /// once the backup is recorded, a failure anywhere later still leaves
    /// rollback a path back to the pre-batch state.
    fn apply_file(
        &self,
        target: &Path,
        content: &[u8],
        ledger: &mut OperationLedger,
        store: &mut ChecksumStore,
    ) -> StencilResult<()> {
        let writer = AtomicWriter::new(self.filesystem.as_ref());
        let batch_id = ledger.batch_id();

        if !self.filesystem.exists(target) {
            let sequence = self.record(ledger, OperationKind::CreateFile, target, None)?;
            writer.write(target, content)?;
            return self.confirm_write(target, sequence, batch_id, store);
        }

        // Something already occupies the target. Snapshot it, record the
        // overwrite, and only then clear the way and write.
        let sequence = if self.filesystem.is_dir(target) {
            let backup = self.snapshot(target, BackupKind::Directory, batch_id)?;
            let sequence = self.record(ledger, OperationKind::OverwriteDir, target, Some(backup))?;
            self.filesystem.remove_dir_all(target)?;
            sequence
        } else {
            let backup = self.snapshot_file(target, batch_id)?;
            self.record(ledger, OperationKind::OverwriteFile, target, Some(backup))?
        };

        writer.write(target, content)?;
        self.confirm_write(target, sequence, batch_id, store)
    }

    /// Materialize one directory entry.
    fn apply_dir(&self, target: &Path, ledger: &mut OperationLedger) -> StencilResult<()> {
        if self.filesystem.is_dir(target) {
            debug!(path = %target.display(), "Directory already present");
            return Ok(());
        }

        if self.filesystem.exists(target) {
            // A file sits where the directory must go. Record the overwrite
            // before touching it so rollback can put the file back.
            let backup = self.snapshot_file(target, ledger.batch_id())?;
            self.record(ledger, OperationKind::OverwriteFile, target, Some(backup))?;
            self.filesystem.remove_file(target)?;
            self.filesystem.create_dir_all(target)?;
            return Ok(());
        }

        self.create_dir(target, ledger)
    }

    /// Create missing ancestors of `target`, recording each as its own
    /// `CreateDir` (deepest last) so rollback removes them again.
    fn ensure_parents(&self, target: &Path, ledger: &mut OperationLedger) -> StencilResult<()> {
        match target.parent() {
            Some(parent) => self.create_missing_dirs(parent, ledger),
            None => Ok(()),
        }
    }

    /// Walk `dir` and its ancestors up to the nearest existing one, then
    /// record and create each missing level, shallowest first.
    fn create_missing_dirs(&self, dir: &Path, ledger: &mut OperationLedger) -> StencilResult<()> {
        let mut missing = Vec::new();
        for ancestor in dir.ancestors() {
            if self.filesystem.exists(ancestor) {
                break;
            }
            missing.push(ancestor.to_path_buf());
        }
        for level in missing.into_iter().rev() {
            self.create_dir(&level, ledger)?;
        }
        Ok(())
    }

    fn create_dir(&self, target: &Path, ledger: &mut OperationLedger) -> StencilResult<()> {
        self.record(ledger, OperationKind::CreateDir, target, None)?;
        self.filesystem.create_dir_all(target)
    }

    /// Snapshot an existing file, cross-checking the vault copy against the
    /// digest of the bytes observed just before.
    fn snapshot_file(&self, target: &Path, batch_id: BatchId) -> StencilResult<BackupRecord> {
        let bytes = self.filesystem.read_file(target)?;
        let observed = ChecksumStore::digest(&bytes);

        let backup = self.snapshot(target, BackupKind::File, batch_id)?;
        if backup.digest != observed {
            return Err(ApplicationError::IntegrityCheckFailed {
                path: target.to_path_buf(),
                expected: observed,
                actual: backup.digest,
            }
            .into());
        }
        Ok(backup)
    }

    fn snapshot(
        &self,
        target: &Path,
        kind: BackupKind,
        batch_id: BatchId,
    ) -> StencilResult<BackupRecord> {
        let backup = self.vault.create_backup(target, kind)?;
        info!(
            source = %target.display(),
            backup = %backup.backup_path.display(),
            "Backup created"
        );
        self.events.emit(
            BatchEvent::info(batch_id, "Backup created").with_context(json!({
                "source": target.display().to_string(),
                "backup": backup.backup_path.display().to_string(),
                "kind": kind.as_str(),
            })),
        );
        Ok(backup)
    }

    /// Append to the ledger and emit the recorded event.
    fn record(
        &self,
        ledger: &mut OperationLedger,
        kind: OperationKind,
        target: &Path,
        backup: Option<BackupRecord>,
    ) -> StencilResult<u64> {
        let batch_id = ledger.batch_id();
        let sequence = ledger.record(kind, target.to_path_buf(), backup)?;

        self.events.emit(
            BatchEvent::info(batch_id, "Operation recorded")
                .with_operation(sequence)
                .with_context(json!({
                    "kind": kind.as_str(),
                    "path": target.display().to_string(),
                })),
        );
        Ok(sequence)
    }

    /// Digest freshly written content and announce the validated write.
    fn confirm_write(
        &self,
        target: &Path,
        sequence: u64,
        batch_id: BatchId,
        store: &mut ChecksumStore,
    ) -> StencilResult<()> {
        let digest = store.remember(self.filesystem.as_ref(), target)?;
        self.events.emit(
            BatchEvent::info(batch_id, "Write validated")
                .with_operation(sequence)
                .with_context(json!({
                    "path": target.display().to_string(),
                    "digest": digest.to_string(),
                })),
        );
        Ok(())
    }

    fn check_stop(&self, completed: usize) -> StencilResult<()> {
        if let Some(stop) = &self.stop {
            if stop.load(Ordering::SeqCst) {
                return Err(ApplicationError::Interrupted { completed }.into());
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Rollback
    // -------------------------------------------------------------------------

    /// Run the single rollback pass and report how it went.
    fn roll_back(&self, ledger: &mut OperationLedger) -> RollbackOutcome {
        let batch_id = ledger.batch_id();
        if ledger.is_empty() {
            ledger.close();
            debug!("Nothing recorded, rollback not needed");
            return RollbackOutcome::NotNeeded;
        }

        let report = ledger.rollback(self.filesystem.as_ref(), self.vault.as_ref());

        // Announce every step outcome in the order the pass ran, newest first.
        let mut steps: Vec<(&Operation, Option<&str>)> = report
            .undone
            .iter()
            .map(|operation| (operation, None))
            .chain(
                report
                    .failures
                    .iter()
                    .map(|failure| (&failure.operation, Some(failure.reason.as_str()))),
            )
            .collect();
        steps.sort_by_key(|(operation, _)| std::cmp::Reverse(operation.sequence));

        for (operation, failure) in steps {
            match failure {
                None => self.events.emit(
                    BatchEvent::info(batch_id, "Operation rolled back")
                        .with_operation(operation.sequence)
                        .with_context(json!({
                            "kind": operation.kind.as_str(),
                            "path": operation.target_path.display().to_string(),
                        })),
                ),
                Some(reason) => self.events.emit(
                    BatchEvent::warn(
                        batch_id,
                        format!(
                            "Rollback step failed for {}: {}",
                            operation.target_path.display(),
                            reason
                        ),
                    )
                    .with_operation(operation.sequence),
                ),
            }
        }

        self.events.emit(
            BatchEvent::info(batch_id, "Rollback finished").with_context(json!({
                "attempted": report.attempted,
                "restored": report.restored(),
                "failures": report.failures.len(),
            })),
        );
        report.into_outcome()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::output::{MockBackupVault, MockFilesystem};
    use crate::domain::DomainError;
    use chrono::Utc;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct RecordingSink {
        events: Arc<Mutex<Vec<BatchEvent>>>,
    }

    impl RecordingSink {
        fn messages(&self) -> Vec<String> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .map(|e| e.message.clone())
                .collect()
        }
    }

    impl crate::application::ports::EventSink for RecordingSink {
        fn emit(&self, event: BatchEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    fn service(fs: MockFilesystem, vault: MockBackupVault, sink: &RecordingSink) -> BatchService {
        BatchService::new(Box::new(fs), Box::new(vault), Box::new(sink.clone()))
    }

    fn is_temp(path: &Path) -> bool {
        path.extension().is_some_and(|e| e == "tmp")
    }

    fn backup_returning(content: &'static [u8]) -> MockBackupVault {
        let digest = ChecksumStore::digest(content);
        let mut vault = MockBackupVault::new();
        vault.expect_create_backup().returning(move |source, kind| {
            Ok(BackupRecord {
                source_path: source.to_path_buf(),
                backup_path: PathBuf::from("/vault/entry.bak"),
                kind,
                digest,
                created_at: Utc::now(),
            })
        });
        vault
    }

    // ── validation failures ──────────────────────────────────────────────────

    #[test]
    fn empty_plan_fails_before_touching_the_filesystem() {
        let sink = RecordingSink::default();
        // no expectations: any filesystem or vault call fails the test
        let service = service(MockFilesystem::new(), MockBackupVault::new(), &sink);

        let err = service.apply(&BatchPlan::new("/proj")).unwrap_err();
        assert!(matches!(
            err.source,
            StencilError::Domain(DomainError::EmptyPlan)
        ));
        assert!(err.failed_target.is_none());
        assert!(matches!(err.rollback, RollbackOutcome::NotNeeded));
    }

    #[test]
    fn traversal_is_rejected_before_any_write() {
        let mut fs = MockFilesystem::new();
        fs.expect_exists().withf(|p| p == Path::new("/proj")).return_const(true);

        let sink = RecordingSink::default();
        let service = service(fs, MockBackupVault::new(), &sink);
        let plan = BatchPlan::new("/proj").with_file("../escape.txt", "nope");

        let err = service.apply(&plan).unwrap_err();
        assert!(matches!(
            err.source,
            StencilError::Domain(DomainError::PathTraversal { .. })
        ));
        assert_eq!(err.failed_target, Some(PathBuf::from("../escape.txt")));
        assert!(matches!(err.rollback, RollbackOutcome::NotNeeded));
    }

    // ── forward pass ─────────────────────────────────────────────────────────

    #[test]
    fn creates_a_file_and_reports_its_digest() {
        let mut fs = MockFilesystem::new();
        fs.expect_exists().withf(|p| p == Path::new("/proj")).return_const(true);
        fs.expect_exists()
            .withf(|p| p == Path::new("/proj/a.txt"))
            .return_const(false);
        fs.expect_write_file()
            .withf(|p, c| is_temp(p) && c == b"v1")
            .returning(|_, _| Ok(()));
        fs.expect_read_file()
            .withf(|p| is_temp(p))
            .returning(|_| Ok(b"v1".to_vec()));
        fs.expect_rename()
            .withf(|from, to| is_temp(from) && to == Path::new("/proj/a.txt"))
            .returning(|_, _| Ok(()));
        fs.expect_read_file()
            .withf(|p| p == Path::new("/proj/a.txt"))
            .returning(|_| Ok(b"v1".to_vec()));

        let sink = RecordingSink::default();
        let service = service(fs, MockBackupVault::new(), &sink);
        let plan = BatchPlan::new("/proj").with_file("a.txt", "v1");

        let receipt = service.apply(&plan).unwrap();
        assert_eq!(receipt.operation_count(), 1);
        assert_eq!(receipt.operations[0].kind, OperationKind::CreateFile);
        assert!(receipt.operations[0].backup.is_none());
        assert_eq!(
            receipt.digest_for(Path::new("/proj/a.txt")),
            Some(&ChecksumStore::digest(b"v1"))
        );

        let messages = sink.messages();
        assert!(messages.contains(&"Batch started".to_string()));
        assert!(messages.contains(&"Operation recorded".to_string()));
        assert!(messages.contains(&"Write validated".to_string()));
        assert!(messages.contains(&"Batch completed".to_string()));
    }

    #[test]
    fn overwrite_snapshots_the_old_content_first() {
        let mut fs = MockFilesystem::new();
        fs.expect_exists().withf(|p| p == Path::new("/proj")).return_const(true);
        fs.expect_exists()
            .withf(|p| p == Path::new("/proj/notes.txt"))
            .return_const(true);
        fs.expect_is_dir()
            .withf(|p| p == Path::new("/proj/notes.txt"))
            .return_const(false);
        // pre-image read, then temp read-back, then post-write read
        fs.expect_read_file()
            .withf(|p| p == Path::new("/proj/notes.txt"))
            .times(1)
            .returning(|_| Ok(b"v1".to_vec()));
        fs.expect_read_file()
            .withf(|p| is_temp(p))
            .times(1)
            .returning(|_| Ok(b"v2".to_vec()));
        fs.expect_read_file()
            .withf(|p| p == Path::new("/proj/notes.txt"))
            .times(1)
            .returning(|_| Ok(b"v2".to_vec()));
        fs.expect_write_file()
            .withf(|p, c| is_temp(p) && c == b"v2")
            .returning(|_, _| Ok(()));
        fs.expect_rename().returning(|_, _| Ok(()));

        let sink = RecordingSink::default();
        let service = service(fs, backup_returning(b"v1"), &sink);
        let plan = BatchPlan::new("/proj").with_file("notes.txt", "v2");

        let receipt = service.apply(&plan).unwrap();
        assert_eq!(receipt.operation_count(), 1);
        let op = &receipt.operations[0];
        assert_eq!(op.kind, OperationKind::OverwriteFile);
        let backup = op.backup.as_ref().unwrap();
        assert_eq!(backup.digest, ChecksumStore::digest(b"v1"));
        let messages = sink.messages();
        assert!(messages.contains(&"Backup created".to_string()));
        assert!(messages.contains(&"Write validated".to_string()));
    }

    #[test]
    fn vault_copy_must_match_the_observed_bytes() {
        let mut fs = MockFilesystem::new();
        fs.expect_exists().withf(|p| p == Path::new("/proj")).return_const(true);
        fs.expect_exists()
            .withf(|p| p == Path::new("/proj/notes.txt"))
            .return_const(true);
        fs.expect_is_dir().return_const(false);
        fs.expect_read_file().returning(|_| Ok(b"v1".to_vec()));

        // vault reports a digest of bytes we never observed
        let sink = RecordingSink::default();
        let service = service(fs, backup_returning(b"tampered"), &sink);
        let plan = BatchPlan::new("/proj").with_file("notes.txt", "v2");

        let err = service.apply(&plan).unwrap_err();
        assert!(matches!(
            err.source,
            StencilError::Application(ApplicationError::IntegrityCheckFailed { .. })
        ));
        // nothing was recorded, so there is nothing to roll back
        assert!(matches!(err.rollback, RollbackOutcome::NotNeeded));
    }

    #[test]
    fn missing_parents_are_recorded_deepest_last() {
        let mut fs = MockFilesystem::new();
        fs.expect_exists().withf(|p| p == Path::new("/proj")).return_const(true);
        fs.expect_exists()
            .withf(|p| p == Path::new("/proj/a/b"))
            .return_const(false);
        fs.expect_exists()
            .withf(|p| p == Path::new("/proj/a"))
            .return_const(false);
        fs.expect_exists()
            .withf(|p| p == Path::new("/proj/a/b/c.txt"))
            .return_const(false);
        fs.expect_create_dir_all()
            .withf(|p| p == Path::new("/proj/a"))
            .times(1)
            .returning(|_| Ok(()));
        fs.expect_create_dir_all()
            .withf(|p| p == Path::new("/proj/a/b"))
            .times(1)
            .returning(|_| Ok(()));
        fs.expect_write_file().returning(|_, _| Ok(()));
        fs.expect_read_file().returning(|_| Ok(b"x".to_vec()));
        fs.expect_rename().returning(|_, _| Ok(()));

        let sink = RecordingSink::default();
        let service = service(fs, MockBackupVault::new(), &sink);
        let plan = BatchPlan::new("/proj").with_file("a/b/c.txt", "x");

        let receipt = service.apply(&plan).unwrap();
        let kinds: Vec<_> = receipt.operations.iter().map(|o| o.kind).collect();
        assert_eq!(
            kinds,
            vec![
                OperationKind::CreateDir,
                OperationKind::CreateDir,
                OperationKind::CreateFile
            ]
        );
        assert_eq!(receipt.operations[0].target_path, Path::new("/proj/a"));
        assert_eq!(receipt.operations[1].target_path, Path::new("/proj/a/b"));
    }

    #[test]
    fn nested_missing_root_records_every_level() {
        let mut fs = MockFilesystem::new();
        // first check during root creation, second while resolving parents
        fs.expect_exists()
            .withf(|p| p == Path::new("/srv/a/b"))
            .times(1)
            .return_const(false);
        fs.expect_exists()
            .withf(|p| p == Path::new("/srv/a/b"))
            .return_const(true);
        fs.expect_exists()
            .withf(|p| p == Path::new("/srv/a"))
            .return_const(false);
        fs.expect_exists().withf(|p| p == Path::new("/srv")).return_const(true);
        fs.expect_exists()
            .withf(|p| p == Path::new("/srv/a/b/sub"))
            .return_const(false);
        fs.expect_is_dir()
            .withf(|p| p == Path::new("/srv/a/b/sub"))
            .return_const(false);
        for dir in ["/srv/a", "/srv/a/b", "/srv/a/b/sub"] {
            fs.expect_create_dir_all()
                .withf(move |p| p == Path::new(dir))
                .times(1)
                .returning(|_| Ok(()));
        }

        let sink = RecordingSink::default();
        let service = service(fs, MockBackupVault::new(), &sink);
        let plan = BatchPlan::new("/srv/a/b").with_directory("sub");

        let receipt = service.apply(&plan).unwrap();
        let targets: Vec<_> = receipt
            .operations
            .iter()
            .map(|op| op.target_path.as_path())
            .collect();
        assert_eq!(
            targets,
            vec![
                Path::new("/srv/a"),
                Path::new("/srv/a/b"),
                Path::new("/srv/a/b/sub")
            ]
        );
        assert!(receipt.operations.iter().all(|op| op.kind == OperationKind::CreateDir));
    }

    #[test]
    fn existing_directory_entry_is_a_no_op() {
        let mut fs = MockFilesystem::new();
        fs.expect_exists().withf(|p| p == Path::new("/proj")).return_const(true);
        fs.expect_is_dir()
            .withf(|p| p == Path::new("/proj/sub"))
            .return_const(true);

        let sink = RecordingSink::default();
        let service = service(fs, MockBackupVault::new(), &sink);
        let plan = BatchPlan::new("/proj").with_directory("sub");

        let receipt = service.apply(&plan).unwrap();
        assert_eq!(receipt.operation_count(), 0);
        assert!(receipt.digests.is_empty());
    }

    // ── failure and rollback ─────────────────────────────────────────────────

    #[test]
    fn first_failure_rolls_back_everything_recorded() {
        let mut fs = MockFilesystem::new();
        fs.expect_exists().withf(|p| p == Path::new("/proj")).return_const(true);
        fs.expect_exists()
            .withf(|p| p == Path::new("/proj/a.txt"))
            .times(1)
            .return_const(false);
        fs.expect_exists()
            .withf(|p| p == Path::new("/proj/b.txt"))
            .return_const(false);
        fs.expect_exists().withf(|p| is_temp(p)).return_const(false);
        // rollback checks a.txt again after the forward pass stopped
        fs.expect_exists()
            .withf(|p| p == Path::new("/proj/a.txt"))
            .return_const(true);

        let a_temp = |p: &Path| {
            is_temp(p)
                && p.file_name()
                    .is_some_and(|n| n.to_string_lossy().starts_with(".a.txt."))
        };
        let b_temp = |p: &Path| {
            is_temp(p)
                && p.file_name()
                    .is_some_and(|n| n.to_string_lossy().starts_with(".b.txt."))
        };
        fs.expect_write_file()
            .withf(move |p, _| a_temp(p))
            .returning(|_, _| Ok(()));
        fs.expect_write_file().withf(move |p, _| b_temp(p)).returning(|p, _| {
            Err(ApplicationError::FilesystemError {
                path: p.to_path_buf(),
                reason: "disk full".into(),
            }
            .into())
        });
        fs.expect_read_file()
            .withf(move |p| a_temp(p))
            .returning(|_| Ok(b"alpha".to_vec()));
        fs.expect_read_file()
            .withf(|p| p == Path::new("/proj/a.txt"))
            .returning(|_| Ok(b"alpha".to_vec()));
        fs.expect_rename().returning(|_, _| Ok(()));
        fs.expect_remove_file()
            .withf(|p| p == Path::new("/proj/a.txt"))
            .times(1)
            .returning(|_| Ok(()));

        let sink = RecordingSink::default();
        let service = service(fs, MockBackupVault::new(), &sink);
        let plan = BatchPlan::new("/proj")
            .with_file("a.txt", "alpha")
            .with_file("b.txt", "beta");

        let err = service.apply(&plan).unwrap_err();
        assert_eq!(err.failed_target, Some(PathBuf::from("/proj/b.txt")));
        assert!(matches!(
            err.source,
            StencilError::Application(ApplicationError::FilesystemError { .. })
        ));

        // both recorded operations are walked: b.txt never landed (skip),
        // a.txt is removed
        let report = err.rollback_report().unwrap();
        assert_eq!(report.attempted, 2);
        assert_eq!(report.restored(), 2);
        assert!(report.is_clean());
        assert!(sink.messages().iter().any(|m| m.starts_with("Batch failed")));
    }

    #[test]
    fn failed_write_after_clearing_a_directory_still_restores_it() {
        let mut fs = MockFilesystem::new();
        fs.expect_exists().withf(|p| p == Path::new("/proj")).return_const(true);
        fs.expect_exists()
            .withf(|p| p == Path::new("/proj/blob"))
            .return_const(true);
        fs.expect_is_dir()
            .withf(|p| p == Path::new("/proj/blob"))
            .return_const(true);
        fs.expect_exists().withf(|p| is_temp(p)).return_const(false);
        fs.expect_remove_dir_all()
            .withf(|p| p == Path::new("/proj/blob"))
            .times(1)
            .returning(|_| Ok(()));
        fs.expect_write_file().returning(|p, _| {
            Err(ApplicationError::FilesystemError {
                path: p.to_path_buf(),
                reason: "disk full".into(),
            }
            .into())
        });

        let mut vault = MockBackupVault::new();
        vault.expect_create_backup().returning(|source, kind| {
            Ok(BackupRecord {
                source_path: source.to_path_buf(),
                backup_path: PathBuf::from("/vault/blob.tar.gz"),
                kind,
                digest: Digest::from_bytes([7u8; 32]),
                created_at: Utc::now(),
            })
        });
        // the cleared tree was already in the ledger, so rollback reaches it
        vault
            .expect_restore()
            .withf(|r| {
                r.source_path == Path::new("/proj/blob") && r.kind == BackupKind::Directory
            })
            .times(1)
            .returning(|_| Ok(()));

        let sink = RecordingSink::default();
        let service = service(fs, vault, &sink);
        let plan = BatchPlan::new("/proj").with_file("blob", "replacement");

        let err = service.apply(&plan).unwrap_err();
        assert_eq!(err.failed_target, Some(PathBuf::from("/proj/blob")));
        let report = err.rollback_report().unwrap();
        assert_eq!(report.attempted, 1);
        assert_eq!(report.restored(), 1);
        assert!(report.is_clean());
        assert!(sink.messages().contains(&"Operation rolled back".to_string()));
    }

    #[test]
    fn raised_stop_flag_interrupts_between_operations() {
        let mut fs = MockFilesystem::new();
        fs.expect_exists().withf(|p| p == Path::new("/proj")).return_const(true);

        let stop = Arc::new(AtomicBool::new(true));
        let sink = RecordingSink::default();
        let service = service(fs, MockBackupVault::new(), &sink).with_stop_flag(Arc::clone(&stop));
        let plan = BatchPlan::new("/proj").with_file("a.txt", "v1");

        let err = service.apply(&plan).unwrap_err();
        assert!(matches!(
            err.source,
            StencilError::Application(ApplicationError::Interrupted { completed: 0 })
        ));
        assert!(matches!(err.rollback, RollbackOutcome::NotNeeded));
    }
}

//! On-disk backup vault with copy and archive strategies.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tracing::{debug, info, warn};
use uuid::Uuid;

use stencil_core::{
    application::{
        ApplicationError, ChecksumStore,
        ports::{BackupVault, PruneReport},
    },
    domain::{BackupKind, BackupRecord, Digest},
    error::{StencilError, StencilResult},
};

use super::VaultConfig;

/// Production vault keeping every backup in one flat directory.
///
/// Files become byte copies (`.bak`); directories become `.tar.gz` archives
/// rooted at the directory's basename, so unpacking into the source's parent
/// puts the tree back in place. Entry names carry the source basename, the
/// creation timestamp and a random suffix, which keeps repeated backups of
/// the same basename collision-free within one second.
pub struct LocalVault {
    directory: PathBuf,
}

impl LocalVault {
    /// Open the vault, creating its directory if needed.
    ///
    /// Aged entries are pruned opportunistically here; a failing prune is
    /// logged and does not block the vault.
    pub fn open(config: &VaultConfig) -> StencilResult<Self> {
        let directory = match &config.directory {
            Some(dir) => dir.clone(),
            None => dirs::home_dir()
                .map(|home| home.join(".stencil-backups"))
                .ok_or_else(|| ApplicationError::VaultUnavailable {
                    path: PathBuf::from("~/.stencil-backups"),
                    reason: "Home directory could not be determined".into(),
                })?,
        };

        fs::create_dir_all(&directory).map_err(|e| ApplicationError::VaultUnavailable {
            path: directory.clone(),
            reason: format!("Failed to create vault directory: {e}"),
        })?;

        let vault = Self { directory };
        match vault.prune_older_than(config.retention()) {
            Ok(report) if report.removed > 0 => {
                info!(removed = report.removed, "Pruned aged vault entries");
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Opportunistic prune failed"),
        }
        Ok(vault)
    }

    /// Directory the vault stores entries in.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn entry_path(&self, source: &Path, kind: BackupKind, at: DateTime<Utc>) -> PathBuf {
        let base = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "entry".into());
        let stamp = at.format("%Y-%m-%dT%H-%M-%S");
        let nonce = Uuid::new_v4().simple().to_string();
        self.directory.join(format!(
            "{base}-{stamp}-{}.{}",
            &nonce[..8],
            kind.extension()
        ))
    }

    fn copy_file(&self, source: &Path, dest: &Path) -> StencilResult<Digest> {
        let bytes =
            fs::read(source).map_err(|e| backup_failed(source, "read source file", &e))?;
        let mut file =
            File::create(dest).map_err(|e| backup_failed(dest, "create vault entry", &e))?;
        file.write_all(&bytes)
            .map_err(|e| backup_failed(dest, "write vault entry", &e))?;
        file.sync_all()
            .map_err(|e| backup_failed(dest, "sync vault entry", &e))?;
        Ok(ChecksumStore::digest(&bytes))
    }

    fn archive_directory(&self, source: &Path, dest: &Path) -> StencilResult<Digest> {
        let base = source
            .file_name()
            .ok_or_else(|| ApplicationError::BackupCreationFailed {
                path: source.to_path_buf(),
                reason: "Directory has no basename to archive under".into(),
            })?;

        let file =
            File::create(dest).map_err(|e| backup_failed(dest, "create vault entry", &e))?;
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);
        builder
            .append_dir_all(base, source)
            .map_err(|e| backup_failed(source, "archive directory", &e))?;
        let encoder = builder
            .into_inner()
            .map_err(|e| backup_failed(dest, "finish archive", &e))?;
        let file = encoder
            .finish()
            .map_err(|e| backup_failed(dest, "finish archive", &e))?;
        file.sync_all()
            .map_err(|e| backup_failed(dest, "sync vault entry", &e))?;

        // The record's digest covers the stored bytes, so hash the archive
        // itself rather than the tree it was built from.
        let bytes =
            fs::read(dest).map_err(|e| backup_failed(dest, "read back vault entry", &e))?;
        Ok(ChecksumStore::digest(&bytes))
    }

    fn restore_file(&self, record: &BackupRecord, content: &[u8]) -> StencilResult<()> {
        let target = &record.source_path;
        if target.is_dir() {
            fs::remove_dir_all(target).map_err(|e| restore_failed(target, "clear occupant", &e))?;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| restore_failed(target, "recreate parent directory", &e))?;
        }
        atomic_write(target, content)
            .map_err(|e| restore_failed(target, "write restored content", &e))
    }

    fn restore_directory(&self, record: &BackupRecord) -> StencilResult<()> {
        let target = &record.source_path;
        let parent = target
            .parent()
            .ok_or_else(|| ApplicationError::RestoreFailed {
                path: target.clone(),
                reason: "Restore target has no parent directory".into(),
            })?;

        if target.exists() {
            let cleared = if target.is_dir() {
                fs::remove_dir_all(target)
            } else {
                fs::remove_file(target)
            };
            cleared.map_err(|e| restore_failed(target, "clear occupant", &e))?;
        }
        fs::create_dir_all(parent)
            .map_err(|e| restore_failed(target, "recreate parent directory", &e))?;

        let file = File::open(&record.backup_path)
            .map_err(|e| restore_failed(&record.backup_path, "open vault entry", &e))?;
        let mut archive = tar::Archive::new(GzDecoder::new(file));
        archive
            .unpack(parent)
            .map_err(|e| restore_failed(target, "unpack archive", &e))?;
        Ok(())
    }

    fn prune_with_now(&self, now: SystemTime, max_age: Duration) -> StencilResult<PruneReport> {
        let entries =
            fs::read_dir(&self.directory).map_err(|e| ApplicationError::VaultUnavailable {
                path: self.directory.clone(),
                reason: format!("Failed to scan vault directory: {e}"),
            })?;

        let mut report = PruneReport::default();
        for entry in entries {
            report.examined += 1;
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Unreadable vault entry, skipping");
                    report.skipped += 1;
                    continue;
                }
            };

            let path = entry.path();
            let modified = match entry.metadata().and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "No modification time, skipping");
                    report.skipped += 1;
                    continue;
                }
            };

            let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
            if age <= max_age {
                continue;
            }

            let removed = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            match removed {
                Ok(()) => report.removed += 1,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to prune vault entry");
                    report.skipped += 1;
                }
            }
        }

        debug!(
            examined = report.examined,
            removed = report.removed,
            skipped = report.skipped,
            "Prune pass finished"
        );
        Ok(report)
    }
}

impl BackupVault for LocalVault {
    fn create_backup(&self, source: &Path, kind: BackupKind) -> StencilResult<BackupRecord> {
        let created_at = Utc::now();
        let backup_path = self.entry_path(source, kind, created_at);

        let result = match kind {
            BackupKind::File => self.copy_file(source, &backup_path),
            BackupKind::Directory => self.archive_directory(source, &backup_path),
        };
        let digest = match result {
            Ok(digest) => digest,
            Err(e) => {
                if backup_path.exists() {
                    if let Err(cleanup) = fs::remove_file(&backup_path) {
                        warn!(
                            path = %backup_path.display(),
                            error = %cleanup,
                            "Failed to remove partial vault entry"
                        );
                    }
                }
                return Err(e);
            }
        };

        debug!(
            source = %source.display(),
            backup = %backup_path.display(),
            kind = %kind,
            "Vault entry written"
        );
        Ok(BackupRecord {
            source_path: source.to_path_buf(),
            backup_path,
            kind,
            digest,
            created_at,
        })
    }

    fn restore(&self, record: &BackupRecord) -> StencilResult<()> {
        // Never trust a vault entry blindly; re-hash it first.
        let stored = fs::read(&record.backup_path)
            .map_err(|e| restore_failed(&record.backup_path, "read vault entry", &e))?;
        let actual = ChecksumStore::digest(&stored);
        if actual != record.digest {
            return Err(ApplicationError::IntegrityCheckFailed {
                path: record.backup_path.clone(),
                expected: record.digest,
                actual,
            }
            .into());
        }

        match record.kind {
            BackupKind::File => self.restore_file(record, &stored),
            BackupKind::Directory => self.restore_directory(record),
        }
    }

    fn prune_older_than(&self, max_age: Duration) -> StencilResult<PruneReport> {
        self.prune_with_now(SystemTime::now(), max_age)
    }
}

/// Write content next to `path` and rename it into place.
fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "entry".into());
    let nonce = Uuid::new_v4().simple().to_string();
    let temp = parent.join(format!(".{name}.{}.tmp", &nonce[..8]));

    let write_result = (|| -> io::Result<()> {
        let mut file = File::create(&temp)?;
        file.write_all(content)?;
        file.sync_all()
    })();
    if let Err(e) = write_result {
        let _ = fs::remove_file(&temp);
        return Err(e);
    }

    fs::rename(&temp, path).map_err(|e| {
        let _ = fs::remove_file(&temp);
        e
    })
}

fn backup_failed(path: &Path, action: &str, e: &io::Error) -> StencilError {
    ApplicationError::BackupCreationFailed {
        path: path.to_path_buf(),
        reason: format!("Failed to {action}: {e}"),
    }
    .into()
}

fn restore_failed(path: &Path, action: &str, e: &io::Error) -> StencilError {
    ApplicationError::RestoreFailed {
        path: path.to_path_buf(),
        reason: format!("Failed to {action}: {e}"),
    }
    .into()
}

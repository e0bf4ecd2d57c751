//! Domain value objects: BatchId, Digest, OperationKind, BackupKind.
//!
//! # Design
//!
//! These are pure value types with equality by value and no identity,
//! `Copy` where possible. They hold NO orchestration logic. How a kind is
//! executed or rolled back lives in the application services. This file's
//! only job is to define the types, their string representations, and their
//! parsers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::DomainError;

// ── BatchId ──────────────────────────────────────────────────────────────────

/// Identity of one batch run.
///
/// Every operation recorded during a run carries the same `BatchId`; vault
/// entries and events reference it so a run can be traced end to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(uuid::Uuid);

impl BatchId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Digest ───────────────────────────────────────────────────────────────────

/// A SHA-256 content digest (32 bytes).
///
/// Rendered as 64 lowercase hex characters. Computation lives in
/// `application::services::checksum`; this type only carries the bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; 32]);

impl Digest {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self)
    }
}

impl FromStr for Digest {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 64 {
            return Err(DomainError::InvalidDigest {
                reason: format!("expected 64 hex characters, got {}", s.len()),
            });
        }
        let mut bytes = [0u8; 32];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(chunk).map_err(|_| DomainError::InvalidDigest {
                reason: "invalid hex character".into(),
            })?;
            bytes[i] = u8::from_str_radix(pair, 16).map_err(|_| DomainError::InvalidDigest {
                reason: "invalid hex character".into(),
            })?;
        }
        Ok(Self(bytes))
    }
}

impl Serialize for Digest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

// ── OperationKind ────────────────────────────────────────────────────────────

/// What a recorded operation did to its target path.
///
/// Overwrite variants replaced something that existed before the run and
/// therefore must carry a backup; Create variants must not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    CreateFile,
    OverwriteFile,
    CreateDir,
    OverwriteDir,
}

impl OperationKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CreateFile => "create-file",
            Self::OverwriteFile => "overwrite-file",
            Self::CreateDir => "create-dir",
            Self::OverwriteDir => "overwrite-dir",
        }
    }

    /// Whether this kind destroys pre-existing content and needs a backup.
    pub const fn requires_backup(self) -> bool {
        matches!(self, Self::OverwriteFile | Self::OverwriteDir)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create-file" => Ok(Self::CreateFile),
            "overwrite-file" => Ok(Self::OverwriteFile),
            "create-dir" => Ok(Self::CreateDir),
            "overwrite-dir" => Ok(Self::OverwriteDir),
            other => Err(DomainError::InvalidOperationKind {
                value: other.to_string(),
            }),
        }
    }
}

// ── BackupKind ───────────────────────────────────────────────────────────────

/// Snapshot strategy recorded with a backup.
///
/// One vault, two strategies: files are byte-copied, directories are
/// archived. The kind also fixes the vault entry's file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupKind {
    File,
    Directory,
}

impl BackupKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
        }
    }

    /// Extension of the vault entry this strategy produces.
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::File => "bak",
            Self::Directory => "tar.gz",
        }
    }
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

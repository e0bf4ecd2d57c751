//! Backup vault adapters.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

mod local;

pub use local::LocalVault;

const SECONDS_PER_DAY: u64 = 86_400;

/// Where the vault lives and how long its entries are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Vault directory. `None` means `<home>/.stencil-backups`.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// Entries older than this many days are pruned.
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,
}

impl VaultConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_days * SECONDS_PER_DAY)
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            directory: None,
            retention_days: default_retention_days(),
        }
    }
}

fn default_retention_days() -> u64 {
    7
}

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_OPS_LIMIT: u32 = 2;
pub const DEFAULT_MEM_LIMIT: u32 = 64 * 1024 * 1024; // 64 MiB

/// Argon2id cost as persisted in the backup header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub ops_limit: u32,
    /// Memory cost in bytes.
    pub mem_limit: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            ops_limit: DEFAULT_OPS_LIMIT,
            mem_limit: DEFAULT_MEM_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSettings {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub kdf: KdfParams,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            kdf: KdfParams::default(),
            output_dir: None,
            temp_dir: None,
        }
    }
}

impl BackupSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let mut settings: BackupSettings = serde_json::from_str(&json)?;
        if settings.batch_size == 0 {
            settings.batch_size = DEFAULT_BATCH_SIZE;
        }
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

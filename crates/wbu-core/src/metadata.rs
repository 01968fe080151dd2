//! `export.json`, the descriptor stored next to the table files in every archive.

use crate::error::{BackupError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const METADATA_FILE_NAME: &str = "export.json";
pub const BACKUP_PLATFORM: &str = "Android";
/// Highest archive content version this build understands.
pub const BACKUP_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupMetadata {
    pub platform: String,
    pub version: u32,
    pub user_id: String,
    #[serde(default)]
    pub user_handle: Option<String>,
    pub creation_time: DateTime<Utc>,
    #[serde(default)]
    pub client_id: Option<String>,
}

impl BackupMetadata {
    pub fn new(user_id: &str, user_handle: Option<&str>, client_id: Option<&str>) -> Self {
        Self {
            platform: BACKUP_PLATFORM.to_string(),
            version: BACKUP_FORMAT_VERSION,
            user_id: user_id.to_string(),
            user_handle: user_handle.map(str::to_string),
            creation_time: Utc::now(),
            client_id: client_id.map(str::to_string),
        }
    }

    /// Write `export.json` into `dir` and return its path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(METADATA_FILE_NAME);
        fs::write(&path, serde_json::to_vec_pretty(self)?)?;
        Ok(path)
    }

    pub fn read_from(dir: &Path) -> Result<Self> {
        let path = dir.join(METADATA_FILE_NAME);
        if !path.exists() {
            return Err(BackupError::UnreadableMetadata(format!(
                "{METADATA_FILE_NAME} missing from archive"
            )));
        }
        let json = fs::read_to_string(&path)?;
        serde_json::from_str(&json)
            .map_err(|e| BackupError::UnreadableMetadata(format!("{METADATA_FILE_NAME}: {e}")))
    }

    /// Check that this archive can be restored into `user_id`'s store.
    pub fn verify(&self, user_id: &str) -> Result<()> {
        if self.version > BACKUP_FORMAT_VERSION {
            return Err(BackupError::UnreadableMetadata(format!(
                "archive format {} is newer than supported {BACKUP_FORMAT_VERSION}",
                self.version
            )));
        }
        if self.user_id != user_id {
            return Err(BackupError::IdentityMismatch);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_then_read() {
        let dir = tempdir().unwrap();
        let meta = BackupMetadata::new("alice", Some("ali"), None);
        meta.write_to(dir.path()).unwrap();
        let back = BackupMetadata::read_from(dir.path()).unwrap();
        assert_eq!(back, meta);
        back.verify("alice").unwrap();
    }

    #[test]
    fn other_user_is_rejected() {
        let meta = BackupMetadata::new("alice", None, None);
        assert!(matches!(meta.verify("bob"), Err(BackupError::IdentityMismatch)));
    }

    #[test]
    fn newer_format_is_rejected() {
        let meta = BackupMetadata {
            version: BACKUP_FORMAT_VERSION + 1,
            ..BackupMetadata::new("alice", None, None)
        };
        assert!(matches!(meta.verify("alice"), Err(BackupError::UnreadableMetadata(_))));
    }

    #[test]
    fn missing_or_malformed_file() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            BackupMetadata::read_from(dir.path()),
            Err(BackupError::UnreadableMetadata(_))
        ));
        fs::write(dir.path().join(METADATA_FILE_NAME), "{\"platform\":").unwrap();
        assert!(matches!(
            BackupMetadata::read_from(dir.path()),
            Err(BackupError::UnreadableMetadata(_))
        ));
    }
}

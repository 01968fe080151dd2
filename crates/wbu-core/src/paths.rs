use crate::error::{BackupError, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

pub const APP_QUALIFIER: &str = "com";
pub const APP_ORG: &str = "wire";
pub const APP_NAME: &str = "backup";

pub fn data_dir() -> Result<PathBuf> {
    if let Ok(override_path) = std::env::var("WBU_DATA_DIR") {
        return Ok(PathBuf::from(override_path));
    }
    let dirs = ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .ok_or_else(|| BackupError::Io("cannot determine data directory".to_string()))?;
    Ok(dirs.data_dir().to_path_buf())
}

pub fn default_output_dir() -> Result<PathBuf> {
    Ok(data_dir()?.join("backups"))
}

pub fn default_settings_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("settings.json"))
}

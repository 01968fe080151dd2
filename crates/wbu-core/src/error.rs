use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Backup metadata unreadable: {0}")]
    UnreadableMetadata(String),

    #[error("Invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("Invalid stream header length: expected {expected} bytes, got {actual}")]
    InvalidHeaderLength { expected: usize, actual: usize },

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Stream cipher initialisation failed")]
    EncryptionInitialisationFailed,

    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Decryption failed (wrong password or corrupted backup)")]
    DecryptionFailed,

    #[error("Backup belongs to a different account")]
    IdentityMismatch,

    #[error("Crypto backend unavailable: {0}")]
    NativeLibraryUnavailable(String),

    #[error("I/O failure: {0}")]
    Io(String),

    #[error("Serialisation error: {0}")]
    Serialization(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Backup and restore must not run on the UI thread")]
    UiThread,

    #[error("Batch {index} failed: {source}")]
    Batch {
        index: usize,
        #[source]
        source: Box<BackupError>,
    },

    #[error("Table {table} failed: {source}")]
    Table {
        table: String,
        #[source]
        source: Box<BackupError>,
    },
}

impl BackupError {
    /// The innermost error once batch and table context is stripped.
    pub fn root_cause(&self) -> &BackupError {
        match self {
            BackupError::Batch { source, .. } | BackupError::Table { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }

    pub(crate) fn in_batch(index: usize, error: BackupError) -> Self {
        BackupError::Batch {
            index,
            source: Box::new(error),
        }
    }

    pub(crate) fn in_table(table: &str, error: BackupError) -> Self {
        BackupError::Table {
            table: table.to_string(),
            source: Box::new(error),
        }
    }
}

impl From<std::io::Error> for BackupError {
    fn from(e: std::io::Error) -> Self {
        BackupError::Io(e.to_string())
    }
}

impl From<zip::result::ZipError> for BackupError {
    fn from(e: zip::result::ZipError) -> Self {
        BackupError::Io(e.to_string())
    }
}

impl From<tempfile::PersistError> for BackupError {
    fn from(e: tempfile::PersistError) -> Self {
        BackupError::Io(e.error.to_string())
    }
}

impl From<serde_json::Error> for BackupError {
    fn from(e: serde_json::Error) -> Self {
        BackupError::Serialization(e.to_string())
    }
}

impl From<rusqlite::Error> for BackupError {
    fn from(e: rusqlite::Error) -> Self {
        BackupError::Database(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;

//! wbu-core: encrypted export and restore of the local messaging store
//!
//! # Module layout
//! - `header`      : fixed binary header prefixed to every artifact
//! - `crypto`      : Argon2id key derivation + XChaCha20-Poly1305 stream cipher
//! - `encryption`  : artifact encryption/decryption with identity check
//! - `models`      : portable per-table backup models
//! - `batch`       : batched readers/writers between tables and JSON Lines files
//! - `source`      : per-table data sources combining the above
//! - `archive`     : zip packaging
//! - `metadata`    : `export.json` descriptor
//! - `manager`     : full export/import flows
//! - `db`          : table DAOs, in-memory and SQLite stores
//! - `config`, `paths`, `error`

pub mod archive;
pub mod batch;
pub mod config;
pub mod crypto;
pub mod db;
pub mod encryption;
pub mod error;
pub mod header;
pub mod manager;
pub mod metadata;
pub mod models;
pub mod paths;
pub mod source;

pub use config::{BackupSettings, KdfParams};
pub use crypto::{BackupKey, CryptoEngine};
pub use encryption::{read_header, BackupEncryption};
pub use error::{BackupError, Result};
pub use header::{EncryptedBackupHeader, HeaderVersion};
pub use manager::{BackupManager, ExportSummary, ImportSummary};
pub use metadata::BackupMetadata;

//! Portable backup models and their mapping to persisted rows.
//!
//! Each table has a model mirroring the row's backed-up columns, with
//! `From` conversions in both directions. The conversions are total: a
//! malformed optional field maps to `None` and columns that are not backed
//! up are restored with a fixed default. Model fields missing from an older
//! backup file deserialize to their defaults.

pub mod conversations;
pub mod messages;
pub mod properties;
pub mod users;

pub use conversations::{
    ConversationBackupModel, ConversationFolderBackupModel, ConversationMemberBackupModel,
    FolderBackupModel,
};
pub use messages::{
    AssetBackupModel, LikeBackupModel, MessageBackupModel, ReadReceiptBackupModel,
};
pub use properties::{KeyValueBackupModel, PropertyBackupModel};
pub use users::UserBackupModel;

use base64::{engine::general_purpose, Engine as _};

pub(crate) fn encode_blob(bytes: &Option<Vec<u8>>) -> Option<String> {
    bytes.as_ref().map(|b| general_purpose::STANDARD.encode(b))
}

pub(crate) fn decode_blob(encoded: Option<String>) -> Option<Vec<u8>> {
    encoded.and_then(|s| general_purpose::STANDARD.decode(s).ok())
}

use super::{decode_blob, encode_blob};
use crate::db::entities::{AssetEntity, LikeEntity, MessageEntity, ReadReceiptEntity};
use serde::{Deserialize, Serialize};

/// A message as written to the backup. `local_time` is not carried: on
/// restore it takes the message's server `time`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBackupModel {
    pub id: String,
    pub conversation_id: String,
    #[serde(default)]
    pub message_type: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    /// Base64 of the raw protobuf payload.
    #[serde(default)]
    pub protos: Option<String>,
    #[serde(default)]
    pub time: i64,
    #[serde(default)]
    pub edit_time: i64,
    #[serde(default)]
    pub first_message: bool,
    #[serde(default)]
    pub members: Option<String>,
    #[serde(default)]
    pub message_state: String,
    #[serde(default)]
    pub ephemeral: Option<i64>,
    #[serde(default)]
    pub expiry_time: Option<i64>,
    #[serde(default)]
    pub expired: bool,
    #[serde(default)]
    pub quote: Option<String>,
    #[serde(default)]
    pub asset_id: Option<String>,
}

impl From<MessageEntity> for MessageBackupModel {
    fn from(row: MessageEntity) -> Self {
        Self {
            protos: encode_blob(&row.protos),
            id: row.id,
            conversation_id: row.conversation_id,
            message_type: row.message_type,
            user_id: row.user_id,
            client_id: row.client_id,
            content: row.content,
            time: row.time,
            edit_time: row.edit_time,
            first_message: row.first_message,
            members: row.members,
            message_state: row.message_state,
            ephemeral: row.ephemeral,
            expiry_time: row.expiry_time,
            expired: row.expired,
            quote: row.quote,
            asset_id: row.asset_id,
        }
    }
}

impl From<MessageBackupModel> for MessageEntity {
    fn from(model: MessageBackupModel) -> Self {
        Self {
            id: model.id,
            conversation_id: model.conversation_id,
            message_type: model.message_type,
            user_id: model.user_id,
            client_id: model.client_id,
            content: model.content,
            protos: decode_blob(model.protos),
            time: model.time,
            local_time: model.time,
            edit_time: model.edit_time,
            first_message: model.first_message,
            members: model.members,
            message_state: model.message_state,
            ephemeral: model.ephemeral,
            expiry_time: model.expiry_time,
            expired: model.expired,
            quote: model.quote,
            asset_id: model.asset_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetBackupModel {
    pub id: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub encryption: String,
    #[serde(default)]
    pub mime: String,
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub preview: Option<String>,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

impl From<AssetEntity> for AssetBackupModel {
    fn from(row: AssetEntity) -> Self {
        Self {
            sha: encode_blob(&row.sha),
            id: row.id,
            token: row.token,
            domain: row.domain,
            name: row.name,
            encryption: row.encryption,
            mime: row.mime,
            size: row.size,
            source: row.source,
            preview: row.preview,
            details: row.details,
            conversation_id: row.conversation_id,
        }
    }
}

impl From<AssetBackupModel> for AssetEntity {
    fn from(model: AssetBackupModel) -> Self {
        Self {
            id: model.id,
            token: model.token,
            domain: model.domain,
            name: model.name,
            encryption: model.encryption,
            mime: model.mime,
            sha: decode_blob(model.sha),
            size: model.size,
            source: model.source,
            preview: model.preview,
            details: model.details,
            conversation_id: model.conversation_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeBackupModel {
    pub message_id: String,
    pub user_id: String,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub action: i32,
}

impl From<LikeEntity> for LikeBackupModel {
    fn from(row: LikeEntity) -> Self {
        Self {
            message_id: row.message_id,
            user_id: row.user_id,
            timestamp: row.timestamp,
            action: row.action,
        }
    }
}

impl From<LikeBackupModel> for LikeEntity {
    fn from(model: LikeBackupModel) -> Self {
        Self {
            message_id: model.message_id,
            user_id: model.user_id,
            timestamp: model.timestamp,
            action: model.action,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadReceiptBackupModel {
    pub message_id: String,
    pub user_id: String,
    #[serde(default)]
    pub timestamp: i64,
}

impl From<ReadReceiptEntity> for ReadReceiptBackupModel {
    fn from(row: ReadReceiptEntity) -> Self {
        Self {
            message_id: row.message_id,
            user_id: row.user_id,
            timestamp: row.timestamp,
        }
    }
}

impl From<ReadReceiptBackupModel> for ReadReceiptEntity {
    fn from(model: ReadReceiptBackupModel) -> Self {
        Self {
            message_id: model.message_id,
            user_id: model.user_id,
            timestamp: model.timestamp,
        }
    }
}

//! Persisted row types, one per local table.

use super::sqlite::SqlRow;
use rusqlite::types::Value;
use rusqlite::Row;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEntity {
    pub id: String,
    pub domain: Option<String>,
    pub team_id: Option<String>,
    pub name: String,
    pub handle: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub picture: Option<String>,
    pub accent_id: i32,
    pub connection: String,
    pub deleted: bool,
    /// Presence state, not part of backups.
    pub availability: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationEntity {
    pub id: String,
    pub remote_id: String,
    pub domain: Option<String>,
    pub name: Option<String>,
    pub creator: Option<String>,
    pub conversation_type: i32,
    pub team: Option<String>,
    pub muted_status: i32,
    pub last_event_time: i64,
    pub archived: bool,
    pub verified: Option<String>,
    /// Recomputed locally, not part of backups.
    pub unread_count: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationMemberEntity {
    pub user_id: String,
    pub conversation_id: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEntity {
    pub id: String,
    pub conversation_id: String,
    pub message_type: String,
    pub user_id: String,
    pub client_id: Option<String>,
    pub content: Option<String>,
    pub protos: Option<Vec<u8>>,
    pub time: i64,
    /// Local arrival time, restored as `time`.
    pub local_time: i64,
    pub edit_time: i64,
    pub first_message: bool,
    pub members: Option<String>,
    pub message_state: String,
    pub ephemeral: Option<i64>,
    pub expiry_time: Option<i64>,
    pub expired: bool,
    pub quote: Option<String>,
    pub asset_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetEntity {
    pub id: String,
    pub token: Option<String>,
    pub domain: Option<String>,
    pub name: String,
    pub encryption: String,
    pub mime: String,
    pub sha: Option<Vec<u8>>,
    pub size: i64,
    pub source: Option<String>,
    pub preview: Option<String>,
    pub details: String,
    pub conversation_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeEntity {
    pub message_id: String,
    pub user_id: String,
    pub timestamp: i64,
    pub action: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadReceiptEntity {
    pub message_id: String,
    pub user_id: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyEntity {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValueEntity {
    pub key: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderEntity {
    pub id: String,
    pub name: String,
    pub folder_type: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationFolderEntity {
    pub conversation_id: String,
    pub folder_id: String,
}

// ── SQL mapping ─────────────────────────────────────────────────────────────

impl SqlRow for UserEntity {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "domain",
        "team_id",
        "name",
        "handle",
        "email",
        "phone",
        "picture",
        "accent_id",
        "connection",
        "deleted",
        "availability",
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            domain: row.get(1)?,
            team_id: row.get(2)?,
            name: row.get(3)?,
            handle: row.get(4)?,
            email: row.get(5)?,
            phone: row.get(6)?,
            picture: row.get(7)?,
            accent_id: row.get(8)?,
            connection: row.get(9)?,
            deleted: row.get(10)?,
            availability: row.get(11)?,
        })
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            self.id.clone().into(),
            self.domain.clone().into(),
            self.team_id.clone().into(),
            self.name.clone().into(),
            self.handle.clone().into(),
            self.email.clone().into(),
            self.phone.clone().into(),
            self.picture.clone().into(),
            self.accent_id.into(),
            self.connection.clone().into(),
            self.deleted.into(),
            self.availability.into(),
        ]
    }
}

impl SqlRow for ConversationEntity {
    const TABLE: &'static str = "conversations";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "remote_id",
        "domain",
        "name",
        "creator",
        "conversation_type",
        "team",
        "muted_status",
        "last_event_time",
        "archived",
        "verified",
        "unread_count",
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            remote_id: row.get(1)?,
            domain: row.get(2)?,
            name: row.get(3)?,
            creator: row.get(4)?,
            conversation_type: row.get(5)?,
            team: row.get(6)?,
            muted_status: row.get(7)?,
            last_event_time: row.get(8)?,
            archived: row.get(9)?,
            verified: row.get(10)?,
            unread_count: row.get(11)?,
        })
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            self.id.clone().into(),
            self.remote_id.clone().into(),
            self.domain.clone().into(),
            self.name.clone().into(),
            self.creator.clone().into(),
            self.conversation_type.into(),
            self.team.clone().into(),
            self.muted_status.into(),
            self.last_event_time.into(),
            self.archived.into(),
            self.verified.clone().into(),
            self.unread_count.into(),
        ]
    }
}

impl SqlRow for ConversationMemberEntity {
    const TABLE: &'static str = "conversation_members";
    const COLUMNS: &'static [&'static str] = &["user_id", "conversation_id", "role"];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get(0)?,
            conversation_id: row.get(1)?,
            role: row.get(2)?,
        })
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            self.user_id.clone().into(),
            self.conversation_id.clone().into(),
            self.role.clone().into(),
        ]
    }
}

impl SqlRow for MessageEntity {
    const TABLE: &'static str = "messages";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "conversation_id",
        "message_type",
        "user_id",
        "client_id",
        "content",
        "protos",
        "time",
        "local_time",
        "edit_time",
        "first_message",
        "members",
        "message_state",
        "ephemeral",
        "expiry_time",
        "expired",
        "quote",
        "asset_id",
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            conversation_id: row.get(1)?,
            message_type: row.get(2)?,
            user_id: row.get(3)?,
            client_id: row.get(4)?,
            content: row.get(5)?,
            protos: row.get(6)?,
            time: row.get(7)?,
            local_time: row.get(8)?,
            edit_time: row.get(9)?,
            first_message: row.get(10)?,
            members: row.get(11)?,
            message_state: row.get(12)?,
            ephemeral: row.get(13)?,
            expiry_time: row.get(14)?,
            expired: row.get(15)?,
            quote: row.get(16)?,
            asset_id: row.get(17)?,
        })
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            self.id.clone().into(),
            self.conversation_id.clone().into(),
            self.message_type.clone().into(),
            self.user_id.clone().into(),
            self.client_id.clone().into(),
            self.content.clone().into(),
            self.protos.clone().into(),
            self.time.into(),
            self.local_time.into(),
            self.edit_time.into(),
            self.first_message.into(),
            self.members.clone().into(),
            self.message_state.clone().into(),
            self.ephemeral.into(),
            self.expiry_time.into(),
            self.expired.into(),
            self.quote.clone().into(),
            self.asset_id.clone().into(),
        ]
    }
}

impl SqlRow for AssetEntity {
    const TABLE: &'static str = "assets";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "token",
        "domain",
        "name",
        "encryption",
        "mime",
        "sha",
        "size",
        "source",
        "preview",
        "details",
        "conversation_id",
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            token: row.get(1)?,
            domain: row.get(2)?,
            name: row.get(3)?,
            encryption: row.get(4)?,
            mime: row.get(5)?,
            sha: row.get(6)?,
            size: row.get(7)?,
            source: row.get(8)?,
            preview: row.get(9)?,
            details: row.get(10)?,
            conversation_id: row.get(11)?,
        })
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            self.id.clone().into(),
            self.token.clone().into(),
            self.domain.clone().into(),
            self.name.clone().into(),
            self.encryption.clone().into(),
            self.mime.clone().into(),
            self.sha.clone().into(),
            self.size.into(),
            self.source.clone().into(),
            self.preview.clone().into(),
            self.details.clone().into(),
            self.conversation_id.clone().into(),
        ]
    }
}

impl SqlRow for LikeEntity {
    const TABLE: &'static str = "likes";
    const COLUMNS: &'static [&'static str] = &["message_id", "user_id", "timestamp", "action"];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            message_id: row.get(0)?,
            user_id: row.get(1)?,
            timestamp: row.get(2)?,
            action: row.get(3)?,
        })
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            self.message_id.clone().into(),
            self.user_id.clone().into(),
            self.timestamp.into(),
            self.action.into(),
        ]
    }
}

impl SqlRow for ReadReceiptEntity {
    const TABLE: &'static str = "read_receipts";
    const COLUMNS: &'static [&'static str] = &["message_id", "user_id", "timestamp"];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            message_id: row.get(0)?,
            user_id: row.get(1)?,
            timestamp: row.get(2)?,
        })
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            self.message_id.clone().into(),
            self.user_id.clone().into(),
            self.timestamp.into(),
        ]
    }
}

impl SqlRow for PropertyEntity {
    const TABLE: &'static str = "properties";
    const COLUMNS: &'static [&'static str] = &["key", "value"];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            key: row.get(0)?,
            value: row.get(1)?,
        })
    }

    fn to_values(&self) -> Vec<Value> {
        vec![self.key.clone().into(), self.value.clone().into()]
    }
}

impl SqlRow for KeyValueEntity {
    const TABLE: &'static str = "key_values";
    const COLUMNS: &'static [&'static str] = &["key", "value"];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            key: row.get(0)?,
            value: row.get(1)?,
        })
    }

    fn to_values(&self) -> Vec<Value> {
        vec![self.key.clone().into(), self.value.clone().into()]
    }
}

impl SqlRow for FolderEntity {
    const TABLE: &'static str = "folders";
    const COLUMNS: &'static [&'static str] = &["id", "name", "folder_type"];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            folder_type: row.get(2)?,
        })
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            self.id.clone().into(),
            self.name.clone().into(),
            self.folder_type.into(),
        ]
    }
}

impl SqlRow for ConversationFolderEntity {
    const TABLE: &'static str = "conversation_folders";
    const COLUMNS: &'static [&'static str] = &["conversation_id", "folder_id"];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            conversation_id: row.get(0)?,
            folder_id: row.get(1)?,
        })
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            self.conversation_id.clone().into(),
            self.folder_id.clone().into(),
        ]
    }
}

use crate::db::entities::{
    ConversationEntity, ConversationFolderEntity, ConversationMemberEntity, FolderEntity,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationBackupModel {
    pub id: String,
    pub remote_id: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub conversation_type: i32,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub muted_status: i32,
    #[serde(default)]
    pub last_event_time: i64,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub verified: Option<String>,
}

impl From<ConversationEntity> for ConversationBackupModel {
    fn from(row: ConversationEntity) -> Self {
        Self {
            id: row.id,
            remote_id: row.remote_id,
            domain: row.domain,
            name: row.name,
            creator: row.creator,
            conversation_type: row.conversation_type,
            team: row.team,
            muted_status: row.muted_status,
            last_event_time: row.last_event_time,
            archived: row.archived,
            verified: row.verified,
        }
    }
}

impl From<ConversationBackupModel> for ConversationEntity {
    fn from(model: ConversationBackupModel) -> Self {
        Self {
            id: model.id,
            remote_id: model.remote_id,
            domain: model.domain,
            name: model.name,
            creator: model.creator,
            conversation_type: model.conversation_type,
            team: model.team,
            muted_status: model.muted_status,
            last_event_time: model.last_event_time,
            archived: model.archived,
            verified: model.verified,
            unread_count: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMemberBackupModel {
    pub user_id: String,
    pub conversation_id: String,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "wire_member".to_string()
}

impl From<ConversationMemberEntity> for ConversationMemberBackupModel {
    fn from(row: ConversationMemberEntity) -> Self {
        Self {
            user_id: row.user_id,
            conversation_id: row.conversation_id,
            role: row.role,
        }
    }
}

impl From<ConversationMemberBackupModel> for ConversationMemberEntity {
    fn from(model: ConversationMemberBackupModel) -> Self {
        Self {
            user_id: model.user_id,
            conversation_id: model.conversation_id,
            role: model.role,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderBackupModel {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub folder_type: i32,
}

impl From<FolderEntity> for FolderBackupModel {
    fn from(row: FolderEntity) -> Self {
        Self {
            id: row.id,
            name: row.name,
            folder_type: row.folder_type,
        }
    }
}

impl From<FolderBackupModel> for FolderEntity {
    fn from(model: FolderBackupModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            folder_type: model.folder_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationFolderBackupModel {
    pub conversation_id: String,
    pub folder_id: String,
}

impl From<ConversationFolderEntity> for ConversationFolderBackupModel {
    fn from(row: ConversationFolderEntity) -> Self {
        Self {
            conversation_id: row.conversation_id,
            folder_id: row.folder_id,
        }
    }
}

impl From<ConversationFolderBackupModel> for ConversationFolderEntity {
    fn from(model: ConversationFolderBackupModel) -> Self {
        Self {
            conversation_id: model.conversation_id,
            folder_id: model.folder_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_roundtrip() {
        let row = ConversationEntity {
            id: "c-1".into(),
            remote_id: "r-1".into(),
            domain: Some("wire.com".into()),
            name: Some("Team chat".into()),
            creator: Some("u-1".into()),
            conversation_type: 0,
            team: None,
            muted_status: 2,
            last_event_time: 1_700_000_000_000,
            archived: true,
            verified: Some("VERIFIED".into()),
            unread_count: 0,
        };
        assert_eq!(
            ConversationEntity::from(ConversationBackupModel::from(row.clone())),
            row
        );
    }

    #[test]
    fn unread_count_restarts_at_zero() {
        let model = ConversationBackupModel {
            id: "c".into(),
            remote_id: "r".into(),
            domain: None,
            name: None,
            creator: None,
            conversation_type: 1,
            team: None,
            muted_status: 0,
            last_event_time: 0,
            archived: false,
            verified: None,
        };
        assert_eq!(ConversationEntity::from(model).unread_count, 0);
    }

    #[test]
    fn member_folder_roundtrips() {
        let member = ConversationMemberEntity {
            user_id: "u".into(),
            conversation_id: "c".into(),
            role: "wire_admin".into(),
        };
        assert_eq!(
            ConversationMemberEntity::from(ConversationMemberBackupModel::from(member.clone())),
            member
        );

        let folder = FolderEntity {
            id: "f".into(),
            name: "Favourites".into(),
            folder_type: 1,
        };
        assert_eq!(FolderEntity::from(FolderBackupModel::from(folder.clone())), folder);

        let link = ConversationFolderEntity {
            conversation_id: "c".into(),
            folder_id: "f".into(),
        };
        assert_eq!(
            ConversationFolderEntity::from(ConversationFolderBackupModel::from(link.clone())),
            link
        );
    }

    #[test]
    fn member_role_defaults() {
        let model: ConversationMemberBackupModel =
            serde_json::from_str(r#"{"user_id":"u","conversation_id":"c"}"#).unwrap();
        assert_eq!(model.role, "wire_member");
    }
}

use crate::db::entities::UserEntity;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBackupModel {
    pub id: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub accent_id: i32,
    #[serde(default = "default_connection")]
    pub connection: String,
    #[serde(default)]
    pub deleted: bool,
}

fn default_connection() -> String {
    "unconnected".to_string()
}

impl From<UserEntity> for UserBackupModel {
    fn from(row: UserEntity) -> Self {
        Self {
            id: row.id,
            domain: row.domain,
            team_id: row.team_id,
            name: row.name,
            handle: row.handle,
            email: row.email,
            phone: row.phone,
            picture: row.picture,
            accent_id: row.accent_id,
            connection: row.connection,
            deleted: row.deleted,
        }
    }
}

impl From<UserBackupModel> for UserEntity {
    fn from(model: UserBackupModel) -> Self {
        Self {
            id: model.id,
            domain: model.domain,
            team_id: model.team_id,
            name: model.name,
            handle: model.handle,
            email: model.email,
            phone: model.phone,
            picture: model.picture,
            accent_id: model.accent_id,
            connection: model.connection,
            deleted: model.deleted,
            availability: 0,
        }
    }
}

use crate::db::entities::{KeyValueEntity, PropertyEntity};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyBackupModel {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

impl From<PropertyEntity> for PropertyBackupModel {
    fn from(row: PropertyEntity) -> Self {
        Self {
            key: row.key,
            value: row.value,
        }
    }
}

impl From<PropertyBackupModel> for PropertyEntity {
    fn from(model: PropertyBackupModel) -> Self {
        Self {
            key: model.key,
            value: model.value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValueBackupModel {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
}

impl From<KeyValueEntity> for KeyValueBackupModel {
    fn from(row: KeyValueEntity) -> Self {
        Self {
            key: row.key,
            value: row.value,
        }
    }
}

impl From<KeyValueBackupModel> for KeyValueEntity {
    fn from(model: KeyValueBackupModel) -> Self {
        Self {
            key: model.key,
            value: model.value,
        }
    }
}

//! Database collaborators consumed by the backup pipeline.
//!
//! The pipeline only needs paged reads and batched writes per table, exposed
//! through [`TableDao`]. [`MessagingDatabase`] groups one DAO per backed-up
//! table. Two stores implement it: an in-memory one and a SQLite one.

pub mod entities;
pub mod schema;
pub mod sqlite;

use crate::error::Result;
use entities::*;
use parking_lot::Mutex;

pub use sqlite::SqliteDatabase;

/// Paged access to one table. Pages are returned in a stable order.
pub trait TableDao<R> {
    fn count(&self) -> Result<u64>;
    fn page(&self, offset: u64, limit: usize) -> Result<Vec<R>>;
    fn insert_all(&self, rows: &[R]) -> Result<()>;
}

pub trait MessagingDatabase {
    fn users(&self) -> &dyn TableDao<UserEntity>;
    fn conversations(&self) -> &dyn TableDao<ConversationEntity>;
    fn conversation_members(&self) -> &dyn TableDao<ConversationMemberEntity>;
    fn messages(&self) -> &dyn TableDao<MessageEntity>;
    fn assets(&self) -> &dyn TableDao<AssetEntity>;
    fn likes(&self) -> &dyn TableDao<LikeEntity>;
    fn read_receipts(&self) -> &dyn TableDao<ReadReceiptEntity>;
    fn properties(&self) -> &dyn TableDao<PropertyEntity>;
    fn key_values(&self) -> &dyn TableDao<KeyValueEntity>;
    fn folders(&self) -> &dyn TableDao<FolderEntity>;
    fn conversation_folders(&self) -> &dyn TableDao<ConversationFolderEntity>;
}

/// Vector-backed table, rows kept in insertion order.
#[derive(Debug)]
pub struct MemoryDao<R> {
    rows: Mutex<Vec<R>>,
}

impl<R> Default for MemoryDao<R> {
    fn default() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
        }
    }
}

impl<R: Clone> MemoryDao<R> {
    pub fn with_rows(rows: Vec<R>) -> Self {
        Self {
            rows: Mutex::new(rows),
        }
    }

    pub fn snapshot(&self) -> Vec<R> {
        self.rows.lock().clone()
    }
}

impl<R: Clone> TableDao<R> for MemoryDao<R> {
    fn count(&self) -> Result<u64> {
        Ok(self.rows.lock().len() as u64)
    }

    fn page(&self, offset: u64, limit: usize) -> Result<Vec<R>> {
        let rows = self.rows.lock();
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(rows.len());
        let end = start.saturating_add(limit).min(rows.len());
        Ok(rows[start..end].to_vec())
    }

    fn insert_all(&self, rows: &[R]) -> Result<()> {
        self.rows.lock().extend_from_slice(rows);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryDatabase {
    pub users: MemoryDao<UserEntity>,
    pub conversations: MemoryDao<ConversationEntity>,
    pub conversation_members: MemoryDao<ConversationMemberEntity>,
    pub messages: MemoryDao<MessageEntity>,
    pub assets: MemoryDao<AssetEntity>,
    pub likes: MemoryDao<LikeEntity>,
    pub read_receipts: MemoryDao<ReadReceiptEntity>,
    pub properties: MemoryDao<PropertyEntity>,
    pub key_values: MemoryDao<KeyValueEntity>,
    pub folders: MemoryDao<FolderEntity>,
    pub conversation_folders: MemoryDao<ConversationFolderEntity>,
}

impl MessagingDatabase for MemoryDatabase {
    fn users(&self) -> &dyn TableDao<UserEntity> {
        &self.users
    }
    fn conversations(&self) -> &dyn TableDao<ConversationEntity> {
        &self.conversations
    }
    fn conversation_members(&self) -> &dyn TableDao<ConversationMemberEntity> {
        &self.conversation_members
    }
    fn messages(&self) -> &dyn TableDao<MessageEntity> {
        &self.messages
    }
    fn assets(&self) -> &dyn TableDao<AssetEntity> {
        &self.assets
    }
    fn likes(&self) -> &dyn TableDao<LikeEntity> {
        &self.likes
    }
    fn read_receipts(&self) -> &dyn TableDao<ReadReceiptEntity> {
        &self.read_receipts
    }
    fn properties(&self) -> &dyn TableDao<PropertyEntity> {
        &self.properties
    }
    fn key_values(&self) -> &dyn TableDao<KeyValueEntity> {
        &self.key_values
    }
    fn folders(&self) -> &dyn TableDao<FolderEntity> {
        &self.folders
    }
    fn conversation_folders(&self) -> &dyn TableDao<ConversationFolderEntity> {
        &self.conversation_folders
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_pages_are_bounded() {
        let dao = MemoryDao::with_rows((0..10).collect::<Vec<i32>>());
        assert_eq!(dao.count().unwrap(), 10);
        assert_eq!(dao.page(0, 4).unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(dao.page(8, 4).unwrap(), vec![8, 9]);
        assert!(dao.page(10, 4).unwrap().is_empty());
        assert!(dao.page(u64::MAX, 4).unwrap().is_empty());
    }
}

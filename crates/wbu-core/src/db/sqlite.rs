//! SQLite-backed implementation of the table DAOs.

use super::entities::*;
use super::schema::{CREATE_TABLES, SCHEMA_VERSION};
use super::{MessagingDatabase, TableDao};
use crate::error::Result;
use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Column mapping for a row type stored in SQLite.
pub trait SqlRow: Sized {
    const TABLE: &'static str;
    /// Column order shared by `from_row` and `to_values`.
    const COLUMNS: &'static [&'static str];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
    fn to_values(&self) -> Vec<Value>;
}

pub struct SqliteTable<R> {
    conn: Arc<Mutex<Connection>>,
    _row: PhantomData<fn() -> R>,
}

impl<R: SqlRow> SqliteTable<R> {
    fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            conn,
            _row: PhantomData,
        }
    }

    fn select_sql() -> String {
        format!(
            "SELECT {} FROM {} ORDER BY rowid LIMIT ?1 OFFSET ?2",
            R::COLUMNS.join(", "),
            R::TABLE
        )
    }

    fn insert_sql() -> String {
        let placeholders: Vec<String> = (1..=R::COLUMNS.len()).map(|i| format!("?{i}")).collect();
        format!(
            "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
            R::TABLE,
            R::COLUMNS.join(", "),
            placeholders.join(", ")
        )
    }
}

impl<R: SqlRow> TableDao<R> for SqliteTable<R> {
    fn count(&self) -> Result<u64> {
        let conn = self.conn.lock();
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", R::TABLE), [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    fn page(&self, offset: u64, limit: usize) -> Result<Vec<R>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&Self::select_sql())?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![limit, offset], R::from_row)?
            .collect::<rusqlite::Result<Vec<R>>>()?;
        Ok(rows)
    }

    fn insert_all(&self, rows: &[R]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&Self::insert_sql())?;
            for row in rows {
                stmt.execute(params_from_iter(row.to_values()))?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

pub struct SqliteDatabase {
    conn: Arc<Mutex<Connection>>,
    users: SqliteTable<UserEntity>,
    conversations: SqliteTable<ConversationEntity>,
    conversation_members: SqliteTable<ConversationMemberEntity>,
    messages: SqliteTable<MessageEntity>,
    assets: SqliteTable<AssetEntity>,
    likes: SqliteTable<LikeEntity>,
    read_receipts: SqliteTable<ReadReceiptEntity>,
    properties: SqliteTable<PropertyEntity>,
    key_values: SqliteTable<KeyValueEntity>,
    folders: SqliteTable<FolderEntity>,
    conversation_folders: SqliteTable<ConversationFolderEntity>,
}

impl SqliteDatabase {
    /// Open or create the store at `path` and make sure the schema exists.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let current = match conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get::<_, i32>(0),
        ) {
            Ok(version) => version,
            Err(rusqlite::Error::SqliteFailure(_, Some(ref msg)))
                if msg.starts_with("no such table") =>
            {
                0
            }
            Err(e) => return Err(e.into()),
        };
        if current < SCHEMA_VERSION {
            debug!(from = current, to = SCHEMA_VERSION, "creating backup store schema");
            conn.execute_batch(CREATE_TABLES)?;
        }

        let conn = Arc::new(Mutex::new(conn));
        Ok(Self {
            users: SqliteTable::new(conn.clone()),
            conversations: SqliteTable::new(conn.clone()),
            conversation_members: SqliteTable::new(conn.clone()),
            messages: SqliteTable::new(conn.clone()),
            assets: SqliteTable::new(conn.clone()),
            likes: SqliteTable::new(conn.clone()),
            read_receipts: SqliteTable::new(conn.clone()),
            properties: SqliteTable::new(conn.clone()),
            key_values: SqliteTable::new(conn.clone()),
            folders: SqliteTable::new(conn.clone()),
            conversation_folders: SqliteTable::new(conn.clone()),
            conn,
        })
    }

    /// Run raw SQL against the store, e.g. for seeding fixtures.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.lock().execute_batch(sql)?;
        Ok(())
    }
}

impl MessagingDatabase for SqliteDatabase {
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
    use crate::error::BackupError;
    use tempfile::tempdir;

    fn message(id: &str, time: i64) -> MessageEntity {
        MessageEntity {
            id: id.to_string(),
            conversation_id: "conv-1".to_string(),
            message_type: "Text".to_string(),
            user_id: "alice".to_string(),
            client_id: Some("c1".to_string()),
            content: Some(format!("hello {id}")),
            protos: Some(vec![1, 2, 3]),
            time,
            local_time: time + 1,
            edit_time: 0,
            first_message: false,
            members: None,
            message_state: "SENT".to_string(),
            ephemeral: None,
            expiry_time: None,
            expired: false,
            quote: None,
            asset_id: None,
        }
    }

    #[test]
    fn fresh_store_gets_schema() {
        let db = SqliteDatabase::open_in_memory().unwrap();
        assert_eq!(db.messages().count().unwrap(), 0);
        let version: i32 = db
            .conn
            .lock()
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn broken_schema_version_table_is_an_error() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE schema_version (applied_at TEXT);")
            .unwrap();
        assert!(matches!(
            SqliteDatabase::from_connection(conn),
            Err(BackupError::Database(ref m)) if m.contains("no such column")
        ));
    }

    #[test]
    fn pages_follow_insertion_order() {
        let db = SqliteDatabase::open_in_memory().unwrap();
        let rows: Vec<MessageEntity> = (0..7).map(|i| message(&format!("m{i}"), i)).collect();
        db.messages().insert_all(&rows).unwrap();

        assert_eq!(db.messages().count().unwrap(), 7);
        assert_eq!(db.messages().page(0, 3).unwrap(), rows[..3].to_vec());
        assert_eq!(db.messages().page(3, 3).unwrap(), rows[3..6].to_vec());
        assert_eq!(db.messages().page(6, 3).unwrap(), rows[6..].to_vec());
        assert!(db.messages().page(7, 3).unwrap().is_empty());
    }

    #[test]
    fn insert_replaces_on_primary_key() {
        let db = SqliteDatabase::open_in_memory().unwrap();
        db.properties()
            .insert_all(&[PropertyEntity {
                key: "theme".into(),
                value: "dark".into(),
            }])
            .unwrap();
        db.properties()
            .insert_all(&[PropertyEntity {
                key: "theme".into(),
                value: "light".into(),
            }])
            .unwrap();
        let rows = db.properties().page(0, 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, "light");
    }

    #[test]
    fn reopening_keeps_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.db");
        {
            let db = SqliteDatabase::open(&path).unwrap();
            db.messages().insert_all(&[message("m1", 10)]).unwrap();
        }
        let db = SqliteDatabase::open(&path).unwrap();
        assert_eq!(db.messages().page(0, 10).unwrap(), vec![message("m1", 10)]);
    }
}

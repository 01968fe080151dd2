//! Per-table backup data sources.
//!
//! A [`BackupDataSource`] ties a table DAO to its backup model and moves the
//! table to or from its `<table>.jsonl` file in batches.

use crate::batch::{for_each, BackupFileReader, BackupFileWriter, PagedTableReader};
use crate::db::{MessagingDatabase, TableDao};
use crate::error::{BackupError, Result};
use crate::models::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const BACKUP_FILE_EXTENSION: &str = "jsonl";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableReport {
    pub table: &'static str,
    pub rows: u64,
    pub batches: usize,
}

/// Object-safe view of a data source, independent of its row and model types.
pub trait TableBackup {
    fn name(&self) -> &'static str;

    fn file_name(&self) -> String {
        format!("{}.{BACKUP_FILE_EXTENSION}", self.name())
    }

    /// Write the whole table to `<dir>/<table>.jsonl`.
    fn backup(&self, dir: &Path) -> Result<TableReport>;

    /// Insert every row of `<dir>/<table>.jsonl`. A missing file restores nothing.
    fn restore(&self, dir: &Path) -> Result<TableReport>;
}

pub struct BackupDataSource<'a, R, M> {
    name: &'static str,
    dao: &'a dyn TableDao<R>,
    batch_size: usize,
    _model: PhantomData<fn(R) -> M>,
}

impl<'a, R, M> BackupDataSource<'a, R, M>
where
    R: From<M>,
    M: From<R> + Serialize + DeserializeOwned,
{
    pub fn new(name: &'static str, dao: &'a dyn TableDao<R>, batch_size: usize) -> Self {
        Self {
            name,
            dao,
            batch_size,
            _model: PhantomData,
        }
    }

    fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(self.file_name())
    }

    fn export_rows(&self, dir: &Path) -> Result<TableReport> {
        let mut writer = BackupFileWriter::<M>::create(&self.path_in(dir))?;
        let mut reader = PagedTableReader::new(self.dao, self.batch_size)?;
        let batches = for_each(&mut reader, |_, rows| {
            let models: Vec<M> = rows.into_iter().map(M::from).collect();
            writer.write_batch(&models)
        })?;
        let rows = writer.finish()?;
        Ok(TableReport {
            table: self.name,
            rows,
            batches,
        })
    }

    fn import_rows(&self, dir: &Path) -> Result<TableReport> {
        let path = self.path_in(dir);
        if !path.exists() {
            debug!(table = self.name, "no backup file for table, skipping");
            return Ok(TableReport {
                table: self.name,
                rows: 0,
                batches: 0,
            });
        }
        let mut reader = BackupFileReader::<M>::open(&path, self.batch_size)?;
        let mut rows = 0u64;
        let batches = for_each(&mut reader, |_, models| {
            let entities: Vec<R> = models.into_iter().map(R::from).collect();
            self.dao.insert_all(&entities)?;
            rows += entities.len() as u64;
            Ok(())
        })?;
        Ok(TableReport {
            table: self.name,
            rows,
            batches,
        })
    }
}

impl<'a, R, M> TableBackup for BackupDataSource<'a, R, M>
where
    R: From<M>,
    M: From<R> + Serialize + DeserializeOwned,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn backup(&self, dir: &Path) -> Result<TableReport> {
        let report = self
            .export_rows(dir)
            .map_err(|e| BackupError::in_table(self.name, e))?;
        debug!(table = self.name, rows = report.rows, batches = report.batches, "table exported");
        Ok(report)
    }

    fn restore(&self, dir: &Path) -> Result<TableReport> {
        let report = self
            .import_rows(dir)
            .map_err(|e| BackupError::in_table(self.name, e))?;
        debug!(table = self.name, rows = report.rows, batches = report.batches, "table restored");
        Ok(report)
    }
}

/// Every backed-up table, parents before the rows that reference them.
pub fn data_sources(
    db: &dyn MessagingDatabase,
    batch_size: usize,
) -> Vec<Box<dyn TableBackup + '_>> {
    vec![
        Box::new(BackupDataSource::<_, UserBackupModel>::new(
            "users",
            db.users(),
            batch_size,
        )),
        Box::new(BackupDataSource::<_, ConversationBackupModel>::new(
            "conversations",
            db.conversations(),
            batch_size,
        )),
        Box::new(BackupDataSource::<_, ConversationMemberBackupModel>::new(
            "conversation_members",
            db.conversation_members(),
            batch_size,
        )),
        Box::new(BackupDataSource::<_, FolderBackupModel>::new(
            "folders",
            db.folders(),
            batch_size,
        )),
        Box::new(BackupDataSource::<_, ConversationFolderBackupModel>::new(
            "conversation_folders",
            db.conversation_folders(),
            batch_size,
        )),
        Box::new(BackupDataSource::<_, AssetBackupModel>::new(
            "assets",
            db.assets(),
            batch_size,
        )),
        Box::new(BackupDataSource::<_, MessageBackupModel>::new(
            "messages",
            db.messages(),
            batch_size,
        )),
        Box::new(BackupDataSource::<_, LikeBackupModel>::new(
            "likes",
            db.likes(),
            batch_size,
        )),
        Box::new(BackupDataSource::<_, ReadReceiptBackupModel>::new(
            "read_receipts",
            db.read_receipts(),
            batch_size,
        )),
        Box::new(BackupDataSource::<_, PropertyBackupModel>::new(
            "properties",
            db.properties(),
            batch_size,
        )),
        Box::new(BackupDataSource::<_, KeyValueBackupModel>::new(
            "key_values",
            db.key_values(),
            batch_size,
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::entities::*;
    use crate::db::{MemoryDao, MemoryDatabase};
    use tempfile::tempdir;

    fn conversation(id: &str) -> ConversationEntity {
        ConversationEntity {
            id: id.into(),
            remote_id: format!("remote-{id}"),
            domain: Some("wire.com".into()),
            name: Some(format!("chat {id}")),
            creator: None,
            conversation_type: 0,
            team: None,
            muted_status: 0,
            last_event_time: 10,
            archived: false,
            verified: None,
            unread_count: 0,
        }
    }

    fn seeded() -> MemoryDatabase {
        let db = MemoryDatabase::default();
        db.conversations
            .insert_all(&[conversation("a"), conversation("b"), conversation("c")])
            .unwrap();
        db.properties
            .insert_all(&[PropertyEntity {
                key: "theme".into(),
                value: "dark".into(),
            }])
            .unwrap();
        db
    }

    struct RejectingDao;

    impl TableDao<PropertyEntity> for RejectingDao {
        fn count(&self) -> Result<u64> {
            Ok(0)
        }
        fn page(&self, _offset: u64, _limit: usize) -> Result<Vec<PropertyEntity>> {
            Ok(Vec::new())
        }
        fn insert_all(&self, _rows: &[PropertyEntity]) -> Result<()> {
            Err(BackupError::Database("read-only store".into()))
        }
    }

    #[test]
    fn all_tables_roundtrip() {
        let dir = tempdir().unwrap();
        let source = seeded();
        let sources = data_sources(&source, 2);
        assert_eq!(sources.len(), 11);
        for table in &sources {
            table.backup(dir.path()).unwrap();
            assert!(dir.path().join(table.file_name()).exists());
        }

        let target = MemoryDatabase::default();
        let reports: Vec<TableReport> = data_sources(&target, 2)
            .iter()
            .map(|t| t.restore(dir.path()).unwrap())
            .collect();

        assert_eq!(target.conversations.snapshot(), source.conversations.snapshot());
        assert_eq!(target.properties.snapshot(), source.properties.snapshot());
        let conversations = reports.iter().find(|r| r.table == "conversations").unwrap();
        assert_eq!((conversations.rows, conversations.batches), (3, 2));
    }

    #[test]
    fn missing_file_restores_nothing() {
        let dir = tempdir().unwrap();
        let target = MemoryDatabase::default();
        let source = BackupDataSource::<LikeEntity, LikeBackupModel>::new("likes", &target.likes, 10);
        let report = source.restore(dir.path()).unwrap();
        assert_eq!(report.rows, 0);
        assert!(target.likes.snapshot().is_empty());
    }

    #[test]
    fn failures_carry_table_and_batch() {
        let dir = tempdir().unwrap();
        let db = seeded();
        BackupDataSource::<PropertyEntity, PropertyBackupModel>::new("properties", &db.properties, 10)
            .backup(dir.path())
            .unwrap();

        let rejecting = RejectingDao;
        let err = BackupDataSource::<PropertyEntity, PropertyBackupModel>::new("properties", &rejecting, 10)
            .restore(dir.path())
            .unwrap_err();
        match err {
            BackupError::Table { table, source } => {
                assert_eq!(table, "properties");
                assert!(matches!(*source, BackupError::Batch { index: 0, .. }));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn empty_table_writes_empty_file() {
        let dir = tempdir().unwrap();
        let dao: MemoryDao<FolderEntity> = MemoryDao::default();
        let report = BackupDataSource::<FolderEntity, FolderBackupModel>::new("folders", &dao, 10)
            .backup(dir.path())
            .unwrap();
        assert_eq!(report.rows, 0);
        assert_eq!(std::fs::read(dir.path().join("folders.jsonl")).unwrap().len(), 0);
    }
}

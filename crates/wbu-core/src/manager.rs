//! Export and import of a whole messaging store.
//!
//! Export: tables → `<table>.jsonl` files + `export.json` → zip → encrypted
//! artifact. Import runs the same steps in reverse. All intermediate files
//! live in a staging directory that is removed when the call returns.

use crate::archive;
use crate::config::BackupSettings;
use crate::crypto::CryptoEngine;
use crate::db::MessagingDatabase;
use crate::encryption::BackupEncryption;
use crate::error::{BackupError, Result};
use crate::metadata::BackupMetadata;
use crate::source::{data_sources, TableBackup, TableReport};
use chrono::{NaiveDate, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread::{self, ThreadId};
use tempfile::TempDir;
use tracing::info;

pub const BACKUP_FILE_EXTENSION: &str = "android_wbu";

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub artifact: PathBuf,
    pub tables: Vec<TableReport>,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub metadata: BackupMetadata,
    pub tables: Vec<TableReport>,
}

impl ExportSummary {
    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|t| t.rows).sum()
    }
}

impl ImportSummary {
    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|t| t.rows).sum()
    }
}

/// `Wire-<handle>-Backup_<yyyyMMdd>`, the stem shared by the artifact and
/// its staging directory.
pub fn backup_base_name(user_handle: &str, date: NaiveDate) -> String {
    let handle: String = user_handle
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    format!("Wire-{handle}-Backup_{}", date.format("%Y%m%d"))
}

pub fn artifact_file_name(user_handle: &str, date: NaiveDate) -> String {
    format!("{}.{BACKUP_FILE_EXTENSION}", backup_base_name(user_handle, date))
}

pub struct BackupManager<'a> {
    engine: &'a CryptoEngine,
    settings: BackupSettings,
    ui_thread: Option<ThreadId>,
}

impl<'a> BackupManager<'a> {
    pub fn new(engine: &'a CryptoEngine, settings: BackupSettings) -> Self {
        Self {
            engine,
            settings,
            ui_thread: None,
        }
    }

    /// Refuse to run export or import on `thread`.
    pub fn with_ui_thread(mut self, thread: ThreadId) -> Self {
        self.ui_thread = Some(thread);
        self
    }

    pub fn settings(&self) -> &BackupSettings {
        &self.settings
    }

    fn ensure_off_ui_thread(&self) -> Result<()> {
        match self.ui_thread {
            Some(ui) if ui == thread::current().id() => Err(BackupError::UiThread),
            _ => Ok(()),
        }
    }

    fn staging_dir(&self, prefix: &str) -> Result<TempDir> {
        let root = self
            .settings
            .temp_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        fs::create_dir_all(&root)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("{prefix}-"))
            .tempdir_in(root)?;
        Ok(dir)
    }

    fn encryption(&self) -> BackupEncryption<'_> {
        BackupEncryption::new(self.engine, self.settings.kdf)
    }

    /// Export every table of `db` into an encrypted artifact in `out_dir`.
    pub fn export(
        &self,
        db: &dyn MessagingDatabase,
        user_id: &str,
        user_handle: &str,
        password: &str,
        out_dir: &Path,
    ) -> Result<ExportSummary> {
        self.ensure_off_ui_thread()?;
        let base = backup_base_name(user_handle, Utc::now().date_naive());
        info!(backup = %base, "starting backup export");

        let staging = self.staging_dir(&base)?;
        let metadata = BackupMetadata::new(user_id, Some(user_handle), None);
        let (zip_path, tables) = self.stage_archive(db, &metadata, staging.path(), &base)?;
        let artifact = self.seal_archive(&zip_path, out_dir, &base, password, user_id)?;

        let summary = ExportSummary { artifact, tables };
        info!(
            artifact = %summary.artifact.display(),
            rows = summary.total_rows(),
            "backup export finished"
        );
        Ok(summary)
    }

    /// Write `export.json` and every table into `staging`, then zip them to
    /// `<staging>/<base>.zip`.
    fn stage_archive(
        &self,
        db: &dyn MessagingDatabase,
        metadata: &BackupMetadata,
        staging: &Path,
        base: &str,
    ) -> Result<(PathBuf, Vec<TableReport>)> {
        let mut files = vec![metadata.write_to(staging)?];
        let mut tables = Vec::new();
        for source in data_sources(db, self.settings.batch_size) {
            tables.push(source.backup(staging)?);
            files.push(staging.join(source.file_name()));
        }
        let zip_path = archive::zip(&staging.join(format!("{base}.zip")), &files)?;
        Ok((zip_path, tables))
    }

    /// Encrypt the staged zip to `<out_dir>/<base>.android_wbu`.
    fn seal_archive(
        &self,
        zip_path: &Path,
        out_dir: &Path,
        base: &str,
        password: &str,
        user_id: &str,
    ) -> Result<PathBuf> {
        fs::create_dir_all(out_dir)?;
        let artifact = out_dir.join(format!("{base}.{BACKUP_FILE_EXTENSION}"));
        self.encryption()
            .encrypt_backup(zip_path, &artifact, password, user_id)?;
        Ok(artifact)
    }

    /// Decrypt `artifact` and insert its rows into `db`.
    pub fn import(
        &self,
        db: &dyn MessagingDatabase,
        artifact: &Path,
        user_id: &str,
        password: &str,
    ) -> Result<ImportSummary> {
        self.ensure_off_ui_thread()?;
        info!(artifact = %artifact.display(), "starting backup import");

        let staging = self.staging_dir("wbu-import")?;
        let zip_path = staging.path().join("backup.zip");
        self.encryption()
            .decrypt_backup(artifact, &zip_path, password, user_id)?;

        let content = staging.path().join("content");
        archive::unzip(&zip_path, &content)?;
        let metadata = BackupMetadata::read_from(&content)?;
        metadata.verify(user_id)?;

        let mut tables = Vec::new();
        for source in data_sources(db, self.settings.batch_size) {
            tables.push(source.restore(&content)?);
        }

        let summary = ImportSummary { metadata, tables };
        info!(rows = summary.total_rows(), "backup import finished");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KdfParams;
    use crate::db::entities::ConversationEntity;
    use crate::db::{MemoryDatabase, TableDao};
    use crate::encryption::read_header;
    use crate::header::HeaderVersion;
    use tempfile::tempdir;

    fn settings(temp: &Path) -> BackupSettings {
        BackupSettings {
            batch_size: 2,
            kdf: KdfParams {
                ops_limit: 1,
                mem_limit: 64 * 1024,
            },
            output_dir: None,
            temp_dir: Some(temp.to_path_buf()),
        }
    }

    fn conversation(id: &str) -> ConversationEntity {
        ConversationEntity {
            id: id.into(),
            remote_id: format!("r-{id}"),
            domain: Some("wire.com".into()),
            name: Some(format!("Conversation {id}")),
            creator: Some("alice".into()),
            conversation_type: 0,
            team: None,
            muted_status: 0,
            last_event_time: 1_700_000_000_000,
            archived: false,
            verified: None,
            unread_count: 0,
        }
    }

    fn seeded() -> MemoryDatabase {
        let db = MemoryDatabase::default();
        db.conversations
            .insert_all(&[conversation("1"), conversation("2"), conversation("3")])
            .unwrap();
        db
    }

    #[test]
    fn base_name_format() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(backup_base_name("alice", date), "Wire-alice-Backup_20240309");
        assert_eq!(
            artifact_file_name("a/b", date),
            "Wire-a_b-Backup_20240309.android_wbu"
        );
    }

    #[test]
    fn export_then_import_three_conversations() {
        let engine = CryptoEngine::init().unwrap();
        let work = tempdir().unwrap();
        let manager = BackupManager::new(&engine, settings(work.path()));
        let source = seeded();

        let out = work.path().join("out");
        let summary = manager
            .export(&source, "alice", "alice", "hunter2", &out)
            .unwrap();
        let name = summary.artifact.file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.starts_with("Wire-alice-Backup_"));
        assert!(name.ends_with(".android_wbu"));
        assert_eq!(summary.total_rows(), 3);
        assert_eq!(read_header(&summary.artifact).unwrap().version, HeaderVersion::V2);

        let target = MemoryDatabase::default();
        let imported = manager
            .import(&target, &summary.artifact, "alice", "hunter2")
            .unwrap();
        assert_eq!(imported.metadata.user_id, "alice");
        assert_eq!(imported.total_rows(), 3);
        assert_eq!(target.conversations.snapshot(), source.conversations.snapshot());

        // staging directories are cleaned up
        let leftovers: Vec<_> = fs::read_dir(work.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .filter(|n| n != "out")
            .collect();
        assert!(leftovers.is_empty(), "left behind: {leftovers:?}");
    }

    #[test]
    fn artifact_decrypts_to_the_staged_zip() {
        let engine = CryptoEngine::init().unwrap();
        let work = tempdir().unwrap();
        let manager = BackupManager::new(&engine, settings(work.path()));
        let staging = tempdir().unwrap();
        let base = backup_base_name("alice", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let metadata = BackupMetadata::new("alice", Some("alice"), None);

        let (zip_path, tables) = manager
            .stage_archive(&seeded(), &metadata, staging.path(), &base)
            .unwrap();
        assert_eq!(zip_path, staging.path().join("Wire-alice-Backup_20240101.zip"));
        assert_eq!(tables.iter().map(|t| t.rows).sum::<u64>(), 3);

        let out = work.path().join("out");
        let artifact = manager
            .seal_archive(&zip_path, &out, &base, "hunter2", "alice")
            .unwrap();
        assert_eq!(artifact, out.join("Wire-alice-Backup_20240101.android_wbu"));

        let restored = work.path().join("restored.zip");
        manager
            .encryption()
            .decrypt_backup(&artifact, &restored, "hunter2", "alice")
            .unwrap();
        assert_eq!(fs::read(&restored).unwrap(), fs::read(&zip_path).unwrap());
    }

    #[test]
    fn import_into_other_account_fails() {
        let engine = CryptoEngine::init().unwrap();
        let work = tempdir().unwrap();
        let manager = BackupManager::new(&engine, settings(work.path()));
        let summary = manager
            .export(&seeded(), "alice", "alice", "hunter2", work.path())
            .unwrap();

        let target = MemoryDatabase::default();
        assert!(matches!(
            manager.import(&target, &summary.artifact, "bob", "hunter2"),
            Err(BackupError::IdentityMismatch)
        ));
        assert!(matches!(
            manager.import(&target, &summary.artifact, "alice", "hunter3"),
            Err(BackupError::DecryptionFailed)
        ));
        assert_eq!(target.conversations.count().unwrap(), 0);
    }

    #[test]
    fn refuses_to_run_on_ui_thread() {
        let engine = CryptoEngine::init().unwrap();
        let work = tempdir().unwrap();
        let manager = BackupManager::new(&engine, settings(work.path()))
            .with_ui_thread(thread::current().id());
        assert!(matches!(
            manager.export(&seeded(), "alice", "alice", "pw", work.path()),
            Err(BackupError::UiThread)
        ));
        assert!(fs::read_dir(work.path()).unwrap().next().is_none());

        let artifact = work.path().join("missing.android_wbu");
        assert!(matches!(
            manager.import(&MemoryDatabase::default(), &artifact, "alice", "pw"),
            Err(BackupError::UiThread)
        ));

        thread::scope(|s| {
            s.spawn(|| {
                manager
                    .export(&seeded(), "alice", "alice", "pw", &work.path().join("out"))
                    .unwrap();
            });
        });
    }
}

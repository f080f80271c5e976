//! Durable backup record persistence

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::errors::CoreError;
use crate::filesys::dir::Dir;
use crate::models::backup::BackupRecord;

/// Append-only persistence for backup records. Records are never updated
/// after insert and never deleted by this subsystem; retention belongs to
/// the surrounding storage policy.
#[async_trait]
pub trait BackupStore: Send + Sync {
    /// Persist a new record. Fails if the backup id already exists.
    async fn insert(&self, record: &BackupRecord) -> Result<(), CoreError>;

    async fn get(&self, backup_id: &str) -> Result<Option<BackupRecord>, CoreError>;

    /// All records, optionally scoped to one nucleus, newest first.
    async fn list(&self, nucleus_id: Option<&str>) -> Result<Vec<BackupRecord>, CoreError>;
}

/// One JSON file per record under the storage layout's backups directory.
pub struct FileBackupStore {
    dir: Dir,
}

impl FileBackupStore {
    pub fn new(dir: Dir) -> Self {
        Self { dir }
    }

    fn record_file(&self, backup_id: &str) -> crate::filesys::file::File {
        self.dir.file(&format!("{}.json", backup_id))
    }
}

#[async_trait]
impl BackupStore for FileBackupStore {
    async fn insert(&self, record: &BackupRecord) -> Result<(), CoreError> {
        let file = self.record_file(&record.backup_id);
        if file.exists().await {
            return Err(CoreError::StorageError(format!(
                "backup {} already exists",
                record.backup_id
            )));
        }

        file.write_json(record).await?;
        debug!("Persisted backup {} to {:?}", record.backup_id, file.path());
        Ok(())
    }

    async fn get(&self, backup_id: &str) -> Result<Option<BackupRecord>, CoreError> {
        let file = self.record_file(backup_id);
        if !file.exists().await {
            return Ok(None);
        }
        Ok(Some(file.read_json().await?))
    }

    async fn list(&self, nucleus_id: Option<&str>) -> Result<Vec<BackupRecord>, CoreError> {
        if !self.dir.exists().await {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for path in self.dir.list_files_with_ext("json").await? {
            let record: BackupRecord =
                crate::filesys::file::File::new(path).read_json().await?;
            if nucleus_id.map(|id| record.nucleus_id == id).unwrap_or(true) {
                records.push(record);
            }
        }

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}

/// In-memory store for tests and embedding.
#[derive(Default)]
pub struct MemoryBackupStore {
    records: RwLock<HashMap<String, BackupRecord>>,
}

impl MemoryBackupStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BackupStore for MemoryBackupStore {
    async fn insert(&self, record: &BackupRecord) -> Result<(), CoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.backup_id) {
            return Err(CoreError::StorageError(format!(
                "backup {} already exists",
                record.backup_id
            )));
        }
        records.insert(record.backup_id.clone(), record.clone());
        Ok(())
    }

    async fn get(&self, backup_id: &str) -> Result<Option<BackupRecord>, CoreError> {
        Ok(self.records.read().await.get(backup_id).cloned())
    }

    async fn list(&self, nucleus_id: Option<&str>) -> Result<Vec<BackupRecord>, CoreError> {
        let records = self.records.read().await;
        let mut out: Vec<BackupRecord> = records
            .values()
            .filter(|r| nucleus_id.map(|id| r.nucleus_id == id).unwrap_or(true))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }
}

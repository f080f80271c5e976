//! Backup creation over the connector and the store

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::codec;
use crate::connector::PlatformConnector;
use crate::errors::CoreError;
use crate::models::backup::{BackupRecord, FileSnapshot};
use crate::models::change::CodeChange;
use crate::backup::store::BackupStore;
use crate::utils;

/// What a backup attempt produced.
#[derive(Debug)]
pub enum BackupOutcome {
    /// Nothing to snapshot: no change touches a pre-existing file.
    NotRequired,

    /// Every required file was snapshotted and the record persisted.
    Complete(BackupRecord),

    /// Some required files could not be fetched. The record covering the
    /// rest was persisted; rolling back the missing files is impossible, so
    /// callers proceeding from here accept that gap.
    Partial {
        record: BackupRecord,
        missing: Vec<(String, String)>,
    },
}

impl BackupOutcome {
    pub fn backup_id(&self) -> Option<&str> {
        match self {
            BackupOutcome::NotRequired => None,
            BackupOutcome::Complete(record) => Some(&record.backup_id),
            BackupOutcome::Partial { record, .. } => Some(&record.backup_id),
        }
    }
}

/// Builds pre-change backup records.
pub struct BackupManager {
    connector: Arc<dyn PlatformConnector>,
    store: Arc<dyn BackupStore>,
}

impl BackupManager {
    pub fn new(connector: Arc<dyn PlatformConnector>, store: Arc<dyn BackupStore>) -> Self {
        Self { connector, store }
    }

    /// Snapshot the current remote content of every file an UPDATE or DELETE
    /// change is about to mutate, and persist the record.
    ///
    /// If every required fetch fails, no record is persisted and the whole
    /// creation fails: callers must not proceed believing a backup exists.
    pub async fn create_backup(
        &self,
        nucleus_id: &str,
        repository: &str,
        branch: &str,
        changes: &[CodeChange],
        deployment_id: Option<&str>,
    ) -> Result<BackupOutcome, CoreError> {
        let required: Vec<&CodeChange> =
            changes.iter().filter(|c| c.mutates_existing()).collect();

        if required.is_empty() {
            return Ok(BackupOutcome::NotRequired);
        }

        let mut snapshots = Vec::new();
        let mut missing: Vec<(String, String)> = Vec::new();

        for change in &required {
            match self
                .connector
                .fetch_file(nucleus_id, repository, &change.file, branch)
                .await
            {
                Ok(payload) => {
                    snapshots.push(FileSnapshot {
                        file: change.file.clone(),
                        payload,
                        timestamp: Utc::now(),
                    });
                }
                Err(e) => {
                    warn!("Could not snapshot {}: {}", change.file, e);
                    missing.push((change.file.clone(), e.to_string()));
                }
            }
        }

        if snapshots.is_empty() {
            return Err(CoreError::BackupError(format!(
                "no required file could be snapshotted ({} failed)",
                missing.len()
            )));
        }

        // Confirm every snapshot checksum before the record is persisted.
        let checksum_valid = snapshots.iter().all(|s| {
            codec::verify(
                s.payload.content(),
                s.payload.encoding(),
                s.payload.checksum(),
            )
        });

        let record = BackupRecord {
            backup_id: utils::backup_id(nucleus_id),
            nucleus_id: nucleus_id.to_string(),
            deployment_id: deployment_id.map(|s| s.to_string()),
            repository: repository.to_string(),
            branch: branch.to_string(),
            change_count: snapshots.len(),
            total_size: snapshots.iter().map(|s| s.payload.size()).sum(),
            checksum_valid,
            created_at: Utc::now(),
            files: snapshots,
        };

        self.store.insert(&record).await?;
        info!(
            "Backup {} persisted: {} file(s), {} byte(s)",
            record.backup_id, record.change_count, record.total_size
        );

        if missing.is_empty() {
            Ok(BackupOutcome::Complete(record))
        } else {
            warn!(
                "Backup {} is partial: {} of {} required file(s) missing",
                record.backup_id,
                missing.len(),
                required.len()
            );
            Ok(BackupOutcome::Partial { record, missing })
        }
    }
}

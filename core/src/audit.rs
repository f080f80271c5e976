//! Audit trail interface
//!
//! The audit log itself is an external durable sink; the core only inserts
//! records and queries them back through this seam.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::errors::CoreError;
use crate::filesys::file::File;
use crate::utils;

/// One auditable core operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub id: String,
    /// Opaque actor identity, when the caller supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    /// "deploy" or "rollback".
    pub action: String,
    pub nucleus_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_id: Option<String>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(action: &str, nucleus_id: &str, success: bool) -> Self {
        Self {
            id: utils::generate_uuid(),
            actor: None,
            action: action.to_string(),
            nucleus_id: nucleus_id.to_string(),
            deployment_id: None,
            backup_id: None,
            success,
            detail: None,
            recorded_at: Utc::now(),
        }
    }
}

/// Record-insert/query interface to the external audit sink.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn insert(&self, record: AuditRecord) -> Result<(), CoreError>;

    async fn query(&self, nucleus_id: Option<&str>) -> Result<Vec<AuditRecord>, CoreError>;
}

/// JSON-lines file sink.
pub struct FileAuditSink {
    file: File,
}

impl FileAuditSink {
    pub fn new(file: File) -> Self {
        Self { file }
    }
}

#[async_trait]
impl AuditSink for FileAuditSink {
    async fn insert(&self, record: AuditRecord) -> Result<(), CoreError> {
        let line = serde_json::to_string(&record)?;
        self.file.append_line(&line).await
    }

    async fn query(&self, nucleus_id: Option<&str>) -> Result<Vec<AuditRecord>, CoreError> {
        if !self.file.exists().await {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for line in self.file.read_lines().await? {
            let record: AuditRecord = serde_json::from_str(&line)?;
            if nucleus_id.map(|id| record.nucleus_id == id).unwrap_or(true) {
                records.push(record);
            }
        }
        Ok(records)
    }
}

/// In-memory sink for tests.
#[derive(Default)]
pub struct MemoryAuditSink {
    records: RwLock<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn insert(&self, record: AuditRecord) -> Result<(), CoreError> {
        self.records.write().await.push(record);
        Ok(())
    }

    async fn query(&self, nucleus_id: Option<&str>) -> Result<Vec<AuditRecord>, CoreError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|r| nucleus_id.map(|id| r.nucleus_id == id).unwrap_or(true))
            .cloned()
            .collect())
    }
}

/// Convenience alias used at wiring time.
pub type SharedAuditSink = Arc<dyn AuditSink>;

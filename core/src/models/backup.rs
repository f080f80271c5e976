//! Durable backup record models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codec::EncodedContent;

/// Pre-change snapshot of one file, taken before a deployment mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSnapshot {
    pub file: String,

    /// Content with its encoding tag, decoded size and checksum.
    #[serde(flatten)]
    pub payload: EncodedContent,

    pub timestamp: DateTime<Utc>,
}

/// The durable artifact of one deployment attempt: every file about to be
/// overwritten or deleted, captured before the mutation. Never mutated after
/// creation; retention is an external storage policy concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRecord {
    pub backup_id: String,
    pub nucleus_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_id: Option<String>,
    pub repository: String,
    pub branch: String,
    pub files: Vec<FileSnapshot>,
    pub change_count: usize,
    pub total_size: u64,
    /// Whether every snapshot's checksum was confirmed at backup time.
    pub checksum_valid: bool,
    pub created_at: DateTime<Utc>,
}

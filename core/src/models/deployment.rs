//! Deployment request and result models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::change::CodeChange;

/// How a validated change set reaches the remote nucleus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeployStrategy {
    /// Simulate only: no backup, no remote mutation.
    DryRun,

    /// Open a pull request carrying the change batch. Safer default.
    CreatePr,

    /// Push the batch directly as one commit. Higher-risk.
    AutoApply,

    /// Record an intent to deploy later. No scheduler integration yet;
    /// performs no remote mutation.
    Scheduled,
}

/// A caller-facing deployment request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRequest {
    pub id: String,
    pub nucleus_id: String,
    pub repository: String,
    #[serde(default)]
    pub branch: Option<String>,
    pub changes: Vec<CodeChange>,
    pub strategy: DeployStrategy,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl DeployRequest {
    /// Target branch, defaulting to `main`.
    pub fn branch(&self) -> &str {
        self.branch.as_deref().unwrap_or("main")
    }

    /// Opaque actor identity carried in `metadata.actor`, if any.
    pub fn actor(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("actor"))
            .and_then(|v| v.as_str())
    }
}

/// Outcome of one deployment or rollback invocation. Produced once; not
/// persisted by the core itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentResult {
    pub success: bool,
    pub completed_at: DateTime<Utc>,
    pub files_changed: usize,
    /// True iff a valid backup record was durably persisted.
    pub rollback_available: bool,
    pub logs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeploymentResult {
    pub fn failure(logs: Vec<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            completed_at: Utc::now(),
            files_changed: 0,
            rollback_available: false,
            logs,
            pr_url: None,
            pr_id: None,
            backup_id: None,
            error: Some(error.into()),
        }
    }
}

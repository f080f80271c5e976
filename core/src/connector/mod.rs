//! Remote platform connectivity
//!
//! The [`PlatformConnector`] trait is the seam the orchestrator, backup
//! manager and rollback path depend on; [`nucleus::NucleusConnector`] is the
//! HTTP implementation. Tests substitute stubs.

pub mod http;
pub mod nucleus;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::codec::EncodedContent;
use crate::errors::CoreError;
use crate::models::change::CodeChange;
use crate::models::connection::Liveness;

/// Scoping options for a codebase listing request.
#[derive(Debug, Clone, Default)]
pub struct CodebaseQuery {
    pub branch: Option<String>,
    pub commit: Option<String>,
    pub path: Option<String>,
}

/// File metadata returned by a codebase listing. No bulk content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodebaseListing {
    pub total_files: u64,
    #[serde(default)]
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Outcome of an atomic push of a change batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushOutcome {
    #[serde(default)]
    pub commit_id: Option<String>,
}

/// What a pull request is opened with.
#[derive(Debug, Clone)]
pub struct PullRequestOptions {
    pub title: String,
    pub description: String,
    pub branch: String,
    pub base_branch: String,
    pub changes: Vec<CodeChange>,
}

/// An opened pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestOutcome {
    pub pr_url: String,
    pub pr_id: String,
}

/// Network operations against one tracked nucleus. No business logic about
/// backups or strategies lives behind this trait.
#[async_trait]
pub trait PlatformConnector: Send + Sync {
    /// Whether the nucleus is tracked and currently `Connected`.
    async fn is_connected(&self, nucleus_id: &str) -> bool;

    /// Read one file with its checksum and encoding.
    async fn fetch_file(
        &self,
        nucleus_id: &str,
        repository: &str,
        path: &str,
        branch: &str,
    ) -> Result<EncodedContent, CoreError>;

    /// Read a directory or commit scoped listing.
    async fn fetch_codebase(
        &self,
        nucleus_id: &str,
        repository: &str,
        query: &CodebaseQuery,
    ) -> Result<CodebaseListing, CoreError>;

    /// Send the full batch as one atomic remote commit.
    async fn push_changes(
        &self,
        nucleus_id: &str,
        changes: &[CodeChange],
        commit_message: &str,
    ) -> Result<PushOutcome, CoreError>;

    /// Open a pull request carrying a change batch.
    async fn create_pull_request(
        &self,
        nucleus_id: &str,
        options: &PullRequestOptions,
    ) -> Result<PullRequestOutcome, CoreError>;
}

/// Optional notification interface for dashboards. Connect, disconnect and
/// liveness changes are reported here in addition to being returned to the
/// caller; the two are never conflated.
pub trait ConnectorObserver: Send + Sync {
    fn on_connected(&self, _nucleus_id: &str) {}
    fn on_disconnected(&self, _nucleus_id: &str) {}
    fn on_liveness_changed(&self, _nucleus_id: &str, _liveness: Liveness) {}
}

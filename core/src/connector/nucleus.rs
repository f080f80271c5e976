//! HTTP connector for remote nuclei
//!
//! Owns all per-nucleus connection state. Liveness transitions happen only
//! through `connect`, `ping` and `disconnect`; the deployment side of the
//! core goes through the [`PlatformConnector`] trait and never touches a
//! connection directly.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::codec::{self, ContentEncoding, EncodedContent};
use crate::connector::http::HttpTransport;
use crate::connector::{
    CodebaseListing, CodebaseQuery, ConnectorObserver, PlatformConnector, PullRequestOptions,
    PullRequestOutcome, PushOutcome,
};
use crate::errors::CoreError;
use crate::models::change::CodeChange;
use crate::models::connection::{ConnectionInfo, Liveness, NucleusConnection, NucleusDescriptor};

/// `GET /api/health` response; either shape marks the nucleus healthy.
#[derive(Debug, Deserialize)]
struct HealthResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    ok: Option<bool>,
}

impl HealthResponse {
    fn is_healthy(&self) -> bool {
        self.status.as_deref() == Some("healthy") || self.ok == Some(true)
    }
}

/// `GET /api/codebase/file` response. `content` must be a string; any other
/// shape fails deserialization and surfaces as a malformed-response error.
#[derive(Debug, Deserialize)]
struct FileResponse {
    content: String,
    #[serde(default)]
    encoding: Option<ContentEncoding>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PushRequest<'a> {
    changes: &'a [CodeChange],
    commit_message: &'a str,
    timestamp: chrono::DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestRequest<'a> {
    title: &'a str,
    description: &'a str,
    branch: &'a str,
    base_branch: &'a str,
    changes: &'a [CodeChange],
    timestamp: chrono::DateTime<Utc>,
}

/// `POST /api/pull-request/create` response; `prId` arrives as a string or a
/// number depending on the nucleus version.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestResponse {
    pr_url: String,
    pr_id: PrId,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PrId {
    Text(String),
    Number(i64),
}

impl PrId {
    fn into_string(self) -> String {
        match self {
            PrId::Text(s) => s,
            PrId::Number(n) => n.to_string(),
        }
    }
}

/// Connector for a fleet of remote nuclei
pub struct NucleusConnector {
    transport: HttpTransport,
    connections: RwLock<HashMap<String, NucleusConnection>>,
    observer: Option<Arc<dyn ConnectorObserver>>,
}

impl NucleusConnector {
    pub fn new(transport: HttpTransport) -> Self {
        Self {
            transport,
            connections: RwLock::new(HashMap::new()),
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ConnectorObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Establish (or re-establish) a connection. Pings the target; a failed
    /// ping records `Error` state and returns a connection error. Idempotent
    /// per nucleus id: reconnecting replaces prior state.
    pub async fn connect(&self, descriptor: NucleusDescriptor) -> Result<(), CoreError> {
        let mut connection = NucleusConnection::from_descriptor(descriptor);
        let probe = self
            .ping(&connection.base_url, connection.credential.as_ref())
            .await;

        let id = connection.id.clone();
        let cause = match probe {
            Ok(true) => {
                connection.liveness = Liveness::Connected;
                connection.last_ping_at = Some(Utc::now());
                self.connections
                    .write()
                    .await
                    .insert(id.clone(), connection);

                info!("Connected to nucleus {}", id);
                if let Some(observer) = &self.observer {
                    observer.on_connected(&id);
                }
                return Ok(());
            }
            Ok(false) => "reported unhealthy".to_string(),
            Err(e) => e.to_string(),
        };

        connection.liveness = Liveness::Error;
        let base_url = connection.base_url.clone();
        self.connections
            .write()
            .await
            .insert(id.clone(), connection);

        error!("Failed to connect to nucleus {} at {}: {}", id, base_url, cause);
        Err(CoreError::ConnectionError(format!(
            "nucleus {} at {}: {}",
            id, base_url, cause
        )))
    }

    /// Drop a tracked connection.
    pub async fn disconnect(&self, nucleus_id: &str) -> Result<(), CoreError> {
        let removed = self.connections.write().await.remove(nucleus_id);
        match removed {
            Some(_) => {
                info!("Disconnected from nucleus {}", nucleus_id);
                if let Some(observer) = &self.observer {
                    observer.on_disconnected(nucleus_id);
                }
                Ok(())
            }
            None => Err(CoreError::NotFound(format!(
                "no connection for nucleus {}",
                nucleus_id
            ))),
        }
    }

    /// Lightweight liveness probe. `Ok(false)` means the nucleus answered
    /// with an unhealthy body; `Err` means it could not be reached at all.
    pub async fn ping(
        &self,
        base_url: &str,
        credential: Option<&SecretString>,
    ) -> Result<bool, CoreError> {
        let url = endpoint(base_url, "api/health")?;
        let response: HealthResponse = self.transport.get_json(url, credential).await?;
        Ok(response.is_healthy())
    }

    /// Probe every tracked connection concurrently and update each liveness
    /// state independently. A failure pinging one nucleus never affects
    /// another's recorded state.
    pub async fn health_check_all(&self) {
        let targets: Vec<(String, String, Option<SecretString>)> = {
            let connections = self.connections.read().await;
            connections
                .values()
                .map(|c| (c.id.clone(), c.base_url.clone(), c.credential.clone()))
                .collect()
        };

        if targets.is_empty() {
            return;
        }

        debug!("Health checking {} nuclei...", targets.len());
        let probes = targets.iter().map(|(id, base_url, credential)| async move {
            let healthy = self
                .ping(base_url, credential.as_ref())
                .await
                .unwrap_or(false);
            (id.clone(), healthy)
        });

        for (id, healthy) in join_all(probes).await {
            let liveness = if healthy {
                Liveness::Connected
            } else {
                Liveness::Error
            };

            let changed = {
                let mut connections = self.connections.write().await;
                match connections.get_mut(&id) {
                    Some(connection) => {
                        let changed = connection.liveness != liveness;
                        connection.liveness = liveness;
                        if healthy {
                            connection.last_ping_at = Some(Utc::now());
                        }
                        changed
                    }
                    // Disconnected while the probe was in flight.
                    None => false,
                }
            };

            if changed {
                warn!("Nucleus {} liveness changed to {:?}", id, liveness);
                if let Some(observer) = &self.observer {
                    observer.on_liveness_changed(&id, liveness);
                }
            }
        }
    }

    /// Credential-free snapshots of all tracked connections.
    pub async fn list_connections(&self) -> Vec<ConnectionInfo> {
        self.connections
            .read()
            .await
            .values()
            .map(|c| c.info())
            .collect()
    }

    async fn target(&self, nucleus_id: &str) -> Result<(String, Option<SecretString>), CoreError> {
        let connections = self.connections.read().await;
        match connections.get(nucleus_id) {
            Some(c) => Ok((c.base_url.clone(), c.credential.clone())),
            None => Err(CoreError::NotFound(format!(
                "no connection for nucleus {}",
                nucleus_id
            ))),
        }
    }
}

#[async_trait]
impl PlatformConnector for NucleusConnector {
    async fn is_connected(&self, nucleus_id: &str) -> bool {
        self.connections
            .read()
            .await
            .get(nucleus_id)
            .map(|c| c.liveness == Liveness::Connected)
            .unwrap_or(false)
    }

    async fn fetch_file(
        &self,
        nucleus_id: &str,
        repository: &str,
        path: &str,
        branch: &str,
    ) -> Result<EncodedContent, CoreError> {
        let (base_url, credential) = self.target(nucleus_id).await?;

        let mut url = endpoint(&base_url, "api/codebase/file")?;
        url.query_pairs_mut()
            .append_pair("repository", repository)
            .append_pair("file", path)
            .append_pair("branch", branch);

        let response: FileResponse = self.transport.get_json(url, credential.as_ref()).await?;

        // A label from the remote API is authoritative; re-detecting would
        // risk misclassifying base64-looking text.
        match response.encoding {
            Some(hint) => codec::encode_with_hint(&response.content, hint),
            None => Ok(codec::encode(response.content.as_bytes())),
        }
    }

    async fn fetch_codebase(
        &self,
        nucleus_id: &str,
        repository: &str,
        query: &CodebaseQuery,
    ) -> Result<CodebaseListing, CoreError> {
        let (base_url, credential) = self.target(nucleus_id).await?;

        let mut url = endpoint(&base_url, "api/codebase/fetch")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("repository", repository);
            if let Some(branch) = &query.branch {
                pairs.append_pair("branch", branch);
            }
            if let Some(commit) = &query.commit {
                pairs.append_pair("commit", commit);
            }
            if let Some(path) = &query.path {
                pairs.append_pair("path", path);
            }
        }

        self.transport.get_json(url, credential.as_ref()).await
    }

    async fn push_changes(
        &self,
        nucleus_id: &str,
        changes: &[CodeChange],
        commit_message: &str,
    ) -> Result<PushOutcome, CoreError> {
        let (base_url, credential) = self.target(nucleus_id).await?;
        let url = endpoint(&base_url, "api/codebase/push")?;

        let body = PushRequest {
            changes,
            commit_message,
            timestamp: Utc::now(),
        };

        info!(
            "Pushing {} change(s) to nucleus {}",
            changes.len(),
            nucleus_id
        );
        self.transport
            .post_json(url, credential.as_ref(), &body)
            .await
    }

    async fn create_pull_request(
        &self,
        nucleus_id: &str,
        options: &PullRequestOptions,
    ) -> Result<PullRequestOutcome, CoreError> {
        let (base_url, credential) = self.target(nucleus_id).await?;
        let url = endpoint(&base_url, "api/pull-request/create")?;

        let body = PullRequestRequest {
            title: &options.title,
            description: &options.description,
            branch: &options.branch,
            base_branch: &options.base_branch,
            changes: &options.changes,
            timestamp: Utc::now(),
        };

        info!(
            "Opening pull request on nucleus {} ({} -> {})",
            nucleus_id, options.branch, options.base_branch
        );
        let response: PullRequestResponse = self
            .transport
            .post_json(url, credential.as_ref(), &body)
            .await?;

        Ok(PullRequestOutcome {
            pr_url: response.pr_url,
            pr_id: response.pr_id.into_string(),
        })
    }
}

fn endpoint(base_url: &str, path: &str) -> Result<Url, CoreError> {
    Url::parse(&format!("{}/{}", base_url.trim_end_matches('/'), path))
        .map_err(|e| CoreError::ConfigError(format!("invalid base URL {}: {}", base_url, e)))
}

//! Deployment orchestrator
//!
//! Single entry point coordinating validation, backup, strategy execution
//! and post-apply verification. Every failure is returned as a
//! `DeploymentResult` with `success = false`; nothing escapes this boundary
//! as an error.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::audit::{AuditRecord, AuditSink};
use crate::backup::manager::{BackupManager, BackupOutcome};
use crate::backup::store::BackupStore;
use crate::connector::{PlatformConnector, PullRequestOptions};
use crate::deploy::fsm::{DeployEvent, DeployFsm};
use crate::deploy::rollback;
use crate::deploy::validate;
use crate::errors::CoreError;
use crate::models::change::{ChangeAction, CodeChange};
use crate::models::deployment::{DeployRequest, DeployStrategy, DeploymentResult};
use crate::utils;

/// Coordinates one deployment or rollback at a time. Concurrent calls
/// targeting the same nucleus are not serialized here; that responsibility
/// stays with the caller.
pub struct Orchestrator {
    connector: Arc<dyn PlatformConnector>,
    store: Arc<dyn BackupStore>,
    backups: BackupManager,
    audit: Arc<dyn AuditSink>,
}

impl Orchestrator {
    pub fn new(
        connector: Arc<dyn PlatformConnector>,
        store: Arc<dyn BackupStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let backups = BackupManager::new(connector.clone(), store.clone());
        Self {
            connector,
            store,
            backups,
            audit,
        }
    }

    /// Run one deployment request through validate, backup, apply and
    /// verify. A failure in any step before apply aborts with no remote
    /// side effects.
    pub async fn deploy(&self, request: &DeployRequest) -> DeploymentResult {
        let started = Instant::now();
        let mut fsm = DeployFsm::new();
        let mut logs = vec![format!(
            "Deployment {} for nucleus {}: {:?}, {} change(s)",
            request.id,
            request.nucleus_id,
            request.strategy,
            request.changes.len()
        )];

        // 1. Validate before any I/O.
        if let Err(e) = validate::validate_changes(&request.changes) {
            let _ = fsm.process(DeployEvent::Fail(e.to_string()));
            logs.push(format!("Validation failed: {}", e));
            return self.fail(request, logs, e, None, false).await;
        }
        let _ = fsm.process(DeployEvent::Validated);
        logs.push("Validation passed".to_string());

        for change in &request.changes {
            if change.content.as_deref() == Some("") {
                warn!("Change for {} carries empty content", change.file);
                logs.push(format!("Warning: {} content is empty", change.file));
            }
        }

        // 2. Dry run short-circuits: no backup, no remote mutation.
        if request.strategy == DeployStrategy::DryRun {
            let _ = fsm.process(DeployEvent::Simulated);
            logs.push(format!(
                "Dry run: {} change(s) simulated, nothing was sent",
                request.changes.len()
            ));

            let result = DeploymentResult {
                success: true,
                completed_at: Utc::now(),
                files_changed: request.changes.len(),
                rollback_available: false,
                logs,
                pr_url: None,
                pr_id: None,
                backup_id: None,
                error: None,
            };
            self.record_audit(request, &result).await;
            return result;
        }

        // 3. Backup every file an UPDATE/DELETE is about to touch. A backup
        // failure aborts the deployment before any remote mutation.
        let outcome = match self
            .backups
            .create_backup(
                &request.nucleus_id,
                &request.repository,
                request.branch(),
                &request.changes,
                Some(&request.id),
            )
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                let _ = fsm.process(DeployEvent::Fail(e.to_string()));
                logs.push(format!("Backup failed, deployment aborted: {}", e));
                return self.fail(request, logs, e, None, false).await;
            }
        };

        let backup_id = outcome.backup_id().map(String::from);
        let rollback_available = backup_id.is_some();
        match &outcome {
            BackupOutcome::NotRequired => {
                logs.push("No pre-existing files to back up".to_string());
            }
            BackupOutcome::Complete(record) => {
                logs.push(format!(
                    "Backup {} covers {} file(s), {} byte(s)",
                    record.backup_id, record.change_count, record.total_size
                ));
            }
            BackupOutcome::Partial { record, missing } => {
                logs.push(format!(
                    "Warning: backup {} is partial, {} file(s) could not be snapshotted",
                    record.backup_id,
                    missing.len()
                ));
                for (file, cause) in missing {
                    logs.push(format!("Warning: no snapshot for {}: {}", file, cause));
                }
            }
        }
        let _ = fsm.process(DeployEvent::BackupReady);

        // 4. Apply the selected strategy.
        let (pr_url, pr_id) = match self.apply(request, &mut logs).await {
            Ok(ids) => ids,
            Err(e) => {
                let _ = fsm.process(DeployEvent::Fail(e.to_string()));
                logs.push(format!("Apply failed: {}", e));
                // A persisted backup stays rollback-eligible even though the
                // apply step failed.
                return self.fail(request, logs, e, backup_id, rollback_available).await;
            }
        };
        let _ = fsm.process(DeployEvent::Applied);

        // 5. Verify the nucleus survived the mutation. A dropped connection
        // is a verification failure even if the push itself succeeded.
        if !self.connector.is_connected(&request.nucleus_id).await {
            let e = CoreError::ConnectionError(format!(
                "nucleus {} is no longer connected after apply",
                request.nucleus_id
            ));
            let _ = fsm.process(DeployEvent::Fail(e.to_string()));
            logs.push(format!("Verification failed: {}", e));
            error!("Deployment {} failed: {}", request.id, e);

            // Report the partial state: the apply itself went through, so
            // the PR and backup identifiers stay in the result.
            let result = DeploymentResult {
                success: false,
                completed_at: Utc::now(),
                files_changed: 0,
                rollback_available,
                logs,
                pr_url,
                pr_id,
                backup_id,
                error: Some(e.to_string()),
            };
            self.record_audit(request, &result).await;
            return result;
        }
        let _ = fsm.process(DeployEvent::Verified);
        logs.push(format!(
            "Nucleus {} verified reachable after apply",
            request.nucleus_id
        ));
        logs.push(format!(
            "Completed in {} ms",
            started.elapsed().as_millis()
        ));

        // 6. Assemble the result.
        let result = DeploymentResult {
            success: true,
            completed_at: Utc::now(),
            files_changed: request.changes.len(),
            rollback_available,
            logs,
            pr_url,
            pr_id,
            backup_id,
            error: None,
        };
        info!(
            "Deployment {} succeeded ({} file(s))",
            request.id, result.files_changed
        );
        self.record_audit(request, &result).await;
        result
    }

    /// Restore a nucleus to the state captured in a backup record. Aborts
    /// entirely, with zero pushes, if any snapshot fails verification.
    pub async fn rollback(&self, deployment_id: &str, backup_id: &str) -> DeploymentResult {
        rollback::execute(
            self.connector.as_ref(),
            self.store.as_ref(),
            self.audit.as_ref(),
            deployment_id,
            backup_id,
        )
        .await
    }

    async fn apply(
        &self,
        request: &DeployRequest,
        logs: &mut Vec<String>,
    ) -> Result<(Option<String>, Option<String>), CoreError> {
        match request.strategy {
            DeployStrategy::CreatePr => {
                let branch = utils::deployment_branch(&request.id);
                let options = PullRequestOptions {
                    title: format!("Deployment {}", request.id),
                    description: pr_description(&request.changes),
                    branch: branch.clone(),
                    base_branch: request.branch().to_string(),
                    changes: request.changes.clone(),
                };

                let pr = self
                    .connector
                    .create_pull_request(&request.nucleus_id, &options)
                    .await?;
                logs.push(format!("Opened pull request {} from {}", pr.pr_url, branch));
                Ok((Some(pr.pr_url), Some(pr.pr_id)))
            }

            DeployStrategy::AutoApply => {
                logs.push(format!(
                    "Direct apply to {}: higher-risk strategy",
                    request.branch()
                ));
                let message = format!(
                    "deployment {}: {} change(s)",
                    request.id,
                    request.changes.len()
                );
                let push = self
                    .connector
                    .push_changes(&request.nucleus_id, &request.changes, &message)
                    .await?;
                match push.commit_id {
                    Some(commit) => logs.push(format!("Pushed as commit {}", commit)),
                    None => logs.push("Pushed as one commit".to_string()),
                }
                Ok((None, None))
            }

            DeployStrategy::Scheduled => {
                // Intent only: no scheduler integration exists yet, so no
                // remote mutation happens here.
                logs.push(format!(
                    "Scheduled: intent recorded for deployment {}, no changes sent",
                    request.id
                ));
                Ok((None, None))
            }

            DeployStrategy::DryRun => unreachable!("dry run handled before apply"),
        }
    }

    async fn fail(
        &self,
        request: &DeployRequest,
        logs: Vec<String>,
        error: CoreError,
        backup_id: Option<String>,
        rollback_available: bool,
    ) -> DeploymentResult {
        error!("Deployment {} failed: {}", request.id, error);
        let result = DeploymentResult {
            success: false,
            completed_at: Utc::now(),
            files_changed: 0,
            rollback_available,
            logs,
            pr_url: None,
            pr_id: None,
            backup_id,
            error: Some(error.to_string()),
        };
        self.record_audit(request, &result).await;
        result
    }

    async fn record_audit(&self, request: &DeployRequest, result: &DeploymentResult) {
        let record = AuditRecord {
            actor: request.actor().map(|a| a.to_string()),
            deployment_id: Some(request.id.clone()),
            backup_id: result.backup_id.clone(),
            detail: result.error.clone(),
            ..AuditRecord::new("deploy", &request.nucleus_id, result.success)
        };

        if let Err(e) = self.audit.insert(record).await {
            error!("Failed to write audit record: {}", e);
        }
    }
}

/// Human-readable pull-request description grouping changes by action.
fn pr_description(changes: &[CodeChange]) -> String {
    let mut sections = String::from("Automated deployment.\n");

    for (action, heading) in [
        (ChangeAction::Create, "Created"),
        (ChangeAction::Update, "Updated"),
        (ChangeAction::Delete, "Deleted"),
    ] {
        let group: Vec<&CodeChange> = changes.iter().filter(|c| c.action == action).collect();
        if group.is_empty() {
            continue;
        }

        sections.push_str(&format!("\n{} ({}):\n", heading, group.len()));
        for change in group {
            sections.push_str(&format!("- `{}`: {}\n", change.file, change.reason));
        }
    }

    sections
}

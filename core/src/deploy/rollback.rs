//! Rollback path
//!
//! Restores files from a backup record, gated on re-verifying every
//! snapshot's checksum. A single mismatch aborts the whole restoration:
//! a corrupted record casts doubt on the entire persisted batch, so even
//! files that did verify are not restored.

use chrono::Utc;
use tracing::{error, info};

use crate::audit::{AuditRecord, AuditSink};
use crate::backup::store::BackupStore;
use crate::codec;
use crate::connector::PlatformConnector;
use crate::models::backup::BackupRecord;
use crate::models::change::{ChangeAction, CodeChange};
use crate::models::deployment::DeploymentResult;

pub(crate) async fn execute(
    connector: &dyn PlatformConnector,
    store: &dyn BackupStore,
    audit: &dyn AuditSink,
    deployment_id: &str,
    backup_id: &str,
) -> DeploymentResult {
    let mut logs = vec![format!(
        "Rollback of deployment {} from backup {}",
        deployment_id, backup_id
    )];

    let record = match store.get(backup_id).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            return fail(
                audit,
                "unknown",
                deployment_id,
                backup_id,
                logs,
                format!("backup {} not found", backup_id),
            )
            .await;
        }
        Err(e) => {
            return fail(
                audit,
                "unknown",
                deployment_id,
                backup_id,
                logs,
                format!("could not load backup {}: {}", backup_id, e),
            )
            .await;
        }
    };

    if !record.checksum_valid {
        return fail(
            audit,
            &record.nucleus_id,
            deployment_id,
            backup_id,
            logs,
            format!("backup {} was recorded as unverified", backup_id),
        )
        .await;
    }

    // Re-verify every snapshot before touching the remote.
    let mismatches: Vec<&str> = record
        .files
        .iter()
        .filter(|s| {
            !codec::verify(
                s.payload.content(),
                s.payload.encoding(),
                s.payload.checksum(),
            )
        })
        .map(|s| s.file.as_str())
        .collect();

    if !mismatches.is_empty() {
        logs.push(format!(
            "Checksum mismatch on {} of {} file(s): {}",
            mismatches.len(),
            record.files.len(),
            mismatches.join(", ")
        ));
        return fail(
            audit,
            &record.nucleus_id,
            deployment_id,
            backup_id,
            logs,
            format!("backup {} failed integrity verification", backup_id),
        )
        .await;
    }
    logs.push(format!(
        "All {} snapshot(s) verified against stored checksums",
        record.files.len()
    ));

    // Restore each file's original content, preserving its encoding exactly:
    // binary snapshots stay base64 end to end.
    let changes = restore_changes(&record);
    let message = format!(
        "rollback {}: restore {} file(s) from backup {}",
        deployment_id,
        changes.len(),
        backup_id
    );

    match connector
        .push_changes(&record.nucleus_id, &changes, &message)
        .await
    {
        Ok(push) => {
            match push.commit_id {
                Some(commit) => logs.push(format!("Restoration pushed as commit {}", commit)),
                None => logs.push("Restoration pushed as one commit".to_string()),
            }
            info!(
                "Rollback from backup {} restored {} file(s)",
                backup_id,
                changes.len()
            );

            let result = DeploymentResult {
                success: true,
                completed_at: Utc::now(),
                files_changed: changes.len(),
                rollback_available: true,
                logs,
                pr_url: None,
                pr_id: None,
                backup_id: Some(backup_id.to_string()),
                error: None,
            };
            record_audit(audit, &record.nucleus_id, deployment_id, backup_id, &result).await;
            result
        }
        Err(e) => {
            fail(
                audit,
                &record.nucleus_id,
                deployment_id,
                backup_id,
                logs,
                format!("restoration push failed: {}", e),
            )
            .await
        }
    }
}

fn restore_changes(record: &BackupRecord) -> Vec<CodeChange> {
    record
        .files
        .iter()
        .map(|snapshot| CodeChange {
            file: snapshot.file.clone(),
            action: ChangeAction::Update,
            content: Some(snapshot.payload.content().to_string()),
            encoding: Some(snapshot.payload.encoding()),
            reason: format!("restore from backup {}", record.backup_id),
        })
        .collect()
}

async fn fail(
    audit: &dyn AuditSink,
    nucleus_id: &str,
    deployment_id: &str,
    backup_id: &str,
    mut logs: Vec<String>,
    reason: String,
) -> DeploymentResult {
    error!("Rollback of {} failed: {}", deployment_id, reason);
    logs.push(format!("Rollback aborted: {}", reason));

    let result = DeploymentResult {
        success: false,
        completed_at: Utc::now(),
        files_changed: 0,
        rollback_available: false,
        logs,
        pr_url: None,
        pr_id: None,
        backup_id: Some(backup_id.to_string()),
        error: Some(reason),
    };
    record_audit(audit, nucleus_id, deployment_id, backup_id, &result).await;
    result
}

async fn record_audit(
    audit: &dyn AuditSink,
    nucleus_id: &str,
    deployment_id: &str,
    backup_id: &str,
    result: &DeploymentResult,
) {
    let record = AuditRecord {
        deployment_id: Some(deployment_id.to_string()),
        backup_id: Some(backup_id.to_string()),
        detail: result.error.clone(),
        ..AuditRecord::new("rollback", nucleus_id, result.success)
    };

    if let Err(e) = audit.insert(record).await {
        error!("Failed to write audit record: {}", e);
    }
}

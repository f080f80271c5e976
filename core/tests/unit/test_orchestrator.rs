//! Orchestrator scenario tests against a stub connector

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use nucleus_core::audit::{AuditSink, MemoryAuditSink};
use nucleus_core::backup::store::{BackupStore, MemoryBackupStore};
use nucleus_core::codec::{self, ContentEncoding, EncodedContent};
use nucleus_core::connector::{
    CodebaseListing, CodebaseQuery, PlatformConnector, PullRequestOptions, PullRequestOutcome,
    PushOutcome,
};
use nucleus_core::deploy::orchestrator::Orchestrator;
use nucleus_core::errors::CoreError;
use nucleus_core::models::change::{ChangeAction, CodeChange};
use nucleus_core::models::deployment::{DeployRequest, DeployStrategy};

/// Stub nucleus: serves files from a map, records every call.
#[derive(Default)]
struct StubConnector {
    connected: AtomicBool,
    files: Mutex<HashMap<String, EncodedContent>>,
    fetch_calls: AtomicUsize,
    push_calls: AtomicUsize,
    pr_calls: AtomicUsize,
    pushes: Mutex<Vec<(Vec<CodeChange>, String)>>,
}

impl StubConnector {
    fn connected() -> Self {
        let stub = Self::default();
        stub.connected.store(true, Ordering::SeqCst);
        stub
    }

    fn with_file(self, path: &str, content: &[u8]) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), codec::encode(content));
        self
    }

    fn network_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
            + self.push_calls.load(Ordering::SeqCst)
            + self.pr_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlatformConnector for StubConnector {
    async fn is_connected(&self, _nucleus_id: &str) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn fetch_file(
        &self,
        _nucleus_id: &str,
        _repository: &str,
        path: &str,
        _branch: &str,
    ) -> Result<EncodedContent, CoreError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| CoreError::RemoteError(format!("404: no such file {}", path)))
    }

    async fn fetch_codebase(
        &self,
        _nucleus_id: &str,
        _repository: &str,
        _query: &CodebaseQuery,
    ) -> Result<CodebaseListing, CoreError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(CodebaseListing {
            total_files: self.files.lock().unwrap().len() as u64,
            files: Vec::new(),
        })
    }

    async fn push_changes(
        &self,
        _nucleus_id: &str,
        changes: &[CodeChange],
        commit_message: &str,
    ) -> Result<PushOutcome, CoreError> {
        self.push_calls.fetch_add(1, Ordering::SeqCst);
        self.pushes
            .lock()
            .unwrap()
            .push((changes.to_vec(), commit_message.to_string()));
        Ok(PushOutcome {
            commit_id: Some("abc123".to_string()),
        })
    }

    async fn create_pull_request(
        &self,
        _nucleus_id: &str,
        _options: &PullRequestOptions,
    ) -> Result<PullRequestOutcome, CoreError> {
        self.pr_calls.fetch_add(1, Ordering::SeqCst);
        Ok(PullRequestOutcome {
            pr_url: "http://nucleus.local/pr/7".to_string(),
            pr_id: "7".to_string(),
        })
    }
}

fn change(file: &str, action: ChangeAction, content: Option<&str>) -> CodeChange {
    CodeChange {
        file: file.to_string(),
        action,
        content: content.map(|c| c.to_string()),
        encoding: content.map(|_| ContentEncoding::Utf8),
        reason: "test".to_string(),
    }
}

fn request(id: &str, changes: Vec<CodeChange>, strategy: DeployStrategy) -> DeployRequest {
    DeployRequest {
        id: id.to_string(),
        nucleus_id: "side-1".to_string(),
        repository: "platform".to_string(),
        branch: None,
        changes,
        strategy,
        metadata: Some(serde_json::json!({ "actor": "operator-9" })),
    }
}

fn harness(connector: Arc<StubConnector>) -> (Orchestrator, Arc<MemoryBackupStore>, Arc<MemoryAuditSink>) {
    let store = Arc::new(MemoryBackupStore::new());
    let audit = Arc::new(MemoryAuditSink::new());
    let orchestrator = Orchestrator::new(connector, store.clone(), audit.clone());
    (orchestrator, store, audit)
}

#[tokio::test]
async fn test_empty_change_set_fails_without_network() {
    let connector = Arc::new(StubConnector::connected());
    let (orchestrator, _, _) = harness(connector.clone());

    let result = orchestrator
        .deploy(&request("dep-1", vec![], DeployStrategy::AutoApply))
        .await;

    assert!(!result.success);
    assert!(!result.rollback_available);
    assert_eq!(connector.network_calls(), 0);
}

#[tokio::test]
async fn test_dry_run_performs_zero_network_calls() {
    let connector = Arc::new(StubConnector::connected());
    let (orchestrator, store, _) = harness(connector.clone());

    let changes = vec![change("src/a.ts", ChangeAction::Update, Some("new"))];
    let result = orchestrator
        .deploy(&request("dep-2", changes, DeployStrategy::DryRun))
        .await;

    assert!(result.success);
    assert!(!result.rollback_available);
    assert_eq!(result.files_changed, 1);
    assert!(result.backup_id.is_none());
    assert_eq!(connector.network_calls(), 0);
    assert!(store.list(None).await.unwrap().is_empty());
    assert!(result.logs.iter().any(|l| l.contains("Dry run")));
}

#[tokio::test]
async fn test_failed_snapshot_aborts_before_any_mutation() {
    // fetch_file fails for src/b.ts: nothing may be pushed.
    let connector = Arc::new(StubConnector::connected());
    let (orchestrator, store, _) = harness(connector.clone());

    let changes = vec![change("src/b.ts", ChangeAction::Update, Some("new"))];
    let result = orchestrator
        .deploy(&request("dep-3", changes, DeployStrategy::AutoApply))
        .await;

    assert!(!result.success);
    assert!(!result.rollback_available);
    assert_eq!(connector.push_calls.load(Ordering::SeqCst), 0);
    assert_eq!(connector.pr_calls.load(Ordering::SeqCst), 0);
    assert!(store.list(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_pr_for_new_file() {
    let connector = Arc::new(StubConnector::connected());
    let (orchestrator, _, _) = harness(connector.clone());

    let changes = vec![change("a.ts", ChangeAction::Create, Some("x"))];
    let result = orchestrator
        .deploy(&request("dep-4", changes, DeployStrategy::CreatePr))
        .await;

    assert!(result.success);
    assert_eq!(result.files_changed, 1);
    assert_eq!(result.pr_url.as_deref(), Some("http://nucleus.local/pr/7"));
    // A pure CREATE has no pre-existing file to snapshot.
    assert!(result.backup_id.is_none());
    assert!(!result.rollback_available);
    assert_eq!(connector.fetch_calls.load(Ordering::SeqCst), 0);
    assert_eq!(connector.pr_calls.load(Ordering::SeqCst), 1);
    assert_eq!(connector.push_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_auto_apply_snapshots_before_push() {
    let connector = Arc::new(StubConnector::connected().with_file("src/b.ts", b"old"));
    let (orchestrator, store, _) = harness(connector.clone());

    let changes = vec![change("src/b.ts", ChangeAction::Update, Some("new"))];
    let result = orchestrator
        .deploy(&request("dep-5", changes, DeployStrategy::AutoApply))
        .await;

    assert!(result.success);
    assert!(result.rollback_available);
    let backup_id = result.backup_id.expect("backup id");

    let record = store.get(&backup_id).await.unwrap().expect("record");
    assert_eq!(record.deployment_id.as_deref(), Some("dep-5"));
    assert_eq!(record.files.len(), 1);
    assert_eq!(record.files[0].file, "src/b.ts");
    assert_eq!(record.files[0].payload.checksum(), codec::checksum(b"old"));
    assert!(record.checksum_valid);

    assert_eq!(connector.push_calls.load(Ordering::SeqCst), 1);
    let pushes = connector.pushes.lock().unwrap();
    assert_eq!(pushes[0].0[0].content.as_deref(), Some("new"));
}

#[tokio::test]
async fn test_partial_backup_warns_but_proceeds() {
    let connector = Arc::new(StubConnector::connected().with_file("src/a.ts", b"old a"));
    let (orchestrator, _, _) = harness(connector.clone());

    let changes = vec![
        change("src/a.ts", ChangeAction::Update, Some("new a")),
        change("src/gone.ts", ChangeAction::Update, Some("new b")),
    ];
    let result = orchestrator
        .deploy(&request("dep-6", changes, DeployStrategy::AutoApply))
        .await;

    assert!(result.success);
    assert!(result.rollback_available);
    assert!(result.logs.iter().any(|l| l.contains("partial")));
    assert_eq!(connector.push_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_traversal_is_rejected_before_any_connector_call() {
    let connector = Arc::new(StubConnector::connected());
    let (orchestrator, _, _) = harness(connector.clone());

    let changes = vec![change("../../etc/passwd", ChangeAction::Update, Some("pwn"))];
    let result = orchestrator
        .deploy(&request("dep-7", changes, DeployStrategy::AutoApply))
        .await;

    assert!(!result.success);
    assert_eq!(connector.network_calls(), 0);
}

#[tokio::test]
async fn test_scheduled_records_intent_without_mutation() {
    let connector = Arc::new(StubConnector::connected());
    let (orchestrator, _, _) = harness(connector.clone());

    let changes = vec![change("src/later.ts", ChangeAction::Create, Some("x"))];
    let result = orchestrator
        .deploy(&request("dep-8", changes, DeployStrategy::Scheduled))
        .await;

    assert!(result.success);
    assert_eq!(connector.push_calls.load(Ordering::SeqCst), 0);
    assert_eq!(connector.pr_calls.load(Ordering::SeqCst), 0);
    assert!(result.logs.iter().any(|l| l.contains("intent")));
}

#[tokio::test]
async fn test_dropped_connection_after_apply_is_a_verification_failure() {
    // Stub reports disconnected even though the PR call itself succeeds.
    let connector = Arc::new(StubConnector::default());
    let (orchestrator, _, _) = harness(connector.clone());

    let changes = vec![change("a.ts", ChangeAction::Create, Some("x"))];
    let result = orchestrator
        .deploy(&request("dep-9", changes, DeployStrategy::CreatePr))
        .await;

    assert!(!result.success);
    // Partial state is reported: the PR did get opened.
    assert!(result.pr_url.is_some());
    assert!(result.error.unwrap().contains("no longer connected"));
}

#[tokio::test]
async fn test_deploy_writes_an_audit_record() {
    let connector = Arc::new(StubConnector::connected());
    let (orchestrator, _, audit) = harness(connector.clone());

    let changes = vec![change("a.ts", ChangeAction::Create, Some("x"))];
    let result = orchestrator
        .deploy(&request("dep-10", changes, DeployStrategy::CreatePr))
        .await;
    assert!(result.success);

    let records = audit.query(Some("side-1")).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].action, "deploy");
    assert_eq!(records[0].actor.as_deref(), Some("operator-9"));
    assert_eq!(records[0].deployment_id.as_deref(), Some("dep-10"));
    assert!(records[0].success);
}

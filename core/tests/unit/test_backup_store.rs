//! Backup store tests

use chrono::Utc;
use nucleus_core::backup::store::{BackupStore, FileBackupStore, MemoryBackupStore};
use nucleus_core::codec;
use nucleus_core::filesys::dir::Dir;
use nucleus_core::models::backup::{BackupRecord, FileSnapshot};

fn record(backup_id: &str, nucleus_id: &str) -> BackupRecord {
    let payload = codec::encode(b"original content");
    BackupRecord {
        backup_id: backup_id.to_string(),
        nucleus_id: nucleus_id.to_string(),
        deployment_id: Some("dep-1".to_string()),
        repository: "platform".to_string(),
        branch: "main".to_string(),
        change_count: 1,
        total_size: payload.size(),
        checksum_valid: true,
        created_at: Utc::now(),
        files: vec![FileSnapshot {
            file: "src/a.ts".to_string(),
            payload,
            timestamp: Utc::now(),
        }],
    }
}

#[tokio::test]
async fn test_file_store_roundtrip() {
    let tmp = tempfile::tempdir().unwrap();
    let store = FileBackupStore::new(Dir::new(tmp.path().join("backups")));

    let original = record("bk-1-side", "side");
    store.insert(&original).await.unwrap();

    let loaded = store.get("bk-1-side").await.unwrap().unwrap();
    assert_eq!(loaded.backup_id, original.backup_id);
    assert_eq!(loaded.files.len(), 1);
    assert_eq!(
        loaded.files[0].payload.checksum(),
        original.files[0].payload.checksum()
    );
    assert_eq!(loaded.files[0].payload.decode().unwrap(), b"original content");
}

#[tokio::test]
async fn test_file_store_is_append_only() {
    let tmp = tempfile::tempdir().unwrap();
    let store = FileBackupStore::new(Dir::new(tmp.path().join("backups")));

    store.insert(&record("bk-1-side", "side")).await.unwrap();
    let duplicate = store.insert(&record("bk-1-side", "side")).await;
    assert!(duplicate.is_err());
}

#[tokio::test]
async fn test_file_store_missing_record_is_none() {
    let tmp = tempfile::tempdir().unwrap();
    let store = FileBackupStore::new(Dir::new(tmp.path().join("backups")));
    assert!(store.get("bk-none").await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_scopes_by_nucleus() {
    let tmp = tempfile::tempdir().unwrap();
    let store = FileBackupStore::new(Dir::new(tmp.path().join("backups")));

    store.insert(&record("bk-1-side", "side")).await.unwrap();
    store.insert(&record("bk-2-side", "side")).await.unwrap();
    store.insert(&record("bk-3-academy", "academy")).await.unwrap();

    assert_eq!(store.list(None).await.unwrap().len(), 3);
    assert_eq!(store.list(Some("side")).await.unwrap().len(), 2);
    assert_eq!(store.list(Some("academy")).await.unwrap().len(), 1);
    assert!(store.list(Some("external")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_memory_store_matches_contract() {
    let store = MemoryBackupStore::new();

    store.insert(&record("bk-1-side", "side")).await.unwrap();
    assert!(store.insert(&record("bk-1-side", "side")).await.is_err());

    assert!(store.get("bk-1-side").await.unwrap().is_some());
    assert!(store.get("bk-2-side").await.unwrap().is_none());
    assert_eq!(store.list(Some("side")).await.unwrap().len(), 1);
}

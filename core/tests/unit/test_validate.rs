//! Change-set validation tests

use nucleus_core::codec::ContentEncoding;
use nucleus_core::deploy::validate::validate_changes;
use nucleus_core::models::change::{ChangeAction, CodeChange};

fn change(file: &str, action: ChangeAction) -> CodeChange {
    CodeChange {
        file: file.to_string(),
        action,
        content: Some("content".to_string()),
        encoding: Some(ContentEncoding::Utf8),
        reason: "test change".to_string(),
    }
}

#[test]
fn test_rejects_empty_change_set() {
    assert!(validate_changes(&[]).is_err());
}

#[test]
fn test_rejects_blank_file_path() {
    assert!(validate_changes(&[change("  ", ChangeAction::Create)]).is_err());
}

#[test]
fn test_rejects_create_without_content() {
    let mut missing = change("src/new.ts", ChangeAction::Create);
    missing.content = None;
    assert!(validate_changes(&[missing]).is_err());
}

#[test]
fn test_rejects_traversal_anywhere_in_path() {
    for path in [
        "../../etc/passwd",
        "src/../../outside.ts",
        "src/..\\..\\outside.ts",
        "a/b/../../../c.ts",
    ] {
        assert!(
            validate_changes(&[change(path, ChangeAction::Update)]).is_err(),
            "{} should be rejected",
            path
        );
    }
}

#[test]
fn test_rejects_protected_directories_case_insensitive() {
    for path in [
        "node_modules/pkg/index.js",
        "NODE_MODULES/pkg/index.js",
        ".git/hooks/pre-commit",
        "app/target/release/bin",
        "vendor/dep/lib.go",
    ] {
        assert!(
            validate_changes(&[change(path, ChangeAction::Create)]).is_err(),
            "{} should be rejected",
            path
        );
    }
}

#[test]
fn test_rejects_absolute_paths() {
    assert!(validate_changes(&[change("/etc/passwd", ChangeAction::Update)]).is_err());
}

#[test]
fn test_one_bad_change_rejects_the_whole_set() {
    let changes = vec![
        change("src/ok.ts", ChangeAction::Create),
        change("../escape.ts", ChangeAction::Create),
    ];
    assert!(validate_changes(&changes).is_err());
}

#[test]
fn test_accepts_ordinary_changes() {
    let changes = vec![
        change("src/services/api.ts", ChangeAction::Create),
        change("README.md", ChangeAction::Update),
        CodeChange {
            file: "src/old.ts".to_string(),
            action: ChangeAction::Delete,
            content: None,
            encoding: None,
            reason: "remove dead module".to_string(),
        },
    ];
    assert!(validate_changes(&changes).is_ok());
}

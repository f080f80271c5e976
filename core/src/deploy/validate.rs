//! Change-set validation
//!
//! Everything here runs before any network I/O. Path checks are hard
//! security boundaries, not heuristics.

use crate::errors::CoreError;
use crate::models::change::{ChangeAction, CodeChange};

/// Directories no deployment may write into: dependency trees and
/// version-control state.
pub const PROTECTED_DIRS: &[&str] = &["node_modules", ".git", "target", "vendor"];

/// Validate a requested change set. Rejects empty sets, incomplete changes,
/// parent-directory traversal and protected-directory writes.
pub fn validate_changes(changes: &[CodeChange]) -> Result<(), CoreError> {
    if changes.is_empty() {
        return Err(CoreError::ValidationError(
            "change set is empty".to_string(),
        ));
    }

    for change in changes {
        if change.file.trim().is_empty() {
            return Err(CoreError::ValidationError(
                "change is missing a file path".to_string(),
            ));
        }

        if matches!(change.action, ChangeAction::Create | ChangeAction::Update)
            && change.content.is_none()
        {
            return Err(CoreError::ValidationError(format!(
                "{:?} of {} is missing content",
                change.action, change.file
            )));
        }

        validate_path(&change.file)?;
    }

    Ok(())
}

fn validate_path(path: &str) -> Result<(), CoreError> {
    if path.starts_with('/') || path.starts_with('\\') {
        return Err(CoreError::ValidationError(format!(
            "absolute path not allowed: {}",
            path
        )));
    }

    let segments: Vec<&str> = path.split(['/', '\\']).collect();

    if segments.iter().any(|s| *s == "..") {
        return Err(CoreError::ValidationError(format!(
            "parent-directory traversal not allowed: {}",
            path
        )));
    }

    if let Some(protected) = segments
        .iter()
        .find(|s| PROTECTED_DIRS.contains(&s.to_lowercase().as_str()))
    {
        return Err(CoreError::ValidationError(format!(
            "write into protected directory {} not allowed: {}",
            protected, path
        )));
    }

    Ok(())
}

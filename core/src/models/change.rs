//! Requested source-file mutations

use serde::{Deserialize, Serialize};

use crate::codec::ContentEncoding;

/// What a change does to its target file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
}

/// One requested mutation inside a deployment. Supplied by the caller; never
/// persisted on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeChange {
    /// Target file path, relative to the repository root.
    pub file: String,

    pub action: ChangeAction,

    /// New content; required for CREATE and UPDATE.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Encoding of `content` when the caller already knows it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<ContentEncoding>,

    /// Human-readable justification.
    pub reason: String,
}

impl CodeChange {
    /// UPDATE and DELETE touch a pre-existing file and therefore require a
    /// backup snapshot before any remote mutation.
    pub fn mutates_existing(&self) -> bool {
        matches!(self.action, ChangeAction::Update | ChangeAction::Delete)
    }
}

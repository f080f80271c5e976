//! Finite state machine for one deployment request

use serde::{Deserialize, Serialize};

/// Phase of a deployment request. Terminal phases are `Succeeded` and
/// `Failed`; a failed deployment must be resubmitted by the caller, there
/// are no automatic retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeployPhase {
    Validating,
    BackingUp,
    Applying,
    Verifying,
    Succeeded,
    Failed,
}

impl DeployPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeployPhase::Succeeded | DeployPhase::Failed)
    }
}

/// Deployment event
#[derive(Debug, Clone)]
pub enum DeployEvent {
    /// Change set passed validation
    Validated,

    /// Dry run: skip backup and mutation, complete immediately
    Simulated,

    /// Backup persisted (or not required)
    BackupReady,

    /// Strategy applied against the remote
    Applied,

    /// Post-apply connection check passed
    Verified,

    /// Any step failed
    Fail(String),
}

/// Per-request deployment FSM
#[derive(Debug, Clone)]
pub struct DeployFsm {
    phase: DeployPhase,
    error: Option<String>,
}

impl DeployFsm {
    /// Create a new FSM in the validating phase
    pub fn new() -> Self {
        Self {
            phase: DeployPhase::Validating,
            error: None,
        }
    }

    /// Get current phase
    pub fn phase(&self) -> &DeployPhase {
        &self.phase
    }

    /// Get error message if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Process an event and transition phase
    pub fn process(&mut self, event: DeployEvent) -> Result<(), String> {
        let next = match (&self.phase, &event) {
            (DeployPhase::Validating, DeployEvent::Validated) => DeployPhase::BackingUp,

            (DeployPhase::BackingUp, DeployEvent::Simulated) => DeployPhase::Succeeded,
            (DeployPhase::BackingUp, DeployEvent::BackupReady) => DeployPhase::Applying,

            (DeployPhase::Applying, DeployEvent::Applied) => DeployPhase::Verifying,

            (DeployPhase::Verifying, DeployEvent::Verified) => DeployPhase::Succeeded,

            (phase, DeployEvent::Fail(reason)) if !phase.is_terminal() => {
                self.error = Some(reason.clone());
                DeployPhase::Failed
            }

            (phase, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", phase, event));
            }
        };

        self.phase = next;
        Ok(())
    }
}

impl Default for DeployFsm {
    fn default() -> Self {
        Self::new()
    }
}

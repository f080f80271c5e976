//! Utility functions

use serde::{Deserialize, Serialize};

/// Version information for the core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// Backup identifier, derived from creation time and the owning nucleus.
pub fn backup_id(nucleus_id: &str) -> String {
    format!("bk-{}-{}", chrono::Utc::now().timestamp_millis(), nucleus_id)
}

/// Working branch name for a pull-request deployment.
pub fn deployment_branch(deployment_id: &str) -> String {
    format!("deploy/{}", deployment_id)
}

/// Generate a random UUID v4
pub fn generate_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

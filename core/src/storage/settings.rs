//! Settings file management

use serde::{Deserialize, Serialize};

use crate::logs::LogLevel;
use crate::models::connection::NucleusCategory;

/// Core settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Connector configuration
    #[serde(default)]
    pub connector: ConnectorSettings,

    /// Health check worker configuration
    #[serde(default)]
    pub health: HealthSettings,

    /// Shared secret for HMAC request signing; signing is disabled when absent
    #[serde(default)]
    pub signing_secret: Option<String>,

    /// Nuclei to connect to at startup
    #[serde(default)]
    pub nuclei: Vec<NucleusEntry>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            connector: ConnectorSettings::default(),
            health: HealthSettings::default(),
            signing_secret: None,
            nuclei: Vec::new(),
        }
    }
}

/// Connector network settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorSettings {
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after a transient failure
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Delay between retries in seconds
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retry_attempts() -> u32 {
    2
}

fn default_retry_backoff_secs() -> u64 {
    1
}

impl Default for ConnectorSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_secs: default_retry_backoff_secs(),
        }
    }
}

/// Health check worker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSettings {
    /// Enable the periodic health worker
    #[serde(default = "default_true")]
    pub enable: bool,

    /// Interval between sweeps in seconds
    #[serde(default = "default_health_interval")]
    pub interval_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_health_interval() -> u64 {
    60
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            enable: true,
            interval_secs: default_health_interval(),
        }
    }
}

/// One configured nucleus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NucleusEntry {
    pub id: String,
    pub name: String,
    pub category: NucleusCategory,
    pub base_url: String,
    /// Opaque credential; kept as plain text in the settings file and wrapped
    /// in a secret type as soon as it is loaded
    #[serde(default)]
    pub credential: Option<String>,
}

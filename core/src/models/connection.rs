//! Nucleus connection models

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Which part of the fleet a nucleus belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NucleusCategory {
    Side,
    Academy,
    External,
}

/// Liveness of a tracked connection.
///
/// Transitions only through connect, ping and disconnect:
/// `Disconnected -> Connected -> Error -> Connected -> Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Liveness {
    Connected,
    Disconnected,
    Error,
}

/// What a caller supplies to establish a connection.
#[derive(Debug, Clone, Deserialize)]
pub struct NucleusDescriptor {
    pub id: String,
    pub name: String,
    pub category: NucleusCategory,
    pub base_url: String,
    /// Opaque credential, sent as a bearer token when present.
    #[serde(default)]
    pub credential: Option<SecretString>,
}

/// One tracked remote platform. Owned exclusively by the connector; nothing
/// else mutates liveness or the ping timestamp.
#[derive(Clone)]
pub struct NucleusConnection {
    pub id: String,
    pub name: String,
    pub category: NucleusCategory,
    pub base_url: String,
    pub credential: Option<SecretString>,
    pub liveness: Liveness,
    pub last_ping_at: Option<DateTime<Utc>>,
}

impl NucleusConnection {
    pub fn from_descriptor(descriptor: NucleusDescriptor) -> Self {
        Self {
            id: descriptor.id,
            name: descriptor.name,
            category: descriptor.category,
            base_url: descriptor.base_url.trim_end_matches('/').to_string(),
            credential: descriptor.credential,
            liveness: Liveness::Disconnected,
            last_ping_at: None,
        }
    }

    /// Credential-free view for status reporting.
    pub fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            category: self.category,
            base_url: self.base_url.clone(),
            liveness: self.liveness,
            last_ping_at: self.last_ping_at,
        }
    }
}

impl std::fmt::Debug for NucleusConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NucleusConnection")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("category", &self.category)
            .field("base_url", &self.base_url)
            .field("liveness", &self.liveness)
            .field("last_ping_at", &self.last_ping_at)
            .finish_non_exhaustive()
    }
}

/// Serializable connection snapshot without the credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    pub id: String,
    pub name: String,
    pub category: NucleusCategory,
    pub base_url: String,
    pub liveness: Liveness,
    pub last_ping_at: Option<DateTime<Utc>>,
}

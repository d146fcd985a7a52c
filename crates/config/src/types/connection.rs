//! Connection configuration types.
//!
//! Responsibilities:
//! - Define endpoint, timeout and retry settings for both dbt Cloud APIs.
//! - Define the top-level `Config` combining connection, auth and projects.
//! - Provide convenience constructors for common config patterns.
//!
//! Does NOT handle:
//! - Configuration loading from files/env (see `loader` module).
//! - Actual network connections (see client crate).
//!
//! Invariants:
//! - Duration fields are serialized as whole seconds.
//! - Endpoint strings never carry a trailing slash once built by the loader.

use crate::constants::{
    DEFAULT_CLOUD_BASE_URL, DEFAULT_DISCOVERY_ENDPOINT, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS,
};
use crate::types::auth::AuthConfig;
use crate::types::projects::ProjectMap;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Module for serializing Duration as seconds (integer).
mod duration_seconds {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Network settings shared by the Discovery and REST clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// GraphQL endpoint of the Discovery API.
    pub discovery_endpoint: String,
    /// Base URL of the administrative REST API (v2).
    pub cloud_base_url: String,
    /// Per-request timeout (serialized as seconds)
    #[serde(with = "duration_seconds")]
    pub timeout: Duration,
    /// Retry budget for rate-limited (HTTP 429) requests
    pub max_retries: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            discovery_endpoint: DEFAULT_DISCOVERY_ENDPOINT.to_string(),
            cloud_base_url: DEFAULT_CLOUD_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone)]
pub struct Config {
    pub connection: ConnectionConfig,
    pub auth: AuthConfig,
    /// dbt Cloud account used by REST-backed operations.
    pub account_id: Option<u64>,
    /// Named project shortcuts (display name to production environment).
    pub projects: ProjectMap,
}

impl Config {
    /// Create a config with default endpoints and the given service token.
    pub fn with_service_token(token: SecretString) -> Self {
        Self {
            connection: ConnectionConfig::default(),
            auth: AuthConfig::new(token),
            account_id: None,
            projects: ProjectMap::new(),
        }
    }

    /// Point both APIs at custom endpoints (used against mock servers).
    pub fn with_endpoints(mut self, discovery_endpoint: String, cloud_base_url: String) -> Self {
        self.connection.discovery_endpoint = discovery_endpoint;
        self.connection.cloud_base_url = cloud_base_url;
        self
    }
}

//! Environment variable parsing for configuration.
//!
//! Responsibilities:
//! - Read the `DBT_*` environment variables and apply them to a `ConfigLoader`.
//! - Provide a helper for reading env vars with empty/whitespace filtering.
//!
//! Does NOT handle:
//! - Project map file loading (see projects.rs).
//! - Building the final Config (see builder.rs).
//!
//! Invariants:
//! - Empty or whitespace-only environment variables are treated as unset.
//! - Returned values are trimmed (leading/trailing whitespace removed).
//! - Invalid numeric values return ConfigError::InvalidValue.
//! - Values already set through builder methods are never overwritten.

use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;

use super::builder::ConfigLoader;
use super::error::ConfigError;
use crate::constants::MAX_MAX_RETRIES;

pub const ENV_SERVICE_TOKEN: &str = "DBT_SERVICE_TOKEN";
pub const ENV_CLOUD_TOKEN: &str = "DBT_CLOUD_TOKEN";
pub const ENV_ACCOUNT_ID: &str = "DBT_CLOUD_ACCOUNT_ID";
pub const ENV_DISCOVERY_ENDPOINT: &str = "DBT_DISCOVERY_ENDPOINT";
pub const ENV_CLOUD_BASE_URL: &str = "DBT_CLOUD_BASE_URL";
pub const ENV_TIMEOUT: &str = "DBT_DISCOVERY_TIMEOUT";
pub const ENV_MAX_RETRIES: &str = "DBT_DISCOVERY_MAX_RETRIES";
pub const ENV_PROJECT_FILE: &str = "DBT_DISCOVERY_CONFIG";

/// Read an environment variable, returning None if unset, empty, or whitespace-only.
/// Returns the trimmed value (leading/trailing whitespace removed) if present.
pub fn env_var_or_none(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == s.len() {
            Some(s)
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn parse_number<T: std::str::FromStr>(var: &str, raw: &str, message: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        var: var.to_string(),
        message: message.to_string(),
    })
}

/// Apply environment variable configuration to the loader.
pub fn apply_env(loader: &mut ConfigLoader) -> Result<(), ConfigError> {
    if !loader.has_service_token()
        && let Some(token) = env_var_or_none(ENV_SERVICE_TOKEN)
    {
        loader.set_service_token(Some(SecretString::new(token.into())));
    }
    if !loader.has_cloud_token()
        && let Some(token) = env_var_or_none(ENV_CLOUD_TOKEN)
    {
        loader.set_cloud_token(Some(SecretString::new(token.into())));
    }
    if loader.account_id().is_none()
        && let Some(raw) = env_var_or_none(ENV_ACCOUNT_ID)
    {
        let id: u64 = parse_number(ENV_ACCOUNT_ID, &raw, "must be a positive integer")?;
        if id == 0 {
            return Err(ConfigError::InvalidValue {
                var: ENV_ACCOUNT_ID.to_string(),
                message: "must be a positive integer".to_string(),
            });
        }
        loader.set_account_id(Some(id));
    }
    if loader.discovery_endpoint().is_none()
        && let Some(url) = env_var_or_none(ENV_DISCOVERY_ENDPOINT)
    {
        loader.set_discovery_endpoint(Some(url));
    }
    if loader.cloud_base_url().is_none()
        && let Some(url) = env_var_or_none(ENV_CLOUD_BASE_URL)
    {
        loader.set_cloud_base_url(Some(url));
    }
    if loader.timeout().is_none()
        && let Some(raw) = env_var_or_none(ENV_TIMEOUT)
    {
        let secs: u64 = parse_number(ENV_TIMEOUT, &raw, "must be a number")?;
        loader.set_timeout(Some(Duration::from_secs(secs)));
    }
    if loader.max_retries().is_none()
        && let Some(raw) = env_var_or_none(ENV_MAX_RETRIES)
    {
        let value: usize = parse_number(ENV_MAX_RETRIES, &raw, "must be a non-negative integer")?;
        if value > MAX_MAX_RETRIES {
            return Err(ConfigError::InvalidMaxRetries {
                message: format!("must be between 0 and {} (got {})", MAX_MAX_RETRIES, value),
            });
        }
        loader.set_max_retries(Some(value));
    }
    if loader.project_file().is_none()
        && let Some(path) = env_var_or_none(ENV_PROJECT_FILE)
    {
        loader.set_project_file(Some(PathBuf::from(path)));
    }
    Ok(())
}

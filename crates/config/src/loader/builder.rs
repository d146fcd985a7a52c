//! Configuration loader builder implementation.
//!
//! Responsibilities:
//! - Provide a builder-pattern `ConfigLoader` for hierarchical configuration merging.
//! - Support loading from environment variables, the project map file and direct builder methods.
//! - Build the final, validated `Config`.
//!
//! Does NOT handle:
//! - Direct environment variable parsing logic (delegated to env.rs).
//! - Project map parsing (delegated to projects.rs).
//!
//! Invariants / Assumptions:
//! - Builder methods take precedence over environment variables.
//! - Projects added with `with_project` take precedence over project file entries.
//! - `load_dotenv()` must be called explicitly to enable `.env` file loading.
//! - The `DOTENV_DISABLED` variable is checked before `dotenvy::dotenv()` is called.

use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;

use super::env::apply_env;
use super::error::ConfigError;
use super::projects::load_project_file;
use crate::constants::{
    DEFAULT_CLOUD_BASE_URL, DEFAULT_DISCOVERY_ENDPOINT, DEFAULT_MAX_RETRIES, DEFAULT_PROJECT_FILE,
    DEFAULT_TIMEOUT_SECS, MAX_MAX_RETRIES, MAX_TIMEOUT_SECS,
};
use crate::types::{AuthConfig, Config, ConnectionConfig, ProjectEntry, ProjectMap};

/// Configuration loader that builds config from environment variables and files.
pub struct ConfigLoader {
    service_token: Option<SecretString>,
    cloud_token: Option<SecretString>,
    account_id: Option<u64>,
    discovery_endpoint: Option<String>,
    cloud_base_url: Option<String>,
    timeout: Option<Duration>,
    max_retries: Option<usize>,
    project_file: Option<PathBuf>,
    skip_project_file: bool,
    projects: ProjectMap,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    pub fn new() -> Self {
        Self {
            service_token: None,
            cloud_token: None,
            account_id: None,
            discovery_endpoint: None,
            cloud_base_url: None,
            timeout: None,
            max_retries: None,
            project_file: None,
            skip_project_file: false,
            projects: ProjectMap::new(),
        }
    }

    /// Check if dotenv loading is disabled via environment variable.
    fn dotenv_disabled() -> bool {
        matches!(
            std::env::var("DOTENV_DISABLED").ok().as_deref(),
            Some("true") | Some("1")
        )
    }

    /// Load environment variables from .env file if present.
    ///
    /// If `DOTENV_DISABLED` environment variable is set to "true" or "1",
    /// the .env file will not be loaded (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The `.env` file exists but has invalid syntax (`ConfigError::DotenvParse`)
    /// - The `.env` file exists but cannot be read due to I/O errors (`ConfigError::DotenvIo`)
    ///
    /// Missing `.env` files are silently ignored (returns `Ok(self)`).
    pub fn load_dotenv(self) -> Result<Self, ConfigError> {
        if Self::dotenv_disabled() {
            return Ok(self);
        }

        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if Self::is_not_found(&e) => Ok(self),
            Err(dotenvy::Error::LineParse(_, idx)) => {
                Err(ConfigError::DotenvParse { error_index: idx })
            }
            Err(dotenvy::Error::Io(io_err)) => Err(ConfigError::DotenvIo {
                kind: io_err.kind(),
            }),
            Err(_) => Err(ConfigError::DotenvUnknown),
        }
    }

    /// Check if a dotenv error indicates the file was not found.
    fn is_not_found(err: &dotenvy::Error) -> bool {
        matches!(
            err,
            dotenvy::Error::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound
        )
    }

    /// Read configuration from `DBT_*` environment variables.
    ///
    /// Values already supplied through builder methods are kept.
    pub fn from_env(mut self) -> Result<Self, ConfigError> {
        apply_env(&mut self)?;
        Ok(self)
    }

    /// Set the Discovery API token.
    pub fn with_service_token(mut self, token: String) -> Self {
        self.service_token = Some(SecretString::new(token.into()));
        self
    }

    /// Set the REST API token.
    pub fn with_cloud_token(mut self, token: String) -> Self {
        self.cloud_token = Some(SecretString::new(token.into()));
        self
    }

    /// Set the dbt Cloud account id used by REST calls.
    pub fn with_account_id(mut self, account_id: u64) -> Self {
        self.account_id = Some(account_id);
        self
    }

    /// Set the Discovery GraphQL endpoint.
    pub fn with_discovery_endpoint(mut self, url: String) -> Self {
        self.discovery_endpoint = Some(url);
        self
    }

    /// Set the REST API base URL.
    pub fn with_cloud_base_url(mut self, url: String) -> Self {
        self.cloud_base_url = Some(url);
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the maximum number of retries for rate-limited requests; 0 disables retrying.
    pub fn with_max_retries(mut self, retries: usize) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Override the project map file path.
    pub fn with_project_file(mut self, path: PathBuf) -> Self {
        self.project_file = Some(path);
        self.skip_project_file = false;
        self
    }

    /// Do not read any project map file.
    pub fn without_project_file(mut self) -> Self {
        self.skip_project_file = true;
        self
    }

    /// Register a named project shortcut directly.
    pub fn with_project(mut self, name: impl Into<String>, prod_env_id: i64) -> Self {
        self.projects.insert(
            name.into(),
            ProjectEntry {
                prod_env_id,
                label: None,
            },
        );
        self
    }

    /// Build the final configuration.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingToken`] when no service token was supplied.
    /// - [`ConfigError::InvalidValue`] for malformed endpoint URLs.
    /// - Project file errors from [`load_project_file`].
    pub fn build(self) -> Result<Config, ConfigError> {
        let service_token = self.service_token.ok_or(ConfigError::MissingToken)?;

        let discovery_endpoint = validate_and_normalize_url(
            "discovery_endpoint",
            self.discovery_endpoint
                .as_deref()
                .unwrap_or(DEFAULT_DISCOVERY_ENDPOINT),
        )?;
        let cloud_base_url = validate_and_normalize_url(
            "cloud_base_url",
            self.cloud_base_url
                .as_deref()
                .unwrap_or(DEFAULT_CLOUD_BASE_URL),
        )?;

        let connection = ConnectionConfig {
            discovery_endpoint,
            cloud_base_url,
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
        };
        Self::validate_connection(&connection)?;

        let mut projects = if self.skip_project_file {
            ProjectMap::new()
        } else {
            let path = self
                .project_file
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PROJECT_FILE));
            load_project_file(&path)?
        };
        for (name, entry) in self.projects {
            if entry.prod_env_id <= 0 {
                return Err(ConfigError::InvalidProject {
                    name,
                    message: format!("prod_env_id must be positive (got {})", entry.prod_env_id),
                });
            }
            projects.insert(name, entry);
        }

        Ok(Config {
            connection,
            auth: AuthConfig {
                service_token,
                cloud_token: self.cloud_token,
            },
            account_id: self.account_id,
            projects,
        })
    }

    /// Validates timeout and retry bounds.
    fn validate_connection(connection: &ConnectionConfig) -> Result<(), ConfigError> {
        let timeout_secs = connection.timeout.as_secs();

        if timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout {
                message: "timeout must be greater than 0 seconds".to_string(),
            });
        }

        if timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::InvalidTimeout {
                message: format!(
                    "timeout exceeds maximum allowed value of {} seconds",
                    MAX_TIMEOUT_SECS
                ),
            });
        }

        if connection.max_retries > MAX_MAX_RETRIES {
            return Err(ConfigError::InvalidMaxRetries {
                message: format!(
                    "must be between 0 and {} (got {})",
                    MAX_MAX_RETRIES, connection.max_retries
                ),
            });
        }

        Ok(())
    }

    // Internal accessor methods for use by other loader modules

    pub(crate) fn has_service_token(&self) -> bool {
        self.service_token.is_some()
    }

    pub(crate) fn has_cloud_token(&self) -> bool {
        self.cloud_token.is_some()
    }

    pub(crate) fn account_id(&self) -> Option<u64> {
        self.account_id
    }

    pub(crate) fn discovery_endpoint(&self) -> Option<&String> {
        self.discovery_endpoint.as_ref()
    }

    pub(crate) fn cloud_base_url(&self) -> Option<&String> {
        self.cloud_base_url.as_ref()
    }

    pub(crate) fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub(crate) fn max_retries(&self) -> Option<usize> {
        self.max_retries
    }

    pub(crate) fn project_file(&self) -> Option<&PathBuf> {
        self.project_file.as_ref()
    }

    pub(crate) fn set_service_token(&mut self, token: Option<SecretString>) {
        self.service_token = token;
    }

    pub(crate) fn set_cloud_token(&mut self, token: Option<SecretString>) {
        self.cloud_token = token;
    }

    pub(crate) fn set_account_id(&mut self, account_id: Option<u64>) {
        self.account_id = account_id;
    }

    pub(crate) fn set_discovery_endpoint(&mut self, url: Option<String>) {
        self.discovery_endpoint = url;
    }

    pub(crate) fn set_cloud_base_url(&mut self, url: Option<String>) {
        self.cloud_base_url = url;
    }

    pub(crate) fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    pub(crate) fn set_max_retries(&mut self, retries: Option<usize>) {
        self.max_retries = retries;
    }

    pub(crate) fn set_project_file(&mut self, path: Option<PathBuf>) {
        self.project_file = path;
    }
}

/// Validate an endpoint URL and strip trailing slashes.
fn validate_and_normalize_url(var: &str, raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();

    let parsed = url::Url::parse(trimmed).map_err(|e| ConfigError::InvalidValue {
        var: var.into(),
        message: format!("must be an absolute http(s) URL with a host: {e}"),
    })?;

    let scheme = parsed.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(ConfigError::InvalidValue {
            var: var.into(),
            message: format!("scheme must be http or https, got: {scheme}"),
        });
    }

    if parsed.host_str().is_none() {
        return Err(ConfigError::InvalidValue {
            var: var.into(),
            message: "host is required".into(),
        });
    }

    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

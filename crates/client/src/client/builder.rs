//! Client builder for constructing [`DiscoveryClient`] instances.
//!
//! This module is responsible for:
//! - Providing a fluent builder API for client configuration
//! - Validating required configuration (service token, endpoint)
//! - Normalizing the endpoint URL (removing trailing slashes)
//! - Configuring the underlying HTTP client (timeouts, redirects)
//!
//! # What this module does NOT handle:
//! - Actual API calls (handled by [`DiscoveryClient`] methods)
//! - Reading tokens from the environment (handled by `dbt_discovery_config::ConfigLoader`)
//!
//! # Invariants
//! - A missing service token is a configuration error at `build()` time
//! - The endpoint is always normalized to have no trailing slashes

use std::time::Duration;

use dbt_discovery_config::{
    Config,
    constants::{
        DEFAULT_DISCOVERY_ENDPOINT, DEFAULT_MAX_REDIRECTS, DEFAULT_MAX_RETRIES,
        DEFAULT_TIMEOUT_SECS,
    },
};
use reqwest::Url;
use secrecy::SecretString;

use crate::client::{DiscoveryClient, QueryLog};
use crate::error::{ClientError, Result};
use crate::metrics::MetricsCollector;

/// Builder for creating a new [`DiscoveryClient`].
///
/// All options have defaults except the service token, which is required.
pub struct DiscoveryClientBuilder {
    endpoint: String,
    token: Option<SecretString>,
    timeout: Duration,
    max_retries: usize,
    metrics: Option<MetricsCollector>,
    record_queries: bool,
}

impl Default for DiscoveryClientBuilder {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_DISCOVERY_ENDPOINT.to_string(),
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            metrics: None,
            record_queries: false,
        }
    }
}

impl DiscoveryClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the GraphQL endpoint. Trailing slashes are removed.
    pub fn endpoint(mut self, url: String) -> Self {
        self.endpoint = url;
        self
    }

    /// Set the Discovery API service token.
    pub fn service_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    /// Set the request timeout.
    ///
    /// Default is 30 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum number of retries for rate-limited requests.
    ///
    /// Default is 3 retries with exponential backoff (1s, 2s, 4s delays).
    pub fn max_retries(mut self, retries: usize) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the metrics collector for API call performance tracking.
    pub fn metrics(mut self, metrics: MetricsCollector) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Keep every sent query in the client's [`QueryLog`].
    ///
    /// Off by default; can also be switched later with [`QueryLog::set_enabled`].
    pub fn record_queries(mut self, on: bool) -> Self {
        self.record_queries = on;
        self
    }

    /// Create a client builder from loaded configuration.
    pub fn from_config(mut self, config: &Config) -> Self {
        self.endpoint = config.connection.discovery_endpoint.clone();
        self.token = Some(config.auth.service_token.clone());
        self.timeout = config.connection.timeout;
        self.max_retries = config.connection.max_retries;
        self
    }

    /// Normalize a URL by removing trailing slashes.
    pub(crate) fn normalize_url(url: &str) -> String {
        url.trim().trim_end_matches('/').to_string()
    }

    /// Check that `url` parses as an absolute http(s) URL.
    pub(crate) fn validate_url(url: &str) -> Result<()> {
        let parsed =
            Url::parse(url).map_err(|e| ClientError::InvalidUrl(format!("{url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl(format!(
                "{url}: scheme must be http or https"
            )));
        }
        Ok(())
    }

    pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(DEFAULT_MAX_REDIRECTS))
            .build()?)
    }

    /// Build the [`DiscoveryClient`] with the configured options.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] if no service token was provided.
    /// Returns [`ClientError::InvalidUrl`] if the endpoint is not a valid URL.
    /// Returns `ClientError::HttpError` if the HTTP client fails to build.
    pub fn build(self) -> Result<DiscoveryClient> {
        let token = self.token.ok_or_else(|| {
            ClientError::Configuration(
                "a Discovery API service token is required (set DBT_SERVICE_TOKEN)".to_string(),
            )
        })?;

        let endpoint = Self::normalize_url(&self.endpoint);
        Self::validate_url(&endpoint)?;

        Ok(DiscoveryClient {
            http: Self::http_client(self.timeout)?,
            endpoint,
            token,
            max_retries: self.max_retries,
            metrics: self.metrics,
            query_log: QueryLog::new(self.record_queries),
        })
    }
}

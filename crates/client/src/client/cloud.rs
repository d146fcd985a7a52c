//! dbt Cloud REST (v2) client.
//!
//! Responsibilities:
//! - Hold the HTTP client, base URL and REST token.
//! - Expose typed jobs, runs and account lookups.
//!
//! Does NOT handle:
//! - Choosing an account (callers pass `account_id`; `DiscoveryApi` reads it
//!   from configuration).

use std::time::Duration;

use dbt_discovery_config::Config;
use dbt_discovery_config::constants::{
    DEFAULT_CLOUD_BASE_URL, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS, MAX_RUN_LIST_LIMIT,
};
use secrecy::SecretString;

use crate::client::builder::DiscoveryClientBuilder;
use crate::endpoints::cloud::{self, RestContext};
use crate::error::{ClientError, Result};
use crate::metrics::MetricsCollector;
use crate::models::{DbtAccountInfo, DbtJob, DbtRun};

/// Client for the dbt Cloud administrative REST API.
#[derive(Debug)]
pub struct CloudClient {
    http: reqwest::Client,
    base_url: String,
    token: SecretString,
    max_retries: usize,
    metrics: Option<MetricsCollector>,
}

impl CloudClient {
    pub fn builder() -> CloudClientBuilder {
        CloudClientBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn ctx(&self) -> RestContext<'_> {
        RestContext {
            client: &self.http,
            base_url: &self.base_url,
            token: &self.token,
            max_retries: self.max_retries,
            metrics: self.metrics.as_ref(),
        }
    }

    /// Every job of the account.
    pub async fn list_jobs(&self, account_id: u64) -> Result<Vec<DbtJob>> {
        cloud::list_jobs(self.ctx(), account_id).await
    }

    pub async fn get_job(&self, account_id: u64, job_id: i64) -> Result<DbtJob> {
        cloud::get_job(self.ctx(), account_id, job_id).await
    }

    pub async fn get_account(&self, account_id: u64) -> Result<DbtAccountInfo> {
        cloud::get_account(self.ctx(), account_id).await
    }

    /// Most recent runs of a job, newest first.
    ///
    /// `limit` is clamped to `1..=MAX_RUN_LIST_LIMIT`.
    pub async fn list_runs(&self, account_id: u64, job_id: i64, limit: usize) -> Result<Vec<DbtRun>> {
        let limit = limit.clamp(1, MAX_RUN_LIST_LIMIT);
        cloud::list_runs(self.ctx(), account_id, job_id, limit).await
    }
}

/// Builder for [`CloudClient`].
pub struct CloudClientBuilder {
    base_url: String,
    token: Option<SecretString>,
    timeout: Duration,
    max_retries: usize,
    metrics: Option<MetricsCollector>,
}

impl Default for CloudClientBuilder {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CLOUD_BASE_URL.to_string(),
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            metrics: None,
        }
    }
}

impl CloudClientBuilder {
    /// Set the REST base URL (e.g. `https://cloud.getdbt.com/api/v2`).
    pub fn base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    pub fn token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_retries(mut self, retries: usize) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn metrics(mut self, metrics: MetricsCollector) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Base URL, REST token (falling back to the service token), timeout and
    /// retries from loaded configuration.
    pub fn from_config(mut self, config: &Config) -> Self {
        self.base_url = config.connection.cloud_base_url.clone();
        self.token = Some(config.auth.rest_token().clone());
        self.timeout = config.connection.timeout;
        self.max_retries = config.connection.max_retries;
        self
    }

    pub fn build(self) -> Result<CloudClient> {
        let token = self.token.ok_or_else(|| {
            ClientError::Configuration(
                "a dbt Cloud API token is required (set DBT_CLOUD_TOKEN or DBT_SERVICE_TOKEN)"
                    .to_string(),
            )
        })?;

        let base_url = DiscoveryClientBuilder::normalize_url(&self.base_url);
        DiscoveryClientBuilder::validate_url(&base_url)?;

        Ok(CloudClient {
            http: DiscoveryClientBuilder::http_client(self.timeout)?,
            base_url,
            token,
            max_retries: self.max_retries,
            metrics: self.metrics,
        })
    }
}

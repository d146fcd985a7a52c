//! Discovery API client and its service methods.
//!
//! This module provides [`DiscoveryClient`], a typed client over the dbt Cloud
//! Discovery GraphQL API, and [`CloudClient`] for the administrative REST API.
//!
//! # Submodules
//! - [`builder`]: Client construction and configuration
//! - `environment`: Environment metadata and state summaries
//! - `models`: Applied/definition model listings and historical runs
//! - `batch`: Aliased multi-model historical runtime lookups
//! - `jobs`: Job-scoped model and test queries
//! - [`cloud`]: REST jobs, runs and account
//! - [`query_log`]: Opt-in record of the queries sent
//!
//! # What this module does NOT handle:
//! - Direct HTTP request implementation (delegated to [`crate::endpoints`])
//! - Query text construction (delegated to [`crate::query`])
//! - Caching (the `api` facades own their caches)
//!
//! # Invariants
//! - Every service method issues exactly one round trip, except the paginated
//!   listings which issue one per page
//! - Responses are normalized before any typed decoding

pub mod batch;
pub mod builder;
pub mod cloud;
mod environment;
mod jobs;
mod models;
pub mod query_log;

use secrecy::SecretString;
use serde_json::Value;
use tracing::debug;

use crate::endpoints;
use crate::error::Result;
use crate::metrics::MetricsCollector;
use crate::normalize::take_path;
use crate::query::BuiltQuery;

pub use batch::{BatchRuntimeAggregator, HistoricalRunsByModel};
pub use cloud::{CloudClient, CloudClientBuilder};
pub use query_log::QueryLog;

/// dbt Cloud Discovery API client.
///
/// # Creating a Client
///
/// ```rust,ignore
/// use dbt_discovery_client::DiscoveryClient;
/// use secrecy::SecretString;
///
/// let client = DiscoveryClient::builder()
///     .service_token(SecretString::new("dbtc_...".to_string().into()))
///     .build()?;
/// let env = EnvironmentId::new(218762)?;
/// let meta = client.environment_metadata(env).await?;
/// ```
#[derive(Debug)]
pub struct DiscoveryClient {
    pub(crate) http: reqwest::Client,
    pub(crate) endpoint: String,
    pub(crate) token: SecretString,
    pub(crate) max_retries: usize,
    pub(crate) metrics: Option<MetricsCollector>,
    pub(crate) query_log: QueryLog,
}

impl DiscoveryClient {
    /// Create a new client builder.
    pub fn builder() -> builder::DiscoveryClientBuilder {
        builder::DiscoveryClientBuilder::new()
    }

    /// Get the GraphQL endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub(crate) fn metrics(&self) -> Option<&MetricsCollector> {
        self.metrics.as_ref()
    }

    /// Queries this client sent while recording was on.
    pub fn query_log(&self) -> &QueryLog {
        &self.query_log
    }

    /// Execute a built query and return the normalized node at its result path.
    ///
    /// The query is recorded in [`DiscoveryClient::query_log`] before it is
    /// sent, so a query that failed can be read back too.
    pub async fn execute(&self, query: &BuiltQuery) -> Result<Value> {
        self.query_log.record(query);
        let data = endpoints::execute_query(
            &self.http,
            &self.endpoint,
            &self.token,
            query,
            self.max_retries,
            self.metrics.as_ref(),
        )
        .await?;
        debug!(
            operation = query.operation_name,
            path = %query.dotted_path(),
            "Reading query result"
        );
        take_path(data, &query.path())
    }
}

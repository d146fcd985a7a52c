//! dbt Cloud Discovery API client.
//!
//! This crate provides a typed client over the dbt Cloud Discovery (GraphQL)
//! API and the dbt Cloud administrative REST API. It builds minimal,
//! parameterized queries, follows cursor pagination, batches historical-run
//! lookups, and turns nested wire responses into flat domain entities.
//!
//! Layers, leaf first:
//! - [`query`]: query documents and field-group selection
//! - [`normalize`]: camelCase to snake_case keys and connection flattening
//! - [`models`]: validated domain entities
//! - [`endpoints`] and [`client`]: transport and typed service methods
//! - [`api`]: caching facades (projects, models, jobs, runs)

pub mod api;
pub mod client;
pub mod endpoints;
pub mod error;
pub mod metrics;
pub mod models;
pub mod normalize;
pub mod query;
mod serde_helpers;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use api::{
    DiscoveryApi, FanOut, FetchFailure, Job, Model, ModelFilter, ModelWithRuntime, Project,
    ProjectFilter, Run, RuntimeMetrics, SearchFilter,
};
pub use client::builder::DiscoveryClientBuilder;
pub use client::{
    BatchRuntimeAggregator, CloudClient, CloudClientBuilder, DiscoveryClient,
    HistoricalRunsByModel, QueryLog,
};
pub use error::{ClientError, Result};
pub use metrics::{ErrorCategory, MetricsCollector};
pub use models::{
    AppliedModel, ExecutionInfo, ModelDefinition, ModelHistoricalRun, ModelMetadata,
    ProjectMetadata, RunOutcome, RunStatus,
};
pub use query::{BuiltQuery, EnvironmentId, FieldSelection, JobId, RunId};

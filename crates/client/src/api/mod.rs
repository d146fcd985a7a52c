//! Caller-facing facades over both dbt Cloud APIs.
//!
//! Responsibilities:
//! - [`DiscoveryApi`]: the entry point; named projects from the project map,
//!   environment validation, and fan-out queries across projects.
//! - [`Project`], [`Model`], [`Job`], [`Run`]: per-resource facades with
//!   lazily filled caches and derived queries (rankings, averages, filters).
//!
//! Does NOT handle:
//! - Query construction or HTTP (delegated to [`crate::client`]).
//!
//! Invariants:
//! - Fan-out operations never fail as a whole: a failing sub-fetch is logged,
//!   left out of `items` and reported in `failures`.
//! - Single-resource lookups propagate their error.
//! - Caches belong to one facade instance and are never shared between
//!   instances.

pub mod filters;
mod job;
mod model;
mod project;
mod run;

use std::future::Future;
use std::sync::Arc;

use dbt_discovery_config::constants::DEFAULT_FANOUT_CONCURRENCY;
use dbt_discovery_config::{Config, ProjectMap};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, warn};

use crate::client::{CloudClient, DiscoveryClient, QueryLog};
use crate::error::{ClientError, Result};
use crate::metrics::MetricsCollector;
use crate::query::EnvironmentId;

pub use filters::{FilterMode, Filterable, ModelFilter, ProjectFilter, SearchFilter};
pub use job::{Job, RankedJob, RuntimeReport};
pub use model::{Model, ModelWithRuntime, RankedModel, RuntimeMetrics};
pub use project::Project;
pub use run::Run;

/// Clients shared by every facade created from one [`DiscoveryApi`].
#[derive(Debug)]
pub(crate) struct Clients {
    pub(crate) discovery: DiscoveryClient,
    pub(crate) cloud: CloudClient,
    pub(crate) account_id: Option<u64>,
}

impl Clients {
    /// Account id for REST calls.
    pub(crate) fn account_id(&self) -> Result<u64> {
        self.account_id.ok_or_else(|| {
            ClientError::Configuration(
                "a dbt Cloud account id is required for job and run data (set DBT_CLOUD_ACCOUNT_ID)"
                    .to_string(),
            )
        })
    }
}

/// A sub-fetch left out of a fan-out result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchFailure {
    /// What was being fetched, e.g. a project name or `job 42`.
    pub resource: String,
    pub error: String,
}

/// Partial result of an operation spanning several independent fetches.
#[derive(Debug, Clone)]
pub struct FanOut<T> {
    pub items: Vec<T>,
    pub failures: Vec<FetchFailure>,
}

impl<T> Default for FanOut<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> From<Vec<T>> for FanOut<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            items,
            failures: Vec::new(),
        }
    }
}

impl<T> FanOut<T> {
    /// True when no sub-fetch failed.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }

    pub(crate) fn record_failure(&mut self, resource: impl Into<String>, err: &ClientError) {
        let resource = resource.into();
        warn!(resource = %resource, error = %err, "Excluding failed sub-fetch");
        self.failures.push(FetchFailure {
            resource,
            error: err.to_string(),
        });
    }

    fn merge(&mut self, other: FanOut<T>) {
        self.items.extend(other.items);
        self.failures.extend(other.failures);
    }

    /// Keep this result's failures and start a new item list.
    fn carry_failures<U>(&mut self) -> FanOut<U> {
        FanOut {
            items: Vec::new(),
            failures: std::mem::take(&mut self.failures),
        }
    }
}

/// Run named sub-fetches with bounded concurrency, keeping input order.
async fn fan_out<T, Fut>(tasks: Vec<(String, Fut)>, concurrency: usize) -> FanOut<T>
where
    Fut: Future<Output = Result<FanOut<T>>>,
{
    let results: Vec<(String, Result<FanOut<T>>)> = stream::iter(tasks)
        .map(|(resource, task)| async move { (resource, task.await) })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut out = FanOut::default();
    for (resource, result) in results {
        match result {
            Ok(partial) => out.merge(partial),
            Err(err) => out.record_failure(resource, &err),
        }
    }
    out
}

/// Whether the remote refused to serve the environment, as opposed to a
/// transport failure.
fn rejects_environment(err: &ClientError) -> bool {
    match err {
        ClientError::GraphQl { .. }
        | ClientError::NotFound { .. }
        | ClientError::UnexpectedShape { .. }
        | ClientError::Validation { .. } => true,
        ClientError::ApiError { status, .. } => {
            (400..500).contains(status) && !ClientError::is_retryable_status(*status)
        }
        _ => false,
    }
}

/// Entry point to projects, models, jobs and runs of one dbt Cloud account.
///
/// ```rust,ignore
/// let config = ConfigLoader::new().load_dotenv()?.from_env()?.build()?;
/// let api = DiscoveryApi::new(&config)?;
/// let mut project = api.project(218762).await?;
/// let slowest = project.slowest_models(5, 1, None).await?;
/// ```
#[derive(Debug)]
pub struct DiscoveryApi {
    clients: Arc<Clients>,
    projects: ProjectMap,
    concurrency: usize,
}

impl DiscoveryApi {
    /// Build both API clients and the project map from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        Self::build(config, None)
    }

    /// Like [`DiscoveryApi::new`], recording request metrics.
    pub fn with_metrics(config: &Config, metrics: MetricsCollector) -> Result<Self> {
        Self::build(config, Some(metrics))
    }

    fn build(config: &Config, metrics: Option<MetricsCollector>) -> Result<Self> {
        let mut discovery = DiscoveryClient::builder().from_config(config);
        let mut cloud = CloudClient::builder().from_config(config);
        if let Some(metrics) = metrics {
            discovery = discovery.metrics(metrics.clone());
            cloud = cloud.metrics(metrics);
        }
        Ok(Self::from_parts(
            discovery.build()?,
            cloud.build()?,
            config.account_id,
            config.projects.clone(),
        ))
    }

    pub fn from_parts(
        discovery: DiscoveryClient,
        cloud: CloudClient,
        account_id: Option<u64>,
        projects: ProjectMap,
    ) -> Self {
        Self {
            clients: Arc::new(Clients {
                discovery,
                cloud,
                account_id,
            }),
            projects,
            concurrency: DEFAULT_FANOUT_CONCURRENCY,
        }
    }

    /// Maximum number of sub-fetches in flight during a fan-out.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn discovery(&self) -> &DiscoveryClient {
        &self.clients.discovery
    }

    /// Discovery queries sent by this API and every facade created from it.
    ///
    /// ```rust,ignore
    /// api.query_log().set_enabled(true);
    /// let project = api.project(218762).await?;
    /// let sent = api.query_log().last().map(|q| q.document);
    /// ```
    pub fn query_log(&self) -> &QueryLog {
        self.clients.discovery.query_log()
    }

    pub fn cloud(&self) -> &CloudClient {
        &self.clients.cloud
    }

    /// Configured project names, in map order.
    pub fn project_names(&self) -> impl Iterator<Item = &str> {
        self.projects.keys().map(String::as_str)
    }

    pub fn project_map(&self) -> &ProjectMap {
        &self.projects
    }

    /// A project by environment id, validated with one metadata query.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidArgument`] for a non-positive id, and
    /// [`ClientError::UnknownEnvironment`] when the API rejects the
    /// environment. Transport failures propagate unchanged.
    pub async fn project(&self, environment_id: i64) -> Result<Project> {
        self.validated_project(None, environment_id).await
    }

    /// A project from the project map by its configured name.
    pub async fn named_project(&self, name: &str) -> Result<Project> {
        let entry = self.projects.get(name).ok_or_else(|| ClientError::NotFound {
            kind: "Project",
            name: name.to_string(),
        })?;
        self.validated_project(Some(name.to_string()), entry.prod_env_id)
            .await
    }

    async fn validated_project(&self, name: Option<String>, environment_id: i64) -> Result<Project> {
        let env = EnvironmentId::new(environment_id)?;
        let metadata = match self.clients.discovery.environment_metadata(env).await {
            Ok(metadata) => metadata,
            Err(err) if rejects_environment(&err) => {
                return Err(ClientError::UnknownEnvironment {
                    environment_id,
                    reason: err.to_string(),
                });
            }
            Err(err) => return Err(err),
        };
        debug!(environment_id, project = %metadata.name, "Validated environment");
        let name = name.unwrap_or_else(|| metadata.name.clone());
        Ok(Project::new(
            Arc::clone(&self.clients),
            name,
            env,
            Some(metadata),
        ))
    }

    /// Every configured project accepted by `filter`, validated.
    pub async fn get_projects(&self, filter: Option<&ProjectFilter>) -> FanOut<Project> {
        let tasks = self
            .projects
            .iter()
            .filter(|(name, entry)| filter.is_none_or(|f| f.matches(name, entry.prod_env_id)))
            .map(|(name, entry)| {
                let task = async move {
                    self.validated_project(Some(name.clone()), entry.prod_env_id)
                        .await
                        .map(|project| FanOut::from(vec![project]))
                };
                (name.clone(), task)
            })
            .collect();
        fan_out(tasks, self.concurrency).await
    }

    /// Applied models of every selected project.
    pub async fn get_models(
        &self,
        projects: Option<&ProjectFilter>,
        filter: Option<&SearchFilter>,
    ) -> FanOut<Model> {
        let mut found = self.get_projects(projects).await;
        let mut out = found.carry_failures();
        let tasks = found
            .items
            .into_iter()
            .map(|mut project| {
                let resource = project.name().to_string();
                let task = async move { project.get_models(filter, false).await.map(FanOut::from) };
                (resource, task)
            })
            .collect();
        out.merge(fan_out(tasks, self.concurrency).await);
        out
    }

    /// REST jobs of every selected project.
    pub async fn get_jobs(&self, projects: Option<&ProjectFilter>) -> FanOut<Job> {
        let mut found = self.get_projects(projects).await;
        let mut out = found.carry_failures();
        let tasks = found
            .items
            .into_iter()
            .map(|mut project| {
                let resource = project.name().to_string();
                let task = async move { project.get_jobs(false).await.map(FanOut::from) };
                (resource, task)
            })
            .collect();
        out.merge(fan_out(tasks, self.concurrency).await);
        out
    }

    /// The `limit` most recent runs across the jobs of every selected
    /// project, newest first.
    pub async fn get_runs(&self, projects: Option<&ProjectFilter>, limit: usize) -> FanOut<Run> {
        let mut jobs = self.get_jobs(projects).await;
        let mut out = jobs.carry_failures();
        let tasks = jobs
            .items
            .into_iter()
            .map(|job| {
                let resource = format!("job {}", job.job_id());
                let task = async move { job.get_runs(limit).await.map(FanOut::from) };
                (resource, task)
            })
            .collect();
        out.merge(fan_out(tasks, self.concurrency).await);
        out.items
            .sort_by(|a, b| b.start_time().cmp(&a.start_time()));
        out.items.truncate(limit);
        out
    }

    /// The `n` slowest models across every selected project.
    pub async fn slowest_models(
        &self,
        n: usize,
        last_n_runs: usize,
        projects: Option<&ProjectFilter>,
        filter: Option<&SearchFilter>,
    ) -> FanOut<RankedModel> {
        let mut found = self.get_projects(projects).await;
        let mut out = found.carry_failures();
        let tasks = found
            .items
            .into_iter()
            .map(|mut project| {
                let resource = project.name().to_string();
                let task = async move {
                    project
                        .slowest_models(n, last_n_runs, filter)
                        .await
                        .map(FanOut::from)
                };
                (resource, task)
            })
            .collect();
        out.merge(fan_out(tasks, self.concurrency).await);
        out.items
            .sort_by(|a, b| b.runtime.total_cmp(&a.runtime));
        out.items.truncate(n);
        out
    }

    /// The `n` longest-running jobs across every selected project.
    ///
    /// With `model_filter`, only jobs whose latest run executed a matching
    /// model are ranked.
    pub async fn longest_running_jobs(
        &self,
        n: usize,
        last_n_runs: usize,
        projects: Option<&ProjectFilter>,
        model_filter: Option<&SearchFilter>,
    ) -> FanOut<RankedJob> {
        let mut found = self.get_projects(projects).await;
        let mut out = found.carry_failures();
        let concurrency = self.concurrency;
        let tasks = found
            .items
            .into_iter()
            .map(|mut project| {
                let resource = project.name().to_string();
                let task = async move {
                    project
                        .longest_running_jobs(n, last_n_runs, model_filter, concurrency)
                        .await
                };
                (resource, task)
            })
            .collect();
        out.merge(fan_out(tasks, self.concurrency).await);
        out.items
            .sort_by(|a, b| b.runtime.total_cmp(&a.runtime));
        out.items.truncate(n);
        out
    }
}

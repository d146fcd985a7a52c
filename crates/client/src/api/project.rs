//! Project facade: one dbt Cloud environment.
//!
//! Responsibilities:
//! - Cache the applied models and the REST jobs of the environment.
//! - Derive runtime rankings from already-fetched execution info.
//! - Batch historical-run lookups through `BatchRuntimeAggregator`.
//!
//! Invariants:
//! - The models cache is filled on first use and only ever replaced whole.
//! - `environment_id` never changes after construction.

use std::sync::Arc;

use dbt_discovery_config::constants::{DEFAULT_HISTORICAL_RUN_COUNT, MAX_BATCH_ALIASES};
use futures::stream::{self, StreamExt};
use tracing::debug;

use super::filters::{ModelFilter, SearchFilter, filter_by};
use super::job::{Job, RankedJob};
use super::model::{Model, ModelWithRuntime, RankedModel, compare_runtime, mean, sort_by_runtime};
use super::{Clients, FanOut};
use crate::client::{BatchRuntimeAggregator, HistoricalRunsByModel, QueryLog};
use crate::error::{ClientError, Result};
use crate::models::{
    AppliedModel, AppliedStateSummary, DefinitionStateSummary, ProjectMetadata, RunStatus,
};
use crate::query::{AppliedModelFilter, EnvironmentId, FieldSelection};

/// Listings follow cursors until the connection is exhausted.
const ALL_MODELS: usize = usize::MAX;

/// A dbt project deployed to one environment.
///
/// Methods that fill a cache take `&mut self`; a `Project` is not meant to be
/// shared between tasks without external synchronization.
#[derive(Debug, Clone)]
pub struct Project {
    clients: Arc<Clients>,
    name: String,
    environment_id: EnvironmentId,
    metadata: Option<ProjectMetadata>,
    models: Option<Vec<Model>>,
    jobs: Option<Vec<Job>>,
    model_count: Option<i64>,
}

impl Project {
    pub(crate) fn new(
        clients: Arc<Clients>,
        name: String,
        environment_id: EnvironmentId,
        metadata: Option<ProjectMetadata>,
    ) -> Self {
        Self {
            clients,
            name,
            environment_id,
            metadata,
            models: None,
            jobs: None,
            model_count: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn environment_id(&self) -> EnvironmentId {
        self.environment_id
    }

    /// The Discovery query log shared with the [`DiscoveryApi`](super::DiscoveryApi)
    /// this project came from.
    pub fn query_log(&self) -> &QueryLog {
        self.clients.discovery.query_log()
    }

    pub async fn get_metadata(&mut self) -> Result<ProjectMetadata> {
        if let Some(metadata) = &self.metadata {
            return Ok(metadata.clone());
        }
        let metadata = self
            .clients
            .discovery
            .environment_metadata(self.environment_id)
            .await?;
        self.metadata = Some(metadata.clone());
        Ok(metadata)
    }

    pub async fn applied_state(&self) -> Result<AppliedStateSummary> {
        self.clients
            .discovery
            .applied_state(self.environment_id)
            .await
    }

    pub async fn definition_state(&self) -> Result<DefinitionStateSummary> {
        self.clients
            .discovery
            .definition_state(self.environment_id)
            .await
    }

    /// Number of models in the definition state.
    pub async fn model_count(&mut self) -> Result<i64> {
        if let Some(count) = self.model_count {
            return Ok(count);
        }
        let count = self.definition_state().await?.model_count();
        self.model_count = Some(count);
        Ok(count)
    }

    async fn load_models(&mut self, refresh: bool) -> Result<&[Model]> {
        if refresh || self.models.is_none() {
            debug!(environment_id = %self.environment_id, refresh, "Fetching applied models");
            let nodes = self
                .clients
                .discovery
                .applied_models(
                    self.environment_id,
                    &AppliedModelFilter::default(),
                    &FieldSelection::everything(),
                    ALL_MODELS,
                )
                .await?;
            let models = nodes
                .into_iter()
                .map(|node| self.model(node))
                .collect();
            self.models = Some(models);
        } else {
            debug!(environment_id = %self.environment_id, "Using cached models");
        }
        Ok(self.models.as_deref().unwrap_or_default())
    }

    fn model(&self, node: AppliedModel) -> Model {
        Model::new(
            Arc::clone(&self.clients),
            self.name.clone(),
            self.environment_id,
            node,
        )
    }

    /// All applied models, fetched once and cached.
    pub async fn models(&mut self) -> Result<&[Model]> {
        self.load_models(false).await
    }

    /// Applied models matching `filter`, evaluated against the cached set.
    ///
    /// `refresh` replaces the cache with a fresh listing first.
    pub async fn get_models(
        &mut self,
        filter: Option<&SearchFilter>,
        refresh: bool,
    ) -> Result<Vec<Model>> {
        let models = self.load_models(refresh).await?.to_vec();
        Ok(filter_by(models, filter))
    }

    /// Applied models selected by identity.
    pub async fn find_models(&mut self, filter: &ModelFilter) -> Result<Vec<Model>> {
        let models = self.load_models(false).await?;
        Ok(models.iter().filter(|m| filter.matches(*m)).cloned().collect())
    }

    /// One model by name: the cache first, then a targeted query.
    pub async fn get_model(&mut self, name: &str) -> Result<Model> {
        if let Some(cached) = self
            .models
            .as_ref()
            .and_then(|models| models.iter().find(|m| m.name() == name))
        {
            return Ok(cached.clone());
        }
        let node = self
            .clients
            .discovery
            .applied_model_by_name(self.environment_id, name)
            .await?
            .ok_or_else(|| ClientError::NotFound {
                kind: "Model",
                name: format!("{}.{name}", self.name),
            })?;
        Ok(self.model(node))
    }

    /// Up to `limit` most recent runs of one model.
    pub async fn get_model_historical_runs(&self, name: &str, limit: usize) -> Result<Vec<RunStatus>> {
        let runs = self
            .clients
            .discovery
            .model_historical_runs(
                self.environment_id,
                name,
                limit,
                &FieldSelection::runtime(),
            )
            .await?;
        let mut out = Vec::with_capacity(runs.len());
        for run in &runs {
            if let Some(status) = run.run_status()? {
                out.push(status);
            }
        }
        Ok(out)
    }

    /// Models with runtime metrics taken from their execution info.
    ///
    /// No extra round trip beyond the (cached) model listing. Sorted by
    /// execution time with missing values treated as zero; `limit == 0` keeps
    /// every model.
    pub async fn get_models_with_runtime(
        &mut self,
        refresh: bool,
        descending: bool,
        limit: usize,
    ) -> Result<Vec<ModelWithRuntime>> {
        let models = self.load_models(refresh).await?;
        let mut out = models
            .iter()
            .map(|m| ModelWithRuntime::from_applied(m.node()))
            .collect::<Result<Vec<_>>>()?;
        sort_by_runtime(&mut out, descending);
        if limit > 0 {
            out.truncate(limit);
        }
        Ok(out)
    }

    /// Historical runs for up to ten models in one batched request.
    ///
    /// With `models`, the first `limit` names are used. Without, the
    /// slowest (or, with `fastest`, the fastest) models by current runtime are
    /// picked. `limit` is capped at ten.
    pub async fn get_historical_models_runtimes(
        &mut self,
        models: Option<&[String]>,
        fastest: bool,
        limit: usize,
    ) -> Result<HistoricalRunsByModel> {
        let limit = limit.min(MAX_BATCH_ALIASES);
        let names: Vec<String> = match models {
            Some(names) => names.iter().take(limit).cloned().collect(),
            None => self
                .get_models_with_runtime(false, !fastest, limit)
                .await?
                .into_iter()
                .map(|m| m.name)
                .collect(),
        };
        if names.is_empty() {
            return Ok(HistoricalRunsByModel::new());
        }
        BatchRuntimeAggregator::new(&self.clients.discovery, self.environment_id)
            .run_count(DEFAULT_HISTORICAL_RUN_COUNT)
            .fetch(&names)
            .await
    }

    /// The `n` slowest models with a runtime.
    ///
    /// With `last_n_runs > 1` each candidate is ranked by its mean runtime
    /// over that many runs, fetched in batches of ten.
    pub async fn slowest_models(
        &mut self,
        n: usize,
        last_n_runs: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<RankedModel>> {
        let candidates: Vec<Model> = self
            .get_models(filter, false)
            .await?
            .into_iter()
            .filter(|m| m.runtime().is_some())
            .collect();

        let mut ranked = Vec::with_capacity(candidates.len());
        if last_n_runs > 1 {
            for chunk in candidates.chunks(MAX_BATCH_ALIASES) {
                let names: Vec<String> = chunk.iter().map(|m| m.name().to_string()).collect();
                let runs = BatchRuntimeAggregator::new(&self.clients.discovery, self.environment_id)
                    .run_count(last_n_runs)
                    .fetch(&names)
                    .await?;
                for model in chunk {
                    let average = runs
                        .get(model.name())
                        .and_then(|runs| mean(runs.iter().filter_map(|r| r.execution_time)));
                    ranked.push(RankedModel {
                        runtime: average.or(model.runtime()).unwrap_or(0.0),
                        model: model.clone(),
                    });
                }
            }
        } else {
            ranked.extend(candidates.into_iter().map(|model| RankedModel {
                runtime: model.runtime().unwrap_or(0.0),
                model,
            }));
        }

        ranked.sort_by(|a, b| compare_runtime(Some(a.runtime), Some(b.runtime), true));
        ranked.truncate(n);
        Ok(ranked)
    }

    /// REST jobs deployed to this environment, cached.
    pub async fn get_jobs(&mut self, refresh: bool) -> Result<Vec<Job>> {
        if let Some(jobs) = &self.jobs
            && !refresh
        {
            return Ok(jobs.clone());
        }
        let account = self.clients.account_id()?;
        let env = self.environment_id.get();
        let jobs: Vec<Job> = self
            .clients
            .cloud
            .list_jobs(account)
            .await?
            .into_iter()
            .filter(|job| job.environment_id == env)
            .map(|job| Job::new(Arc::clone(&self.clients), job))
            .collect();
        self.jobs = Some(jobs.clone());
        Ok(jobs)
    }

    pub async fn job_count(&mut self) -> Result<usize> {
        Ok(self.get_jobs(false).await?.len())
    }

    /// The `n` jobs with the longest runtime.
    ///
    /// Fails only when the job list cannot be fetched; a job whose runs
    /// cannot be read is recorded as a failure and left out.
    pub async fn longest_running_jobs(
        &mut self,
        n: usize,
        last_n_runs: usize,
        model_filter: Option<&SearchFilter>,
        concurrency: usize,
    ) -> Result<FanOut<RankedJob>> {
        let jobs = self.get_jobs(false).await?;
        let results: Vec<(Job, Result<Option<f64>>)> = stream::iter(jobs)
            .map(|job| async move {
                let runtime = job.ranking_runtime(last_n_runs, model_filter).await;
                (job, runtime)
            })
            .buffered(concurrency.max(1))
            .collect()
            .await;

        let mut out = FanOut::default();
        for (job, runtime) in results {
            match runtime {
                Ok(Some(runtime)) => out.items.push(RankedJob { job, runtime }),
                Ok(None) => {}
                Err(err) => out.record_failure(format!("job {}", job.job_id()), &err),
            }
        }
        out.items
            .sort_by(|a, b| compare_runtime(Some(a.runtime), Some(b.runtime), true));
        out.items.truncate(n);
        Ok(out)
    }
}

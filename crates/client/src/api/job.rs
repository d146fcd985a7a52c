//! Job facade: a dbt Cloud job definition with its runs and models.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::warn;

use super::filters::{SearchFilter, filter_by};
use super::model::mean;
use super::run::{Run, slowest};
use super::{Clients, FanOut};
use crate::error::{ClientError, Result};
use crate::models::{DbtJob, JobModelRun};
use crate::query::{FieldSelection, JobId};

/// Runtime of one run, or of one model within a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuntimeReport {
    pub job_id: i64,
    pub run_id: i64,
    /// Set for per-model reports.
    pub model_id: Option<String>,
    /// Seconds; zero when the source reported none.
    pub runtime: f64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

/// A job definition.
///
/// The last run is fetched once per instance.
#[derive(Debug, Clone)]
pub struct Job {
    clients: Arc<Clients>,
    job: DbtJob,
    last_run: OnceCell<Option<Run>>,
}

/// A job paired with the runtime it was ranked by.
#[derive(Debug, Clone)]
pub struct RankedJob {
    pub job: Job,
    /// Last run runtime, or the mean over the requested number of runs.
    pub runtime: f64,
}

impl Job {
    pub(crate) fn new(clients: Arc<Clients>, job: DbtJob) -> Self {
        Self {
            clients,
            job,
            last_run: OnceCell::new(),
        }
    }

    pub fn job_id(&self) -> i64 {
        self.job.id
    }

    pub fn environment_id(&self) -> i64 {
        self.job.environment_id
    }

    pub fn name(&self) -> &str {
        &self.job.name
    }

    /// The REST definition.
    pub fn definition(&self) -> &DbtJob {
        &self.job
    }

    /// The `last_n` most recent runs, newest first.
    pub async fn get_runs(&self, last_n: usize) -> Result<Vec<Run>> {
        let account = self.clients.account_id()?;
        let runs = self
            .clients
            .cloud
            .list_runs(account, self.job.id, last_n)
            .await?;
        Ok(runs
            .into_iter()
            .map(|run| Run::new(Arc::clone(&self.clients), run))
            .collect())
    }

    pub async fn last_run(&self) -> Result<Option<&Run>> {
        let run = self
            .last_run
            .get_or_try_init(|| async {
                let runs = self.get_runs(1).await?;
                Ok::<_, ClientError>(runs.into_iter().next())
            })
            .await?;
        Ok(run.as_ref())
    }

    pub async fn last_run_runtime(&self) -> Result<Option<f64>> {
        Ok(self.last_run().await?.and_then(Run::runtime))
    }

    /// Models of the job's latest run, from the Discovery API.
    pub async fn get_models(&self, filter: Option<&SearchFilter>) -> Result<Vec<JobModelRun>> {
        let models = self
            .clients
            .discovery
            .job_models(
                JobId::new(self.job.id)?,
                None,
                &FieldSelection::everything(),
            )
            .await?;
        Ok(filter_by(models, filter))
    }

    pub async fn get_slowest_models(
        &self,
        n: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<JobModelRun>> {
        Ok(slowest(self.get_models(filter).await?, n))
    }

    /// One report per run, or per model of each run when `by_model` is set.
    ///
    /// Fails only when the runs cannot be listed; a run whose models cannot be
    /// fetched is recorded as a failure.
    pub async fn get_runtimes(&self, last_n: usize, by_model: bool) -> Result<FanOut<RuntimeReport>> {
        let runs = self.get_runs(last_n).await?;
        let mut out = FanOut::default();
        for run in &runs {
            if !by_model {
                out.items.push(RuntimeReport {
                    job_id: self.job.id,
                    run_id: run.run_id(),
                    model_id: None,
                    runtime: run.runtime().unwrap_or(0.0),
                    start_time: run.start_time(),
                    end_time: run.end_time(),
                });
                continue;
            }
            match run.get_models(None).await {
                Ok(models) => out.items.extend(models.into_iter().map(|m| RuntimeReport {
                    job_id: self.job.id,
                    run_id: run.run_id(),
                    runtime: m.execution_time().unwrap_or(0.0),
                    start_time: m.timing.execute_started_at.or(run.start_time()),
                    end_time: m.timing.execute_completed_at.or(run.end_time()),
                    model_id: Some(m.unique_id),
                })),
                Err(err) => out.record_failure(format!("run {}", run.run_id()), &err),
            }
        }
        Ok(out)
    }

    /// Mean runtime over the last `last_n` runs.
    ///
    /// With `model_filter`, only runs that executed a matching model count
    /// (a run without a runtime counts as zero). `None` when no run qualifies.
    pub async fn get_average_job_runtime(
        &self,
        last_n: usize,
        model_filter: Option<&SearchFilter>,
    ) -> Result<Option<f64>> {
        let runs = self.get_runs(last_n).await?;
        let Some(model_filter) = model_filter else {
            return Ok(mean(runs.iter().filter_map(Run::runtime)));
        };

        let mut runtimes = Vec::with_capacity(runs.len());
        for run in &runs {
            match run.get_models(Some(model_filter)).await {
                Ok(models) if !models.is_empty() => runtimes.push(run.runtime().unwrap_or(0.0)),
                Ok(_) => {}
                Err(err) => warn!(
                    job_id = self.job.id,
                    run_id = run.run_id(),
                    error = %err,
                    "Skipping run whose models could not be fetched"
                ),
            }
        }
        Ok(mean(runtimes))
    }

    /// Runtime used for ranking: the last run's, or the mean over `last_n_runs`.
    ///
    /// `None` when the job has never run with a known runtime. With
    /// `model_filter`, jobs whose latest models match nothing also yield `None`.
    pub(crate) async fn ranking_runtime(
        &self,
        last_n_runs: usize,
        model_filter: Option<&SearchFilter>,
    ) -> Result<Option<f64>> {
        let Some(last) = self.last_run_runtime().await? else {
            return Ok(None);
        };
        if let Some(filter) = model_filter
            && self.get_models(Some(filter)).await?.is_empty()
        {
            return Ok(None);
        }
        if last_n_runs <= 1 {
            return Ok(Some(last));
        }
        Ok(Some(
            self.get_average_job_runtime(last_n_runs, None)
                .await?
                .unwrap_or(last),
        ))
    }
}

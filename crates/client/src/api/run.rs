//! Run facade: one execution of a dbt Cloud job.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;

use super::Clients;
use super::filters::{Filterable, ModelFilter, SearchFilter, filter_by};
use super::job::Job;
use super::model::{compare_runtime, mean};
use crate::error::Result;
use crate::models::{DbtRun, JobModelRun, RunOutcome};
use crate::query::{FieldSelection, JobId, RunId};

/// A job run as reported by the REST API.
///
/// The models it executed are fetched from the Discovery API on first use and
/// kept for the life of the instance.
#[derive(Debug, Clone)]
pub struct Run {
    clients: Arc<Clients>,
    run: DbtRun,
    models: OnceCell<Vec<JobModelRun>>,
}

impl Run {
    pub(crate) fn new(clients: Arc<Clients>, run: DbtRun) -> Self {
        Self {
            clients,
            run,
            models: OnceCell::new(),
        }
    }

    pub fn run_id(&self) -> i64 {
        self.run.id
    }

    pub fn job_id(&self) -> i64 {
        self.run.job_definition_id
    }

    pub fn status(&self) -> Result<RunOutcome> {
        self.run.outcome()
    }

    /// Seconds between start and finish.
    pub fn runtime(&self) -> Option<f64> {
        self.run.runtime()
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.run.started_at
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.run.finished_at
    }

    /// The REST record.
    pub fn record(&self) -> &DbtRun {
        &self.run
    }

    /// Look up the owning job by id.
    pub async fn job(&self) -> Result<Job> {
        let account = self.clients.account_id()?;
        let job = self.clients.cloud.get_job(account, self.job_id()).await?;
        Ok(Job::new(Arc::clone(&self.clients), job))
    }

    async fn models(&self) -> Result<&[JobModelRun]> {
        let models = self
            .models
            .get_or_try_init(|| async {
                let job = JobId::new(self.job_id())?;
                let run = RunId::new(self.run.id)?;
                self.clients
                    .discovery
                    .job_models(job, Some(run), &FieldSelection::everything())
                    .await
            })
            .await?;
        Ok(models)
    }

    /// Models executed by this run.
    pub async fn get_models(&self, filter: Option<&SearchFilter>) -> Result<Vec<JobModelRun>> {
        Ok(filter_by(self.models().await?.to_vec(), filter))
    }

    pub async fn model_count(&self) -> Result<usize> {
        Ok(self.models().await?.len())
    }

    /// The `n` slowest models that have a runtime.
    pub async fn get_slowest_models(
        &self,
        n: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<JobModelRun>> {
        Ok(slowest(self.get_models(filter).await?, n))
    }

    /// Mean runtime of the `slowest_n` slowest matching models; 0 when none match.
    pub async fn average_model_runtime(
        &self,
        slowest_n: usize,
        filter: Option<&SearchFilter>,
        model_filter: Option<&ModelFilter>,
    ) -> Result<f64> {
        let mut models = self.get_models(filter).await?;
        if let Some(model_filter) = model_filter {
            models.retain(|m| model_filter.matches(m));
        }
        let slowest = slowest(models, slowest_n);
        Ok(mean(slowest.iter().filter_map(Filterable::runtime)).unwrap_or(0.0))
    }
}

/// Keep items with a runtime, sort descending and truncate.
pub(crate) fn slowest<T: Filterable>(items: Vec<T>, n: usize) -> Vec<T> {
    let mut items: Vec<T> = items.into_iter().filter(|m| m.runtime().is_some()).collect();
    items.sort_by(|a, b| compare_runtime(a.runtime(), b.runtime(), true));
    items.truncate(n);
    items
}

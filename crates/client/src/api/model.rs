//! Model facade and runtime views.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value, json};
use tokio::sync::OnceCell;

use super::Clients;
use super::filters::Filterable;
use crate::error::{ClientError, Result};
use crate::models::{AppliedModel, ExecutionInfo, ModelMetadata, RunOutcome, RunStatus};
use crate::query::{EnvironmentId, FieldSelection};

/// One applied model of a project.
///
/// The last run is fetched at most once per instance; `refresh_last_run`
/// discards it.
#[derive(Debug, Clone)]
pub struct Model {
    clients: Arc<Clients>,
    project_name: String,
    environment_id: EnvironmentId,
    node: AppliedModel,
    last_run: OnceCell<Option<RunStatus>>,
}

impl Model {
    pub(crate) fn new(
        clients: Arc<Clients>,
        project_name: String,
        environment_id: EnvironmentId,
        node: AppliedModel,
    ) -> Self {
        Self {
            clients,
            project_name,
            environment_id,
            node,
            last_run: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.node.name
    }

    pub fn unique_id(&self) -> &str {
        &self.node.unique_id
    }

    /// `<project>.<model>`; names are only unique within a project.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.project_name, self.node.name)
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn environment_id(&self) -> EnvironmentId {
        self.environment_id
    }

    pub fn metadata(&self) -> ModelMetadata {
        self.node.metadata()
    }

    /// The applied-state node this model was built from.
    pub fn node(&self) -> &AppliedModel {
        &self.node
    }

    pub fn execution_info(&self) -> &ExecutionInfo {
        &self.node.execution_info
    }

    /// Seconds spent in the last execution.
    pub fn runtime(&self) -> Option<f64> {
        self.node.execution_time()
    }

    /// Most recent historical run, fetched on first access.
    pub async fn last_run(&self) -> Result<Option<&RunStatus>> {
        let run = self
            .last_run
            .get_or_try_init(|| async {
                let runs = self.get_historical_runs(1).await?;
                Ok::<_, ClientError>(runs.into_iter().next())
            })
            .await?;
        Ok(run.as_ref())
    }

    /// Drop the cached last run and fetch it again.
    pub async fn refresh_last_run(&mut self) -> Result<Option<&RunStatus>> {
        self.last_run.take();
        self.last_run().await
    }

    /// Up to `limit` most recent runs. Runs reported without a status are skipped.
    pub async fn get_historical_runs(&self, limit: usize) -> Result<Vec<RunStatus>> {
        let runs = self
            .clients
            .discovery
            .model_historical_runs(
                self.environment_id,
                &self.node.name,
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

    /// JSON record of the model; `last_run` is null until it was fetched.
    pub fn to_json(&self) -> Value {
        let last_run = self
            .last_run
            .get()
            .and_then(Option::as_ref)
            .map(|run| Value::Object(run.to_map()))
            .unwrap_or(Value::Null);
        json!({
            "name": self.node.name,
            "unique_id": self.node.unique_id,
            "qualified_name": self.qualified_name(),
            "database": self.node.database,
            "schema": self.node.db_schema,
            "description": self.node.description,
            "materialized": self.node.materialized_type,
            "tags": self.node.tags,
            "last_run": last_run,
        })
    }
}

impl Filterable for Model {
    fn name(&self) -> &str {
        &self.node.name
    }

    fn unique_id(&self) -> &str {
        &self.node.unique_id
    }

    fn tags(&self) -> &[String] {
        &self.node.tags
    }

    fn materialization(&self) -> Option<&str> {
        self.node.materialized_type.as_deref()
    }

    fn runtime(&self) -> Option<f64> {
        self.node.execution_time()
    }
}

/// Most recent run plus the raw execution info it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuntimeMetrics {
    pub most_recent_run: Option<RunStatus>,
    pub execution_info: ExecutionInfo,
}

impl RuntimeMetrics {
    pub fn from_execution_info(execution_info: ExecutionInfo) -> Result<Self> {
        Ok(Self {
            most_recent_run: execution_info.last_run()?,
            execution_info,
        })
    }
}

/// Model metadata with runtime metrics attached.
///
/// `execution_time`, `last_run_status` and `most_recent_run` are computed from
/// `runtime_metrics` on every call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelWithRuntime {
    pub name: String,
    pub unique_id: String,
    pub metadata: ModelMetadata,
    pub runtime_metrics: RuntimeMetrics,
}

impl ModelWithRuntime {
    pub fn from_applied(node: &AppliedModel) -> Result<Self> {
        Ok(Self {
            name: node.name.clone(),
            unique_id: node.unique_id.clone(),
            metadata: node.metadata(),
            runtime_metrics: RuntimeMetrics::from_execution_info(node.execution_info.clone())?,
        })
    }

    pub fn execution_time(&self) -> Option<f64> {
        self.runtime_metrics.execution_info.execution_time
    }

    pub fn last_run_status(&self) -> Option<RunOutcome> {
        self.runtime_metrics
            .most_recent_run
            .as_ref()
            .map(|run| run.status)
            .or(self.runtime_metrics.execution_info.last_run_status)
    }

    /// Mapping view of the most recent run.
    pub fn most_recent_run(&self) -> Option<Map<String, Value>> {
        self.runtime_metrics
            .most_recent_run
            .as_ref()
            .map(RunStatus::to_map)
    }
}

impl Filterable for ModelWithRuntime {
    fn name(&self) -> &str {
        &self.name
    }

    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn tags(&self) -> &[String] {
        &self.metadata.tags
    }

    fn materialization(&self) -> Option<&str> {
        self.metadata.materialized_type.as_deref()
    }

    fn runtime(&self) -> Option<f64> {
        self.execution_time()
    }
}

/// A model paired with the runtime it was ranked by.
#[derive(Debug, Clone)]
pub struct RankedModel {
    pub model: Model,
    /// Last runtime, or the mean over the requested number of runs.
    pub runtime: f64,
}

/// Stable sort by runtime; a missing runtime sorts as zero.
pub(crate) fn sort_by_runtime<T: Filterable>(items: &mut [T], descending: bool) {
    items.sort_by(|a, b| compare_runtime(a.runtime(), b.runtime(), descending));
}

pub(crate) fn compare_runtime(a: Option<f64>, b: Option<f64>, descending: bool) -> Ordering {
    let (a, b) = (a.unwrap_or(0.0), b.unwrap_or(0.0));
    if descending { b.total_cmp(&a) } else { a.total_cmp(&b) }
}

/// Mean of the runtimes that are present.
pub(crate) fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

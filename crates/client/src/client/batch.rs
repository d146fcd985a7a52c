//! Batched historical-run lookups.
//!
//! Responsibilities:
//! - Fetch historical runs for up to `MAX_BATCH_ALIASES` models in one request.
//! - Split the aliased response back into a per-model mapping.
//!
//! Invariants:
//! - Every model name in the issued batch is a key of the result, with an
//!   empty list when the response had nothing for it.
//! - Exactly one round trip per non-empty call; none for an empty input.

use std::collections::HashMap;

use dbt_discovery_config::constants::DEFAULT_HISTORICAL_RUN_COUNT;
use serde_json::Value;
use tracing::debug;

use crate::client::DiscoveryClient;
use crate::error::{ClientError, Result};
use crate::models::ModelHistoricalRun;
use crate::models::factory::build_list;
use crate::query::{self, BatchQuery, EnvironmentId, FieldSelection};

/// Model name to its historical runs.
pub type HistoricalRunsByModel = HashMap<String, Vec<ModelHistoricalRun>>;

/// Fetches historical runs for several models of one environment at once.
#[derive(Debug, Clone, Copy)]
pub struct BatchRuntimeAggregator<'a> {
    client: &'a DiscoveryClient,
    environment: EnvironmentId,
    run_count: usize,
    fields: FieldSelection,
}

impl<'a> BatchRuntimeAggregator<'a> {
    pub fn new(client: &'a DiscoveryClient, environment: EnvironmentId) -> Self {
        Self {
            client,
            environment,
            run_count: DEFAULT_HISTORICAL_RUN_COUNT,
            fields: FieldSelection::runtime(),
        }
    }

    /// Runs fetched per model.
    pub fn run_count(mut self, count: usize) -> Self {
        self.run_count = count;
        self
    }

    pub fn fields(mut self, fields: FieldSelection) -> Self {
        self.fields = fields;
        self
    }

    /// Fetch runs for `names` (deduplicated, first ten kept).
    pub async fn fetch(&self, names: &[String]) -> Result<HistoricalRunsByModel> {
        if names.is_empty() {
            return Ok(HashMap::new());
        }
        let batch =
            query::batch_historical_runs(self.environment, names, self.run_count, &self.fields)?;
        debug!(
            environment_id = %self.environment,
            models = batch.aliases.len(),
            "Fetching batched historical runs"
        );
        let applied = self.client.execute(&batch.query).await?;
        demultiplex(&batch, applied)
    }
}

/// Split an aliased `applied` node into a per-model mapping.
pub fn demultiplex(batch: &BatchQuery, applied: Value) -> Result<HistoricalRunsByModel> {
    let mut aliased = match applied {
        Value::Object(map) => map,
        Value::Null => Default::default(),
        _ => {
            return Err(ClientError::unexpected_shape(
                batch.query.dotted_path(),
                "object of aliased results",
            ));
        }
    };

    let mut out = HashMap::with_capacity(batch.aliases.len());
    for (alias, name) in &batch.aliases {
        let path = format!("{}.{alias}", batch.query.dotted_path());
        let runs = match aliased.remove(alias) {
            Some(value) => build_list(value, &path)?,
            None => Vec::new(),
        };
        out.insert(name.clone(), runs);
    }
    Ok(out)
}

impl DiscoveryClient {
    /// Historical runs for several models in one request.
    pub async fn batch_historical_runs(
        &self,
        env: EnvironmentId,
        names: &[String],
        count: usize,
    ) -> Result<HistoricalRunsByModel> {
        BatchRuntimeAggregator::new(self, env)
            .run_count(count)
            .fetch(names)
            .await
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::factory::{Entity, non_negative};
use super::run_status::{RunOutcome, RunStatus};
use crate::error::Result;
use crate::serde_helpers::{
    null_as_default, opt_f64_from_string_or_number, opt_i64_from_string_or_number, opt_timestamp,
};

/// Parent reference in a historical run's lineage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRef {
    pub unique_id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// One past execution of a model (`applied.modelHistoricalRuns`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelHistoricalRun {
    pub name: String,
    pub resource_type: String,
    #[serde(default)]
    pub unique_id: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub meta: Map<String, Value>,
    #[serde(default, deserialize_with = "opt_i64_from_string_or_number")]
    pub environment_id: Option<i64>,
    #[serde(default, deserialize_with = "opt_i64_from_string_or_number")]
    pub project_id: Option<i64>,
    #[serde(default, deserialize_with = "opt_i64_from_string_or_number")]
    pub account_id: Option<i64>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub materialized_type: Option<String>,
    #[serde(default, deserialize_with = "opt_i64_from_string_or_number")]
    pub run_id: Option<i64>,
    #[serde(default)]
    pub invocation_id: Option<String>,
    #[serde(default, deserialize_with = "opt_i64_from_string_or_number")]
    pub job_id: Option<i64>,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default, deserialize_with = "opt_timestamp")]
    pub run_generated_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "opt_timestamp")]
    pub compile_started_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "opt_timestamp")]
    pub compile_completed_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "opt_timestamp")]
    pub execute_started_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "opt_timestamp")]
    pub execute_completed_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "opt_f64_from_string_or_number")]
    pub execution_time: Option<f64>,
    #[serde(default, deserialize_with = "opt_f64_from_string_or_number")]
    pub run_elapsed_time: Option<f64>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default, rename = "schema")]
    pub db_schema: Option<String>,
    #[serde(default)]
    pub raw_sql: Option<String>,
    #[serde(default)]
    pub compiled_sql: Option<String>,
    #[serde(default)]
    pub raw_code: Option<String>,
    #[serde(default)]
    pub compiled_code: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub depends_on: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub parents_models: Vec<NodeRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub parents_sources: Vec<NodeRef>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub skip: Option<bool>,
}

impl ModelHistoricalRun {
    /// Canonical outcome; `skip` wins over the status string.
    pub fn outcome(&self) -> Result<Option<RunOutcome>> {
        if self.skip == Some(true) {
            return Ok(Some(RunOutcome::Skipped));
        }
        self.status.as_deref().map(str::parse::<RunOutcome>).transpose()
    }

    pub fn run_status(&self) -> Result<Option<RunStatus>> {
        let Some(outcome) = self.outcome()? else {
            return Ok(None);
        };
        RunStatus::new(
            outcome,
            self.run_id,
            self.execute_completed_at.or(self.run_generated_at),
            self.execution_time,
            self.error.clone(),
        )
        .map(Some)
    }
}

impl Entity for ModelHistoricalRun {
    const NAME: &'static str = "ModelHistoricalRun";

    fn check(&self) -> Result<()> {
        non_negative(Self::NAME, "execution_time", self.execution_time)?;
        non_negative(Self::NAME, "run_elapsed_time", self.run_elapsed_time)
    }
}

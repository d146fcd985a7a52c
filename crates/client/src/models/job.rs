//! Discovery records scoped to a job run (`job { models tests }`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::factory::{Entity, non_negative};
use super::run_status::{RunOutcome, RunStatus};
use crate::error::Result;
use crate::serde_helpers::{
    i64_from_string_or_number, null_as_default, opt_f64_from_string_or_number,
    opt_i64_from_string_or_number, opt_timestamp,
};

/// Job identity as resolved by the Discovery API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobNode {
    #[serde(deserialize_with = "i64_from_string_or_number")]
    pub id: i64,
    #[serde(default, deserialize_with = "opt_i64_from_string_or_number")]
    pub run_id: Option<i64>,
}

impl Entity for JobNode {
    const NAME: &'static str = "JobNode";
}

/// Timing fields shared by model and test executions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTiming {
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
}

impl ExecutionTiming {
    fn check(&self, entity: &str) -> Result<()> {
        non_negative(entity, "execution_time", self.execution_time)?;
        non_negative(entity, "run_elapsed_time", self.run_elapsed_time)
    }
}

/// Run identifiers shared by model and test executions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIdentity {
    #[serde(default, deserialize_with = "opt_i64_from_string_or_number")]
    pub run_id: Option<i64>,
    #[serde(default, deserialize_with = "opt_i64_from_string_or_number")]
    pub job_id: Option<i64>,
    #[serde(default)]
    pub invocation_id: Option<String>,
    #[serde(default)]
    pub thread_id: Option<String>,
}

/// Compiled and raw code of an execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionCode {
    #[serde(default)]
    pub raw_sql: Option<String>,
    #[serde(default)]
    pub compiled_sql: Option<String>,
    #[serde(default)]
    pub raw_code: Option<String>,
    #[serde(default)]
    pub compiled_code: Option<String>,
}

/// A model as executed by one job run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobModelRun {
    pub name: String,
    pub unique_id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub materialized_type: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default, rename = "schema")]
    pub db_schema: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(flatten)]
    pub run: RunIdentity,
    #[serde(flatten)]
    pub timing: ExecutionTiming,
    #[serde(flatten)]
    pub code: ExecutionCode,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub skip: Option<bool>,
}

impl JobModelRun {
    pub fn execution_time(&self) -> Option<f64> {
        self.timing.execution_time
    }

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
            self.run.run_id,
            self.timing.execute_completed_at,
            self.timing.execution_time,
            self.error.clone(),
        )
        .map(Some)
    }
}

impl Entity for JobModelRun {
    const NAME: &'static str = "JobModelRun";

    fn check(&self) -> Result<()> {
        self.timing.check(Self::NAME)
    }
}

/// A test as executed by one job run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobTestRun {
    pub name: String,
    pub unique_id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub column_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(flatten)]
    pub run: RunIdentity,
    #[serde(flatten)]
    pub timing: ExecutionTiming,
    #[serde(flatten)]
    pub code: ExecutionCode,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub warn: Option<bool>,
    #[serde(default)]
    pub fail: Option<bool>,
    #[serde(default)]
    pub skip: Option<bool>,
}

impl JobTestRun {
    /// Whether the test failed or warned.
    pub fn has_failures(&self) -> bool {
        self.fail == Some(true) || self.warn == Some(true)
    }
}

impl Entity for JobTestRun {
    const NAME: &'static str = "JobTestRun";

    fn check(&self) -> Result<()> {
        self.timing.check(Self::NAME)
    }
}

/// `job { id runId models tests }` in one response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRunNodes {
    #[serde(flatten)]
    pub job: JobNode,
    #[serde(default, deserialize_with = "null_as_default")]
    pub models: Vec<JobModelRun>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tests: Vec<JobTestRun>,
}

impl Entity for JobRunNodes {
    const NAME: &'static str = "JobRunNodes";

    fn check(&self) -> Result<()> {
        self.models.iter().try_for_each(Entity::check)?;
        self.tests.iter().try_for_each(Entity::check)
    }
}

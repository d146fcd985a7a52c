//! dbt Cloud administrative REST API (v2) payloads.
//!
//! Every response is wrapped in a `{ "data": ..., "status": {...} }` envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::run_status::RunOutcome;
use crate::error::Result;
use crate::serde_helpers::{
    i64_from_string_or_number, null_as_default, opt_duration_seconds,
    opt_i64_from_string_or_number, opt_timestamp, timestamp,
};

fn default_threads() -> i64 {
    1
}

fn default_target_name() -> String {
    "default".to_string()
}

/// Execution settings of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbtJobSettings {
    #[serde(default = "default_threads")]
    pub threads: i64,
    #[serde(default = "default_target_name")]
    pub target_name: String,
}

impl Default for DbtJobSettings {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            target_name: default_target_name(),
        }
    }
}

/// What starts a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbtJobTriggers {
    pub github_webhook: bool,
    pub schedule: bool,
    pub git_provider_webhook: bool,
    pub on_merge: bool,
}

/// Schedule of a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DbtJobSchedule {
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: Map<String, Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub time: Map<String, Value>,
    #[serde(default)]
    pub cron: Option<String>,
}

/// A job definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbtJob {
    #[serde(deserialize_with = "i64_from_string_or_number")]
    pub id: i64,
    #[serde(deserialize_with = "i64_from_string_or_number")]
    pub account_id: i64,
    #[serde(deserialize_with = "i64_from_string_or_number")]
    pub project_id: i64,
    #[serde(deserialize_with = "i64_from_string_or_number")]
    pub environment_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub execute_steps: Vec<String>,
    pub job_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub settings: DbtJobSettings,
    pub state: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub triggers: DbtJobTriggers,
    #[serde(default)]
    pub triggers_on_draft_pr: bool,
    #[serde(deserialize_with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub schedule: Option<DbtJobSchedule>,
    #[serde(default)]
    pub generate_sources: bool,
    #[serde(default)]
    pub cron_humanized: Option<String>,
    #[serde(default)]
    pub next_run_humanized: Option<String>,
    #[serde(default, deserialize_with = "opt_timestamp")]
    pub next_run: Option<DateTime<Utc>>,
    #[serde(default)]
    pub most_recent_run: Option<Value>,
}

impl DbtJob {
    /// Whether the job is active (state 1) rather than deleted.
    pub fn is_active(&self) -> bool {
        self.state == 1
    }
}

/// A run of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbtRun {
    #[serde(deserialize_with = "i64_from_string_or_number")]
    pub id: i64,
    #[serde(deserialize_with = "i64_from_string_or_number")]
    pub job_definition_id: i64,
    #[serde(default, deserialize_with = "opt_i64_from_string_or_number")]
    pub environment_id: Option<i64>,
    #[serde(default, deserialize_with = "opt_i64_from_string_or_number")]
    pub project_id: Option<i64>,
    #[serde(deserialize_with = "i64_from_string_or_number")]
    pub status: i64,
    #[serde(default)]
    pub status_humanized: Option<String>,
    #[serde(default, deserialize_with = "opt_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "opt_timestamp")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "opt_timestamp")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Seconds (the API reports `HH:MM:SS`).
    #[serde(default, deserialize_with = "opt_duration_seconds")]
    pub duration: Option<f64>,
    #[serde(default)]
    pub git_sha: Option<String>,
}

impl DbtRun {
    pub fn outcome(&self) -> Result<RunOutcome> {
        RunOutcome::from_rest_code(self.status)
    }

    /// Reported duration, else the span between start and finish.
    pub fn runtime(&self) -> Option<f64> {
        self.duration.or_else(|| match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) if end >= start => {
                Some((end - start).num_milliseconds() as f64 / 1000.0)
            }
            _ => None,
        })
    }
}

/// Account summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbtAccountInfo {
    #[serde(deserialize_with = "i64_from_string_or_number")]
    pub id: i64,
    pub name: String,
    pub state: i64,
}

/// Envelope of a REST response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudResponse<T> {
    pub data: T,
    #[serde(default)]
    pub status: Option<Map<String, Value>>,
}

pub type DbtJobsResponse = CloudResponse<Vec<DbtJob>>;
pub type DbtJobResponse = CloudResponse<DbtJob>;
pub type DbtRunsResponse = CloudResponse<Vec<DbtRun>>;
pub type DbtAccountResponse = CloudResponse<DbtAccountInfo>;

//! Applied-state models: models as last built in an environment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::factory::{Entity, non_negative};
use super::metadata::ModelMetadata;
use super::run_status::{RunOutcome, RunStatus};
use crate::error::Result;
use crate::serde_helpers::{
    null_as_default, opt_f64_from_string_or_number, opt_i64_from_string_or_number, opt_timestamp,
};

/// `executionInfo` of an applied model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionInfo {
    #[serde(default, deserialize_with = "opt_i64_from_string_or_number")]
    pub last_run_id: Option<i64>,
    #[serde(default)]
    pub last_run_status: Option<RunOutcome>,
    #[serde(default)]
    pub last_run_error: Option<String>,
    #[serde(default, deserialize_with = "opt_i64_from_string_or_number")]
    pub last_success_job_definition_id: Option<i64>,
    #[serde(default, deserialize_with = "opt_i64_from_string_or_number")]
    pub last_success_run_id: Option<i64>,
    #[serde(default, deserialize_with = "opt_timestamp")]
    pub run_generated_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "opt_f64_from_string_or_number")]
    pub run_elapsed_time: Option<f64>,
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
}

impl ExecutionInfo {
    /// Raw mapping view of every field.
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Most recent run, when a status was reported.
    pub fn last_run(&self) -> Result<Option<RunStatus>> {
        let Some(status) = self.last_run_status else {
            return Ok(None);
        };
        RunStatus::new(
            status,
            self.last_run_id,
            self.execute_completed_at.or(self.run_generated_at),
            self.execution_time,
            self.last_run_error.clone(),
        )
        .map(Some)
    }

    pub(crate) fn check(&self, entity: &str) -> Result<()> {
        non_negative(entity, "execution_time", self.execution_time)?;
        non_negative(entity, "run_elapsed_time", self.run_elapsed_time)
    }
}

/// A model node from `environment.applied.models`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedModel {
    pub name: String,
    pub unique_id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub meta: Map<String, Value>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub materialized_type: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default, rename = "schema")]
    pub db_schema: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fqn: Vec<String>,
    #[serde(default)]
    pub package_name: Option<String>,
    #[serde(default)]
    pub contract_enforced: Option<bool>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub execution_info: ExecutionInfo,
}

impl AppliedModel {
    /// Identity and location subset.
    pub fn metadata(&self) -> ModelMetadata {
        ModelMetadata {
            name: self.name.clone(),
            unique_id: self.unique_id.clone(),
            database: self.database.clone(),
            db_schema: self.db_schema.clone(),
            alias: self.alias.clone(),
            description: self.description.clone(),
            materialized_type: self.materialized_type.clone(),
            tags: self.tags.clone(),
        }
    }

    /// Seconds spent executing in the last run.
    pub fn execution_time(&self) -> Option<f64> {
        self.execution_info.execution_time
    }
}

impl Entity for AppliedModel {
    const NAME: &'static str = "AppliedModel";

    fn check(&self) -> Result<()> {
        self.execution_info.check(Self::NAME)
    }
}

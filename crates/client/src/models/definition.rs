//! Definition-state models: models as declared in the project source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::factory::Entity;
use super::metadata::ModelMetadata;
use crate::serde_helpers::{i64_from_string_or_number, null_as_default, opt_timestamp};

/// A `ModelDefinitionNode` from `environment.definition.resources`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDefinition {
    pub name: String,
    pub unique_id: String,
    pub resource_type: String,
    #[serde(deserialize_with = "i64_from_string_or_number")]
    pub project_id: i64,
    #[serde(deserialize_with = "i64_from_string_or_number")]
    pub environment_id: i64,
    #[serde(deserialize_with = "i64_from_string_or_number")]
    pub account_id: i64,
    pub file_path: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub meta: Map<String, Value>,
    #[serde(default, deserialize_with = "opt_timestamp")]
    pub run_generated_at: Option<DateTime<Utc>>,
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
    pub group: Option<String>,
    #[serde(default)]
    pub raw_code: Option<String>,
}

impl ModelDefinition {
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
}

impl Entity for ModelDefinition {
    const NAME: &'static str = "ModelDefinition";
}

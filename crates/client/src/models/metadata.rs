use serde::{Deserialize, Serialize};

use super::factory::Entity;
use crate::serde_helpers::null_as_default;

/// Identity, location and materialization of a model.
///
/// `name` is unique only within a project; `unique_id`
/// (`<resource_type>.<package>.<name>`) is globally unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub name: String,
    pub unique_id: String,
    #[serde(default)]
    pub database: Option<String>,
    /// Serialized as `schema`.
    #[serde(default, rename = "schema")]
    pub db_schema: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub materialized_type: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
}

impl Entity for ModelMetadata {
    const NAME: &'static str = "ModelMetadata";
}

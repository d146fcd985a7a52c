//! Environment-level records: project metadata and state summaries.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::factory::{Entity, build};
use crate::error::Result;
use crate::query::EnvironmentId;
use crate::serde_helpers::{null_as_default, opt_timestamp};

/// Display data of the dbt project deployed to an environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub name: String,
    pub adapter_type: Option<String>,
    pub environment_id: i64,
    /// When the applied state last changed.
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct EnvironmentNode {
    dbt_project_name: String,
    #[serde(default)]
    adapter_type: Option<String>,
    #[serde(default)]
    applied: Option<AppliedFreshness>,
}

#[derive(Debug, Deserialize)]
struct AppliedFreshness {
    #[serde(default, deserialize_with = "opt_timestamp")]
    last_updated_at: Option<DateTime<Utc>>,
}

impl Entity for EnvironmentNode {
    const NAME: &'static str = "ProjectMetadata";
}

impl ProjectMetadata {
    /// Build from a normalized `environment` node.
    pub fn from_node(environment_id: EnvironmentId, node: Value) -> Result<Self> {
        let node: EnvironmentNode = build(node)?;
        Ok(Self {
            name: node.dbt_project_name,
            adapter_type: node.adapter_type,
            environment_id: environment_id.get(),
            updated_at: node.applied.and_then(|a| a.last_updated_at),
        })
    }
}

/// `environment.applied` summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedStateSummary {
    #[serde(default, deserialize_with = "opt_timestamp")]
    pub last_updated_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub resource_counts: BTreeMap<String, i64>,
    #[serde(default)]
    pub latest_git_sha: Option<String>,
}

impl Entity for AppliedStateSummary {
    const NAME: &'static str = "AppliedStateSummary";
}

/// `environment.definition` summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionStateSummary {
    #[serde(default, deserialize_with = "opt_timestamp")]
    pub last_updated_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub resource_counts: BTreeMap<String, i64>,
}

impl DefinitionStateSummary {
    /// Number of model definitions, zero when the count is absent.
    pub fn model_count(&self) -> i64 {
        self.resource_counts.get("model").copied().unwrap_or(0)
    }
}

impl Entity for DefinitionStateSummary {
    const NAME: &'static str = "DefinitionStateSummary";
}

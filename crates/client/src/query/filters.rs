//! Server-side filter inputs for Discovery model listings.
//!
//! These serialize to the GraphQL input objects `ModelAppliedFilter` and
//! `DefinitionResourcesFilter`. Client-side filtering over fetched models
//! lives in `api::filters`.

use serde::Serialize;
use serde_json::Value;

use crate::error::{ClientError, Result};

/// `AccessLevel` schema enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Private,
    Protected,
    Public,
}

/// `RunStatus` schema enum as accepted by applied-state filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AppliedRunStatus {
    Error,
    Skipped,
    Success,
}

/// `ResourceNodeType` schema enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ResourceNodeType {
    Exposure,
    Macro,
    Metric,
    Model,
    SavedQuery,
    Seed,
    SemanticModel,
    Snapshot,
    Source,
    Test,
}

/// Filter for `applied.models`.
///
/// `materialized_type` has no server-side counterpart; it is applied to the
/// fetched page by the client and is never serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedModelFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<AccessLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run_status: Option<AppliedRunStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modeling_layer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unique_ids: Vec<String>,
    #[serde(skip)]
    pub materialized_type: Option<String>,
}

impl AppliedModelFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_access(mut self, access: AccessLevel) -> Self {
        self.access = Some(access);
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_package_name(mut self, package: impl Into<String>) -> Self {
        self.package_name = Some(package.into());
        self
    }

    pub fn with_last_run_status(mut self, status: AppliedRunStatus) -> Self {
        self.last_run_status = Some(status);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_unique_id(mut self, unique_id: impl Into<String>) -> Self {
        self.unique_ids.push(unique_id.into());
        self
    }

    pub fn with_materialized_type(mut self, materialized: impl Into<String>) -> Self {
        self.materialized_type = Some(materialized.into());
        self
    }

    /// The `$filter` variable value, or `None` when nothing is sent to the server.
    pub fn to_graphql(&self) -> Option<Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) if !map.is_empty() => Some(Value::Object(map)),
            _ => None,
        }
    }

    /// Whether a fetched node with `materialized` passes the client-side part.
    pub fn matches_materialization(&self, materialized: Option<&str>) -> bool {
        match &self.materialized_type {
            None => true,
            Some(wanted) => materialized == Some(wanted.as_str()),
        }
    }
}

/// Filter for `definition.resources`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionFilter {
    pub types: Vec<ResourceNodeType>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unique_ids: Vec<String>,
}

impl Default for DefinitionFilter {
    fn default() -> Self {
        Self::models()
    }
}

impl DefinitionFilter {
    /// Only model definitions.
    pub fn models() -> Self {
        Self {
            types: vec![ResourceNodeType::Model],
            tags: Vec::new(),
            unique_ids: Vec::new(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_unique_id(mut self, unique_id: impl Into<String>) -> Self {
        self.unique_ids.push(unique_id.into());
        self
    }

    /// Reject combinations the server would refuse.
    pub fn validate(&self) -> Result<()> {
        if self.types.is_empty() {
            return Err(ClientError::validation(
                "DefinitionFilter",
                "at least one resource type is required",
            ));
        }
        Ok(())
    }

    pub(crate) fn to_graphql(&self) -> Result<Value> {
        self.validate()?;
        serde_json::to_value(self)
            .map_err(|e| ClientError::validation("DefinitionFilter", e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_applied_filter_sends_nothing() {
        assert_eq!(AppliedModelFilter::new().to_graphql(), None);
    }

    #[test]
    fn test_materialization_is_client_side_only() {
        let filter = AppliedModelFilter::new().with_materialized_type("table");
        assert_eq!(filter.to_graphql(), None);
        assert!(filter.matches_materialization(Some("table")));
        assert!(!filter.matches_materialization(Some("view")));
        assert!(!filter.matches_materialization(None));
    }

    #[test]
    fn test_applied_filter_wire_names() {
        let filter = AppliedModelFilter::new()
            .with_access(AccessLevel::Public)
            .with_package_name("jaffle_shop")
            .with_last_run_status(AppliedRunStatus::Success)
            .with_tag("finance");

        assert_eq!(
            filter.to_graphql(),
            Some(json!({
                "access": "public",
                "lastRunStatus": "success",
                "packageName": "jaffle_shop",
                "tags": ["finance"],
            }))
        );
    }

    #[test]
    fn test_relation_filters_pass_through() {
        let filter = AppliedModelFilter::new()
            .with_database("ANALYTICS")
            .with_schema("marts")
            .with_group("finance");

        assert_eq!(
            filter.to_graphql(),
            Some(json!({"database": "ANALYTICS", "group": "finance", "schema": "marts"}))
        );
    }

    #[test]
    fn test_definition_filter_requires_types() {
        let filter = DefinitionFilter {
            types: Vec::new(),
            tags: Vec::new(),
            unique_ids: Vec::new(),
        };
        let err = filter.validate().unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_definition_filter_wire_format() {
        let value = DefinitionFilter::models()
            .with_unique_id("model.jaffle.orders")
            .to_graphql()
            .unwrap();
        assert_eq!(
            value,
            json!({"types": ["Model"], "uniqueIds": ["model.jaffle.orders"]})
        );
    }
}

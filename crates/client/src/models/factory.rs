//! Typed construction of domain entities from normalized JSON.
//!
//! Responsibilities:
//! - Decode one normalized node into an entity, or fail as a whole.
//! - Report missing or mistyped fields as `ClientError::Validation`
//!   naming the entity and the field.
//! - Run per-entity semantic checks (non-negative durations).
//!
//! Does NOT handle:
//! - Key renaming or connection unwrapping (see `normalize`).
//!
//! Invariants:
//! - No entity is returned unless every required field was present and
//!   every present field had the declared type.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ClientError, Result};

/// A domain type the factory can construct.
pub trait Entity: DeserializeOwned {
    /// Name used in validation errors.
    const NAME: &'static str;

    /// Semantic checks beyond shape and type.
    fn check(&self) -> Result<()> {
        Ok(())
    }
}

/// Build one entity from a normalized node.
pub fn build<T: Entity>(node: Value) -> Result<T> {
    let entity: T =
        serde_json::from_value(node).map_err(|e| ClientError::validation(T::NAME, e.to_string()))?;
    entity.check()?;
    Ok(entity)
}

/// Build one entity, treating `null` as absent.
pub fn build_optional<T: Entity>(node: Value) -> Result<Option<T>> {
    match node {
        Value::Null => Ok(None),
        node => build(node).map(Some),
    }
}

/// Build every node of a list; the first failure aborts the whole list.
pub fn build_all<T: Entity>(nodes: Vec<Value>) -> Result<Vec<T>> {
    nodes.into_iter().map(build).collect()
}

/// Build every element of a JSON array value (`null` is an empty list).
pub fn build_list<T: Entity>(value: Value, path: &str) -> Result<Vec<T>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(nodes) => build_all(nodes),
        _ => Err(ClientError::unexpected_shape(path, "list")),
    }
}

/// Reject negative or NaN durations.
pub(crate) fn non_negative(entity: &str, field: &str, value: Option<f64>) -> Result<()> {
    match value {
        Some(secs) if secs.is_nan() || secs < 0.0 => Err(ClientError::validation(
            entity,
            format!("{field} must be a non-negative number of seconds, got {secs}"),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Sample {
        name: String,
        #[serde(default)]
        seconds: Option<f64>,
    }

    impl Entity for Sample {
        const NAME: &'static str = "Sample";

        fn check(&self) -> Result<()> {
            non_negative(Self::NAME, "seconds", self.seconds)
        }
    }

    #[test]
    fn test_missing_field_is_named() {
        let err = build::<Sample>(json!({"seconds": 1.0})).unwrap_err();
        match err {
            ClientError::Validation { entity, message } => {
                assert_eq!(entity, "Sample");
                assert!(message.contains("name"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_semantic_check_runs_after_decode() {
        let err = build::<Sample>(json!({"name": "a", "seconds": -2.0})).unwrap_err();
        assert!(err.is_validation());
        let ok = build::<Sample>(json!({"name": "a", "seconds": 2.0})).unwrap();
        assert_eq!(ok.name, "a");
    }

    #[test]
    fn test_list_is_all_or_nothing() {
        let nodes = vec![json!({"name": "a"}), json!({"seconds": 1})];
        assert!(build_all::<Sample>(nodes).is_err());
        assert!(build_list::<Sample>(Value::Null, "x").unwrap().is_empty());
        assert!(build_list::<Sample>(json!({}), "x").is_err());
        assert!(build_optional::<Sample>(Value::Null).unwrap().is_none());
    }
}

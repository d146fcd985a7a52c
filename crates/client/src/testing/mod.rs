//! Testing utilities for dbt Discovery client tests.
//!
//! Helpers for loading JSON fixtures and generating synthetic Discovery
//! payloads. Available when running tests or when the `test-utils` feature is
//! enabled.
//!
//! # Example
//! ```ignore
//! use dbt_discovery_client::testing::{load_fixture, generators::AppliedModelGenerator};
//!
//! let page = load_fixture("discovery/applied_models_page.json");
//! let models = AppliedModelGenerator::new().with_count(50).generate();
//! ```

#[cfg(any(feature = "test-utils", test))]
pub mod generators;

use std::path::Path;

/// Load a JSON fixture file from the fixtures directory.
///
/// # Arguments
/// * `fixture_path` - Relative path within the fixtures directory (e.g., "discovery/environment.json")
///
/// # Panics
/// - If the fixture file cannot be read
/// - If the file content is not valid JSON
pub fn load_fixture(fixture_path: &str) -> serde_json::Value {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let full_path = manifest_dir.join("fixtures").join(fixture_path);
    let content = std::fs::read_to_string(&full_path)
        .unwrap_or_else(|_| panic!("Failed to load fixture: {}", full_path.display()));
    serde_json::from_str(&content).expect("Invalid JSON in fixture")
}

/// Wrap a node as a GraphQL success envelope.
pub fn graphql_data(data: serde_json::Value) -> serde_json::Value {
    serde_json::json!({ "data": data })
}

/// Wrap applied-model nodes (wire format) as one `environment.applied.models` page.
pub fn applied_models_page(
    nodes: Vec<serde_json::Value>,
    end_cursor: Option<&str>,
    has_next_page: bool,
) -> serde_json::Value {
    let edges: Vec<serde_json::Value> = nodes
        .into_iter()
        .enumerate()
        .map(|(i, node)| serde_json::json!({ "cursor": format!("c{i}"), "node": node }))
        .collect();
    graphql_data(serde_json::json!({
        "environment": {
            "applied": {
                "models": {
                    "pageInfo": {
                        "hasNextPage": has_next_page,
                        "hasPreviousPage": false,
                        "startCursor": null,
                        "endCursor": end_cursor,
                    },
                    "edges": edges,
                }
            }
        }
    }))
}

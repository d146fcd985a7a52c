//! Test data generators using the fake crate.
//!
//! Produce wire-format (camelCase) Discovery nodes and REST payloads so that
//! tests exercise the normalizer as well as the decoders.

use fake::Fake;
use fake::faker::boolean::en::Boolean;
use fake::faker::lorem::en::Word;
use serde_json::{Value, json};

/// Materializations dbt ships with.
pub const MATERIALIZATIONS: &[&str] = &["table", "view", "incremental", "ephemeral"];

/// Tags drawn from a small pool so filters hit.
pub const TAG_POOL: &[&str] = &["finance", "marketing", "daily", "hourly", "pii"];

fn pick<'a>(items: &[&'a str]) -> &'a str {
    items[(0..items.len()).fake::<usize>()]
}

// =============================================================================
// Applied Model Generator
// =============================================================================

/// Generates `environment.applied.models` nodes.
///
/// # Example
/// ```ignore
/// use dbt_discovery_client::testing::generators::AppliedModelGenerator;
///
/// let nodes = AppliedModelGenerator::new()
///     .with_count(20)
///     .with_package("jaffle_shop")
///     .generate();
/// ```
#[derive(Debug, Clone)]
pub struct AppliedModelGenerator {
    count: usize,
    package: String,
    /// Percent of models reported without an execution time.
    missing_runtime_percent: u8,
    max_runtime: f64,
}

impl Default for AppliedModelGenerator {
    fn default() -> Self {
        Self {
            count: 10,
            package: "analytics".to_string(),
            missing_runtime_percent: 10,
            max_runtime: 600.0,
        }
    }
}

impl AppliedModelGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn with_package(mut self, package: &str) -> Self {
        self.package = package.to_string();
        self
    }

    pub fn with_missing_runtime_percent(mut self, percent: u8) -> Self {
        self.missing_runtime_percent = percent.min(100);
        self
    }

    pub fn with_max_runtime(mut self, secs: f64) -> Self {
        self.max_runtime = secs.max(1.0);
        self
    }

    /// Generate one node with a fixed index-based name.
    pub fn generate_one(&self, index: usize) -> Value {
        let word: String = Word().fake();
        let name = format!("{word}_{index}");
        let tag_count = (0..3usize).fake::<usize>();
        let tags: Vec<&str> = (0..tag_count).map(|_| pick(TAG_POOL)).collect();
        let missing: bool = Boolean(self.missing_runtime_percent).fake();
        let execution_time = if missing {
            Value::Null
        } else {
            json!((0.0..self.max_runtime).fake::<f64>())
        };
        let status = pick(&["success", "success", "success", "error", "skipped"]);

        json!({
            "name": name,
            "uniqueId": format!("model.{}.{name}", self.package),
            "description": null,
            "tags": tags,
            "meta": {},
            "materializedType": pick(MATERIALIZATIONS),
            "database": "analytics",
            "schema": "dbt_prod",
            "alias": name,
            "packageName": self.package,
            "executionInfo": {
                "lastRunId": (1_000..100_000i64).fake::<i64>(),
                "lastRunStatus": status,
                "lastRunError": if status == "error" { json!("Database Error") } else { Value::Null },
                "executionTime": execution_time,
                "runGeneratedAt": "2024-03-01T08:00:00.000Z",
            }
        })
    }

    /// Generate `count` nodes.
    pub fn generate(&self) -> Vec<Value> {
        (0..self.count).map(|i| self.generate_one(i)).collect()
    }
}

// =============================================================================
// Historical Run Generator
// =============================================================================

/// Generates `modelHistoricalRuns` entries for one model, newest first.
#[derive(Debug, Clone)]
pub struct HistoricalRunGenerator {
    model: String,
    count: usize,
}

impl HistoricalRunGenerator {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            count: 5,
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn generate(&self) -> Vec<Value> {
        let base_run = (10_000..20_000i64).fake::<i64>();
        (0..self.count)
            .map(|i| {
                json!({
                    "name": self.model,
                    "resourceType": "model",
                    "uniqueId": format!("model.analytics.{}", self.model),
                    "runId": base_run - i as i64,
                    "status": "success",
                    "executionTime": (1.0..120.0).fake::<f64>(),
                    "executeCompletedAt": format!("2024-03-{:02}T08:00:00Z", 28 - (i % 27)),
                })
            })
            .collect()
    }
}

// =============================================================================
// REST Generators
// =============================================================================

/// A dbt Cloud v2 job payload.
pub fn dbt_job(id: i64, account_id: i64, environment_id: i64, name: &str) -> Value {
    json!({
        "id": id,
        "account_id": account_id,
        "project_id": 100,
        "environment_id": environment_id,
        "name": name,
        "description": null,
        "execute_steps": ["dbt build"],
        "job_type": "scheduled",
        "settings": { "threads": 4, "target_name": "prod" },
        "state": 1,
        "triggers": { "github_webhook": false, "schedule": true },
        "created_at": "2024-01-01 10:00:00.000000+00:00",
        "updated_at": "2024-02-01T10:00:00Z",
        "generate_sources": false,
    })
}

/// A dbt Cloud v2 run payload.
pub fn dbt_run(id: i64, job_id: i64, status: i64, duration_secs: Option<f64>) -> Value {
    json!({
        "id": id,
        "job_definition_id": job_id,
        "status": status,
        "started_at": format!("2024-03-01T{:02}:00:00Z", id % 24),
        "finished_at": format!("2024-03-01T{:02}:30:00Z", id % 24),
        "duration": duration_secs,
    })
}

// =============================================================================
// Proptest Integration
// =============================================================================

/// Proptest strategies over the decoded domain types.
#[cfg(feature = "test-utils")]
pub mod proptest_strategies {
    use super::*;
    use crate::models::AppliedModel;
    use crate::models::factory::build;
    use proptest::prelude::*;

    /// Tags drawn from [`TAG_POOL`].
    pub fn tags_strategy() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(prop::sample::select(TAG_POOL), 0..3)
            .prop_map(|tags| tags.into_iter().map(str::to_string).collect())
    }

    /// An applied model with random tags, materialization and runtime.
    pub fn applied_model_strategy() -> impl Strategy<Value = AppliedModel> {
        (
            "[a-z]{3,10}",
            tags_strategy(),
            prop::option::of(prop::sample::select(MATERIALIZATIONS)),
            prop::option::of(0.0..1_000.0f64),
        )
            .prop_map(|(name, tags, materialized, runtime)| {
                let node = json!({
                    "name": name,
                    "unique_id": format!("model.analytics.{name}"),
                    "tags": tags,
                    "materialized_type": materialized,
                    "execution_info": { "execution_time": runtime },
                });
                build::<AppliedModel>(node).expect("generated model is valid")
            })
    }

    /// Strategy for generating wire-format applied model nodes using fake.
    pub fn fake_applied_node_strategy() -> impl Strategy<Value = Value> {
        let generator = AppliedModelGenerator::new();
        (0..1000usize).prop_map(move |i| generator.generate_one(i))
    }
}

//! Common test utilities for integration tests.
//!
//! Shared helpers for building clients against a wiremock server and for
//! mounting Discovery and REST responses. All integration tests should use
//! these utilities to ensure consistency.
//!
//! # Invariants
//! - Fixtures are loaded from the `fixtures/` directory relative to the crate root
//! - Discovery mocks are told apart by the operation name in the query text
//!
//! # What this does NOT handle
//! - Test-specific assertions or test logic

use dbt_discovery_config::{ProjectEntry, ProjectMap};
use secrecy::SecretString;
use serde_json::Value;
use wiremock::MockBuilder;
use wiremock::matchers::{body_string_contains, method, path};

#[allow(unused_imports)]
pub use dbt_discovery_client::testing::load_fixture;
#[allow(unused_imports)]
pub use dbt_discovery_client::{ClientError, CloudClient, DiscoveryApi, DiscoveryClient};
#[allow(unused_imports)]
pub use wiremock::{Mock, MockServer, ResponseTemplate};

/// Account id used by every REST fixture.
#[allow(dead_code)]
pub const ACCOUNT_ID: u64 = 51798;

/// Environment id of the `jaffle_shop` fixtures.
#[allow(dead_code)]
pub const ENV_ID: i64 = 218762;

#[allow(dead_code)]
pub const TEST_TOKEN: &str = "dbtc_test_token";

/// Route client logs to the test writer; `RUST_LOG` picks the level.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn test_token() -> SecretString {
    SecretString::new(TEST_TOKEN.to_string().into())
}

/// A Discovery client pointed at `{server}/graphql`.
#[allow(dead_code)]
pub fn discovery_client(server: &MockServer) -> DiscoveryClient {
    DiscoveryClient::builder()
        .endpoint(format!("{}/graphql", server.uri()))
        .service_token(test_token())
        .max_retries(1)
        .build()
        .expect("discovery client builds")
}

/// A REST client pointed at `{server}/api/v2`.
#[allow(dead_code)]
pub fn cloud_client(server: &MockServer) -> CloudClient {
    CloudClient::builder()
        .base_url(format!("{}/api/v2", server.uri()))
        .token(test_token())
        .max_retries(1)
        .build()
        .expect("cloud client builds")
}

/// Both clients against one server, with the given project map.
#[allow(dead_code)]
pub fn api(server: &MockServer, projects: &[(&str, i64)]) -> DiscoveryApi {
    let map: ProjectMap = projects
        .iter()
        .map(|(name, env)| {
            (
                name.to_string(),
                ProjectEntry {
                    prod_env_id: *env,
                    label: None,
                },
            )
        })
        .collect();
    DiscoveryApi::from_parts(
        discovery_client(server),
        cloud_client(server),
        Some(ACCOUNT_ID),
        map,
    )
}

/// Mock for one Discovery operation, matched on `query <Operation>(`.
#[allow(dead_code)]
pub fn graphql(operation: &str) -> MockBuilder {
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains(format!("query {operation}(")))
}

/// Mount a Discovery response for one operation.
#[allow(dead_code)]
pub async fn mount_graphql(server: &MockServer, operation: &str, body: Value) {
    graphql(operation)
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mount the `jaffle_shop` environment metadata.
#[allow(dead_code)]
pub async fn mount_environment(server: &MockServer) {
    mount_graphql(
        server,
        "EnvironmentMetadata",
        load_fixture("discovery/environment_metadata.json"),
    )
    .await;
}

/// Mount the `jaffle_shop` applied models page.
#[allow(dead_code)]
pub async fn mount_applied_models(server: &MockServer) {
    mount_graphql(
        server,
        "AppliedModels",
        load_fixture("discovery/applied_models_page.json"),
    )
    .await;
}

/// Parsed bodies of every received request whose query is `operation`.
#[allow(dead_code)]
pub async fn bodies_for(server: &MockServer, operation: &str) -> Vec<Value> {
    let needle = format!("query {operation}(");
    server
        .received_requests()
        .await
        .expect("request recording enabled")
        .iter()
        .filter_map(|r| serde_json::from_slice::<Value>(&r.body).ok())
        .filter(|b| b["query"].as_str().is_some_and(|q| q.contains(&needle)))
        .collect()
}

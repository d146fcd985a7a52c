//! Environment-level methods for [`DiscoveryClient`].

use serde_json::Value;

use crate::client::DiscoveryClient;
use crate::error::{ClientError, Result};
use crate::models::factory::build;
use crate::models::{AppliedStateSummary, DefinitionStateSummary, ProjectMetadata};
use crate::query::{self, EnvironmentId};

impl DiscoveryClient {
    /// Project name and adapter type of an environment.
    ///
    /// A `null` environment node is reported as `NotFound`.
    pub async fn environment_metadata(&self, env: EnvironmentId) -> Result<ProjectMetadata> {
        let node = self.execute(&query::environment_metadata(env)).await?;
        if node.is_null() {
            return Err(ClientError::NotFound {
                kind: "Environment",
                name: env.to_string(),
            });
        }
        ProjectMetadata::from_node(env, node)
    }

    /// Applied-state freshness and resource counts.
    pub async fn applied_state(&self, env: EnvironmentId) -> Result<AppliedStateSummary> {
        let node = self.execute(&query::applied_state_summary(env)).await?;
        build(or_empty(node))
    }

    /// Definition-state freshness and resource counts.
    pub async fn definition_state(&self, env: EnvironmentId) -> Result<DefinitionStateSummary> {
        let node = self.execute(&query::definition_state_summary(env)).await?;
        build(or_empty(node))
    }
}

fn or_empty(node: Value) -> Value {
    if node.is_null() {
        Value::Object(Default::default())
    } else {
        node
    }
}

//! Credential configuration.

use secrecy::SecretString;

/// API tokens for the two dbt Cloud surfaces.
///
/// The Discovery API token is mandatory. The REST token is optional and the
/// service token is reused for REST calls when it is absent.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Token for the Discovery (GraphQL) API (`DBT_SERVICE_TOKEN`).
    pub service_token: SecretString,
    /// Token for the administrative REST API (`DBT_CLOUD_TOKEN`).
    pub cloud_token: Option<SecretString>,
}

impl AuthConfig {
    /// Create credentials with only a service token.
    pub fn new(service_token: SecretString) -> Self {
        Self {
            service_token,
            cloud_token: None,
        }
    }

    /// Token to present to the REST API.
    pub fn rest_token(&self) -> &SecretString {
        self.cloud_token.as_ref().unwrap_or(&self.service_token)
    }
}

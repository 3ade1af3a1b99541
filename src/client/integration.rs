//! Integration endpoints.

use serde::{Deserialize, Serialize};

use super::{ApiError, BuddyClient};

/// An IAM role the integration assumes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleAssumption {
    /// ARN of the role to assume.
    pub arn: String,
    /// External ID required by the role trust policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    /// Session length in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
}

/// An integration as returned by the Service. Credential material is never
/// echoed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Integration {
    /// Service identifier.
    pub hash_id: String,
    /// API URL.
    pub url: String,
    /// Link to the web UI.
    pub html_url: String,
    /// Integration name.
    pub name: String,
    /// Integration kind, e.g. `AMAZON`.
    #[serde(rename = "type")]
    pub integration_type: String,
    /// Visibility, e.g. `WORKSPACE` or `PROJECT`.
    pub scope: String,
    /// Project URL handle.
    pub project_name: String,
    /// Group the integration is shared with.
    pub group_id: Option<i64>,
    /// Stable handle used in YAML.
    pub identifier: String,
    /// OIDC audience for keyless integrations.
    pub audience: String,
    /// IAM roles assumed after authenticating.
    pub role_assumptions: Vec<RoleAssumption>,
}

/// Create and update payload for an integration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IntegrationOps {
    /// Integration name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Integration kind, e.g. `AMAZON`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub integration_type: Option<String>,
    /// Visibility, e.g. `WORKSPACE` or `PROJECT`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Project URL handle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    /// Group the integration is shared with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,
    /// Stable handle used in YAML.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// Token credential. Never returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Username credential.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Password credential.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// AWS access key ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,
    /// Secret key credential.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
    /// Application (client) ID credential.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    /// Azure tenant ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    /// Client token credential.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_token: Option<String>,
    /// API key credential.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Shopify shop name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shop: Option<String>,
    /// OIDC audience for keyless integrations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    /// Google Cloud project ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_project: Option<String>,
    /// Partner token credential.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner_token: Option<String>,
    /// Raw JSON configuration for types that take one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
    /// IAM roles assumed after authenticating.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_assumptions: Option<Vec<RoleAssumption>>,
}

impl BuddyClient {
    /// Create an integration.
    pub async fn create_integration(
        &self,
        domain: &str,
        ops: &IntegrationOps,
    ) -> Result<Integration, ApiError> {
        self.post(&format!("/workspaces/{domain}/integrations"), ops)
            .await
    }

    /// Fetch an integration.
    pub async fn get_integration(
        &self,
        domain: &str,
        hash_id: &str,
    ) -> Result<Integration, ApiError> {
        self.get(&format!("/workspaces/{domain}/integrations/{hash_id}"))
            .await
    }

    /// Update an integration.
    pub async fn update_integration(
        &self,
        domain: &str,
        hash_id: &str,
        ops: &IntegrationOps,
    ) -> Result<Integration, ApiError> {
        self.patch(&format!("/workspaces/{domain}/integrations/{hash_id}"), ops)
            .await
    }

    /// Delete an integration.
    pub async fn delete_integration(&self, domain: &str, hash_id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/workspaces/{domain}/integrations/{hash_id}"))
            .await
    }
}

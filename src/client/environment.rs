//! Environment endpoints.

use serde::{Deserialize, Serialize};

use super::{ApiError, BuddyClient, IdRef, ResourcePermissions};

/// A variable scoped to an environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentVariable {
    /// Variable name.
    pub key: String,
    /// Encrypted values come back as ciphertext.
    pub value: String,
    /// Whether the value is stored encrypted.
    pub encrypted: bool,
    /// Description of the variable.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Whether runs may override the value.
    pub settable: bool,
}

/// An environment as returned by the Service.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Environment {
    /// Service identifier.
    pub id: String,
    /// API URL.
    pub url: String,
    /// Link to the web UI.
    pub html_url: String,
    /// Environment name.
    pub name: String,
    /// Stable handle used in YAML.
    pub identifier: String,
    /// `DEV`, `STAGE`, `PRODUCTION` and so on.
    #[serde(rename = "type")]
    pub environment_type: String,
    /// Public URL of the environment.
    pub public_url: String,
    /// Tags used to select the environment.
    pub tags: Vec<String>,
    /// Whether every pipeline may deploy to the environment.
    pub all_pipelines_allowed: bool,
    /// Pipelines allowed to deploy when not all are.
    pub allowed_pipelines: Vec<IdRef>,
    /// Environment-scoped variables.
    pub variables: Vec<EnvironmentVariable>,
    /// Per-user and per-group access.
    pub permissions: Option<ResourcePermissions>,
}

/// Create and update payload for an environment.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EnvironmentOps {
    /// Name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Stable handle used in YAML.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// `DEV`, `STAGE`, `PRODUCTION` and so on.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub environment_type: Option<String>,
    /// Public URL of the environment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
    /// Free-form tags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Whether every pipeline may deploy to the environment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_pipelines_allowed: Option<bool>,
    /// Pipelines allowed to deploy when not all are.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_pipelines: Option<Vec<IdRef>>,
    /// Environment-scoped variables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Vec<EnvironmentVariable>>,
    /// Per-user and per-group access.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<ResourcePermissions>,
}

impl BuddyClient {
    /// Create an environment.
    pub async fn create_environment(
        &self,
        domain: &str,
        project: &str,
        ops: &EnvironmentOps,
    ) -> Result<Environment, ApiError> {
        self.post(
            &format!("/workspaces/{domain}/projects/{project}/environments"),
            ops,
        )
        .await
    }

    /// Fetch an environment.
    pub async fn get_environment(
        &self,
        domain: &str,
        project: &str,
        environment_id: &str,
    ) -> Result<Environment, ApiError> {
        self.get(&format!(
            "/workspaces/{domain}/projects/{project}/environments/{environment_id}"
        ))
        .await
    }

    /// Update an environment.
    pub async fn update_environment(
        &self,
        domain: &str,
        project: &str,
        environment_id: &str,
        ops: &EnvironmentOps,
    ) -> Result<Environment, ApiError> {
        self.patch(
            &format!("/workspaces/{domain}/projects/{project}/environments/{environment_id}"),
            ops,
        )
        .await
    }

    /// Delete an environment.
    pub async fn delete_environment(
        &self,
        domain: &str,
        project: &str,
        environment_id: &str,
    ) -> Result<(), ApiError> {
        self.delete(&format!(
            "/workspaces/{domain}/projects/{project}/environments/{environment_id}"
        ))
        .await
    }
}

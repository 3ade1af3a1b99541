//! Deployment target endpoints.

use serde::{Deserialize, Serialize};

use super::{ApiError, BuddyClient, IdRef, NameRef, ResourcePermissions};

/// How a target authenticates. Secrets are write-only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetAuth {
    /// Authentication method.
    pub method: String,
    /// Username credential.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub username: String,
    /// Password credential.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub password: String,
    /// Private key.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub key: String,
    /// Passphrase of the private key.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub passphrase: String,
    /// Asset holding the private key.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub asset: String,
}

/// Reference to an environment by its string id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentRef {
    /// Environment ID.
    pub id: String,
}

/// A deployment target as returned by the Service.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Target {
    /// Service identifier.
    pub id: String,
    /// API URL.
    pub url: String,
    /// Link to the web UI.
    pub html_url: String,
    /// Target name.
    pub name: String,
    /// Stable handle used in YAML.
    pub identifier: String,
    /// Target kind, e.g. `SSH` or `FTP`.
    #[serde(rename = "type")]
    pub target_type: String,
    /// Host name or address.
    pub host: String,
    /// Port, as a string.
    pub port: String,
    /// Path on the target.
    pub path: String,
    /// Repository name.
    pub repository: String,
    /// Integration used to reach the target.
    pub integration: String,
    /// Whether the connection uses TLS.
    pub secure: bool,
    /// Whether the pipeline is disabled.
    pub disabled: bool,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Project the target is scoped to.
    pub project: Option<NameRef>,
    /// Pipeline the target is scoped to.
    pub pipeline: Option<IdRef>,
    /// Environment the target belongs to.
    pub environment: Option<EnvironmentRef>,
    /// Authentication settings.
    pub auth: Option<TargetAuth>,
    /// Per-user and per-group access.
    pub permissions: Option<ResourcePermissions>,
}

/// Create and update payload for a target.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TargetOps {
    /// Target name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Stable handle used in YAML.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// Target kind, e.g. `SSH` or `FTP`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
    /// Host name or address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Port, as a string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    /// Path on the target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Repository name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    /// Integration used to reach the target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integration: Option<String>,
    /// Whether the connection uses TLS.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    /// Whether the pipeline is disabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    /// Free-form tags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Project the target is scoped to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<NameRef>,
    /// Pipeline the target is scoped to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<IdRef>,
    /// Environment the target belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<EnvironmentRef>,
    /// Authentication settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<TargetAuth>,
    /// Per-user and per-group access.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<ResourcePermissions>,
}

impl BuddyClient {
    /// Create a target.
    pub async fn create_target(&self, domain: &str, ops: &TargetOps) -> Result<Target, ApiError> {
        self.post(&format!("/workspaces/{domain}/targets"), ops).await
    }

    /// Fetch a target.
    pub async fn get_target(&self, domain: &str, target_id: &str) -> Result<Target, ApiError> {
        self.get(&format!("/workspaces/{domain}/targets/{target_id}"))
            .await
    }

    /// Update a target.
    pub async fn update_target(
        &self,
        domain: &str,
        target_id: &str,
        ops: &TargetOps,
    ) -> Result<Target, ApiError> {
        self.patch(&format!("/workspaces/{domain}/targets/{target_id}"), ops)
            .await
    }

    /// Delete a target.
    pub async fn delete_target(&self, domain: &str, target_id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/workspaces/{domain}/targets/{target_id}"))
            .await
    }
}

//! Variable endpoints.

use serde::{Deserialize, Serialize};

use super::{ApiError, BuddyClient, IdRef, NameRef};

/// A workspace, project, pipeline or action scoped variable.
///
/// Plain variables have `type = VAR`; SSH keys have `type = SSH_KEY` and
/// carry the file placement fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Variable {
    /// Service identifier.
    pub id: i64,
    /// API URL.
    pub url: String,
    /// Variable name.
    pub key: String,
    /// Ciphertext when `encrypted` is set.
    pub value: String,
    /// `VAR` or `SSH_KEY`.
    #[serde(rename = "type")]
    pub variable_type: String,
    /// Whether the value is stored encrypted.
    pub encrypted: bool,
    /// Whether runs may override the value.
    pub settable: bool,
    /// Free-form description.
    pub description: String,
    /// `CONTAINER` or `NONE`.
    pub file_place: String,
    /// Path the key file is written to.
    pub file_path: String,
    /// Mode of the written key file.
    pub file_chmod: String,
    /// Human-readable name.
    pub display_name: String,
    /// Checksum of the key file.
    pub checksum: String,
    /// Fingerprint of the SSH key.
    pub key_fingerprint: String,
    /// Public half of an SSH key.
    pub public_value: String,
    /// Project the item is scoped to.
    pub project: Option<NameRef>,
    /// Pipeline the item is scoped to.
    pub pipeline: Option<IdRef>,
    /// Action the variable is scoped to.
    pub action: Option<IdRef>,
}

/// Create and update payload for a variable.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VariableOps {
    /// Variable name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Plain value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// `VAR` or `SSH_KEY`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub variable_type: Option<String>,
    /// Whether the value is stored encrypted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted: Option<bool>,
    /// Whether runs may override the value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settable: Option<bool>,
    /// Free-form description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `CONTAINER` or `NONE`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_place: Option<String>,
    /// Path the key file is written to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    /// Mode of the written key file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_chmod: Option<String>,
    /// Human-readable name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Project the item is scoped to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<NameRef>,
    /// Pipeline the item is scoped to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<IdRef>,
    /// Action the variable is scoped to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<IdRef>,
}

impl BuddyClient {
    /// Create a variable.
    pub async fn create_variable(
        &self,
        domain: &str,
        ops: &VariableOps,
    ) -> Result<Variable, ApiError> {
        self.post(&format!("/workspaces/{domain}/variables"), ops).await
    }

    /// Fetch a variable.
    pub async fn get_variable(&self, domain: &str, variable_id: i64) -> Result<Variable, ApiError> {
        self.get(&format!("/workspaces/{domain}/variables/{variable_id}"))
            .await
    }

    /// Update a variable.
    pub async fn update_variable(
        &self,
        domain: &str,
        variable_id: i64,
        ops: &VariableOps,
    ) -> Result<Variable, ApiError> {
        self.patch(&format!("/workspaces/{domain}/variables/{variable_id}"), ops)
            .await
    }

    /// Delete a variable.
    pub async fn delete_variable(&self, domain: &str, variable_id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/workspaces/{domain}/variables/{variable_id}"))
            .await
    }
}

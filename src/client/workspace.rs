//! Workspace endpoints.

use serde::{Deserialize, Serialize};

use super::{ApiError, BuddyClient};

/// A workspace as returned by the Service.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Workspace {
    /// Service identifier.
    pub id: i64,
    /// API URL.
    pub url: String,
    /// Link to the web UI.
    pub html_url: String,
    /// Workspace name.
    pub name: String,
    /// Workspace domain, its URL handle.
    pub domain: String,
    /// Member who owns the workspace.
    pub owner_id: i64,
    /// Whether the workspace is frozen.
    pub frozen: bool,
    /// Creation timestamp as sent by the Service.
    pub create_date: String,
}

/// Create payload for a workspace.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkspaceCreate {
    /// Workspace domain, its URL handle.
    pub domain: String,
    /// Workspace name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Salt used to encrypt workspace secrets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_salt: Option<String>,
}

/// Update payload for a workspace.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkspaceUpdate {
    /// Workspace name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorkspaceList {
    #[serde(default)]
    workspaces: Vec<Workspace>,
}

impl BuddyClient {
    /// Create a workspace.
    pub async fn create_workspace(&self, ops: &WorkspaceCreate) -> Result<Workspace, ApiError> {
        self.post("/workspaces", ops).await
    }

    /// Fetch a workspace.
    pub async fn get_workspace(&self, domain: &str) -> Result<Workspace, ApiError> {
        self.get(&format!("/workspaces/{domain}")).await
    }

    /// Workspaces visible to the token.
    pub async fn list_workspaces(&self) -> Result<Vec<Workspace>, ApiError> {
        let list: WorkspaceList = self.get("/workspaces").await?;
        Ok(list.workspaces)
    }

    /// Update a workspace.
    pub async fn update_workspace(
        &self,
        domain: &str,
        ops: &WorkspaceUpdate,
    ) -> Result<Workspace, ApiError> {
        self.patch(&format!("/workspaces/{domain}"), ops).await
    }

    /// Delete a workspace.
    pub async fn delete_workspace(&self, domain: &str) -> Result<(), ApiError> {
        self.delete(&format!("/workspaces/{domain}")).await
    }
}

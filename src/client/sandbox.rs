//! Sandbox endpoints. Start and stop return immediately; see
//! [`crate::sandbox_wait`] for waiting on the result.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{ApiError, BuddyClient, NameRef};

/// A sandbox as returned by the Service.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Sandbox {
    /// Service identifier.
    pub id: String,
    /// API URL.
    pub url: String,
    /// Link to the web UI.
    pub html_url: String,
    /// Sandbox name.
    pub name: String,
    /// Stable handle used in YAML.
    pub identifier: String,
    /// Base image, e.g. `ubuntu:24.04`.
    pub os: String,
    /// CPU and memory size, e.g. `2x4`.
    pub resources: String,
    /// Shell commands run during setup.
    pub install_commands: String,
    /// Application command.
    pub run_command: String,
    /// Working directory of the app command.
    pub app_dir: String,
    /// `CMD` or `SERVICE`.
    pub app_type: String,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Exposed endpoints by name.
    pub endpoints: BTreeMap<String, String>,
    /// Lifecycle status: CREATING, STARTING, RUNNING, STOPPING, STOPPED, FAILED.
    pub status: String,
    /// Setup script status: INPROGRESS, SUCCESS, FAILED.
    pub setup_status: String,
    /// Application status: NONE, RUNNING, ENDED, FAILED.
    pub app_status: String,
    /// Command that opens an SSH session.
    pub ssh_command: String,
    /// Project the sandbox belongs to.
    pub project: Option<NameRef>,
}

/// Create and update payload for a sandbox.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SandboxOps {
    /// Sandbox name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Stable handle used in YAML.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// Base image, e.g. `ubuntu:24.04`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    /// CPU and memory size, e.g. `2x4`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<String>,
    /// Shell commands run during setup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_commands: Option<String>,
    /// Application command.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_command: Option<String>,
    /// Working directory of the app command.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_dir: Option<String>,
    /// `CMD` or `SERVICE`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_type: Option<String>,
    /// Free-form tags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Exposed endpoints by name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<BTreeMap<String, String>>,
}

impl BuddyClient {
    /// Create a sandbox.
    pub async fn create_sandbox(
        &self,
        domain: &str,
        project: &str,
        ops: &SandboxOps,
    ) -> Result<Sandbox, ApiError> {
        self.post(
            &format!("/workspaces/{domain}/sandboxes?project_name={project}"),
            ops,
        )
        .await
    }

    /// Fetch a sandbox.
    pub async fn get_sandbox(&self, domain: &str, sandbox_id: &str) -> Result<Sandbox, ApiError> {
        self.get(&format!("/workspaces/{domain}/sandboxes/{sandbox_id}"))
            .await
    }

    /// Update a sandbox.
    pub async fn update_sandbox(
        &self,
        domain: &str,
        sandbox_id: &str,
        ops: &SandboxOps,
    ) -> Result<Sandbox, ApiError> {
        self.patch(&format!("/workspaces/{domain}/sandboxes/{sandbox_id}"), ops)
            .await
    }

    /// Delete a sandbox.
    pub async fn delete_sandbox(&self, domain: &str, sandbox_id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/workspaces/{domain}/sandboxes/{sandbox_id}"))
            .await
    }

    /// Request a start. Returns before the sandbox is running.
    pub async fn start_sandbox(&self, domain: &str, sandbox_id: &str) -> Result<(), ApiError> {
        self.post_action(&format!("/workspaces/{domain}/sandboxes/{sandbox_id}/start"))
            .await
    }

    /// Request a stop. Returns before the sandbox is stopped.
    pub async fn stop_sandbox(&self, domain: &str, sandbox_id: &str) -> Result<(), ApiError> {
        self.post_action(&format!("/workspaces/{domain}/sandboxes/{sandbox_id}/stop"))
            .await
    }
}

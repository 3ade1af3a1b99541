//! Projects and their member and group grants.

use serde::{Deserialize, Serialize};

use super::{ApiError, BuddyClient, HashIdRef, IdRef};

/// A project as returned by the Service.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Project {
    /// API URL.
    pub url: String,
    /// Link to the web UI.
    pub html_url: String,
    /// URL handle.
    pub name: String,
    /// Human-readable name.
    pub display_name: String,
    /// Status reported by the Service.
    pub status: String,
    /// Creation timestamp as sent by the Service.
    pub create_date: String,
    /// `PRIVATE` or `PUBLIC`.
    pub access: String,
    /// Whether pull requests are built.
    pub allow_pull_requests: bool,
    /// Whether submodules are fetched.
    pub fetch_submodules: bool,
    /// SSH key variable used for submodules.
    pub fetch_submodules_env_key: String,
    /// Default branch of the repository.
    pub default_branch: String,
    /// Integration backing the repository.
    pub integration: Option<HashIdRef>,
    /// Repository ID on the Git hosting side.
    pub external_project_id: String,
    /// GitLab project ID.
    pub git_lab_project_id: String,
    /// URL of a repository not backed by an integration.
    pub custom_repo_url: String,
    /// Username for the custom repository.
    pub custom_repo_user: String,
    /// SSH key variable used to clone the custom repository.
    pub custom_repo_ssh_key_id: Option<i64>,
    /// Whether the default branch follows the repository host.
    pub update_default_branch_from_external: bool,
    /// Whether the project has no repository.
    pub without_repository: bool,
}

/// Create and update payload for a project. Fields left `None` are not
/// sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectOps {
    /// URL handle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Human-readable name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Integration backing the repository.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integration: Option<HashIdRef>,
    /// Repository ID on the Git hosting side.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_project_id: Option<String>,
    /// GitLab project ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_lab_project_id: Option<String>,
    /// URL of a repository not backed by an integration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_repo_url: Option<String>,
    /// Username for the custom repository.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_repo_user: Option<String>,
    /// Password for the custom repository. Never returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_repo_pass: Option<String>,
    /// SSH key variable used to clone the custom repository.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_repo_ssh_key_id: Option<i64>,
    /// `PRIVATE` or `PUBLIC`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<String>,
    /// Whether pull requests are built.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_pull_requests: Option<bool>,
    /// Whether submodules are fetched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_submodules: Option<bool>,
    /// SSH key variable used for submodules.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_submodules_env_key: Option<String>,
    /// Whether the default branch follows the repository host.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_default_branch_from_external: Option<bool>,
    /// Whether the project has no repository.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub without_repository: Option<bool>,
}

/// A workspace member or group attached to a project, with its permission set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectPrincipal {
    /// Member or group ID.
    pub id: i64,
    /// Link to the web UI.
    pub html_url: String,
    /// Member or group name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Avatar image URL.
    pub avatar_url: String,
    /// Whether the member administers the workspace.
    pub admin: bool,
    /// Whether the member owns the workspace.
    pub workspace_owner: bool,
    /// Permission set granted.
    pub permission_set: Option<IdRef>,
}

#[derive(Debug, Serialize)]
struct ProjectPrincipalOps {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
    permission_set: IdRef,
}

#[derive(Debug, Deserialize)]
struct ProjectList {
    #[serde(default)]
    projects: Vec<Project>,
}

impl BuddyClient {
    /// Create a project.
    pub async fn create_project(
        &self,
        domain: &str,
        ops: &ProjectOps,
    ) -> Result<Project, ApiError> {
        self.post(&format!("/workspaces/{domain}/projects"), ops).await
    }

    /// Fetch a project.
    pub async fn get_project(&self, domain: &str, name: &str) -> Result<Project, ApiError> {
        self.get(&format!("/workspaces/{domain}/projects/{name}")).await
    }

    /// Every project in the workspace.
    pub async fn list_projects(&self, domain: &str) -> Result<Vec<Project>, ApiError> {
        let list: ProjectList = self.get(&format!("/workspaces/{domain}/projects")).await?;
        Ok(list.projects)
    }

    /// Update a project.
    pub async fn update_project(
        &self,
        domain: &str,
        name: &str,
        ops: &ProjectOps,
    ) -> Result<Project, ApiError> {
        self.patch(&format!("/workspaces/{domain}/projects/{name}"), ops)
            .await
    }

    /// Delete a project.
    pub async fn delete_project(&self, domain: &str, name: &str) -> Result<(), ApiError> {
        self.delete(&format!("/workspaces/{domain}/projects/{name}"))
            .await
    }

    /// Add a project member.
    pub async fn add_project_member(
        &self,
        domain: &str,
        project: &str,
        member_id: i64,
        permission_id: i64,
    ) -> Result<ProjectPrincipal, ApiError> {
        let ops = ProjectPrincipalOps {
            id: Some(member_id),
            permission_set: IdRef { id: permission_id },
        };
        self.post(&format!("/workspaces/{domain}/projects/{project}/members"), &ops)
            .await
    }

    /// Fetch a project member.
    pub async fn get_project_member(
        &self,
        domain: &str,
        project: &str,
        member_id: i64,
    ) -> Result<ProjectPrincipal, ApiError> {
        self.get(&format!(
            "/workspaces/{domain}/projects/{project}/members/{member_id}"
        ))
        .await
    }

    /// Update a project member.
    pub async fn update_project_member(
        &self,
        domain: &str,
        project: &str,
        member_id: i64,
        permission_id: i64,
    ) -> Result<ProjectPrincipal, ApiError> {
        let ops = ProjectPrincipalOps {
            id: None,
            permission_set: IdRef { id: permission_id },
        };
        self.patch(
            &format!("/workspaces/{domain}/projects/{project}/members/{member_id}"),
            &ops,
        )
        .await
    }

    /// Remove a project member.
    pub async fn remove_project_member(
        &self,
        domain: &str,
        project: &str,
        member_id: i64,
    ) -> Result<(), ApiError> {
        self.delete(&format!(
            "/workspaces/{domain}/projects/{project}/members/{member_id}"
        ))
        .await
    }

    /// Add a project group.
    pub async fn add_project_group(
        &self,
        domain: &str,
        project: &str,
        group_id: i64,
        permission_id: i64,
    ) -> Result<ProjectPrincipal, ApiError> {
        let ops = ProjectPrincipalOps {
            id: Some(group_id),
            permission_set: IdRef { id: permission_id },
        };
        self.post(&format!("/workspaces/{domain}/projects/{project}/groups"), &ops)
            .await
    }

    /// Fetch a project group.
    pub async fn get_project_group(
        &self,
        domain: &str,
        project: &str,
        group_id: i64,
    ) -> Result<ProjectPrincipal, ApiError> {
        self.get(&format!(
            "/workspaces/{domain}/projects/{project}/groups/{group_id}"
        ))
        .await
    }

    /// Update a project group.
    pub async fn update_project_group(
        &self,
        domain: &str,
        project: &str,
        group_id: i64,
        permission_id: i64,
    ) -> Result<ProjectPrincipal, ApiError> {
        let ops = ProjectPrincipalOps {
            id: None,
            permission_set: IdRef { id: permission_id },
        };
        self.patch(
            &format!("/workspaces/{domain}/projects/{project}/groups/{group_id}"),
            &ops,
        )
        .await
    }

    /// Remove a project group.
    pub async fn remove_project_group(
        &self,
        domain: &str,
        project: &str,
        group_id: i64,
    ) -> Result<(), ApiError> {
        self.delete(&format!(
            "/workspaces/{domain}/projects/{project}/groups/{group_id}"
        ))
        .await
    }
}

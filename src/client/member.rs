//! Members, groups, group membership and permission sets.

use serde::{Deserialize, Serialize};

use super::{ApiError, BuddyClient};

/// A workspace member.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Member {
    /// Service identifier.
    pub id: i64,
    /// API URL.
    pub url: String,
    /// Link to the web UI.
    pub html_url: String,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Avatar image URL.
    pub avatar_url: String,
    /// Whether the member administers the workspace.
    pub admin: bool,
    /// Whether the member owns the workspace.
    pub workspace_owner: bool,
    /// Whether new projects get this principal automatically.
    pub auto_assign_to_new_projects: bool,
    /// Permission set used when auto-assigning to new projects.
    pub auto_assign_permission_set_id: Option<i64>,
    /// Only set for group memberships.
    pub status: String,
}

/// Update payload for a member. Also used for group memberships (`status`).
#[derive(Debug, Clone, Default, Serialize)]
pub struct MemberOps {
    /// Whether the member administers the workspace.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<bool>,
    /// Whether new projects get this principal automatically.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_assign_to_new_projects: Option<bool>,
    /// Permission set used when auto-assigning to new projects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_assign_permission_set_id: Option<i64>,
    /// Group membership status, `MEMBER` or `MANAGER`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
struct MemberInvite<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct GroupMemberAdd<'a> {
    id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<&'a str>,
}

/// A workspace group.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Group {
    /// Service identifier.
    pub id: i64,
    /// API URL.
    pub url: String,
    /// Link to the web UI.
    pub html_url: String,
    /// Group name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Whether new projects get this principal automatically.
    pub auto_assign_to_new_projects: bool,
    /// Permission set used when auto-assigning to new projects.
    pub auto_assign_permission_set_id: Option<i64>,
}

/// Create and update payload for a group.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GroupOps {
    /// Group name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Free-form description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether new projects get this principal automatically.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_assign_to_new_projects: Option<bool>,
    /// Permission set used when auto-assigning to new projects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_assign_permission_set_id: Option<i64>,
}

/// A permission set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Permission {
    /// Service identifier.
    pub id: i64,
    /// API URL.
    pub url: String,
    /// Link to the web UI.
    pub html_url: String,
    /// Permission set name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// `DEVELOPER`, `READ_ONLY` or `CUSTOM`.
    #[serde(rename = "type")]
    pub permission_type: String,
    /// Access to pipelines.
    pub pipeline_access_level: String,
    /// Access to the repository.
    pub repository_access_level: String,
    /// Access to sandboxes.
    pub sandbox_access_level: String,
    /// Access to project team settings.
    pub project_team_access_level: String,
    /// Access to targets.
    pub target_access_level: String,
    /// Access to environments.
    pub environment_access_level: String,
}

/// Create and update payload for a permission set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PermissionOps {
    /// Permission set name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Free-form description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Access to pipelines.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline_access_level: Option<String>,
    /// Access to the repository.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_access_level: Option<String>,
    /// Access to sandboxes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sandbox_access_level: Option<String>,
    /// Access to project team settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_team_access_level: Option<String>,
    /// Access to targets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_access_level: Option<String>,
    /// Access to environments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_access_level: Option<String>,
}

impl BuddyClient {
    /// Invite `email` to the workspace. Returns the new member.
    pub async fn invite_member(&self, domain: &str, email: &str) -> Result<Member, ApiError> {
        self.post(
            &format!("/workspaces/{domain}/members"),
            &MemberInvite { email },
        )
        .await
    }

    /// Fetch a member.
    pub async fn get_member(&self, domain: &str, member_id: i64) -> Result<Member, ApiError> {
        self.get(&format!("/workspaces/{domain}/members/{member_id}"))
            .await
    }

    /// Update a member.
    pub async fn update_member(
        &self,
        domain: &str,
        member_id: i64,
        ops: &MemberOps,
    ) -> Result<Member, ApiError> {
        self.patch(&format!("/workspaces/{domain}/members/{member_id}"), ops)
            .await
    }

    /// Remove a member.
    pub async fn remove_member(&self, domain: &str, member_id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/workspaces/{domain}/members/{member_id}"))
            .await
    }

    /// Create a group.
    pub async fn create_group(&self, domain: &str, ops: &GroupOps) -> Result<Group, ApiError> {
        self.post(&format!("/workspaces/{domain}/groups"), ops).await
    }

    /// Fetch a group.
    pub async fn get_group(&self, domain: &str, group_id: i64) -> Result<Group, ApiError> {
        self.get(&format!("/workspaces/{domain}/groups/{group_id}"))
            .await
    }

    /// Update a group.
    pub async fn update_group(
        &self,
        domain: &str,
        group_id: i64,
        ops: &GroupOps,
    ) -> Result<Group, ApiError> {
        self.patch(&format!("/workspaces/{domain}/groups/{group_id}"), ops)
            .await
    }

    /// Delete a group.
    pub async fn delete_group(&self, domain: &str, group_id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/workspaces/{domain}/groups/{group_id}"))
            .await
    }

    /// Add a group member.
    pub async fn add_group_member(
        &self,
        domain: &str,
        group_id: i64,
        member_id: i64,
        status: Option<&str>,
    ) -> Result<Member, ApiError> {
        self.post(
            &format!("/workspaces/{domain}/groups/{group_id}/members"),
            &GroupMemberAdd {
                id: member_id,
                status,
            },
        )
        .await
    }

    /// Fetch a group member.
    pub async fn get_group_member(
        &self,
        domain: &str,
        group_id: i64,
        member_id: i64,
    ) -> Result<Member, ApiError> {
        self.get(&format!(
            "/workspaces/{domain}/groups/{group_id}/members/{member_id}"
        ))
        .await
    }

    /// Update a group member.
    pub async fn update_group_member(
        &self,
        domain: &str,
        group_id: i64,
        member_id: i64,
        status: &str,
    ) -> Result<Member, ApiError> {
        let ops = MemberOps {
            status: Some(status.to_string()),
            ..Default::default()
        };
        self.patch(
            &format!("/workspaces/{domain}/groups/{group_id}/members/{member_id}"),
            &ops,
        )
        .await
    }

    /// Remove a group member.
    pub async fn remove_group_member(
        &self,
        domain: &str,
        group_id: i64,
        member_id: i64,
    ) -> Result<(), ApiError> {
        self.delete(&format!(
            "/workspaces/{domain}/groups/{group_id}/members/{member_id}"
        ))
        .await
    }

    /// Create a permission.
    pub async fn create_permission(
        &self,
        domain: &str,
        ops: &PermissionOps,
    ) -> Result<Permission, ApiError> {
        self.post(&format!("/workspaces/{domain}/permissions"), ops)
            .await
    }

    /// Fetch a permission.
    pub async fn get_permission(
        &self,
        domain: &str,
        permission_id: i64,
    ) -> Result<Permission, ApiError> {
        self.get(&format!("/workspaces/{domain}/permissions/{permission_id}"))
            .await
    }

    /// Update a permission.
    pub async fn update_permission(
        &self,
        domain: &str,
        permission_id: i64,
        ops: &PermissionOps,
    ) -> Result<Permission, ApiError> {
        self.patch(
            &format!("/workspaces/{domain}/permissions/{permission_id}"),
            ops,
        )
        .await
    }

    /// Delete a permission.
    pub async fn delete_permission(
        &self,
        domain: &str,
        permission_id: i64,
    ) -> Result<(), ApiError> {
        self.delete(&format!("/workspaces/{domain}/permissions/{permission_id}"))
            .await
    }
}

//! `buddy_project_member`: grants a member a permission set on a project.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::client::ProjectPrincipal;
use crate::convert::required;
use crate::error::{ApiResultExt, ProviderError};
use crate::identity::{compose_triple, decompose_triple, parse_component};
use crate::schema::{Attribute, Schema};
use crate::value::{BoolValue, Int64Value, StringValue, Value};

use super::workspace::domain_attribute;
use super::{imported, Context, Resource};

/// A member's permission set on a project.
pub struct ProjectMemberResource;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectMemberState {
    pub id: StringValue,
    pub domain: StringValue,
    pub project_name: StringValue,
    pub member_id: Int64Value,
    pub permission_id: Int64Value,
    pub name: StringValue,
    pub email: StringValue,
    pub avatar_url: StringValue,
    pub admin: BoolValue,
    pub workspace_owner: BoolValue,
    pub html_url: StringValue,
}

impl ProjectMemberState {
    fn apply(&mut self, domain: &str, project: &str, m: &ProjectPrincipal) {
        self.id = Value::Known(compose_triple(domain, project, m.id));
        self.domain = Value::Known(domain.to_string());
        self.project_name = Value::Known(project.to_string());
        self.member_id = Value::Known(m.id);
        if let Some(set) = m.permission_set {
            self.permission_id = Value::Known(set.id);
        }
        self.name = Value::Known(m.name.clone());
        self.email = Value::Known(m.email.clone());
        self.avatar_url = Value::Known(m.avatar_url.clone());
        self.admin = Value::Known(m.admin);
        self.workspace_owner = Value::Known(m.workspace_owner);
        self.html_url = Value::Known(m.html_url.clone());
    }
}

fn keys(id: &StringValue) -> Result<(String, String, i64), ProviderError> {
    let raw = required(id, "id")?;
    let (domain, project, member) = decompose_triple(raw)?;
    Ok((domain, project, parse_component(raw, &member)?))
}

#[async_trait]
impl Resource for ProjectMemberResource {
    type State = ProjectMemberState;

    fn name(&self) -> &'static str {
        "buddy_project_member"
    }

    fn schema(&self) -> Schema {
        Schema::resource("A workspace member's access to a project")
            .with_attribute("domain", domain_attribute())
            .with_attribute("project_name", Attribute::required_string().requires_replace())
            .with_attribute("member_id", Attribute::required_int64().requires_replace())
            .with_attribute(
                "permission_id",
                Attribute::required_int64()
                    .with_description("Permission set granted in the project"),
            )
            .with_attribute("name", Attribute::computed_string())
            .with_attribute("email", Attribute::computed_string())
            .with_attribute("avatar_url", Attribute::computed_string())
            .with_attribute("admin", Attribute::computed_bool())
            .with_attribute("workspace_owner", Attribute::computed_bool())
            .with_attribute("html_url", Attribute::computed_string())
    }

    async fn create(
        &self,
        ctx: &Context,
        planned: ProjectMemberState,
    ) -> Result<ProjectMemberState, ProviderError> {
        let domain = required(&planned.domain, "domain")?.clone();
        let project = required(&planned.project_name, "project_name")?.clone();
        let member_id = *required(&planned.member_id, "member_id")?;
        let permission_id = *required(&planned.permission_id, "permission_id")?;
        let member = ctx
            .client
            .add_project_member(&domain, &project, member_id, permission_id)
            .await
            .or_api_err("add project member")?;
        info!(domain = %domain, project = %project, member_id, "Added member to project");

        let mut state = planned;
        state.apply(&domain, &project, &member);
        Ok(state)
    }

    async fn read(
        &self,
        ctx: &Context,
        current: ProjectMemberState,
    ) -> Result<Option<ProjectMemberState>, ProviderError> {
        let (domain, project, member_id) = keys(&current.id)?;
        let Some(member) = ctx
            .client
            .get_project_member(&domain, &project, member_id)
            .await
            .found("read project member")?
        else {
            warn!(
                domain = %domain,
                project = %project,
                member_id,
                "Project member no longer exists, removing from state"
            );
            return Ok(None);
        };
        let mut state = current;
        state.apply(&domain, &project, &member);
        Ok(Some(state))
    }

    async fn update(
        &self,
        ctx: &Context,
        prior: ProjectMemberState,
        planned: ProjectMemberState,
    ) -> Result<ProjectMemberState, ProviderError> {
        let (domain, project, member_id) = keys(&prior.id)?;
        let permission_id = *required(&planned.permission_id, "permission_id")?;
        let member = ctx
            .client
            .update_project_member(&domain, &project, member_id, permission_id)
            .await
            .or_api_err("update project member")?;
        let mut state = planned;
        state.apply(&domain, &project, &member);
        Ok(state)
    }

    async fn delete(
        &self,
        ctx: &Context,
        current: ProjectMemberState,
    ) -> Result<(), ProviderError> {
        let (domain, project, member_id) = keys(&current.id)?;
        ctx.client
            .remove_project_member(&domain, &project, member_id)
            .await
            .ignore_not_found("remove project member")?;
        info!(domain = %domain, project = %project, member_id, "Removed member from project");
        Ok(())
    }

    async fn import(&self, ctx: &Context, id: &str) -> Result<ProjectMemberState, ProviderError> {
        let state = ProjectMemberState {
            id: Value::Known(id.to_string()),
            ..Default::default()
        };
        keys(&state.id)?;
        imported(id, self.read(ctx, state).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::IdRef;

    #[test]
    fn test_apply_reads_permission_set() {
        let mut state = ProjectMemberState {
            permission_id: Value::Known(1),
            ..Default::default()
        };
        state.apply(
            "acme",
            "backend",
            &ProjectPrincipal {
                id: 7,
                permission_set: Some(IdRef { id: 4 }),
                ..Default::default()
            },
        );
        assert_eq!(state.id.as_str(), "acme:backend:7");
        assert_eq!(state.permission_id, Value::Known(4));
    }
}

//! `buddy_project_group`: grants a group a permission set on a project.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::client::ProjectPrincipal;
use crate::convert::required;
use crate::error::{ApiResultExt, ProviderError};
use crate::identity::{compose_triple, decompose_triple, parse_component};
use crate::schema::{Attribute, Schema};
use crate::value::{Int64Value, StringValue, Value};

use super::workspace::domain_attribute;
use super::{imported, Context, Resource};

/// A group's access to a project.
pub struct ProjectGroupResource;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectGroupState {
    pub id: StringValue,
    pub domain: StringValue,
    pub project_name: StringValue,
    pub group_id: Int64Value,
    pub permission_id: Int64Value,
    pub name: StringValue,
    pub html_url: StringValue,
}

impl ProjectGroupState {
    fn apply(&mut self, domain: &str, project: &str, g: &ProjectPrincipal) {
        self.id = Value::Known(compose_triple(domain, project, g.id));
        self.domain = Value::Known(domain.to_string());
        self.project_name = Value::Known(project.to_string());
        self.group_id = Value::Known(g.id);
        if let Some(set) = g.permission_set {
            self.permission_id = Value::Known(set.id);
        }
        self.name = Value::Known(g.name.clone());
        self.html_url = Value::Known(g.html_url.clone());
    }
}

fn keys(id: &StringValue) -> Result<(String, String, i64), ProviderError> {
    let raw = required(id, "id")?;
    let (domain, project, group) = decompose_triple(raw)?;
    Ok((domain, project, parse_component(raw, &group)?))
}

#[async_trait]
impl Resource for ProjectGroupResource {
    type State = ProjectGroupState;

    fn name(&self) -> &'static str {
        "buddy_project_group"
    }

    fn schema(&self) -> Schema {
        Schema::resource("A group's access to a project")
            .with_attribute("domain", domain_attribute())
            .with_attribute("project_name", Attribute::required_string().requires_replace())
            .with_attribute("group_id", Attribute::required_int64().requires_replace())
            .with_attribute("permission_id", Attribute::required_int64())
            .with_attribute("name", Attribute::computed_string())
            .with_attribute("html_url", Attribute::computed_string())
    }

    async fn create(
        &self,
        ctx: &Context,
        planned: ProjectGroupState,
    ) -> Result<ProjectGroupState, ProviderError> {
        let domain = required(&planned.domain, "domain")?.clone();
        let project = required(&planned.project_name, "project_name")?.clone();
        let group_id = *required(&planned.group_id, "group_id")?;
        let permission_id = *required(&planned.permission_id, "permission_id")?;
        let group = ctx
            .client
            .add_project_group(&domain, &project, group_id, permission_id)
            .await
            .or_api_err("add project group")?;
        info!(domain = %domain, project = %project, group_id, "Added group to project");

        let mut state = planned;
        state.apply(&domain, &project, &group);
        Ok(state)
    }

    async fn read(
        &self,
        ctx: &Context,
        current: ProjectGroupState,
    ) -> Result<Option<ProjectGroupState>, ProviderError> {
        let (domain, project, group_id) = keys(&current.id)?;
        let Some(group) = ctx
            .client
            .get_project_group(&domain, &project, group_id)
            .await
            .found("read project group")?
        else {
            warn!(
                domain = %domain,
                project = %project,
                group_id,
                "Project group no longer exists, removing from state"
            );
            return Ok(None);
        };
        let mut state = current;
        state.apply(&domain, &project, &group);
        Ok(Some(state))
    }

    async fn update(
        &self,
        ctx: &Context,
        prior: ProjectGroupState,
        planned: ProjectGroupState,
    ) -> Result<ProjectGroupState, ProviderError> {
        let (domain, project, group_id) = keys(&prior.id)?;
        let permission_id = *required(&planned.permission_id, "permission_id")?;
        let group = ctx
            .client
            .update_project_group(&domain, &project, group_id, permission_id)
            .await
            .or_api_err("update project group")?;
        let mut state = planned;
        state.apply(&domain, &project, &group);
        Ok(state)
    }

    async fn delete(&self, ctx: &Context, current: ProjectGroupState) -> Result<(), ProviderError> {
        let (domain, project, group_id) = keys(&current.id)?;
        ctx.client
            .remove_project_group(&domain, &project, group_id)
            .await
            .ignore_not_found("remove project group")?;
        info!(domain = %domain, project = %project, group_id, "Removed group from project");
        Ok(())
    }

    async fn import(&self, ctx: &Context, id: &str) -> Result<ProjectGroupState, ProviderError> {
        let state = ProjectGroupState {
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

    #[test]
    fn test_keys_need_numeric_group() {
        let id = Value::Known("acme:backend:9".to_string());
        assert_eq!(keys(&id).unwrap(), ("acme".to_string(), "backend".to_string(), 9));
        assert!(keys(&Value::Known("acme:backend:devs".to_string())).is_err());
    }

    #[test]
    fn test_apply_keeps_permission_without_set() {
        let mut state = ProjectGroupState {
            permission_id: Value::Known(3),
            ..Default::default()
        };
        state.apply(
            "acme",
            "backend",
            &ProjectPrincipal {
                id: 9,
                name: "devs".to_string(),
                ..Default::default()
            },
        );
        assert_eq!(state.id.as_str(), "acme:backend:9");
        assert_eq!(state.permission_id, Value::Known(3));
    }
}

//! `buddy_group`, ID `<domain>:<group_id>`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::client::{Group, GroupOps};
use crate::convert::required;
use crate::error::{ApiResultExt, ProviderError};
use crate::identity::{compose_double, decompose_double, parse_component};
use crate::schema::{Attribute, Schema};
use crate::value::{BoolValue, Int64Value, StringValue, Value};

use super::workspace::domain_attribute;
use super::{imported, Context, Resource};

/// Member groups.
pub struct GroupResource;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupState {
    pub id: StringValue,
    pub domain: StringValue,
    pub name: StringValue,
    pub description: StringValue,
    pub auto_assign_to_new_projects: BoolValue,
    pub auto_assign_permission_set_id: Int64Value,
    pub group_id: Int64Value,
    pub html_url: StringValue,
}

impl GroupState {
    fn to_ops(&self) -> GroupOps {
        GroupOps {
            name: self.name.cloned(),
            description: self.description.cloned(),
            auto_assign_to_new_projects: self.auto_assign_to_new_projects.cloned(),
            auto_assign_permission_set_id: self.auto_assign_permission_set_id.cloned(),
        }
    }

    fn apply(&mut self, domain: &str, g: &Group) {
        self.id = Value::Known(compose_double(domain, g.id));
        self.domain = Value::Known(domain.to_string());
        self.group_id = Value::Known(g.id);
        self.name = Value::Known(g.name.clone());
        self.description = StringValue::non_empty(Some(g.description.clone()));
        self.auto_assign_to_new_projects = Value::Known(g.auto_assign_to_new_projects);
        self.auto_assign_permission_set_id = Value::from_option(g.auto_assign_permission_set_id);
        self.html_url = Value::Known(g.html_url.clone());
    }
}

fn keys(id: &StringValue) -> Result<(String, i64), ProviderError> {
    let raw = required(id, "id")?;
    let (domain, group) = decompose_double(raw)?;
    Ok((domain, parse_component(raw, &group)?))
}

#[async_trait]
impl Resource for GroupResource {
    type State = GroupState;

    fn name(&self) -> &'static str {
        "buddy_group"
    }

    fn schema(&self) -> Schema {
        Schema::resource("A group of workspace members")
            .with_attribute("domain", domain_attribute())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("description", Attribute::optional_string())
            .with_attribute(
                "auto_assign_to_new_projects",
                Attribute::optional_computed_bool(),
            )
            .with_attribute("auto_assign_permission_set_id", Attribute::optional_int64())
            .with_attribute("group_id", Attribute::computed_int64().use_state_for_unknown())
            .with_attribute("html_url", Attribute::computed_string().use_state_for_unknown())
    }

    async fn create(
        &self,
        ctx: &Context,
        planned: GroupState,
    ) -> Result<GroupState, ProviderError> {
        let domain = required(&planned.domain, "domain")?.clone();
        let group = ctx
            .client
            .create_group(&domain, &planned.to_ops())
            .await
            .or_api_err("create group")?;
        info!(domain = %domain, group_id = group.id, "Created group");

        let mut state = planned;
        state.apply(&domain, &group);
        Ok(state)
    }

    async fn read(
        &self,
        ctx: &Context,
        current: GroupState,
    ) -> Result<Option<GroupState>, ProviderError> {
        let (domain, group_id) = keys(&current.id)?;
        let Some(group) = ctx
            .client
            .get_group(&domain, group_id)
            .await
            .found("read group")?
        else {
            warn!(domain = %domain, group_id, "Group no longer exists, removing from state");
            return Ok(None);
        };
        let mut state = current;
        state.apply(&domain, &group);
        Ok(Some(state))
    }

    async fn update(
        &self,
        ctx: &Context,
        prior: GroupState,
        planned: GroupState,
    ) -> Result<GroupState, ProviderError> {
        let (domain, group_id) = keys(&prior.id)?;
        let group = ctx
            .client
            .update_group(&domain, group_id, &planned.to_ops())
            .await
            .or_api_err("update group")?;
        let mut state = planned;
        state.apply(&domain, &group);
        Ok(state)
    }

    async fn delete(&self, ctx: &Context, current: GroupState) -> Result<(), ProviderError> {
        let (domain, group_id) = keys(&current.id)?;
        ctx.client
            .delete_group(&domain, group_id)
            .await
            .ignore_not_found("delete group")?;
        info!(domain = %domain, group_id, "Deleted group");
        Ok(())
    }

    async fn import(&self, ctx: &Context, id: &str) -> Result<GroupState, ProviderError> {
        let state = GroupState {
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
    fn test_empty_description_reads_as_null() {
        let mut state = GroupState::default();
        state.apply(
            "acme",
            &Group {
                id: 3,
                name: "devs".to_string(),
                ..Default::default()
            },
        );
        assert_eq!(state.id.as_str(), "acme:3");
        assert!(state.description.is_null());
        assert_eq!(state.auto_assign_to_new_projects, Value::Known(false));
    }

    #[test]
    fn test_keys() {
        assert_eq!(
            keys(&Value::Known("acme:3".to_string())).unwrap(),
            ("acme".to_string(), 3)
        );
        assert!(keys(&Value::Known("acme".to_string())).is_err());
        assert!(keys(&Value::Null).is_err());
    }
}

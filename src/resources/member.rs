//! `buddy_member`: a workspace member invited by email.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::client::{Member, MemberOps};
use crate::convert::required;
use crate::error::{ApiResultExt, ProviderError};
use crate::identity::{compose_double, decompose_double, parse_component};
use crate::schema::{Attribute, Schema, Validator};
use crate::value::{BoolValue, Int64Value, StringValue, Value};

use super::workspace::domain_attribute;
use super::{imported, Context, Resource};

/// Workspace members.
pub struct MemberResource;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemberState {
    pub id: StringValue,
    pub domain: StringValue,
    pub email: StringValue,
    pub admin: BoolValue,
    pub auto_assign_to_new_projects: BoolValue,
    pub auto_assign_permission_set_id: Int64Value,
    pub member_id: Int64Value,
    pub name: StringValue,
    pub avatar_url: StringValue,
    pub html_url: StringValue,
    pub workspace_owner: BoolValue,
}

impl MemberState {
    fn to_ops(&self) -> MemberOps {
        MemberOps {
            admin: self.admin.cloned(),
            auto_assign_to_new_projects: self.auto_assign_to_new_projects.cloned(),
            auto_assign_permission_set_id: self.auto_assign_permission_set_id.cloned(),
            status: None,
        }
    }

    /// Whether anything beyond the invitation needs to be sent.
    fn has_settings(&self) -> bool {
        self.admin.is_present()
            || self.auto_assign_to_new_projects.is_present()
            || self.auto_assign_permission_set_id.is_present()
    }

    fn apply(&mut self, domain: &str, m: &Member) {
        self.id = Value::Known(compose_double(domain, m.id));
        self.domain = Value::Known(domain.to_string());
        self.member_id = Value::Known(m.id);
        if !m.email.is_empty() {
            self.email = Value::Known(m.email.clone());
        }
        self.admin = Value::Known(m.admin);
        self.auto_assign_to_new_projects = Value::Known(m.auto_assign_to_new_projects);
        self.auto_assign_permission_set_id = Value::from_option(m.auto_assign_permission_set_id);
        self.name = Value::Known(m.name.clone());
        self.avatar_url = Value::Known(m.avatar_url.clone());
        self.html_url = Value::Known(m.html_url.clone());
        self.workspace_owner = Value::Known(m.workspace_owner);
    }
}

fn keys(id: &StringValue) -> Result<(String, i64), ProviderError> {
    let raw = required(id, "id")?;
    let (domain, member) = decompose_double(raw)?;
    Ok((domain, parse_component(raw, &member)?))
}

#[async_trait]
impl Resource for MemberResource {
    type State = MemberState;

    fn name(&self) -> &'static str {
        "buddy_member"
    }

    fn schema(&self) -> Schema {
        Schema::resource("A member of a Buddy workspace, invited by email")
            .with_attribute("domain", domain_attribute())
            .with_attribute("email", Attribute::required_string().requires_replace())
            .with_attribute("admin", Attribute::optional_computed_bool())
            .with_attribute(
                "auto_assign_to_new_projects",
                Attribute::optional_computed_bool(),
            )
            .with_attribute(
                "auto_assign_permission_set_id",
                Attribute::optional_int64()
                    .with_validator(Validator::also_requires(&["auto_assign_to_new_projects"])),
            )
            .with_attribute("member_id", Attribute::computed_int64().use_state_for_unknown())
            .with_attribute("name", Attribute::computed_string())
            .with_attribute("avatar_url", Attribute::computed_string())
            .with_attribute("html_url", Attribute::computed_string().use_state_for_unknown())
            .with_attribute("workspace_owner", Attribute::computed_bool())
    }

    async fn create(
        &self,
        ctx: &Context,
        planned: MemberState,
    ) -> Result<MemberState, ProviderError> {
        let domain = required(&planned.domain, "domain")?.clone();
        let email = required(&planned.email, "email")?;
        let member = ctx
            .client
            .invite_member(&domain, email)
            .await
            .or_api_err("invite member")?;
        info!(domain = %domain, member_id = member.id, "Invited member");

        let ops = planned.to_ops();
        let settings = planned.has_settings();
        let mut state = planned;
        state.apply(&domain, &member);
        if !settings {
            return Ok(state);
        }

        // The member exists from here on; a failed settings call still
        // records it so the next plan retries the settings.
        match ctx
            .client
            .update_member(&domain, member.id, &ops)
            .await
            .or_api_err("update member")
        {
            Ok(member) => {
                state.apply(&domain, &member);
                Ok(state)
            }
            Err(err) => Err(err.with_state(serde_json::to_value(&state)?)),
        }
    }

    async fn read(
        &self,
        ctx: &Context,
        current: MemberState,
    ) -> Result<Option<MemberState>, ProviderError> {
        let (domain, member_id) = keys(&current.id)?;
        let Some(member) = ctx
            .client
            .get_member(&domain, member_id)
            .await
            .found("read member")?
        else {
            warn!(domain = %domain, member_id, "Member no longer exists, removing from state");
            return Ok(None);
        };
        let mut state = current;
        state.apply(&domain, &member);
        Ok(Some(state))
    }

    async fn update(
        &self,
        ctx: &Context,
        prior: MemberState,
        planned: MemberState,
    ) -> Result<MemberState, ProviderError> {
        let (domain, member_id) = keys(&prior.id)?;
        let member = ctx
            .client
            .update_member(&domain, member_id, &planned.to_ops())
            .await
            .or_api_err("update member")?;
        let mut state = planned;
        state.apply(&domain, &member);
        Ok(state)
    }

    async fn delete(&self, ctx: &Context, current: MemberState) -> Result<(), ProviderError> {
        let (domain, member_id) = keys(&current.id)?;
        ctx.client
            .remove_member(&domain, member_id)
            .await
            .ignore_not_found("remove member")?;
        info!(domain = %domain, member_id, "Removed member");
        Ok(())
    }

    async fn import(&self, ctx: &Context, id: &str) -> Result<MemberState, ProviderError> {
        let state = MemberState {
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
    fn test_invite_only_when_no_settings() {
        let state = MemberState {
            email: Value::Known("dev@acme.io".to_string()),
            ..Default::default()
        };
        assert!(!state.has_settings());

        let state = MemberState {
            admin: Value::Known(true),
            ..state
        };
        assert!(state.has_settings());
        assert_eq!(state.to_ops().admin, Some(true));
        assert_eq!(state.to_ops().auto_assign_to_new_projects, None);
    }

    #[test]
    fn test_apply_keeps_configured_email() {
        let mut state = MemberState {
            email: Value::Known("dev@acme.io".to_string()),
            ..Default::default()
        };
        state.apply(
            "acme",
            &Member {
                id: 7,
                name: "Dev".to_string(),
                ..Default::default()
            },
        );
        assert_eq!(state.id.as_str(), "acme:7");
        assert_eq!(state.email.as_str(), "dev@acme.io");
        assert!(state.auto_assign_permission_set_id.is_null());
    }
}

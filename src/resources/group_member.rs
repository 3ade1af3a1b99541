//! `buddy_group_member`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::client::Member;
use crate::convert::required;
use crate::error::{ApiResultExt, ProviderError};
use crate::identity::{compose_triple, decompose_triple, parse_component};
use crate::schema::{Attribute, Schema};
use crate::value::{BoolValue, Int64Value, StringValue, Value};

use super::workspace::domain_attribute;
use super::{imported, Context, Resource};

/// Group membership of a workspace member.
pub struct GroupMemberResource;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupMemberState {
    pub id: StringValue,
    pub domain: StringValue,
    pub group_id: Int64Value,
    pub member_id: Int64Value,
    pub status: StringValue,
    pub email: StringValue,
    pub name: StringValue,
    pub admin: BoolValue,
    pub avatar_url: StringValue,
    pub html_url: StringValue,
}

impl GroupMemberState {
    fn apply(&mut self, domain: &str, group_id: i64, m: &Member) {
        self.id = Value::Known(compose_triple(domain, group_id, m.id));
        self.domain = Value::Known(domain.to_string());
        self.group_id = Value::Known(group_id);
        self.member_id = Value::Known(m.id);
        self.status = StringValue::non_empty(Some(m.status.clone()))
            .or_keep(self.status.clone().resolve_unknown());
        self.email = Value::Known(m.email.clone());
        self.name = Value::Known(m.name.clone());
        self.admin = Value::Known(m.admin);
        self.avatar_url = Value::Known(m.avatar_url.clone());
        self.html_url = Value::Known(m.html_url.clone());
    }
}

fn keys(id: &StringValue) -> Result<(String, i64, i64), ProviderError> {
    let raw = required(id, "id")?;
    let (domain, group, member) = decompose_triple(raw)?;
    Ok((domain, parse_component(raw, &group)?, parse_component(raw, &member)?))
}

#[async_trait]
impl Resource for GroupMemberResource {
    type State = GroupMemberState;

    fn name(&self) -> &'static str {
        "buddy_group_member"
    }

    fn schema(&self) -> Schema {
        Schema::resource("Membership of a workspace member in a group")
            .with_attribute("domain", domain_attribute())
            .with_attribute("group_id", Attribute::required_int64().requires_replace())
            .with_attribute("member_id", Attribute::required_int64().requires_replace())
            .with_attribute(
                "status",
                Attribute::optional_computed_string().one_of(&["MEMBER", "MANAGER"]),
            )
            .with_attribute("email", Attribute::computed_string())
            .with_attribute("name", Attribute::computed_string())
            .with_attribute("admin", Attribute::computed_bool())
            .with_attribute("avatar_url", Attribute::computed_string())
            .with_attribute("html_url", Attribute::computed_string())
    }

    async fn create(
        &self,
        ctx: &Context,
        planned: GroupMemberState,
    ) -> Result<GroupMemberState, ProviderError> {
        let domain = required(&planned.domain, "domain")?.clone();
        let group_id = *required(&planned.group_id, "group_id")?;
        let member_id = *required(&planned.member_id, "member_id")?;
        let member = ctx
            .client
            .add_group_member(
                &domain,
                group_id,
                member_id,
                planned.status.get().map(String::as_str),
            )
            .await
            .or_api_err("add group member")?;
        info!(domain = %domain, group_id, member_id, "Added member to group");

        let mut state = planned;
        state.apply(&domain, group_id, &member);
        Ok(state)
    }

    async fn read(
        &self,
        ctx: &Context,
        current: GroupMemberState,
    ) -> Result<Option<GroupMemberState>, ProviderError> {
        let (domain, group_id, member_id) = keys(&current.id)?;
        let Some(member) = ctx
            .client
            .get_group_member(&domain, group_id, member_id)
            .await
            .found("read group member")?
        else {
            warn!(
                domain = %domain,
                group_id,
                member_id,
                "Group membership no longer exists, removing from state"
            );
            return Ok(None);
        };
        let mut state = current;
        state.apply(&domain, group_id, &member);
        Ok(Some(state))
    }

    async fn update(
        &self,
        ctx: &Context,
        prior: GroupMemberState,
        planned: GroupMemberState,
    ) -> Result<GroupMemberState, ProviderError> {
        let (domain, group_id, member_id) = keys(&prior.id)?;
        let member = match planned.status.get() {
            Some(status) => ctx
                .client
                .update_group_member(&domain, group_id, member_id, status)
                .await
                .or_api_err("update group member")?,
            None => ctx
                .client
                .get_group_member(&domain, group_id, member_id)
                .await
                .or_api_err("read group member")?,
        };
        let mut state = planned;
        state.apply(&domain, group_id, &member);
        Ok(state)
    }

    async fn delete(&self, ctx: &Context, current: GroupMemberState) -> Result<(), ProviderError> {
        let (domain, group_id, member_id) = keys(&current.id)?;
        ctx.client
            .remove_group_member(&domain, group_id, member_id)
            .await
            .ignore_not_found("remove group member")?;
        info!(domain = %domain, group_id, member_id, "Removed member from group");
        Ok(())
    }

    async fn import(&self, ctx: &Context, id: &str) -> Result<GroupMemberState, ProviderError> {
        let state = GroupMemberState {
            id: Value::Known(id.to_string()),
            ..Default::default()
        };
        keys(&state.id)?;
        imported(id, self.read(ctx, state).await?)
    }
}

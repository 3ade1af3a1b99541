//! `buddy_profile`: the display name of the authenticated user. Deleting
//! it only forgets the state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::{Profile, ProfileUpdate};
use crate::convert::required;
use crate::error::{ApiResultExt, ProviderError};
use crate::schema::{Attribute, Schema};
use crate::value::{Int64Value, StringValue, Value};

use super::{imported, Context, Resource};

/// The authenticated user's profile. It always exists, so creating adopts it
/// and destroying only forgets it.
pub struct ProfileResource;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileState {
    pub id: StringValue,
    pub name: StringValue,
    pub member_id: Int64Value,
    pub avatar_url: StringValue,
    pub html_url: StringValue,
}

impl ProfileState {
    fn apply(&mut self, p: &Profile) {
        self.id = Value::Known(p.id.to_string());
        self.member_id = Value::Known(p.id);
        self.name = Value::Known(p.name.clone());
        self.avatar_url = Value::Known(p.avatar_url.clone());
        self.html_url = Value::Known(p.html_url.clone());
    }
}

#[async_trait]
impl Resource for ProfileResource {
    type State = ProfileState;

    fn name(&self) -> &'static str {
        "buddy_profile"
    }

    fn schema(&self) -> Schema {
        Schema::resource("The profile of the authenticated user")
            .with_attribute("name", Attribute::required_string())
            .with_attribute("member_id", Attribute::computed_int64().use_state_for_unknown())
            .with_attribute("avatar_url", Attribute::computed_string())
            .with_attribute("html_url", Attribute::computed_string().use_state_for_unknown())
    }

    async fn create(
        &self,
        ctx: &Context,
        planned: ProfileState,
    ) -> Result<ProfileState, ProviderError> {
        let update = ProfileUpdate {
            name: required(&planned.name, "name")?.clone(),
        };
        let profile = ctx
            .client
            .update_profile(&update)
            .await
            .or_api_err("update profile")?;
        info!(member_id = profile.id, "Updated profile");

        let mut state = planned;
        state.apply(&profile);
        Ok(state)
    }

    async fn read(
        &self,
        ctx: &Context,
        current: ProfileState,
    ) -> Result<Option<ProfileState>, ProviderError> {
        let profile = ctx.client.get_profile().await.or_api_err("read profile")?;
        let mut state = current;
        state.apply(&profile);
        Ok(Some(state))
    }

    async fn update(
        &self,
        ctx: &Context,
        _prior: ProfileState,
        planned: ProfileState,
    ) -> Result<ProfileState, ProviderError> {
        self.create(ctx, planned).await
    }

    async fn delete(&self, _ctx: &Context, _current: ProfileState) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn import(&self, ctx: &Context, id: &str) -> Result<ProfileState, ProviderError> {
        imported(id, self.read(ctx, ProfileState::default()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_is_user_id() {
        let mut state = ProfileState {
            name: Value::Known("Jane".to_string()),
            ..Default::default()
        };
        state.apply(&Profile {
            id: 42,
            name: "Jane Doe".to_string(),
            ..Default::default()
        });
        assert_eq!(state.id.as_str(), "42");
        assert_eq!(state.member_id, Value::Known(42));
        assert_eq!(state.name.as_str(), "Jane Doe");
    }
}

//! `buddy_profile_email`, identified by the address.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::client::ProfileEmail;
use crate::convert::required;
use crate::error::{ApiResultExt, ProviderError};
use crate::schema::{Attribute, Schema};
use crate::value::{BoolValue, StringValue, Value};

use super::{imported, Context, Resource};

/// Additional email addresses of the authenticated user.
pub struct ProfileEmailResource;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileEmailState {
    pub id: StringValue,
    pub email: StringValue,
    pub confirmed: BoolValue,
}

impl ProfileEmailState {
    fn apply(&mut self, e: &ProfileEmail) {
        self.id = Value::Known(e.email.clone());
        self.email = Value::Known(e.email.clone());
        self.confirmed = Value::Known(e.confirmed);
    }
}

#[async_trait]
impl Resource for ProfileEmailResource {
    type State = ProfileEmailState;

    fn name(&self) -> &'static str {
        "buddy_profile_email"
    }

    fn schema(&self) -> Schema {
        Schema::resource("An email address of the authenticated user")
            .with_attribute("email", Attribute::required_string().requires_replace())
            .with_attribute("confirmed", Attribute::computed_bool())
    }

    async fn create(
        &self,
        ctx: &Context,
        planned: ProfileEmailState,
    ) -> Result<ProfileEmailState, ProviderError> {
        let email = required(&planned.email, "email")?.clone();
        let added = ctx
            .client
            .add_profile_email(&email)
            .await
            .or_api_err("add profile email")?;
        info!(email = %email, "Added profile email");

        let mut state = planned;
        state.apply(&added);
        Ok(state)
    }

    async fn read(
        &self,
        ctx: &Context,
        current: ProfileEmailState,
    ) -> Result<Option<ProfileEmailState>, ProviderError> {
        let email = required(&current.id, "id")?.clone();
        let emails = ctx
            .client
            .list_profile_emails()
            .await
            .or_api_err("list profile emails")?;
        let Some(found) = emails.iter().find(|e| e.email == email) else {
            warn!(email = %email, "Profile email no longer exists, removing from state");
            return Ok(None);
        };
        let mut state = current;
        state.apply(found);
        Ok(Some(state))
    }

    async fn update(
        &self,
        _ctx: &Context,
        prior: ProfileEmailState,
        planned: ProfileEmailState,
    ) -> Result<ProfileEmailState, ProviderError> {
        Ok(ProfileEmailState {
            id: prior.id,
            confirmed: prior.confirmed,
            ..planned
        })
    }

    async fn delete(&self, ctx: &Context, current: ProfileEmailState) -> Result<(), ProviderError> {
        let email = required(&current.id, "id")?;
        ctx.client
            .delete_profile_email(email)
            .await
            .ignore_not_found("delete profile email")?;
        info!(email = %email, "Deleted profile email");
        Ok(())
    }

    async fn import(&self, ctx: &Context, id: &str) -> Result<ProfileEmailState, ProviderError> {
        let state = ProfileEmailState {
            id: Value::Known(id.to_string()),
            ..Default::default()
        };
        imported(id, self.read(ctx, state).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_uses_email_as_id() {
        let mut state = ProfileEmailState::default();
        state.apply(&ProfileEmail {
            email: "jane@acme.io".to_string(),
            confirmed: false,
        });
        assert_eq!(state.id.as_str(), "jane@acme.io");
        assert_eq!(state.confirmed, Value::Known(false));
    }

    #[test]
    fn test_email_forces_replacement() {
        let schema = ProfileEmailResource.schema();
        assert!(schema.block.attributes["email"].force_new());
    }
}

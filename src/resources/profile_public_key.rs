//! `buddy_profile_public_key`: an SSH key of the authenticated user.
//! Any change recreates it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::client::{PublicKey, PublicKeyCreate};
use crate::convert::required;
use crate::error::{ApiResultExt, ProviderError};
use crate::identity::parse_component;
use crate::schema::{Attribute, Schema};
use crate::value::{Int64Value, StringValue, Value};

use super::{imported, Context, Resource};

/// An SSH public key of the authenticated user. Keys are immutable.
pub struct ProfilePublicKeyResource;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilePublicKeyState {
    pub id: StringValue,
    pub content: StringValue,
    pub title: StringValue,
    pub key_id: Int64Value,
}

impl ProfilePublicKeyState {
    fn apply(&mut self, k: &PublicKey) {
        self.id = Value::Known(k.id.to_string());
        self.key_id = Value::Known(k.id);
        self.content = Value::Known(k.content.clone());
        self.title = StringValue::non_empty(Some(k.title.clone()));
    }
}

fn key_id(id: &StringValue) -> Result<i64, ProviderError> {
    let raw = required(id, "id")?;
    parse_component(raw, raw)
}

#[async_trait]
impl Resource for ProfilePublicKeyResource {
    type State = ProfilePublicKeyState;

    fn name(&self) -> &'static str {
        "buddy_profile_public_key"
    }

    fn schema(&self) -> Schema {
        Schema::resource("An SSH public key of the authenticated user")
            .with_attribute("content", Attribute::required_string().requires_replace())
            .with_attribute("title", Attribute::optional_string().requires_replace())
            .with_attribute("key_id", Attribute::computed_int64().use_state_for_unknown())
    }

    async fn create(
        &self,
        ctx: &Context,
        planned: ProfilePublicKeyState,
    ) -> Result<ProfilePublicKeyState, ProviderError> {
        let payload = PublicKeyCreate {
            content: required(&planned.content, "content")?.clone(),
            title: planned.title.cloned(),
        };
        let key = ctx
            .client
            .create_public_key(&payload)
            .await
            .or_api_err("create public key")?;
        info!(key_id = key.id, "Created public key");

        let mut state = planned;
        state.apply(&key);
        Ok(state)
    }

    async fn read(
        &self,
        ctx: &Context,
        current: ProfilePublicKeyState,
    ) -> Result<Option<ProfilePublicKeyState>, ProviderError> {
        let key_id = key_id(&current.id)?;
        let Some(key) = ctx
            .client
            .get_public_key(key_id)
            .await
            .found("read public key")?
        else {
            warn!(key_id, "Public key no longer exists, removing from state");
            return Ok(None);
        };
        let mut state = current;
        state.apply(&key);
        Ok(Some(state))
    }

    async fn update(
        &self,
        _ctx: &Context,
        prior: ProfilePublicKeyState,
        planned: ProfilePublicKeyState,
    ) -> Result<ProfilePublicKeyState, ProviderError> {
        Ok(ProfilePublicKeyState {
            id: prior.id,
            key_id: prior.key_id,
            ..planned
        })
    }

    async fn delete(
        &self,
        ctx: &Context,
        current: ProfilePublicKeyState,
    ) -> Result<(), ProviderError> {
        let key_id = key_id(&current.id)?;
        ctx.client
            .delete_public_key(key_id)
            .await
            .ignore_not_found("delete public key")?;
        info!(key_id, "Deleted public key");
        Ok(())
    }

    async fn import(
        &self,
        ctx: &Context,
        id: &str,
    ) -> Result<ProfilePublicKeyState, ProviderError> {
        let state = ProfilePublicKeyState {
            id: Value::Known(id.to_string()),
            ..Default::default()
        };
        key_id(&state.id)?;
        imported(id, self.read(ctx, state).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_id_must_be_numeric() {
        assert_eq!(key_id(&Value::Known("17".to_string())).unwrap(), 17);
        assert!(key_id(&Value::Known("abc".to_string())).is_err());
        assert!(key_id(&Value::Null).is_err());
    }

    #[test]
    fn test_empty_title_reads_as_null() {
        let mut state = ProfilePublicKeyState::default();
        state.apply(&PublicKey {
            id: 3,
            content: "ssh-ed25519 AAAA".to_string(),
            ..Default::default()
        });
        assert!(state.title.is_null());
        assert_eq!(state.id.as_str(), "3");
    }
}

//! `buddy_profile` data source.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ApiResultExt, ProviderError};
use crate::resources::Context;
use crate::schema::{Attribute, Schema};
use crate::value::{Int64Value, StringValue, Value};

use super::DataSource;

/// The user the provider token belongs to.
pub struct ProfileDataSource;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileLookup {
    pub id: StringValue,
    pub member_id: Int64Value,
    pub name: StringValue,
    pub avatar_url: StringValue,
    pub html_url: StringValue,
}

#[async_trait]
impl DataSource for ProfileDataSource {
    type State = ProfileLookup;

    fn name(&self) -> &'static str {
        "buddy_profile"
    }

    fn schema(&self) -> Schema {
        Schema::resource("The authenticated user")
            .with_attribute("member_id", Attribute::computed_int64())
            .with_attribute("name", Attribute::computed_string())
            .with_attribute("avatar_url", Attribute::computed_string())
            .with_attribute("html_url", Attribute::computed_string())
    }

    async fn read(
        &self,
        ctx: &Context,
        _config: ProfileLookup,
    ) -> Result<ProfileLookup, ProviderError> {
        let profile = ctx.client.get_profile().await.or_api_err("read profile")?;
        Ok(ProfileLookup {
            id: Value::Known(profile.id.to_string()),
            member_id: Value::Known(profile.id),
            name: Value::Known(profile.name),
            avatar_url: Value::Known(profile.avatar_url),
            html_url: Value::Known(profile.html_url),
        })
    }
}

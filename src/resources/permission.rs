//! `buddy_permission`: a custom permission set.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::client::{Permission, PermissionOps};
use crate::convert::required;
use crate::error::{ApiResultExt, ProviderError};
use crate::identity::{compose_double, decompose_double, parse_component};
use crate::schema::{Attribute, Schema};
use crate::value::{Int64Value, StringValue, Value};

use super::workspace::domain_attribute;
use super::{imported, Context, Resource};

const USE_LEVELS: &[&str] = &["DENIED", "READ_ONLY", "USE_ONLY", "MANAGE"];

/// Custom permission sets.
pub struct PermissionResource;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionState {
    pub id: StringValue,
    pub domain: StringValue,
    pub name: StringValue,
    pub description: StringValue,
    pub pipeline_access_level: StringValue,
    pub repository_access_level: StringValue,
    pub sandbox_access_level: StringValue,
    pub project_team_access_level: StringValue,
    pub target_access_level: StringValue,
    pub environment_access_level: StringValue,
    pub permission_id: Int64Value,
    #[serde(rename = "type")]
    pub permission_type: StringValue,
    pub html_url: StringValue,
}

impl PermissionState {
    fn to_ops(&self) -> PermissionOps {
        PermissionOps {
            name: self.name.cloned(),
            description: self.description.cloned(),
            pipeline_access_level: self.pipeline_access_level.cloned(),
            repository_access_level: self.repository_access_level.cloned(),
            sandbox_access_level: self.sandbox_access_level.cloned(),
            project_team_access_level: self.project_team_access_level.cloned(),
            target_access_level: self.target_access_level.cloned(),
            environment_access_level: self.environment_access_level.cloned(),
        }
    }

    fn apply(&mut self, domain: &str, p: &Permission) {
        self.id = Value::Known(compose_double(domain, p.id));
        self.domain = Value::Known(domain.to_string());
        self.permission_id = Value::Known(p.id);
        self.name = Value::Known(p.name.clone());
        self.description = StringValue::non_empty(Some(p.description.clone()));
        self.pipeline_access_level = Value::Known(p.pipeline_access_level.clone());
        self.repository_access_level = Value::Known(p.repository_access_level.clone());
        self.sandbox_access_level = Value::Known(p.sandbox_access_level.clone());
        self.project_team_access_level = Value::Known(p.project_team_access_level.clone());
        self.target_access_level = Value::Known(p.target_access_level.clone());
        self.environment_access_level = Value::Known(p.environment_access_level.clone());
        self.permission_type = Value::Known(p.permission_type.clone());
        self.html_url = Value::Known(p.html_url.clone());
    }
}

fn keys(id: &StringValue) -> Result<(String, i64), ProviderError> {
    let raw = required(id, "id")?;
    let (domain, permission) = decompose_double(raw)?;
    Ok((domain, parse_component(raw, &permission)?))
}

#[async_trait]
impl Resource for PermissionResource {
    type State = PermissionState;

    fn name(&self) -> &'static str {
        "buddy_permission"
    }

    fn schema(&self) -> Schema {
        Schema::resource("A workspace permission set")
            .with_attribute("domain", domain_attribute())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("description", Attribute::optional_string())
            .with_attribute(
                "pipeline_access_level",
                Attribute::required_string()
                    .one_of(&["DENIED", "READ_ONLY", "RUN_ONLY", "READ_WRITE"]),
            )
            .with_attribute(
                "repository_access_level",
                Attribute::required_string()
                    .one_of(&["DENIED", "READ_ONLY", "READ_WRITE", "MANAGE"]),
            )
            .with_attribute(
                "sandbox_access_level",
                Attribute::required_string().one_of(&["DENIED", "READ_ONLY", "READ_WRITE"]),
            )
            .with_attribute(
                "project_team_access_level",
                Attribute::optional_computed_string().one_of(&["READ_ONLY", "MANAGE"]),
            )
            .with_attribute(
                "target_access_level",
                Attribute::optional_computed_string().one_of(USE_LEVELS),
            )
            .with_attribute(
                "environment_access_level",
                Attribute::optional_computed_string().one_of(USE_LEVELS),
            )
            .with_attribute("permission_id", Attribute::computed_int64().use_state_for_unknown())
            .with_attribute("type", Attribute::computed_string().use_state_for_unknown())
            .with_attribute("html_url", Attribute::computed_string().use_state_for_unknown())
    }

    async fn create(
        &self,
        ctx: &Context,
        planned: PermissionState,
    ) -> Result<PermissionState, ProviderError> {
        let domain = required(&planned.domain, "domain")?.clone();
        let permission = ctx
            .client
            .create_permission(&domain, &planned.to_ops())
            .await
            .or_api_err("create permission")?;
        info!(domain = %domain, permission_id = permission.id, "Created permission set");

        let mut state = planned;
        state.apply(&domain, &permission);
        Ok(state)
    }

    async fn read(
        &self,
        ctx: &Context,
        current: PermissionState,
    ) -> Result<Option<PermissionState>, ProviderError> {
        let (domain, permission_id) = keys(&current.id)?;
        let Some(permission) = ctx
            .client
            .get_permission(&domain, permission_id)
            .await
            .found("read permission")?
        else {
            warn!(
                domain = %domain,
                permission_id,
                "Permission set no longer exists, removing from state"
            );
            return Ok(None);
        };
        let mut state = current;
        state.apply(&domain, &permission);
        Ok(Some(state))
    }

    async fn update(
        &self,
        ctx: &Context,
        prior: PermissionState,
        planned: PermissionState,
    ) -> Result<PermissionState, ProviderError> {
        let (domain, permission_id) = keys(&prior.id)?;
        let permission = ctx
            .client
            .update_permission(&domain, permission_id, &planned.to_ops())
            .await
            .or_api_err("update permission")?;
        let mut state = planned;
        state.apply(&domain, &permission);
        Ok(state)
    }

    async fn delete(&self, ctx: &Context, current: PermissionState) -> Result<(), ProviderError> {
        let (domain, permission_id) = keys(&current.id)?;
        ctx.client
            .delete_permission(&domain, permission_id)
            .await
            .ignore_not_found("delete permission")?;
        info!(domain = %domain, permission_id, "Deleted permission set");
        Ok(())
    }

    async fn import(&self, ctx: &Context, id: &str) -> Result<PermissionState, ProviderError> {
        let state = PermissionState {
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
    use crate::validation::validate;
    use serde_json::json;

    #[test]
    fn test_access_levels() {
        let schema = PermissionResource.schema();
        let mut config = json!({
            "domain": "acme",
            "name": "Developers",
            "pipeline_access_level": "RUN_ONLY",
            "repository_access_level": "READ_WRITE",
            "sandbox_access_level": "READ_ONLY"
        });
        assert!(validate(&schema, &config).is_empty());

        config["sandbox_access_level"] = json!("MANAGE");
        let diagnostics = validate(&schema, &config);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("sandbox_access_level"));
    }

    #[test]
    fn test_type_field_name() {
        let mut state = PermissionState::default();
        state.apply(
            "acme",
            &Permission {
                id: 5,
                permission_type: "CUSTOM".to_string(),
                ..Default::default()
            },
        );
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["type"], "CUSTOM");
        assert_eq!(json["id"], "acme:5");
    }
}

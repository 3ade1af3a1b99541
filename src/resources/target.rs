//! `buddy_target`: a reusable deployment target with its auth block.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::client::{EnvironmentRef, IdRef, NameRef, Target, TargetAuth, TargetOps};
use crate::convert::collections::list_from;
use crate::convert::permissions::{self, PermissionsBlock, USE_ACCESS_LEVELS};
use crate::convert::required;
use crate::error::{ApiResultExt, ProviderError};
use crate::identity::{compose_double, decompose_double};
use crate::schema::{Attribute, AttributeFlags, Block, Diagnostic, NestedBlock, Schema, Validator};
use crate::value::{BoolValue, Int64Value, SetValue, StringValue, Value};

use super::workspace::domain_attribute;
use super::{imported, Context, Resource};

/// Deployment targets.
pub struct TargetResource;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthBlock {
    pub method: StringValue,
    pub username: StringValue,
    pub password: StringValue,
    pub key: StringValue,
    pub passphrase: StringValue,
    pub asset: StringValue,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetState {
    pub id: StringValue,
    pub domain: StringValue,
    pub name: StringValue,
    pub identifier: StringValue,
    #[serde(rename = "type")]
    pub target_type: StringValue,
    pub host: StringValue,
    pub port: StringValue,
    pub path: StringValue,
    pub repository: StringValue,
    pub integration: StringValue,
    pub secure: BoolValue,
    pub disabled: BoolValue,
    pub tags: SetValue<String>,
    pub project_name: StringValue,
    pub pipeline_id: Int64Value,
    pub environment_id: StringValue,
    pub auth: Value<AuthBlock>,
    pub permissions: Value<PermissionsBlock>,
    pub target_id: StringValue,
    pub html_url: StringValue,
}

impl TargetState {
    fn to_ops(&self) -> Result<TargetOps, ProviderError> {
        Ok(TargetOps {
            name: self.name.cloned(),
            identifier: self.identifier.cloned(),
            target_type: self.target_type.cloned(),
            host: self.host.cloned(),
            port: self.port.cloned(),
            path: self.path.cloned(),
            repository: self.repository.cloned(),
            integration: self.integration.cloned(),
            secure: self.secure.cloned(),
            disabled: self.disabled.cloned(),
            tags: self.tags.cloned(),
            project: self.project_name.cloned().map(|name| NameRef { name }),
            pipeline: self.pipeline_id.cloned().map(|id| IdRef { id }),
            environment: self.environment_id.cloned().map(|id| EnvironmentRef { id }),
            auth: self.auth.get().map(|a| TargetAuth {
                method: a.method.as_str().to_string(),
                username: a.username.as_str().to_string(),
                password: a.password.as_str().to_string(),
                key: a.key.as_str().to_string(),
                passphrase: a.passphrase.as_str().to_string(),
                asset: a.asset.as_str().to_string(),
            }),
            permissions: permissions::to_api(&self.permissions)?,
        })
    }

    fn apply(&mut self, domain: &str, t: &Target) {
        self.id = Value::Known(compose_double(domain, &t.id));
        self.domain = Value::Known(domain.to_string());
        self.target_id = Value::Known(t.id.clone());
        self.name = Value::Known(t.name.clone());
        self.identifier = Value::Known(t.identifier.clone());
        self.target_type = Value::Known(t.target_type.clone());
        self.host = StringValue::non_empty(Some(t.host.clone()));
        self.port = StringValue::non_empty(Some(t.port.clone()));
        self.path = StringValue::non_empty(Some(t.path.clone()));
        self.repository = StringValue::non_empty(Some(t.repository.clone()));
        self.integration = StringValue::non_empty(Some(t.integration.clone()));
        self.secure = Value::Known(t.secure);
        self.disabled = Value::Known(t.disabled);
        self.tags = list_from(t.tags.clone(), &self.tags);
        self.project_name = Value::from_option(t.project.as_ref().map(|p| p.name.clone()));
        self.pipeline_id = Value::from_option(t.pipeline.map(|p| p.id));
        self.environment_id = Value::from_option(t.environment.as_ref().map(|e| e.id.clone()));
        self.auth = match &t.auth {
            Some(remote) => {
                // Secrets are never returned.
                let prior = self.auth.cloned().unwrap_or_default();
                Value::Known(AuthBlock {
                    method: Value::Known(remote.method.clone()),
                    username: StringValue::non_empty(Some(remote.username.clone())),
                    asset: StringValue::non_empty(Some(remote.asset.clone())),
                    ..prior
                })
            }
            None => Value::Null,
        };
        self.permissions = permissions::from_api(t.permissions.as_ref(), &self.permissions);
        self.html_url = Value::Known(t.html_url.clone());
    }
}

fn keys(id: &StringValue) -> Result<(String, String), ProviderError> {
    decompose_double(required(id, "id")?)
}

fn auth_block() -> NestedBlock {
    NestedBlock::single(
        Block::new()
            .with_attribute(
                "method",
                Attribute::required_string().one_of(&[
                    "PASS",
                    "SSH_KEY",
                    "ASSETS_KEY",
                    "HTTP_BASIC",
                    "OIDC",
                ]),
            )
            .with_attribute("username", Attribute::optional_string())
            .with_attribute("password", Attribute::optional_string().sensitive())
            .with_attribute("key", Attribute::optional_string().sensitive())
            .with_attribute("passphrase", Attribute::optional_string().sensitive())
            .with_attribute("asset", Attribute::optional_string()),
    )
    .with_max_items(1)
}

#[async_trait]
impl Resource for TargetResource {
    type State = TargetState;

    fn name(&self) -> &'static str {
        "buddy_target"
    }

    fn schema(&self) -> Schema {
        Schema::resource("A deployment target")
            .with_attribute("domain", domain_attribute())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("identifier", Attribute::required_string())
            .with_attribute(
                "type",
                Attribute::required_string()
                    .requires_replace()
                    .one_of(&["SSH", "FTP", "FTPS", "GIT", "DIGITAL_OCEAN", "VULTR"]),
            )
            .with_attribute("host", Attribute::optional_string())
            .with_attribute("port", Attribute::optional_string())
            .with_attribute("path", Attribute::optional_string())
            .with_attribute("repository", Attribute::optional_string())
            .with_attribute("integration", Attribute::optional_string())
            .with_attribute("secure", Attribute::optional_computed_bool())
            .with_attribute("disabled", Attribute::optional_computed_bool())
            .with_attribute("tags", Attribute::string_set(AttributeFlags::optional()))
            .with_attribute("project_name", Attribute::optional_string().requires_replace())
            .with_attribute(
                "pipeline_id",
                Attribute::optional_int64()
                    .requires_replace()
                    .with_validator(Validator::also_requires(&["project_name"])),
            )
            .with_attribute(
                "environment_id",
                Attribute::optional_string()
                    .requires_replace()
                    .with_validator(Validator::also_requires(&["project_name"])),
            )
            .with_block("auth", auth_block())
            .with_block("permissions", permissions::permissions_block(USE_ACCESS_LEVELS))
            .with_attribute("target_id", Attribute::computed_string().use_state_for_unknown())
            .with_attribute("html_url", Attribute::computed_string().use_state_for_unknown())
    }

    fn validate(&self, config: &TargetState) -> Vec<Diagnostic> {
        let Value::Known(target_type) = &config.target_type else {
            return Vec::new();
        };
        let (attribute, value) = match target_type.as_str() {
            "SSH" | "FTP" | "FTPS" => ("host", &config.host),
            "GIT" => ("repository", &config.repository),
            "DIGITAL_OCEAN" | "VULTR" => ("integration", &config.integration),
            _ => return Vec::new(),
        };
        if value.is_null() {
            vec![Diagnostic::error(format!("Target type {target_type} requires '{attribute}'"))
                .with_attribute(attribute)]
        } else {
            Vec::new()
        }
    }

    async fn create(
        &self,
        ctx: &Context,
        planned: TargetState,
    ) -> Result<TargetState, ProviderError> {
        let domain = required(&planned.domain, "domain")?.clone();
        let target = ctx
            .client
            .create_target(&domain, &planned.to_ops()?)
            .await
            .or_api_err("create target")?;
        info!(domain = %domain, target = %target.id, "Created target");

        let mut state = planned;
        state.apply(&domain, &target);
        Ok(state)
    }

    async fn read(
        &self,
        ctx: &Context,
        current: TargetState,
    ) -> Result<Option<TargetState>, ProviderError> {
        let (domain, target_id) = keys(&current.id)?;
        let Some(target) = ctx
            .client
            .get_target(&domain, &target_id)
            .await
            .found("read target")?
        else {
            warn!(
                domain = %domain,
                target = %target_id,
                "Target no longer exists, removing from state"
            );
            return Ok(None);
        };
        let mut state = current;
        state.apply(&domain, &target);
        Ok(Some(state))
    }

    async fn update(
        &self,
        ctx: &Context,
        prior: TargetState,
        planned: TargetState,
    ) -> Result<TargetState, ProviderError> {
        let (domain, target_id) = keys(&prior.id)?;
        let target = ctx
            .client
            .update_target(&domain, &target_id, &planned.to_ops()?)
            .await
            .or_api_err("update target")?;
        let mut state = planned;
        state.apply(&domain, &target);
        Ok(state)
    }

    async fn delete(&self, ctx: &Context, current: TargetState) -> Result<(), ProviderError> {
        let (domain, target_id) = keys(&current.id)?;
        ctx.client
            .delete_target(&domain, &target_id)
            .await
            .ignore_not_found("delete target")?;
        info!(domain = %domain, target = %target_id, "Deleted target");
        Ok(())
    }

    async fn import(&self, ctx: &Context, id: &str) -> Result<TargetState, ProviderError> {
        let state = TargetState {
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
    use crate::resources::decode;
    use serde_json::json;

    #[test]
    fn test_type_rules() {
        let schema = TargetResource.schema();
        let ssh: TargetState = decode(&schema, json!({"type": "SSH"})).unwrap();
        let diagnostics = TargetResource.validate(&ssh);
        assert_eq!(diagnostics[0].summary, "Target type SSH requires 'host'");

        let git: TargetState = decode(
            &schema,
            json!({"type": "GIT", "repository": "git@example.com:r.git"}),
        )
        .unwrap();
        assert!(TargetResource.validate(&git).is_empty());
    }

    #[test]
    fn test_apply_keeps_auth_secrets() {
        let mut state = TargetState {
            auth: Value::Known(AuthBlock {
                method: Value::Known("PASS".to_string()),
                username: Value::Known("deploy".to_string()),
                password: Value::Known("hunter2".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        state.apply(
            "acme",
            &Target {
                id: "t1".to_string(),
                target_type: "SSH".to_string(),
                host: "10.0.0.1".to_string(),
                auth: Some(TargetAuth {
                    method: "PASS".to_string(),
                    username: "deploy".to_string(),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        let auth = state.auth.get().unwrap();
        assert_eq!(auth.password.as_str(), "hunter2");
        assert!(auth.key.is_null());
        assert_eq!(state.id.as_str(), "acme:t1");
        assert!(state.port.is_null());
    }
}

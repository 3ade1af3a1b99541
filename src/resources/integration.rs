//! `buddy_integration`: credentials for AWS, GitHub, Kubernetes and the
//! like. Secrets are write-only and kept from the prior state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::client::{Integration, IntegrationOps, RoleAssumption};
use crate::convert::collections::list_from;
use crate::convert::required;
use crate::error::{ApiResultExt, ProviderError};
use crate::identity::{compose_double, decompose_double};
use crate::schema::{Attribute, Block, Diagnostic, NestedBlock, Schema, Validator};
use crate::value::{Int64Value, ListValue, StringValue, Value};

use super::workspace::domain_attribute;
use super::{imported, Context, Resource};

/// Integration types the Service accepts.
pub const INTEGRATION_TYPES: &[&str] = &[
    "GIT_HUB",
    "GIT_LAB",
    "BITBUCKET",
    "AMAZON",
    "AZURE_CLOUD",
    "DIGITAL_OCEAN",
    "DOCKER_HUB",
    "GOOGLE_SERVICE_ACCOUNT",
    "GIT_HUB_ENTERPRISE",
    "GIT_LAB_ENTERPRISE",
    "HETZNER",
    "CLOUDFLARE",
    "NETLIFY",
    "RACKSPACE",
    "SHOPIFY",
    "SLACK",
    "SENTRY",
    "UPCLOUD",
    "VULTR",
];

const SCOPES: &[&str] = &[
    "PRIVATE",
    "WORKSPACE",
    "ADMIN",
    "GROUP",
    "PROJECT",
    "PRIVATE_IN_PROJECT",
    "ADMIN_IN_PROJECT",
    "GROUP_IN_PROJECT",
];

/// Write-only credential attributes.
const CREDENTIALS: &[&str] = &[
    "token",
    "username",
    "password",
    "access_key",
    "secret_key",
    "app_id",
    "tenant_id",
    "client_token",
    "api_key",
    "shop",
    "audience",
    "google_project",
    "partner_token",
    "config",
];

/// Integrations with external services.
pub struct IntegrationResource;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleAssumptionBlock {
    pub arn: StringValue,
    pub external_id: StringValue,
    pub duration: Int64Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationState {
    pub id: StringValue,
    pub domain: StringValue,
    pub name: StringValue,
    #[serde(rename = "type")]
    pub integration_type: StringValue,
    pub scope: StringValue,
    pub project_name: StringValue,
    pub group_id: Int64Value,
    pub identifier: StringValue,
    pub token: StringValue,
    pub username: StringValue,
    pub password: StringValue,
    pub access_key: StringValue,
    pub secret_key: StringValue,
    pub app_id: StringValue,
    pub tenant_id: StringValue,
    pub client_token: StringValue,
    pub api_key: StringValue,
    pub shop: StringValue,
    pub audience: StringValue,
    pub google_project: StringValue,
    pub partner_token: StringValue,
    pub config: StringValue,
    pub role_assumption: ListValue<RoleAssumptionBlock>,
    pub integration_id: StringValue,
    pub html_url: StringValue,
}

impl IntegrationState {
    fn to_ops(&self) -> IntegrationOps {
        IntegrationOps {
            name: self.name.cloned(),
            integration_type: self.integration_type.cloned(),
            scope: self.scope.cloned(),
            project_name: self.project_name.cloned(),
            group_id: self.group_id.cloned(),
            identifier: self.identifier.cloned(),
            token: self.token.cloned(),
            username: self.username.cloned(),
            password: self.password.cloned(),
            access_key: self.access_key.cloned(),
            secret_key: self.secret_key.cloned(),
            app_id: self.app_id.cloned(),
            tenant_id: self.tenant_id.cloned(),
            client_token: self.client_token.cloned(),
            api_key: self.api_key.cloned(),
            shop: self.shop.cloned(),
            audience: self.audience.cloned(),
            google_project: self.google_project.cloned(),
            partner_token: self.partner_token.cloned(),
            config: self.config.cloned(),
            role_assumptions: self.role_assumption.get().map(|blocks| {
                blocks
                    .iter()
                    .map(|b| RoleAssumption {
                        arn: b.arn.as_str().to_string(),
                        external_id: b.external_id.cloned(),
                        duration: b.duration.cloned(),
                    })
                    .collect()
            }),
        }
    }

    /// Refresh from the Service. Credentials are never returned, so they
    /// keep whatever the state already holds.
    fn apply(&mut self, domain: &str, i: &Integration) {
        self.id = Value::Known(compose_double(domain, &i.hash_id));
        self.domain = Value::Known(domain.to_string());
        self.integration_id = Value::Known(i.hash_id.clone());
        self.name = Value::Known(i.name.clone());
        self.integration_type = Value::Known(i.integration_type.clone());
        self.scope = Value::Known(i.scope.clone());
        self.project_name = StringValue::non_empty(Some(i.project_name.clone()));
        self.group_id = Value::from_option(i.group_id);
        self.identifier = Value::Known(i.identifier.clone());
        self.audience =
            StringValue::non_empty(Some(i.audience.clone())).or_keep(self.audience.clone());
        let roles = i
            .role_assumptions
            .iter()
            .map(|r| RoleAssumptionBlock {
                arn: Value::Known(r.arn.clone()),
                external_id: StringValue::non_empty(r.external_id.clone()),
                duration: Value::from_option(r.duration),
            })
            .collect();
        self.role_assumption = list_from(roles, &self.role_assumption);
        self.html_url = Value::Known(i.html_url.clone());
    }

    fn credential(&self, name: &str) -> &StringValue {
        match name {
            "token" => &self.token,
            "username" => &self.username,
            "password" => &self.password,
            "access_key" => &self.access_key,
            "secret_key" => &self.secret_key,
            "app_id" => &self.app_id,
            "tenant_id" => &self.tenant_id,
            "client_token" => &self.client_token,
            "api_key" => &self.api_key,
            "shop" => &self.shop,
            "audience" => &self.audience,
            "google_project" => &self.google_project,
            "partner_token" => &self.partner_token,
            _ => &self.config,
        }
    }
}

/// Credentials a type cannot be created without.
fn required_credentials(integration_type: &str, oidc: bool) -> &'static [&'static str] {
    match integration_type {
        "AMAZON" if oidc => &[],
        "AMAZON" => &["access_key", "secret_key"],
        "AZURE_CLOUD" => &["app_id", "tenant_id", "password"],
        "DIGITAL_OCEAN" | "HETZNER" | "NETLIFY" | "VULTR" | "SENTRY" => &["token"],
        "DOCKER_HUB" | "UPCLOUD" => &["username", "password"],
        "GOOGLE_SERVICE_ACCOUNT" => &["api_key"],
        "SHOPIFY" => &["shop", "token"],
        "RACKSPACE" => &["username", "token"],
        _ => &[],
    }
}

fn keys(id: &StringValue) -> Result<(String, String), ProviderError> {
    decompose_double(required(id, "id")?)
}

fn role_assumption_block() -> NestedBlock {
    NestedBlock::list(
        Block::new()
            .with_attribute("arn", Attribute::required_string())
            .with_attribute("external_id", Attribute::optional_string())
            .with_attribute(
                "duration",
                Attribute::optional_int64().with_validator(Validator::at_least(1)),
            ),
    )
}

#[async_trait]
impl Resource for IntegrationResource {
    type State = IntegrationState;

    fn name(&self) -> &'static str {
        "buddy_integration"
    }

    fn schema(&self) -> Schema {
        let mut schema = Schema::resource("Credentials for an external service")
            .with_attribute("domain", domain_attribute())
            .with_attribute("name", Attribute::required_string())
            .with_attribute(
                "type",
                Attribute::required_string().requires_replace().one_of(INTEGRATION_TYPES),
            )
            .with_attribute("scope", Attribute::required_string().one_of(SCOPES))
            .with_attribute("project_name", Attribute::optional_string())
            .with_attribute("group_id", Attribute::optional_int64())
            .with_attribute("identifier", Attribute::optional_computed_string())
            .with_block("role_assumption", role_assumption_block())
            .with_attribute("integration_id", Attribute::computed_string().use_state_for_unknown())
            .with_attribute("html_url", Attribute::computed_string().use_state_for_unknown());
        for name in CREDENTIALS {
            schema = schema.with_attribute(*name, Attribute::optional_string().sensitive());
        }
        schema
    }

    fn validate(&self, config: &IntegrationState) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        if let Value::Known(integration_type) = &config.integration_type {
            let oidc = !config.audience.is_null();
            for field in required_credentials(integration_type, oidc) {
                if config.credential(field).is_null() {
                    diagnostics.push(
                        Diagnostic::error(format!(
                            "Integration type {integration_type} requires '{field}'"
                        ))
                        .with_attribute(*field),
                    );
                }
            }
        }

        if let Value::Known(scope) = &config.scope {
            if scope.ends_with("PROJECT") && config.project_name.is_null() {
                diagnostics.push(
                    Diagnostic::error(format!("Scope {scope} requires 'project_name'"))
                        .with_attribute("project_name"),
                );
            }
            if scope.starts_with("GROUP") && config.group_id.is_null() {
                diagnostics.push(
                    Diagnostic::error(format!("Scope {scope} requires 'group_id'"))
                        .with_attribute("group_id"),
                );
            }
        }

        diagnostics
    }

    async fn create(
        &self,
        ctx: &Context,
        planned: IntegrationState,
    ) -> Result<IntegrationState, ProviderError> {
        let domain = required(&planned.domain, "domain")?.clone();
        let integration = ctx
            .client
            .create_integration(&domain, &planned.to_ops())
            .await
            .or_api_err("create integration")?;
        info!(domain = %domain, integration = %integration.hash_id, "Created integration");

        let mut state = planned;
        state.apply(&domain, &integration);
        Ok(state)
    }

    async fn read(
        &self,
        ctx: &Context,
        current: IntegrationState,
    ) -> Result<Option<IntegrationState>, ProviderError> {
        let (domain, hash_id) = keys(&current.id)?;
        let Some(integration) = ctx
            .client
            .get_integration(&domain, &hash_id)
            .await
            .found("read integration")?
        else {
            warn!(
                domain = %domain,
                integration = %hash_id,
                "Integration no longer exists, removing from state"
            );
            return Ok(None);
        };
        let mut state = current;
        state.apply(&domain, &integration);
        Ok(Some(state))
    }

    async fn update(
        &self,
        ctx: &Context,
        prior: IntegrationState,
        planned: IntegrationState,
    ) -> Result<IntegrationState, ProviderError> {
        let (domain, hash_id) = keys(&prior.id)?;
        let integration = ctx
            .client
            .update_integration(&domain, &hash_id, &planned.to_ops())
            .await
            .or_api_err("update integration")?;
        let mut state = planned;
        state.apply(&domain, &integration);
        Ok(state)
    }

    async fn delete(&self, ctx: &Context, current: IntegrationState) -> Result<(), ProviderError> {
        let (domain, hash_id) = keys(&current.id)?;
        ctx.client
            .delete_integration(&domain, &hash_id)
            .await
            .ignore_not_found("delete integration")?;
        info!(domain = %domain, integration = %hash_id, "Deleted integration");
        Ok(())
    }

    async fn import(&self, ctx: &Context, id: &str) -> Result<IntegrationState, ProviderError> {
        let state = IntegrationState {
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

    fn typed(config: serde_json::Value) -> IntegrationState {
        decode(&IntegrationResource.schema(), config).unwrap()
    }

    #[test]
    fn test_type_credentials() {
        let config = typed(json!({"type": "DIGITAL_OCEAN", "scope": "WORKSPACE"}));
        let diagnostics = IntegrationResource.validate(&config);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("token"));

        let config = typed(json!({"type": "AMAZON", "scope": "WORKSPACE", "access_key": "AK"}));
        assert_eq!(IntegrationResource.validate(&config).len(), 1);

        let config = typed(json!({"type": "AMAZON", "scope": "WORKSPACE", "audience": "sts"}));
        assert!(IntegrationResource.validate(&config).is_empty());
    }

    #[test]
    fn test_scope_rules() {
        let config = typed(json!({"type": "SLACK", "scope": "GROUP_IN_PROJECT"}));
        let attributes: Vec<_> = IntegrationResource
            .validate(&config)
            .into_iter()
            .filter_map(|d| d.attribute)
            .collect();
        assert_eq!(attributes, vec!["project_name", "group_id"]);
    }

    #[test]
    fn test_apply_keeps_credentials() {
        let mut state = IntegrationState {
            token: Value::Known("secret".to_string()),
            ..Default::default()
        };
        state.apply(
            "acme",
            &Integration {
                hash_id: "abc123".to_string(),
                integration_type: "DIGITAL_OCEAN".to_string(),
                scope: "WORKSPACE".to_string(),
                ..Default::default()
            },
        );
        assert_eq!(state.id.as_str(), "acme:abc123");
        assert_eq!(state.token.as_str(), "secret");
        assert!(state.role_assumption.is_null());
    }

    #[test]
    fn test_role_without_external_id_omits_it() {
        let state = typed(json!({
            "type": "AMAZON",
            "scope": "WORKSPACE",
            "role_assumption": [{"arn": "arn:aws:iam::1:role/deploy", "external_id": null}]
        }));
        let body = serde_json::to_value(state.to_ops()).unwrap();
        assert_eq!(
            body["role_assumptions"],
            json!([{"arn": "arn:aws:iam::1:role/deploy"}])
        );
    }

    #[test]
    fn test_credentials_are_sensitive() {
        let schema = IntegrationResource.schema();
        for name in CREDENTIALS {
            assert!(schema.block.attributes[*name].flags.sensitive, "{name}");
        }
    }
}

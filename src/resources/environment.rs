//! `buddy_environment`: a deployment environment with scoped variables
//! and pipeline restrictions. ID `<domain>:<project_name>:<environment_id>`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::client::{Environment, EnvironmentOps};
use crate::convert::collections::list_from;
use crate::convert::environment::{
    allowed_pipelines_from_api, allowed_pipelines_to_api, variable_block, variables_from_api,
    variables_to_api, VariableBlock,
};
use crate::convert::permissions::{self, PermissionsBlock, USE_ACCESS_LEVELS};
use crate::convert::required;
use crate::error::{ApiResultExt, ProviderError};
use crate::identity::{compose_triple, decompose_triple};
use crate::schema::{Attribute, AttributeFlags, Schema, Validator};
use crate::value::{BoolValue, SetValue, StringValue, Value};

use super::workspace::domain_attribute;
use super::{imported, Context, Resource};

/// Deployment environments of a project.
pub struct EnvironmentResource;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentState {
    pub id: StringValue,
    pub domain: StringValue,
    pub project_name: StringValue,
    pub name: StringValue,
    pub identifier: StringValue,
    #[serde(rename = "type")]
    pub environment_type: StringValue,
    pub public_url: StringValue,
    pub tags: SetValue<String>,
    pub all_pipelines_allowed: BoolValue,
    pub allowed_pipelines: SetValue<i64>,
    pub var: SetValue<VariableBlock>,
    pub permissions: Value<PermissionsBlock>,
    pub environment_id: StringValue,
    pub html_url: StringValue,
}

impl EnvironmentState {
    fn to_ops(&self) -> Result<EnvironmentOps, ProviderError> {
        Ok(EnvironmentOps {
            name: self.name.cloned(),
            identifier: self.identifier.cloned(),
            environment_type: self.environment_type.cloned(),
            public_url: self.public_url.cloned(),
            tags: self.tags.cloned(),
            all_pipelines_allowed: self.all_pipelines_allowed.cloned(),
            allowed_pipelines: allowed_pipelines_to_api(&self.allowed_pipelines),
            variables: variables_to_api(&self.var),
            permissions: permissions::to_api(&self.permissions)?,
        })
    }

    fn apply(&mut self, domain: &str, project: &str, e: &Environment) {
        self.id = Value::Known(compose_triple(domain, project, &e.id));
        self.domain = Value::Known(domain.to_string());
        self.project_name = Value::Known(project.to_string());
        self.environment_id = Value::Known(e.id.clone());
        self.name = Value::Known(e.name.clone());
        self.identifier = Value::Known(e.identifier.clone());
        self.environment_type = Value::Known(e.environment_type.clone());
        self.public_url = StringValue::non_empty(Some(e.public_url.clone()));
        self.tags = list_from(e.tags.clone(), &self.tags);
        self.all_pipelines_allowed = Value::Known(e.all_pipelines_allowed);
        self.allowed_pipelines =
            allowed_pipelines_from_api(&e.allowed_pipelines, &self.allowed_pipelines);
        self.var = variables_from_api(&e.variables, &self.var);
        self.permissions = permissions::from_api(e.permissions.as_ref(), &self.permissions);
        self.html_url = Value::Known(e.html_url.clone());
    }
}

fn keys(id: &StringValue) -> Result<(String, String, String), ProviderError> {
    decompose_triple(required(id, "id")?)
}

#[async_trait]
impl Resource for EnvironmentResource {
    type State = EnvironmentState;

    fn name(&self) -> &'static str {
        "buddy_environment"
    }

    fn schema(&self) -> Schema {
        Schema::resource("A deployment environment in a project")
            .with_attribute("domain", domain_attribute())
            .with_attribute("project_name", Attribute::required_string().requires_replace())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("identifier", Attribute::required_string())
            .with_attribute(
                "type",
                Attribute::required_string().one_of(&["PRODUCTION", "STAGE", "DEV"]),
            )
            .with_attribute("public_url", Attribute::optional_string())
            .with_attribute("tags", Attribute::string_set(AttributeFlags::optional()))
            .with_attribute(
                "all_pipelines_allowed",
                Attribute::optional_computed_bool()
                    .with_validator(Validator::conflicts_with(&["allowed_pipelines"])),
            )
            .with_attribute(
                "allowed_pipelines",
                Attribute::int64_set(AttributeFlags::optional())
                    .with_description("Pipeline ids allowed to deploy to this environment"),
            )
            .with_block("var", variable_block())
            .with_block("permissions", permissions::permissions_block(USE_ACCESS_LEVELS))
            .with_attribute("environment_id", Attribute::computed_string().use_state_for_unknown())
            .with_attribute("html_url", Attribute::computed_string().use_state_for_unknown())
    }

    async fn create(
        &self,
        ctx: &Context,
        planned: EnvironmentState,
    ) -> Result<EnvironmentState, ProviderError> {
        let domain = required(&planned.domain, "domain")?.clone();
        let project = required(&planned.project_name, "project_name")?.clone();
        let environment = ctx
            .client
            .create_environment(&domain, &project, &planned.to_ops()?)
            .await
            .or_api_err("create environment")?;
        info!(
            domain = %domain,
            project = %project,
            environment = %environment.id,
            "Created environment"
        );

        let mut state = planned;
        state.apply(&domain, &project, &environment);
        Ok(state)
    }

    async fn read(
        &self,
        ctx: &Context,
        current: EnvironmentState,
    ) -> Result<Option<EnvironmentState>, ProviderError> {
        let (domain, project, environment_id) = keys(&current.id)?;
        let Some(environment) = ctx
            .client
            .get_environment(&domain, &project, &environment_id)
            .await
            .found("read environment")?
        else {
            warn!(
                domain = %domain,
                project = %project,
                environment = %environment_id,
                "Environment no longer exists, removing from state"
            );
            return Ok(None);
        };
        let mut state = current;
        state.apply(&domain, &project, &environment);
        Ok(Some(state))
    }

    async fn update(
        &self,
        ctx: &Context,
        prior: EnvironmentState,
        planned: EnvironmentState,
    ) -> Result<EnvironmentState, ProviderError> {
        let (domain, project, environment_id) = keys(&prior.id)?;
        let environment = ctx
            .client
            .update_environment(&domain, &project, &environment_id, &planned.to_ops()?)
            .await
            .or_api_err("update environment")?;
        let mut state = planned;
        state.apply(&domain, &project, &environment);
        Ok(state)
    }

    async fn delete(&self, ctx: &Context, current: EnvironmentState) -> Result<(), ProviderError> {
        let (domain, project, environment_id) = keys(&current.id)?;
        ctx.client
            .delete_environment(&domain, &project, &environment_id)
            .await
            .ignore_not_found("delete environment")?;
        info!(
            domain = %domain,
            project = %project,
            environment = %environment_id,
            "Deleted environment"
        );
        Ok(())
    }

    async fn import(&self, ctx: &Context, id: &str) -> Result<EnvironmentState, ProviderError> {
        let state = EnvironmentState {
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
    use crate::client::EnvironmentVariable;
    use crate::validation::validate;
    use serde_json::json;

    #[test]
    fn test_all_pipelines_conflicts_with_list() {
        let config = json!({
            "domain": "acme",
            "project_name": "backend",
            "name": "Production",
            "identifier": "production",
            "type": "PRODUCTION",
            "all_pipelines_allowed": true,
            "allowed_pipelines": [1, 2]
        });
        let diagnostics = validate(&EnvironmentResource.schema(), &config);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].summary,
            "Conflicting attributes 'all_pipelines_allowed' and 'allowed_pipelines'"
        );
    }

    #[test]
    fn test_apply_keeps_encrypted_plaintext() {
        let mut state = EnvironmentState {
            var: Value::Known(vec![VariableBlock {
                key: Value::Known("TOKEN".to_string()),
                value: Value::Known("plain".to_string()),
                encrypted: Value::Known(true),
                ..Default::default()
            }]),
            ..Default::default()
        };
        state.apply(
            "acme",
            "backend",
            &Environment {
                id: "env1".to_string(),
                environment_type: "STAGE".to_string(),
                variables: vec![EnvironmentVariable {
                    key: "TOKEN".to_string(),
                    value: "secure!abc".to_string(),
                    encrypted: true,
                    ..Default::default()
                }],
                ..Default::default()
            },
        );
        assert_eq!(state.id.as_str(), "acme:backend:env1");
        let vars = state.var.get().unwrap();
        assert_eq!(vars[0].value.as_str(), "plain");
        assert!(state.permissions.is_null());
    }
}

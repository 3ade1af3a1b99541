//! `buddy_variable`: a plain variable at workspace, project, pipeline or
//! action scope. ID `<domain>:<variable_id>`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::client::{IdRef, NameRef, Variable, VariableOps};
use crate::convert::required;
use crate::error::{ApiResultExt, ProviderError};
use crate::identity::{compose_double, decompose_double, parse_component};
use crate::schema::{Attribute, Schema, Validator};
use crate::value::{BoolValue, Int64Value, StringValue, Value};

use super::workspace::domain_attribute;
use super::{imported, Context, Resource};

/// Plain variables.
pub struct VariableResource;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariableState {
    pub id: StringValue,
    pub domain: StringValue,
    pub key: StringValue,
    pub value: StringValue,
    pub encrypted: BoolValue,
    pub settable: BoolValue,
    pub description: StringValue,
    pub project_name: StringValue,
    pub pipeline_id: Int64Value,
    pub action_id: Int64Value,
    pub variable_id: Int64Value,
}

/// Where a variable lives: workspace, project, pipeline or action.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Scope {
    pub project: Option<NameRef>,
    pub pipeline: Option<IdRef>,
    pub action: Option<IdRef>,
}

impl Scope {
    pub(crate) fn new(project: &StringValue, pipeline: &Int64Value, action: &Int64Value) -> Self {
        Self {
            project: project.cloned().map(|name| NameRef { name }),
            pipeline: pipeline.cloned().map(|id| IdRef { id }),
            action: action.cloned().map(|id| IdRef { id }),
        }
    }
}

/// Scope attributes shared with SSH key variables. Moving a variable
/// between scopes recreates it.
pub(crate) fn with_scope(schema: Schema) -> Schema {
    schema
        .with_attribute("project_name", Attribute::optional_string().requires_replace())
        .with_attribute(
            "pipeline_id",
            Attribute::optional_int64()
                .requires_replace()
                .with_validator(Validator::also_requires(&["project_name"])),
        )
        .with_attribute(
            "action_id",
            Attribute::optional_int64()
                .requires_replace()
                .with_validator(Validator::also_requires(&["pipeline_id"])),
        )
}

/// Read back the scope of `v`.
pub(crate) fn scope_from_api(v: &Variable) -> (StringValue, Int64Value, Int64Value) {
    (
        Value::from_option(v.project.as_ref().map(|p| p.name.clone())),
        Value::from_option(v.pipeline.map(|p| p.id)),
        Value::from_option(v.action.map(|a| a.id)),
    )
}

impl VariableState {
    fn to_ops(&self) -> VariableOps {
        let scope = Scope::new(&self.project_name, &self.pipeline_id, &self.action_id);
        VariableOps {
            key: self.key.cloned(),
            value: self.value.cloned(),
            variable_type: Some("VAR".to_string()),
            encrypted: self.encrypted.cloned(),
            settable: self.settable.cloned(),
            description: self.description.cloned(),
            project: scope.project,
            pipeline: scope.pipeline,
            action: scope.action,
            ..Default::default()
        }
    }

    fn apply(&mut self, domain: &str, v: &Variable) {
        self.id = Value::Known(compose_double(domain, v.id));
        self.domain = Value::Known(domain.to_string());
        self.variable_id = Value::Known(v.id);
        self.key = Value::Known(v.key.clone());
        if !v.encrypted {
            self.value = Value::Known(v.value.clone());
        }
        self.encrypted = Value::Known(v.encrypted);
        self.settable = Value::Known(v.settable);
        self.description = StringValue::non_empty(Some(v.description.clone()));
        (self.project_name, self.pipeline_id, self.action_id) = scope_from_api(v);
    }
}

pub(crate) fn keys(id: &StringValue) -> Result<(String, i64), ProviderError> {
    let raw = required(id, "id")?;
    let (domain, variable) = decompose_double(raw)?;
    Ok((domain, parse_component(raw, &variable)?))
}

#[async_trait]
impl Resource for VariableResource {
    type State = VariableState;

    fn name(&self) -> &'static str {
        "buddy_variable"
    }

    fn schema(&self) -> Schema {
        let schema = Schema::resource("A workspace, project, pipeline or action variable")
            .with_attribute("domain", domain_attribute())
            .with_attribute("key", Attribute::required_string().requires_replace())
            .with_attribute("value", Attribute::required_string().sensitive())
            .with_attribute(
                "encrypted",
                Attribute::optional_computed_bool()
                    .requires_replace_if_configured()
                    .use_state_for_unknown(),
            )
            .with_attribute(
                "settable",
                Attribute::optional_computed_bool().use_state_for_unknown(),
            )
            .with_attribute("description", Attribute::optional_string())
            .with_attribute("variable_id", Attribute::computed_int64().use_state_for_unknown());
        with_scope(schema)
    }

    async fn create(
        &self,
        ctx: &Context,
        planned: VariableState,
    ) -> Result<VariableState, ProviderError> {
        let domain = required(&planned.domain, "domain")?.clone();
        let variable = ctx
            .client
            .create_variable(&domain, &planned.to_ops())
            .await
            .or_api_err("create variable")?;
        info!(domain = %domain, variable_id = variable.id, key = %variable.key, "Created variable");

        let mut state = planned;
        state.apply(&domain, &variable);
        Ok(state)
    }

    async fn read(
        &self,
        ctx: &Context,
        current: VariableState,
    ) -> Result<Option<VariableState>, ProviderError> {
        let (domain, variable_id) = keys(&current.id)?;
        let Some(variable) = ctx
            .client
            .get_variable(&domain, variable_id)
            .await
            .found("read variable")?
        else {
            warn!(domain = %domain, variable_id, "Variable no longer exists, removing from state");
            return Ok(None);
        };
        let mut state = current;
        state.apply(&domain, &variable);
        Ok(Some(state))
    }

    async fn update(
        &self,
        ctx: &Context,
        prior: VariableState,
        planned: VariableState,
    ) -> Result<VariableState, ProviderError> {
        let (domain, variable_id) = keys(&prior.id)?;
        let variable = ctx
            .client
            .update_variable(&domain, variable_id, &planned.to_ops())
            .await
            .or_api_err("update variable")?;
        let mut state = planned;
        state.apply(&domain, &variable);
        Ok(state)
    }

    async fn delete(&self, ctx: &Context, current: VariableState) -> Result<(), ProviderError> {
        let (domain, variable_id) = keys(&current.id)?;
        ctx.client
            .delete_variable(&domain, variable_id)
            .await
            .ignore_not_found("delete variable")?;
        info!(domain = %domain, variable_id, "Deleted variable");
        Ok(())
    }

    async fn import(&self, ctx: &Context, id: &str) -> Result<VariableState, ProviderError> {
        let state = VariableState {
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

    fn remote(encrypted: bool) -> Variable {
        Variable {
            id: 11,
            key: "API_URL".to_string(),
            value: if encrypted { "secure!xyz".to_string() } else { "https://api".to_string() },
            variable_type: "VAR".to_string(),
            encrypted,
            project: Some(NameRef { name: "backend".to_string() }),
            ..Default::default()
        }
    }

    #[test]
    fn test_encrypted_value_not_echoed() {
        let mut state = VariableState {
            value: Value::Known("plain".to_string()),
            ..Default::default()
        };
        state.apply("acme", &remote(true));
        assert_eq!(state.value.as_str(), "plain");

        state.apply("acme", &remote(false));
        assert_eq!(state.value.as_str(), "https://api");
        assert_eq!(state.project_name.as_str(), "backend");
        assert!(state.pipeline_id.is_null());
    }

    #[test]
    fn test_scope_dependencies() {
        let config = json!({
            "domain": "acme",
            "key": "K",
            "value": "v",
            "action_id": 3
        });
        let diagnostics = validate(&VariableResource.schema(), &config);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Missing attribute 'pipeline_id'");
    }

    #[test]
    fn test_ops_type() {
        let state = VariableState {
            key: Value::Known("K".to_string()),
            pipeline_id: Value::Known(4),
            ..Default::default()
        };
        let ops = state.to_ops();
        assert_eq!(ops.variable_type.as_deref(), Some("VAR"));
        assert_eq!(ops.pipeline, Some(IdRef { id: 4 }));
        assert!(ops.project.is_none());
    }
}

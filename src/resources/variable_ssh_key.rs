//! `buddy_variable_ssh_key`: a private key variable, optionally written
//! to a file inside run containers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::client::{Variable, VariableOps};
use crate::convert::required;
use crate::error::{ApiResultExt, ProviderError};
use crate::identity::compose_double;
use crate::schema::{Attribute, Schema, Validator};
use crate::value::{BoolValue, Int64Value, StringValue, Value};

use super::variable::{keys, scope_from_api, with_scope, Scope};
use super::workspace::domain_attribute;
use super::{imported, Context, Resource};

/// A private SSH key stored as an encrypted variable and optionally
/// written into the build container.
pub struct VariableSshKeyResource;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariableSshKeyState {
    pub id: StringValue,
    pub domain: StringValue,
    pub key: StringValue,
    pub value: StringValue,
    pub file_place: StringValue,
    pub file_path: StringValue,
    pub file_chmod: StringValue,
    pub display_name: StringValue,
    pub settable: BoolValue,
    pub description: StringValue,
    pub project_name: StringValue,
    pub pipeline_id: Int64Value,
    pub action_id: Int64Value,
    pub encrypted: BoolValue,
    pub checksum: StringValue,
    pub key_fingerprint: StringValue,
    pub public_value: StringValue,
    pub variable_id: Int64Value,
}

impl VariableSshKeyState {
    fn to_ops(&self) -> VariableOps {
        let scope = Scope::new(&self.project_name, &self.pipeline_id, &self.action_id);
        VariableOps {
            key: self.key.cloned(),
            value: self.value.cloned(),
            variable_type: Some("SSH_KEY".to_string()),
            encrypted: Some(true),
            settable: self.settable.cloned(),
            description: self.description.cloned(),
            file_place: self.file_place.cloned(),
            file_path: self.file_path.cloned(),
            file_chmod: self.file_chmod.cloned(),
            display_name: self.display_name.cloned(),
            project: scope.project,
            pipeline: scope.pipeline,
            action: scope.action,
        }
    }

    /// The key material itself is never read back.
    fn apply(&mut self, domain: &str, v: &Variable) {
        self.id = Value::Known(compose_double(domain, v.id));
        self.domain = Value::Known(domain.to_string());
        self.variable_id = Value::Known(v.id);
        self.key = Value::Known(v.key.clone());
        self.file_place = Value::Known(v.file_place.clone());
        self.file_path = Value::Known(v.file_path.clone());
        self.file_chmod = Value::Known(v.file_chmod.clone());
        self.display_name = StringValue::non_empty(Some(v.display_name.clone()));
        self.settable = Value::Known(v.settable);
        self.description = StringValue::non_empty(Some(v.description.clone()));
        (self.project_name, self.pipeline_id, self.action_id) = scope_from_api(v);
        self.encrypted = Value::Known(true);
        self.checksum = Value::Known(v.checksum.clone());
        self.key_fingerprint = Value::Known(v.key_fingerprint.clone());
        self.public_value = Value::Known(v.public_value.clone());
    }
}

#[async_trait]
impl Resource for VariableSshKeyResource {
    type State = VariableSshKeyState;

    fn name(&self) -> &'static str {
        "buddy_variable_ssh_key"
    }

    fn schema(&self) -> Schema {
        let schema = Schema::resource("An SSH key variable")
            .with_attribute("domain", domain_attribute())
            .with_attribute("key", Attribute::required_string().requires_replace())
            .with_attribute(
                "value",
                Attribute::required_string()
                    .sensitive()
                    .with_description("Private key in PEM format"),
            )
            .with_attribute(
                "file_place",
                Attribute::required_string().one_of(&["CONTAINER", "NONE"]),
            )
            .with_attribute("file_path", Attribute::required_string())
            .with_attribute(
                "file_chmod",
                Attribute::required_string()
                    .with_validator(Validator::regex(
                        r"^[0-7]{3,4}$",
                        "must be an octal file mode",
                    )),
            )
            .with_attribute("display_name", Attribute::optional_string())
            .with_attribute("settable", Attribute::optional_computed_bool())
            .with_attribute("description", Attribute::optional_string())
            .with_attribute("encrypted", Attribute::computed_bool().use_state_for_unknown())
            .with_attribute("checksum", Attribute::computed_string())
            .with_attribute("key_fingerprint", Attribute::computed_string())
            .with_attribute("public_value", Attribute::computed_string())
            .with_attribute("variable_id", Attribute::computed_int64().use_state_for_unknown());
        with_scope(schema)
    }

    async fn create(
        &self,
        ctx: &Context,
        planned: VariableSshKeyState,
    ) -> Result<VariableSshKeyState, ProviderError> {
        let domain = required(&planned.domain, "domain")?.clone();
        let variable = ctx
            .client
            .create_variable(&domain, &planned.to_ops())
            .await
            .or_api_err("create ssh key variable")?;
        info!(
            domain = %domain,
            variable_id = variable.id,
            key = %variable.key,
            "Created SSH key variable"
        );

        let mut state = planned;
        state.apply(&domain, &variable);
        Ok(state)
    }

    async fn read(
        &self,
        ctx: &Context,
        current: VariableSshKeyState,
    ) -> Result<Option<VariableSshKeyState>, ProviderError> {
        let (domain, variable_id) = keys(&current.id)?;
        let Some(variable) = ctx
            .client
            .get_variable(&domain, variable_id)
            .await
            .found("read ssh key variable")?
        else {
            warn!(
                domain = %domain,
                variable_id,
                "SSH key variable no longer exists, removing from state"
            );
            return Ok(None);
        };
        let mut state = current;
        state.apply(&domain, &variable);
        Ok(Some(state))
    }

    async fn update(
        &self,
        ctx: &Context,
        prior: VariableSshKeyState,
        planned: VariableSshKeyState,
    ) -> Result<VariableSshKeyState, ProviderError> {
        let (domain, variable_id) = keys(&prior.id)?;
        let variable = ctx
            .client
            .update_variable(&domain, variable_id, &planned.to_ops())
            .await
            .or_api_err("update ssh key variable")?;
        let mut state = planned;
        state.apply(&domain, &variable);
        Ok(state)
    }

    async fn delete(
        &self,
        ctx: &Context,
        current: VariableSshKeyState,
    ) -> Result<(), ProviderError> {
        let (domain, variable_id) = keys(&current.id)?;
        ctx.client
            .delete_variable(&domain, variable_id)
            .await
            .ignore_not_found("delete ssh key variable")?;
        info!(domain = %domain, variable_id, "Deleted SSH key variable");
        Ok(())
    }

    async fn import(&self, ctx: &Context, id: &str) -> Result<VariableSshKeyState, ProviderError> {
        let state = VariableSshKeyState {
            id: Value::Known(id.to_string()),
            ..Default::default()
        };
        keys(&state.id)?;
        imported(id, self.read(ctx, state).await?)
    }
}

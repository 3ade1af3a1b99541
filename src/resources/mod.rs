//! Resource handlers.
//!
//! Each Service object type is a [`Resource`] with a typed state struct.
//! [`DynamicResource`] erases the state type so the provider can dispatch
//! by resource type name on raw JSON.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::watch;

use crate::client::BuddyClient;
use crate::config::ProviderOptions;
use crate::error::ProviderError;
use crate::schema::{BlockNestingMode, Diagnostic, Schema};
use crate::validation;

mod domain;
mod domain_record;
mod environment;
mod group;
mod group_member;
mod integration;
mod member;
mod permission;
mod pipeline;
mod profile;
mod profile_email;
mod profile_public_key;
mod project;
mod project_group;
mod project_member;
mod sandbox;
mod sandbox_status;
mod sso;
mod target;
mod variable;
mod variable_ssh_key;
mod webhook;
mod workspace;

pub use domain::DomainResource;
pub use domain_record::DomainRecordResource;
pub use environment::EnvironmentResource;
pub use group::GroupResource;
pub use group_member::GroupMemberResource;
pub use integration::IntegrationResource;
pub use member::MemberResource;
pub use permission::PermissionResource;
pub use pipeline::PipelineResource;
pub use profile::ProfileResource;
pub use profile_email::ProfileEmailResource;
pub use profile_public_key::ProfilePublicKeyResource;
pub use project::ProjectResource;
pub use project_group::ProjectGroupResource;
pub use project_member::ProjectMemberResource;
pub use sandbox::SandboxResource;
pub use sandbox_status::SandboxStatusResource;
pub use sso::SsoResource;
pub use target::TargetResource;
pub use variable::VariableResource;
pub use variable_ssh_key::VariableSshKeyResource;
pub use webhook::WebhookResource;
pub use workspace::WorkspaceResource;
pub(crate) use workspace::DOMAIN_PATTERN;

/// What every handler call gets: the shared client, process options and
/// the shutdown signal long-running waits observe.
#[derive(Debug, Clone)]
pub struct Context {
    /// Client built by Configure.
    pub client: Arc<BuddyClient>,
    /// Polling interval and wait defaults.
    pub options: ProviderOptions,
    /// Flips to `true` when the engine calls Stop.
    pub shutdown: watch::Receiver<bool>,
}

impl Context {
    /// Bundle the per-request handles.
    pub fn new(
        client: Arc<BuddyClient>,
        options: ProviderOptions,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            client,
            options,
            shutdown,
        }
    }

    /// Whether the provider has been asked to stop.
    pub fn is_stopping(&self) -> bool {
        *self.shutdown.borrow()
    }
}

/// A managed Service object.
#[async_trait]
pub trait Resource: Send + Sync + 'static {
    /// Typed resource state; the JSON form is what the engine stores.
    type State: Serialize + DeserializeOwned + Default + Send + Sync;

    /// Resource type name, e.g. `buddy_pipeline`.
    fn name(&self) -> &'static str;

    /// Attributes and blocks, with their validators and plan modifiers.
    fn schema(&self) -> Schema;

    /// Cross-field rules the schema cannot express. Runs on configuration
    /// that already passed schema validation; unknown values must be
    /// skipped.
    fn validate(&self, config: &Self::State) -> Vec<Diagnostic> {
        let _ = config;
        Vec::new()
    }

    /// Create the object and return the planned state with every computed
    /// value resolved. Once the object exists, a later failure should
    /// carry the state so far through [`ProviderError::with_state`].
    async fn create(
        &self,
        ctx: &Context,
        planned: Self::State,
    ) -> Result<Self::State, ProviderError>;

    /// Refresh. `None` means the object no longer exists.
    async fn read(
        &self,
        ctx: &Context,
        current: Self::State,
    ) -> Result<Option<Self::State>, ProviderError>;

    /// Apply an in-place change from `prior` to `planned`.
    async fn update(
        &self,
        ctx: &Context,
        prior: Self::State,
        planned: Self::State,
    ) -> Result<Self::State, ProviderError>;

    /// Delete the object. Already gone counts as success.
    async fn delete(&self, ctx: &Context, current: Self::State) -> Result<(), ProviderError>;

    /// Build state from an ID.
    async fn import(&self, ctx: &Context, id: &str) -> Result<Self::State, ProviderError> {
        let _ = (ctx, id);
        Err(ProviderError::Unimplemented(format!(
            "{} does not support import",
            Resource::name(self)
        )))
    }
}

/// Object-safe, JSON-facing view of a [`Resource`].
#[async_trait]
pub trait DynamicResource: Send + Sync {
    /// See [`Resource::name`].
    fn name(&self) -> &'static str;
    /// See [`Resource::schema`].
    fn schema(&self) -> Schema;
    /// Schema validation plus the resource's own rules.
    fn validate(&self, config: &serde_json::Value) -> Vec<Diagnostic>;
    /// See [`Resource::create`].
    async fn create(
        &self,
        ctx: &Context,
        planned: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError>;
    /// See [`Resource::read`].
    async fn read(
        &self,
        ctx: &Context,
        current: serde_json::Value,
    ) -> Result<Option<serde_json::Value>, ProviderError>;
    /// See [`Resource::update`].
    async fn update(
        &self,
        ctx: &Context,
        prior: serde_json::Value,
        planned: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError>;
    /// See [`Resource::delete`].
    async fn delete(&self, ctx: &Context, current: serde_json::Value) -> Result<(), ProviderError>;
    /// See [`Resource::import`].
    async fn import(&self, ctx: &Context, id: &str) -> Result<serde_json::Value, ProviderError>;
}

#[async_trait]
impl<R: Resource> DynamicResource for R {
    fn name(&self) -> &'static str {
        Resource::name(self)
    }

    fn schema(&self) -> Schema {
        Resource::schema(self)
    }

    fn validate(&self, config: &serde_json::Value) -> Vec<Diagnostic> {
        let schema = Resource::schema(self);
        let mut diagnostics = validation::validate(&schema, config);
        if diagnostics.iter().any(Diagnostic::is_error) {
            return diagnostics;
        }
        if let Ok(state) = decode::<R::State>(&schema, config.clone()) {
            diagnostics.extend(Resource::validate(self, &state));
        }
        diagnostics
    }

    async fn create(
        &self,
        ctx: &Context,
        planned: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        let planned = decode(&Resource::schema(self), planned)?;
        let state = Resource::create(self, ctx, planned).await?;
        Ok(serde_json::to_value(state)?)
    }

    async fn read(
        &self,
        ctx: &Context,
        current: serde_json::Value,
    ) -> Result<Option<serde_json::Value>, ProviderError> {
        let current = decode(&Resource::schema(self), current)?;
        match Resource::read(self, ctx, current).await? {
            Some(state) => Ok(Some(serde_json::to_value(state)?)),
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        ctx: &Context,
        prior: serde_json::Value,
        planned: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        let schema = Resource::schema(self);
        let prior = decode(&schema, prior)?;
        let planned = decode(&schema, planned)?;
        let state = Resource::update(self, ctx, prior, planned).await?;
        Ok(serde_json::to_value(state)?)
    }

    async fn delete(&self, ctx: &Context, current: serde_json::Value) -> Result<(), ProviderError> {
        let current = decode(&Resource::schema(self), current)?;
        Resource::delete(self, ctx, current).await
    }

    async fn import(&self, ctx: &Context, id: &str) -> Result<serde_json::Value, ProviderError> {
        let state = Resource::import(self, ctx, id).await?;
        Ok(serde_json::to_value(state)?)
    }
}

/// Decode engine JSON into a typed state. Single blocks may arrive wrapped
/// in a one-element list; they are unwrapped first.
pub(crate) fn decode<T: DeserializeOwned>(
    schema: &Schema,
    mut value: serde_json::Value,
) -> Result<T, ProviderError> {
    if value.is_null() {
        value = serde_json::Value::Object(serde_json::Map::new());
    }
    if let Some(obj) = value.as_object_mut() {
        for (name, nested) in &schema.block.blocks {
            if nested.nesting_mode != BlockNestingMode::Single {
                continue;
            }
            if let Some(slot) = obj.get_mut(name) {
                *slot = match slot.take() {
                    serde_json::Value::Array(mut items) if items.len() <= 1 => {
                        items.pop().unwrap_or(serde_json::Value::Null)
                    }
                    other => other,
                };
            }
        }
    }
    Ok(serde_json::from_value(value)?)
}

/// Finish an import: a read that finds nothing means the ID is wrong.
pub(crate) fn imported<S>(id: &str, state: Option<S>) -> Result<S, ProviderError> {
    state.ok_or_else(|| {
        ProviderError::invalid(
            Diagnostic::error(format!("Cannot import non-existent remote object '{id}'"))
                .with_attribute("id"),
        )
    })
}

/// All resource handlers keyed by type name.
pub fn registry() -> BTreeMap<&'static str, Arc<dyn DynamicResource>> {
    let handlers: Vec<Arc<dyn DynamicResource>> = vec![
        Arc::new(WorkspaceResource),
        Arc::new(ProjectResource),
        Arc::new(PipelineResource),
        Arc::new(MemberResource),
        Arc::new(GroupResource),
        Arc::new(GroupMemberResource),
        Arc::new(PermissionResource),
        Arc::new(ProjectMemberResource),
        Arc::new(ProjectGroupResource),
        Arc::new(IntegrationResource),
        Arc::new(EnvironmentResource),
        Arc::new(TargetResource),
        Arc::new(SandboxResource),
        Arc::new(SandboxStatusResource),
        Arc::new(WebhookResource),
        Arc::new(DomainResource),
        Arc::new(DomainRecordResource),
        Arc::new(VariableResource),
        Arc::new(VariableSshKeyResource),
        Arc::new(SsoResource),
        Arc::new(ProfileResource),
        Arc::new(ProfileEmailResource),
        Arc::new(ProfilePublicKeyResource),
    ];
    handlers.into_iter().map(|h| (h.name(), h)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_names() {
        let registry = registry();
        assert_eq!(registry.len(), 23);
        for (name, handler) in &registry {
            assert!(name.starts_with("buddy_"));
            assert_eq!(*name, handler.name());
            assert!(handler.schema().block.attributes.contains_key("id"), "{name} has no id");
        }
    }

    #[test]
    fn test_decode_unwraps_single_blocks() {
        #[derive(Debug, Default, serde::Deserialize)]
        #[serde(default)]
        struct WithAuth {
            auth: crate::value::Value<serde_json::Map<String, serde_json::Value>>,
        }
        let schema = Schema::resource("t").with_block(
            "auth",
            crate::schema::NestedBlock::single(crate::schema::Block::new()),
        );
        let state: WithAuth = decode(&schema, json!({"auth": [{"method": "PASS"}]})).unwrap();
        assert_eq!(state.auth.get().unwrap()["method"], "PASS");

        let state: WithAuth = decode(&schema, json!({"auth": []})).unwrap();
        assert!(state.auth.is_null());
    }

    #[test]
    fn test_imported_missing_object() {
        let err = imported::<()>("acme:42", None).unwrap_err();
        assert!(err.to_string().contains("acme:42"));
    }
}

//! `buddy_sandbox`: an on-demand VM. Create and update wait for each phase
//! its `wait_for_*` attribute enables.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::client::{Sandbox, SandboxOps};
use crate::convert::collections::list_from;
use crate::convert::required;
use crate::convert::sandbox::{endpoints_from_api, endpoints_to_api};
use crate::error::{ApiResultExt, ProviderError};
use crate::identity::{compose_triple, decompose_triple};
use crate::sandbox_wait::{
    wait_duration, wait_for_app, wait_for_configured, wait_for_running, MAX_WAIT_SECS,
};
use crate::schema::{Attribute, AttributeFlags, Schema, Validator};
use crate::value::{BoolValue, Int64Value, MapValue, SetValue, StringValue, Value};

use super::workspace::domain_attribute;
use super::{imported, Context, Resource};

const DEFAULT_RUNNING_TIMEOUT: i64 = 300;
const DEFAULT_CONFIGURED_TIMEOUT: i64 = 600;
const DEFAULT_APP_TIMEOUT: i64 = 600;

const RESOURCES: &[&str] = &[
    "1x2", "2x4", "3x6", "4x8", "5x10", "6x12", "7x14", "8x16", "9x18", "10x20", "11x22", "12x24",
];

/// Sandboxes.
pub struct SandboxResource;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxState {
    pub id: StringValue,
    pub domain: StringValue,
    pub project_name: StringValue,
    pub name: StringValue,
    pub identifier: StringValue,
    pub os: StringValue,
    pub resources: StringValue,
    pub install_commands: StringValue,
    pub run_command: StringValue,
    pub app_dir: StringValue,
    pub app_type: StringValue,
    pub tags: SetValue<String>,
    pub endpoints: MapValue<String>,
    pub wait_for_running: BoolValue,
    pub wait_for_running_timeout: Int64Value,
    pub wait_for_configured: BoolValue,
    pub wait_for_configured_timeout: Int64Value,
    pub wait_for_app: BoolValue,
    pub wait_for_app_timeout: Int64Value,
    pub status: StringValue,
    pub setup_status: StringValue,
    pub app_status: StringValue,
    pub sandbox_id: StringValue,
    pub html_url: StringValue,
    pub ssh_command: StringValue,
}

fn seconds(value: &Int64Value, default: i64) -> Duration {
    wait_duration(value.cloned(), default)
}

impl SandboxState {
    fn to_ops(&self) -> SandboxOps {
        SandboxOps {
            name: self.name.cloned(),
            identifier: self.identifier.cloned(),
            os: self.os.cloned(),
            resources: self.resources.cloned(),
            install_commands: self.install_commands.cloned(),
            run_command: self.run_command.cloned(),
            app_dir: self.app_dir.cloned(),
            app_type: self.app_type.cloned(),
            tags: self.tags.cloned(),
            endpoints: endpoints_to_api(&self.endpoints),
        }
    }

    fn apply(&mut self, domain: &str, project: &str, s: &Sandbox) {
        self.id = Value::Known(compose_triple(domain, project, &s.id));
        self.domain = Value::Known(domain.to_string());
        self.project_name = Value::Known(project.to_string());
        self.sandbox_id = Value::Known(s.id.clone());
        self.name = Value::Known(s.name.clone());
        self.identifier = Value::Known(s.identifier.clone());
        self.os = Value::Known(s.os.clone());
        self.resources = Value::Known(s.resources.clone());
        self.install_commands = StringValue::non_empty(Some(s.install_commands.clone()));
        self.run_command = StringValue::non_empty(Some(s.run_command.clone()));
        self.app_dir = StringValue::non_empty(Some(s.app_dir.clone()));
        self.app_type = Value::Known(s.app_type.clone());
        self.tags = list_from(s.tags.clone(), &self.tags);
        self.endpoints = endpoints_from_api(&s.endpoints, &self.endpoints);
        self.status = Value::Known(s.status.clone());
        self.setup_status = Value::Known(s.setup_status.clone());
        self.app_status = Value::Known(s.app_status.clone());
        self.html_url = Value::Known(s.html_url.clone());
        self.ssh_command = Value::Known(s.ssh_command.clone());
    }

    /// Wait settings are not Service attributes; an imported state gets the
    /// defaults.
    fn default_waits(&mut self) {
        fn fill<T>(value: &mut Value<T>, default: T) {
            if !value.is_present() {
                *value = Value::Known(default);
            }
        }
        fill(&mut self.wait_for_running, true);
        fill(&mut self.wait_for_running_timeout, DEFAULT_RUNNING_TIMEOUT);
        fill(&mut self.wait_for_configured, false);
        fill(&mut self.wait_for_configured_timeout, DEFAULT_CONFIGURED_TIMEOUT);
        fill(&mut self.wait_for_app, false);
        fill(&mut self.wait_for_app_timeout, DEFAULT_APP_TIMEOUT);
    }

    fn running_wait(&self) -> Option<Duration> {
        self.wait_for_running
            .cloned()
            .unwrap_or(true)
            .then(|| seconds(&self.wait_for_running_timeout, DEFAULT_RUNNING_TIMEOUT))
    }

    fn configured_wait(&self) -> Option<Duration> {
        self.wait_for_configured
            .cloned()
            .unwrap_or(false)
            .then(|| seconds(&self.wait_for_configured_timeout, DEFAULT_CONFIGURED_TIMEOUT))
    }

    fn app_wait(&self) -> Option<Duration> {
        self.wait_for_app
            .cloned()
            .unwrap_or(false)
            .then(|| seconds(&self.wait_for_app_timeout, DEFAULT_APP_TIMEOUT))
    }
}

fn keys(id: &StringValue) -> Result<(String, String, String), ProviderError> {
    decompose_triple(required(id, "id")?)
}

/// Run the configured and app phases. The sandbox exists at this point, so
/// a failure carries the state that must still be written.
async fn settle(
    ctx: &Context,
    domain: &str,
    project: &str,
    mut state: SandboxState,
) -> Result<SandboxState, ProviderError> {
    let sandbox_id = state.sandbox_id.as_str().to_string();
    if let Some(timeout) = state.configured_wait() {
        match wait_for_configured(ctx, domain, &sandbox_id, timeout).await {
            Ok(sandbox) => state.apply(domain, project, &sandbox),
            Err(err) => return Err(err.with_state(serde_json::to_value(&state)?)),
        }
    }
    if let Some(timeout) = state.app_wait() {
        match wait_for_app(ctx, domain, &sandbox_id, timeout).await {
            Ok(sandbox) => state.apply(domain, project, &sandbox),
            Err(err) => return Err(err.with_state(serde_json::to_value(&state)?)),
        }
    }
    Ok(state)
}

#[async_trait]
impl Resource for SandboxResource {
    type State = SandboxState;

    fn name(&self) -> &'static str {
        "buddy_sandbox"
    }

    fn schema(&self) -> Schema {
        let timeout = |default: i64| {
            Attribute::optional_int64()
                .with_default(json!(default))
                .with_validator(Validator::between(1, MAX_WAIT_SECS))
                .with_description("Seconds")
        };
        Schema::resource("An on-demand sandbox VM")
            .with_attribute("domain", domain_attribute())
            .with_attribute("project_name", Attribute::required_string().requires_replace())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("identifier", Attribute::optional_computed_string())
            .with_attribute(
                "os",
                Attribute::required_string()
                    .requires_replace()
                    .one_of(&["ubuntu:20.04", "ubuntu:22.04", "ubuntu:24.04"]),
            )
            .with_attribute("resources", Attribute::optional_computed_string().one_of(RESOURCES))
            .with_attribute("install_commands", Attribute::optional_string())
            .with_attribute("run_command", Attribute::optional_string())
            .with_attribute("app_dir", Attribute::optional_string())
            .with_attribute(
                "app_type",
                Attribute::optional_computed_string().one_of(&["CMD", "SERVICE"]),
            )
            .with_attribute("tags", Attribute::string_set(AttributeFlags::optional()))
            .with_attribute("endpoints", Attribute::string_map(AttributeFlags::optional()))
            .with_attribute(
                "wait_for_running",
                Attribute::optional_bool().with_default(json!(true)),
            )
            .with_attribute("wait_for_running_timeout", timeout(DEFAULT_RUNNING_TIMEOUT))
            .with_attribute(
                "wait_for_configured",
                Attribute::optional_bool().with_default(json!(false)),
            )
            .with_attribute("wait_for_configured_timeout", timeout(DEFAULT_CONFIGURED_TIMEOUT))
            .with_attribute("wait_for_app", Attribute::optional_bool().with_default(json!(false)))
            .with_attribute("wait_for_app_timeout", timeout(DEFAULT_APP_TIMEOUT))
            .with_attribute("status", Attribute::computed_string())
            .with_attribute("setup_status", Attribute::computed_string())
            .with_attribute("app_status", Attribute::computed_string())
            .with_attribute("sandbox_id", Attribute::computed_string().use_state_for_unknown())
            .with_attribute("html_url", Attribute::computed_string().use_state_for_unknown())
            .with_attribute("ssh_command", Attribute::computed_string().use_state_for_unknown())
    }

    async fn create(
        &self,
        ctx: &Context,
        planned: SandboxState,
    ) -> Result<SandboxState, ProviderError> {
        let domain = required(&planned.domain, "domain")?.clone();
        let project = required(&planned.project_name, "project_name")?.clone();
        let mut sandbox = ctx
            .client
            .create_sandbox(&domain, &project, &planned.to_ops())
            .await
            .or_api_err("create sandbox")?;
        info!(domain = %domain, project = %project, sandbox = %sandbox.id, "Created sandbox");

        if let Some(timeout) = planned.running_wait() {
            sandbox = wait_for_running(ctx, &domain, &sandbox.id, timeout, false).await?;
        }

        let mut state = planned;
        state.apply(&domain, &project, &sandbox);
        settle(ctx, &domain, &project, state).await
    }

    async fn read(
        &self,
        ctx: &Context,
        current: SandboxState,
    ) -> Result<Option<SandboxState>, ProviderError> {
        let (domain, project, sandbox_id) = keys(&current.id)?;
        let Some(sandbox) = ctx
            .client
            .get_sandbox(&domain, &sandbox_id)
            .await
            .found("read sandbox")?
        else {
            warn!(
                domain = %domain,
                sandbox = %sandbox_id,
                "Sandbox no longer exists, removing from state"
            );
            return Ok(None);
        };
        let mut state = current;
        state.apply(&domain, &project, &sandbox);
        Ok(Some(state))
    }

    async fn update(
        &self,
        ctx: &Context,
        prior: SandboxState,
        planned: SandboxState,
    ) -> Result<SandboxState, ProviderError> {
        let (domain, project, sandbox_id) = keys(&prior.id)?;

        // The Service rejects changes while the sandbox is busy.
        let running_timeout = seconds(&planned.wait_for_running_timeout, DEFAULT_RUNNING_TIMEOUT);
        wait_for_running(ctx, &domain, &sandbox_id, running_timeout, true).await?;
        let configured_timeout =
            seconds(&planned.wait_for_configured_timeout, DEFAULT_CONFIGURED_TIMEOUT);
        wait_for_configured(ctx, &domain, &sandbox_id, configured_timeout).await?;

        let sandbox = ctx
            .client
            .update_sandbox(&domain, &sandbox_id, &planned.to_ops())
            .await
            .or_api_err("update sandbox")?;
        let mut state = planned;
        state.apply(&domain, &project, &sandbox);
        settle(ctx, &domain, &project, state).await
    }

    async fn delete(&self, ctx: &Context, current: SandboxState) -> Result<(), ProviderError> {
        let (domain, _, sandbox_id) = keys(&current.id)?;
        ctx.client
            .delete_sandbox(&domain, &sandbox_id)
            .await
            .ignore_not_found("delete sandbox")?;
        info!(domain = %domain, sandbox = %sandbox_id, "Deleted sandbox");
        Ok(())
    }

    async fn import(&self, ctx: &Context, id: &str) -> Result<SandboxState, ProviderError> {
        let mut state = SandboxState {
            id: Value::Known(id.to_string()),
            ..Default::default()
        };
        keys(&state.id)?;
        state.default_waits();
        imported(id, self.read(ctx, state).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::decode;

    #[test]
    fn test_wait_defaults() {
        let state = SandboxState::default();
        assert_eq!(state.running_wait(), Some(Duration::from_secs(300)));
        assert_eq!(state.configured_wait(), None);
        assert_eq!(state.app_wait(), None);

        let state: SandboxState = decode(
            &SandboxResource.schema(),
            json!({"wait_for_running": false, "wait_for_app": true, "wait_for_app_timeout": 30}),
        )
        .unwrap();
        assert_eq!(state.running_wait(), None);
        assert_eq!(state.app_wait(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_import_fills_waits() {
        let mut state = SandboxState {
            wait_for_app: Value::Known(true),
            ..Default::default()
        };
        state.default_waits();
        assert_eq!(state.wait_for_running, Value::Known(true));
        assert_eq!(state.wait_for_app, Value::Known(true));
        assert_eq!(state.wait_for_configured_timeout, Value::Known(600));
    }

    #[test]
    fn test_apply_nulls_empty_optionals() {
        let mut state = SandboxState::default();
        state.apply(
            "acme",
            "backend",
            &Sandbox {
                id: "sb1".to_string(),
                status: "RUNNING".to_string(),
                ..Default::default()
            },
        );
        assert_eq!(state.id.as_str(), "acme:backend:sb1");
        assert!(state.run_command.is_null());
        assert!(state.endpoints.is_null());
    }
}

//! `buddy_sandbox_status`: drives an existing sandbox to RUNNING or
//! STOPPED and waits until it gets there.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::client::Sandbox;
use crate::convert::required;
use crate::convert::sandbox::is_transitional;
use crate::error::{ApiResultExt, ProviderError};
use crate::identity::{compose_double, decompose_double};
use crate::sandbox_wait::{wait_duration, wait_for_running, wait_for_stopped, MAX_WAIT_SECS};
use crate::schema::{Attribute, Schema, Validator};
use crate::value::{Int64Value, StringValue, Value};

use super::workspace::domain_attribute;
use super::{Context, Resource};

const DEFAULT_TIMEOUT: i64 = 300;

/// Desired run state of an existing sandbox. Deleting it leaves the
/// sandbox as it is.
pub struct SandboxStatusResource;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxStatusState {
    pub id: StringValue,
    pub domain: StringValue,
    pub sandbox_id: StringValue,
    pub status: StringValue,
    pub timeout: Int64Value,
}

impl SandboxStatusState {
    fn timeout(&self) -> Duration {
        wait_duration(self.timeout.cloned(), DEFAULT_TIMEOUT)
    }
}

/// Drive the sandbox to `desired` and wait for it to get there.
async fn converge(
    ctx: &Context,
    domain: &str,
    sandbox_id: &str,
    desired: &str,
    timeout: Duration,
) -> Result<Sandbox, ProviderError> {
    if desired == "RUNNING" {
        return wait_for_running(ctx, domain, sandbox_id, timeout, true).await;
    }

    let sandbox = ctx
        .client
        .get_sandbox(domain, sandbox_id)
        .await
        .or_api_err("read sandbox")?;
    let sandbox = if is_transitional(&sandbox.status) {
        wait_for_running(ctx, domain, sandbox_id, timeout, false).await?
    } else {
        sandbox
    };
    if sandbox.status == "STOPPED" {
        return Ok(sandbox);
    }
    info!(domain = %domain, sandbox = %sandbox_id, "Stopping sandbox");
    ctx.client
        .stop_sandbox(domain, sandbox_id)
        .await
        .or_api_err("stop sandbox")?;
    wait_for_stopped(ctx, domain, sandbox_id, timeout).await
}

#[async_trait]
impl Resource for SandboxStatusResource {
    type State = SandboxStatusState;

    fn name(&self) -> &'static str {
        "buddy_sandbox_status"
    }

    fn schema(&self) -> Schema {
        Schema::resource("Keeps a sandbox running or stopped")
            .with_attribute("domain", domain_attribute())
            .with_attribute("sandbox_id", Attribute::required_string().requires_replace())
            .with_attribute(
                "status",
                Attribute::required_string().one_of(&["RUNNING", "STOPPED"]),
            )
            .with_attribute(
                "timeout",
                Attribute::optional_int64()
                    .with_default(json!(DEFAULT_TIMEOUT))
                    .with_validator(Validator::between(1, MAX_WAIT_SECS))
                    .with_description("Seconds to wait for the status change"),
            )
    }

    async fn create(
        &self,
        ctx: &Context,
        planned: SandboxStatusState,
    ) -> Result<SandboxStatusState, ProviderError> {
        let domain = required(&planned.domain, "domain")?.clone();
        let sandbox_id = required(&planned.sandbox_id, "sandbox_id")?.clone();
        let desired = required(&planned.status, "status")?.clone();
        let sandbox = converge(ctx, &domain, &sandbox_id, &desired, planned.timeout()).await?;

        let mut state = planned;
        state.id = Value::Known(compose_double(&domain, &sandbox_id));
        state.status = Value::Known(sandbox.status);
        Ok(state)
    }

    async fn read(
        &self,
        ctx: &Context,
        current: SandboxStatusState,
    ) -> Result<Option<SandboxStatusState>, ProviderError> {
        let (domain, sandbox_id) = decompose_double(required(&current.id, "id")?)?;
        let Some(sandbox) = ctx
            .client
            .get_sandbox(&domain, &sandbox_id)
            .await
            .found("read sandbox")?
        else {
            warn!(
                domain = %domain,
                sandbox = %sandbox_id,
                "Sandbox no longer exists, removing status from state"
            );
            return Ok(None);
        };
        let mut state = current;
        state.status = Value::Known(sandbox.status);
        Ok(Some(state))
    }

    async fn update(
        &self,
        ctx: &Context,
        _prior: SandboxStatusState,
        planned: SandboxStatusState,
    ) -> Result<SandboxStatusState, ProviderError> {
        self.create(ctx, planned).await
    }

    async fn delete(
        &self,
        _ctx: &Context,
        _current: SandboxStatusState,
    ) -> Result<(), ProviderError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_default() {
        assert_eq!(SandboxStatusState::default().timeout(), Duration::from_secs(300));
        let state = SandboxStatusState {
            timeout: Value::Known(0),
            ..Default::default()
        };
        assert_eq!(state.timeout(), Duration::from_secs(1));
    }
}

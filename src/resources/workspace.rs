//! `buddy_workspace`, identified by its domain.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::client::{Workspace, WorkspaceCreate, WorkspaceUpdate};
use crate::convert::{required, timestamp};
use crate::error::{ApiResultExt, ProviderError};
use crate::schema::{Attribute, Schema, Validator};
use crate::value::{BoolValue, Int64Value, StringValue, Value};

use super::{imported, Context, Resource};

/// Handle for workspace domains.
pub const DOMAIN_PATTERN: &str = r"^[a-z0-9][a-z0-9-]{1,}[a-z0-9]$";

/// Workspaces. Creating one needs an account that may create workspaces;
/// deleting one removes everything in it.
pub struct WorkspaceResource;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceState {
    pub id: StringValue,
    pub domain: StringValue,
    pub name: StringValue,
    pub encryption_salt: StringValue,
    pub workspace_id: Int64Value,
    pub owner_id: Int64Value,
    pub frozen: BoolValue,
    pub create_date: StringValue,
    pub html_url: StringValue,
    pub url: StringValue,
}

impl WorkspaceState {
    fn apply(&mut self, ws: &Workspace) {
        self.id = Value::Known(ws.domain.clone());
        self.domain = Value::Known(ws.domain.clone());
        self.name = Value::Known(ws.name.clone());
        self.workspace_id = Value::Known(ws.id);
        self.owner_id = Value::Known(ws.owner_id);
        self.frozen = Value::Known(ws.frozen);
        self.create_date = timestamp(&ws.create_date);
        self.html_url = Value::Known(ws.html_url.clone());
        self.url = Value::Known(ws.url.clone());
    }
}

/// Domain attribute shared by every workspace-scoped resource.
pub fn domain_attribute() -> Attribute {
    Attribute::required_string()
        .requires_replace()
        .with_description("Workspace domain")
        .with_validator(Validator::regex(
            DOMAIN_PATTERN,
            "must be a workspace domain (lowercase letters, digits and hyphens)",
        ))
}

#[async_trait]
impl Resource for WorkspaceResource {
    type State = WorkspaceState;

    fn name(&self) -> &'static str {
        "buddy_workspace"
    }

    fn schema(&self) -> Schema {
        Schema::resource("A Buddy workspace")
            .with_attribute("domain", domain_attribute())
            .with_attribute(
                "name",
                Attribute::optional_computed_string().use_state_for_unknown(),
            )
            .with_attribute(
                "encryption_salt",
                Attribute::optional_string()
                    .sensitive()
                    .requires_replace()
                    .with_description(
                        "Salt for encrypting workspace secrets; never returned by the API",
                    ),
            )
            .with_attribute(
                "workspace_id",
                Attribute::computed_int64().use_state_for_unknown(),
            )
            .with_attribute("owner_id", Attribute::computed_int64().use_state_for_unknown())
            .with_attribute("frozen", Attribute::computed_bool())
            .with_attribute(
                "create_date",
                Attribute::computed_string().use_state_for_unknown(),
            )
            .with_attribute("html_url", Attribute::computed_string().use_state_for_unknown())
            .with_attribute("url", Attribute::computed_string().use_state_for_unknown())
    }

    async fn create(
        &self,
        ctx: &Context,
        planned: WorkspaceState,
    ) -> Result<WorkspaceState, ProviderError> {
        let domain = required(&planned.domain, "domain")?;
        let ops = WorkspaceCreate {
            domain: domain.clone(),
            name: planned.name.cloned(),
            encryption_salt: planned.encryption_salt.cloned(),
        };
        let ws = ctx
            .client
            .create_workspace(&ops)
            .await
            .or_api_err("create workspace")?;
        info!(domain = %ws.domain, "Created workspace");

        let mut state = planned;
        state.apply(&ws);
        Ok(state)
    }

    async fn read(
        &self,
        ctx: &Context,
        current: WorkspaceState,
    ) -> Result<Option<WorkspaceState>, ProviderError> {
        let domain = required(&current.domain, "domain")?;
        let Some(ws) = ctx
            .client
            .get_workspace(domain)
            .await
            .found("read workspace")?
        else {
            warn!(domain = %domain, "Workspace no longer exists, removing from state");
            return Ok(None);
        };
        let mut state = current;
        state.apply(&ws);
        Ok(Some(state))
    }

    async fn update(
        &self,
        ctx: &Context,
        _prior: WorkspaceState,
        planned: WorkspaceState,
    ) -> Result<WorkspaceState, ProviderError> {
        let domain = required(&planned.domain, "domain")?;
        let ops = WorkspaceUpdate {
            name: planned.name.cloned(),
        };
        let ws = ctx
            .client
            .update_workspace(domain, &ops)
            .await
            .or_api_err("update workspace")?;

        let mut state = planned;
        state.apply(&ws);
        Ok(state)
    }

    async fn delete(&self, ctx: &Context, current: WorkspaceState) -> Result<(), ProviderError> {
        let domain = required(&current.domain, "domain")?;
        ctx.client
            .delete_workspace(domain)
            .await
            .ignore_not_found("delete workspace")?;
        info!(domain = %domain, "Deleted workspace");
        Ok(())
    }

    async fn import(&self, ctx: &Context, id: &str) -> Result<WorkspaceState, ProviderError> {
        let state = WorkspaceState {
            domain: Value::Known(id.to_string()),
            ..Default::default()
        };
        imported(id, self.read(ctx, state).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate;
    use serde_json::json;

    #[test]
    fn test_domain_pattern() {
        let schema = WorkspaceResource.schema();
        assert!(validate(&schema, &json!({"domain": "acme-corp"})).is_empty());
        for bad in ["A", "ab", "-acme", "acme_corp", "Acme"] {
            assert_eq!(validate(&schema, &json!({"domain": bad})).len(), 1, "{bad}");
        }
    }

    #[test]
    fn test_apply_keeps_salt() {
        let mut state = WorkspaceState {
            domain: Value::Known("acme".to_string()),
            encryption_salt: Value::Known("pepper".to_string()),
            ..Default::default()
        };
        state.apply(&Workspace {
            id: 12,
            domain: "acme".to_string(),
            name: "Acme".to_string(),
            create_date: "2024-01-02T03:04:05.000Z".to_string(),
            ..Default::default()
        });
        assert_eq!(state.id.as_str(), "acme");
        assert_eq!(state.workspace_id, Value::Known(12));
        assert_eq!(state.encryption_salt.as_str(), "pepper");
        assert_eq!(state.create_date.as_str(), "2024-01-02T03:04:05Z");
    }

    #[test]
    fn test_salt_is_sensitive_and_replacing() {
        let schema = WorkspaceResource.schema();
        let salt = &schema.block.attributes["encryption_salt"];
        assert!(salt.flags.sensitive);
        assert!(salt.force_new());
    }
}

//! `buddy_domain`, a DNS zone. ID `<workspace>:<domain_id>`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::convert::required;
use crate::error::{ApiResultExt, ProviderError};
use crate::identity::{compose_double, decompose_double};
use crate::schema::{Attribute, Schema, Validator};
use crate::value::{StringValue, Value};

use super::workspace::domain_attribute;
use super::{Context, Resource};

/// Fully-qualified DNS name.
pub const FQDN_PATTERN: &str =
    r"^([a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,63}$";

/// A DNS zone hosted by the Service. The Service has no single-zone
/// lookup, so reads list the workspace zones.
pub struct DomainResource;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainState {
    pub id: StringValue,
    pub workspace_domain: StringValue,
    pub domain: StringValue,
    pub domain_id: StringValue,
}

pub(crate) fn fqdn_attribute() -> Attribute {
    Attribute::required_string()
        .requires_replace()
        .with_validator(Validator::regex(FQDN_PATTERN, "must be a fully-qualified domain name"))
}

#[async_trait]
impl Resource for DomainResource {
    type State = DomainState;

    fn name(&self) -> &'static str {
        "buddy_domain"
    }

    fn schema(&self) -> Schema {
        Schema::resource("A DNS zone hosted by Buddy")
            .with_attribute("workspace_domain", domain_attribute())
            .with_attribute("domain", fqdn_attribute())
            .with_attribute("domain_id", Attribute::computed_string().use_state_for_unknown())
    }

    async fn create(
        &self,
        ctx: &Context,
        planned: DomainState,
    ) -> Result<DomainState, ProviderError> {
        let workspace = required(&planned.workspace_domain, "workspace_domain")?.clone();
        let name = required(&planned.domain, "domain")?;
        let domain = ctx
            .client
            .create_domain(&workspace, name)
            .await
            .or_api_err("create domain")?;
        info!(workspace = %workspace, domain = %domain.name, "Created domain");

        let mut state = planned;
        state.id = Value::Known(compose_double(&workspace, &domain.id));
        state.domain_id = Value::Known(domain.id);
        Ok(state)
    }

    async fn read(
        &self,
        ctx: &Context,
        current: DomainState,
    ) -> Result<Option<DomainState>, ProviderError> {
        let (workspace, domain_id) = decompose_double(required(&current.id, "id")?)?;
        let Some(domains) = ctx
            .client
            .list_domains(&workspace)
            .await
            .found("list domains")?
        else {
            warn!(workspace = %workspace, "Workspace no longer exists, removing domain from state");
            return Ok(None);
        };
        let Some(domain) = domains.into_iter().find(|d| d.id == domain_id) else {
            warn!(
                workspace = %workspace,
                domain_id = %domain_id,
                "Domain no longer exists, removing from state"
            );
            return Ok(None);
        };

        let mut state = current;
        state.workspace_domain = Value::Known(workspace);
        state.domain = Value::Known(domain.name);
        state.domain_id = Value::Known(domain.id);
        Ok(Some(state))
    }

    /// Every attribute forces replacement.
    async fn update(
        &self,
        _ctx: &Context,
        prior: DomainState,
        planned: DomainState,
    ) -> Result<DomainState, ProviderError> {
        Ok(DomainState {
            id: prior.id,
            domain_id: prior.domain_id,
            ..planned
        })
    }

    async fn delete(&self, ctx: &Context, current: DomainState) -> Result<(), ProviderError> {
        let (workspace, domain_id) = decompose_double(required(&current.id, "id")?)?;
        ctx.client
            .delete_domain(&workspace, &domain_id)
            .await
            .ignore_not_found("delete domain")?;
        info!(workspace = %workspace, domain_id = %domain_id, "Deleted domain");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate;
    use serde_json::json;

    #[test]
    fn test_fqdn_pattern() {
        let schema = DomainResource.schema();
        for good in ["acme.io", "dev.acme.io", "a-b.example.com"] {
            let config = json!({"workspace_domain": "acme", "domain": good});
            assert!(validate(&schema, &config).is_empty(), "{good}");
        }
        for bad in ["acme", "-acme.io", "acme..io", "ACME.IO"] {
            let config = json!({"workspace_domain": "acme", "domain": bad});
            assert_eq!(validate(&schema, &config).len(), 1, "{bad}");
        }
    }
}

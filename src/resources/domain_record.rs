//! `buddy_domain_record`: one record set, keyed by name and type.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::client::{DomainRecord, DomainRecordUpsert};
use crate::convert::collections::list_from;
use crate::convert::required;
use crate::error::{ApiResultExt, ProviderError};
use crate::identity::{compose_triple, decompose_triple};
use crate::schema::{Attribute, AttributeFlags, Schema, Validator};
use crate::value::{Int64Value, ListValue, StringValue, Value};

use super::domain::fqdn_attribute;
use super::workspace::domain_attribute;
use super::{imported, Context, Resource};

const RECORD_TYPES: &[&str] = &["A", "AAAA", "CNAME", "MX", "TXT", "NS", "SRV", "CAA"];

/// A record set keyed by name and type. Create and update are the same
/// upsert call.
pub struct DomainRecordResource;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainRecordState {
    pub id: StringValue,
    pub workspace_domain: StringValue,
    pub domain: StringValue,
    #[serde(rename = "type")]
    pub record_type: StringValue,
    pub ttl: Int64Value,
    pub value: ListValue<String>,
}

impl DomainRecordState {
    fn apply(&mut self, workspace: &str, fqdn: &str, r: &DomainRecord) {
        self.id = Value::Known(compose_triple(workspace, fqdn, &r.record_type));
        self.workspace_domain = Value::Known(workspace.to_string());
        self.domain = Value::Known(fqdn.to_string());
        self.record_type = Value::Known(r.record_type.clone());
        self.ttl = Value::Known(r.ttl);
        self.value = list_from(r.values.clone(), &self.value);
    }
}

fn keys(id: &StringValue) -> Result<(String, String, String), ProviderError> {
    decompose_triple(required(id, "id")?)
}

async fn upsert(
    ctx: &Context,
    planned: DomainRecordState,
) -> Result<DomainRecordState, ProviderError> {
    let workspace = required(&planned.workspace_domain, "workspace_domain")?.clone();
    let fqdn = required(&planned.domain, "domain")?.clone();
    let record_type = required(&planned.record_type, "type")?.clone();
    let ops = DomainRecordUpsert {
        ttl: *required(&planned.ttl, "ttl")?,
        values: required(&planned.value, "value")?.clone(),
    };
    let mut record = ctx
        .client
        .upsert_domain_record(&workspace, &fqdn, &record_type, &ops)
        .await
        .or_api_err("upsert domain record")?;
    if record.record_type.is_empty() {
        record.record_type = record_type;
    }
    info!(
        workspace = %workspace,
        domain = %fqdn,
        record_type = %record.record_type,
        "Upserted domain record"
    );

    let mut state = planned;
    state.apply(&workspace, &fqdn, &record);
    Ok(state)
}

#[async_trait]
impl Resource for DomainRecordResource {
    type State = DomainRecordState;

    fn name(&self) -> &'static str {
        "buddy_domain_record"
    }

    fn schema(&self) -> Schema {
        Schema::resource("A DNS record set in a Buddy-hosted zone")
            .with_attribute("workspace_domain", domain_attribute())
            .with_attribute("domain", fqdn_attribute())
            .with_attribute(
                "type",
                Attribute::required_string().requires_replace().one_of(RECORD_TYPES),
            )
            .with_attribute(
                "ttl",
                Attribute::required_int64().with_validator(Validator::between(60, 86400)),
            )
            .with_attribute(
                "value",
                Attribute::string_list(AttributeFlags::required())
                    .with_validator(Validator::min_items(1)),
            )
    }

    async fn create(
        &self,
        ctx: &Context,
        planned: DomainRecordState,
    ) -> Result<DomainRecordState, ProviderError> {
        upsert(ctx, planned).await
    }

    async fn read(
        &self,
        ctx: &Context,
        current: DomainRecordState,
    ) -> Result<Option<DomainRecordState>, ProviderError> {
        let (workspace, fqdn, record_type) = keys(&current.id)?;
        let Some(mut record) = ctx
            .client
            .get_domain_record(&workspace, &fqdn, &record_type)
            .await
            .found("read domain record")?
        else {
            warn!(
                workspace = %workspace,
                domain = %fqdn,
                record_type = %record_type,
                "Domain record no longer exists, removing from state"
            );
            return Ok(None);
        };
        if record.record_type.is_empty() {
            record.record_type = record_type;
        }
        let mut state = current;
        state.apply(&workspace, &fqdn, &record);
        Ok(Some(state))
    }

    async fn update(
        &self,
        ctx: &Context,
        _prior: DomainRecordState,
        planned: DomainRecordState,
    ) -> Result<DomainRecordState, ProviderError> {
        upsert(ctx, planned).await
    }

    async fn delete(&self, ctx: &Context, current: DomainRecordState) -> Result<(), ProviderError> {
        let (workspace, fqdn, record_type) = keys(&current.id)?;
        ctx.client
            .delete_domain_record(&workspace, &fqdn, &record_type)
            .await
            .ignore_not_found("delete domain record")?;
        info!(
            workspace = %workspace,
            domain = %fqdn,
            record_type = %record_type,
            "Deleted domain record"
        );
        Ok(())
    }

    async fn import(&self, ctx: &Context, id: &str) -> Result<DomainRecordState, ProviderError> {
        let state = DomainRecordState {
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

    #[test]
    fn test_ttl_and_values() {
        let schema = DomainRecordResource.schema();
        let config = json!({
            "workspace_domain": "acme",
            "domain": "www.acme.io",
            "type": "A",
            "ttl": 30,
            "value": []
        });
        let attributes: Vec<_> = validate(&schema, &config)
            .into_iter()
            .filter_map(|d| d.attribute)
            .collect();
        assert_eq!(attributes, vec!["ttl", "value"]);
    }

    #[test]
    fn test_apply_id() {
        let mut state = DomainRecordState::default();
        state.apply(
            "acme",
            "www.acme.io",
            &DomainRecord {
                name: "www.acme.io".to_string(),
                record_type: "CNAME".to_string(),
                ttl: 300,
                values: vec!["acme.io".to_string()],
            },
        );
        assert_eq!(state.id.as_str(), "acme:www.acme.io:CNAME");
        assert_eq!(state.value.get().unwrap(), &vec!["acme.io".to_string()]);
    }
}

//! `buddy_webhook`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::client::{Webhook, WebhookOps};
use crate::convert::collections::list_from;
use crate::convert::required;
use crate::error::{ApiResultExt, ProviderError};
use crate::identity::{compose_double, decompose_double, parse_component};
use crate::schema::{Attribute, AttributeFlags, Schema, Validator};
use crate::value::{Int64Value, SetValue, StringValue, Value};

use super::workspace::domain_attribute;
use super::{imported, Context, Resource};

const EVENTS: &[&str] = &[
    "PUSH",
    "EXECUTION_STARTED",
    "EXECUTION_SUCCESSFUL",
    "EXECUTION_FAILED",
    "EXECUTION_FINISHED",
];

/// Workspace webhooks.
pub struct WebhookResource;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookState {
    pub id: StringValue,
    pub domain: StringValue,
    pub target_url: StringValue,
    pub secret_key: StringValue,
    pub events: SetValue<String>,
    pub projects: SetValue<String>,
    pub webhook_id: Int64Value,
    pub html_url: StringValue,
}

impl WebhookState {
    fn to_ops(&self) -> WebhookOps {
        WebhookOps {
            target_url: self.target_url.cloned(),
            secret_key: self.secret_key.cloned(),
            events: self.events.cloned(),
            projects: self.projects.cloned(),
        }
    }

    fn apply(&mut self, domain: &str, w: &Webhook) {
        self.id = Value::Known(compose_double(domain, w.id));
        self.domain = Value::Known(domain.to_string());
        self.webhook_id = Value::Known(w.id);
        self.target_url = Value::Known(w.target_url.clone());
        self.events = list_from(w.events.clone(), &self.events);
        self.projects = list_from(w.projects.clone(), &self.projects);
        self.html_url = Value::Known(w.html_url.clone());
    }
}

fn keys(id: &StringValue) -> Result<(String, i64), ProviderError> {
    let raw = required(id, "id")?;
    let (domain, webhook) = decompose_double(raw)?;
    Ok((domain, parse_component(raw, &webhook)?))
}

#[async_trait]
impl Resource for WebhookResource {
    type State = WebhookState;

    fn name(&self) -> &'static str {
        "buddy_webhook"
    }

    fn schema(&self) -> Schema {
        Schema::resource("A workspace webhook")
            .with_attribute("domain", domain_attribute())
            .with_attribute(
                "target_url",
                Attribute::required_string()
                    .with_validator(Validator::regex(r"^https?://\S+$", "must be an http(s) URL")),
            )
            .with_attribute("secret_key", Attribute::optional_string().sensitive())
            .with_attribute(
                "events",
                Attribute::string_set(AttributeFlags::required())
                    .with_validator(Validator::min_items(1))
                    .with_validator(Validator::one_of(EVENTS)),
            )
            .with_attribute("projects", Attribute::string_set(AttributeFlags::optional()))
            .with_attribute("webhook_id", Attribute::computed_int64().use_state_for_unknown())
            .with_attribute("html_url", Attribute::computed_string().use_state_for_unknown())
    }

    async fn create(
        &self,
        ctx: &Context,
        planned: WebhookState,
    ) -> Result<WebhookState, ProviderError> {
        let domain = required(&planned.domain, "domain")?.clone();
        let webhook = ctx
            .client
            .create_webhook(&domain, &planned.to_ops())
            .await
            .or_api_err("create webhook")?;
        info!(domain = %domain, webhook_id = webhook.id, "Created webhook");

        let mut state = planned;
        state.apply(&domain, &webhook);
        Ok(state)
    }

    async fn read(
        &self,
        ctx: &Context,
        current: WebhookState,
    ) -> Result<Option<WebhookState>, ProviderError> {
        let (domain, webhook_id) = keys(&current.id)?;
        let Some(webhook) = ctx
            .client
            .get_webhook(&domain, webhook_id)
            .await
            .found("read webhook")?
        else {
            warn!(domain = %domain, webhook_id, "Webhook no longer exists, removing from state");
            return Ok(None);
        };
        let mut state = current;
        state.apply(&domain, &webhook);
        Ok(Some(state))
    }

    async fn update(
        &self,
        ctx: &Context,
        prior: WebhookState,
        planned: WebhookState,
    ) -> Result<WebhookState, ProviderError> {
        let (domain, webhook_id) = keys(&prior.id)?;
        let webhook = ctx
            .client
            .update_webhook(&domain, webhook_id, &planned.to_ops())
            .await
            .or_api_err("update webhook")?;
        let mut state = planned;
        state.apply(&domain, &webhook);
        Ok(state)
    }

    async fn delete(&self, ctx: &Context, current: WebhookState) -> Result<(), ProviderError> {
        let (domain, webhook_id) = keys(&current.id)?;
        ctx.client
            .delete_webhook(&domain, webhook_id)
            .await
            .ignore_not_found("delete webhook")?;
        info!(domain = %domain, webhook_id, "Deleted webhook");
        Ok(())
    }

    async fn import(&self, ctx: &Context, id: &str) -> Result<WebhookState, ProviderError> {
        let state = WebhookState {
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
    fn test_schema_rules() {
        let schema = WebhookResource.schema();
        let ok = json!({
            "domain": "acme",
            "target_url": "https://hooks.acme.io/buddy",
            "events": ["PUSH", "EXECUTION_FAILED"]
        });
        assert!(validate(&schema, &ok).is_empty());

        let bad_url = json!({"domain": "acme", "target_url": "ftp://x", "events": ["PUSH"]});
        assert_eq!(validate(&schema, &bad_url).len(), 1);

        let no_events = json!({"domain": "acme", "target_url": "https://x.io", "events": []});
        assert_eq!(validate(&schema, &no_events).len(), 1);
    }

    #[test]
    fn test_apply_keeps_secret() {
        let mut state = WebhookState {
            secret_key: Value::Known("s3cret".to_string()),
            ..Default::default()
        };
        state.apply(
            "acme",
            &Webhook {
                id: 9,
                target_url: "https://x.io".to_string(),
                events: vec!["PUSH".to_string()],
                ..Default::default()
            },
        );
        assert_eq!(state.id.as_str(), "acme:9");
        assert_eq!(state.secret_key.as_str(), "s3cret");
        assert!(state.projects.is_null());
    }
}

//! Webhook endpoints.

use serde::{Deserialize, Serialize};

use super::{ApiError, BuddyClient};

/// A workspace webhook.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Webhook {
    /// Service identifier.
    pub id: i64,
    /// API URL.
    pub url: String,
    /// Link to the web UI.
    pub html_url: String,
    /// URL the hook posts to.
    pub target_url: String,
    /// Events that fire the hook.
    pub events: Vec<String>,
    /// Projects the hook is limited to.
    pub projects: Vec<String>,
}

/// Create and update payload for a webhook.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WebhookOps {
    /// URL the hook posts to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
    /// Secret key credential.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
    /// Events that fire the hook.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<String>>,
    /// Projects the hook is limited to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<String>>,
}

impl BuddyClient {
    /// Create a webhook.
    pub async fn create_webhook(
        &self,
        domain: &str,
        ops: &WebhookOps,
    ) -> Result<Webhook, ApiError> {
        self.post(&format!("/workspaces/{domain}/webhooks"), ops).await
    }

    /// Fetch a webhook.
    pub async fn get_webhook(&self, domain: &str, webhook_id: i64) -> Result<Webhook, ApiError> {
        self.get(&format!("/workspaces/{domain}/webhooks/{webhook_id}"))
            .await
    }

    /// Update a webhook.
    pub async fn update_webhook(
        &self,
        domain: &str,
        webhook_id: i64,
        ops: &WebhookOps,
    ) -> Result<Webhook, ApiError> {
        self.patch(&format!("/workspaces/{domain}/webhooks/{webhook_id}"), ops)
            .await
    }

    /// Delete a webhook.
    pub async fn delete_webhook(&self, domain: &str, webhook_id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/workspaces/{domain}/webhooks/{webhook_id}"))
            .await
    }
}

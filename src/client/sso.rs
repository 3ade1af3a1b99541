//! Workspace SSO settings.

use serde::{Deserialize, Serialize};

use super::{ApiError, BuddyClient};

/// Workspace single sign-on settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Sso {
    /// Link to the web UI.
    pub html_url: String,
    /// `SAML` or `OIDC`.
    #[serde(rename = "type")]
    pub sso_type: String,
    /// SAML login URL.
    pub sso_url: String,
    /// Identity provider issuer.
    pub issuer: String,
    /// SAML signing certificate.
    pub certificate: String,
    /// SAML signature algorithm.
    pub signature: String,
    /// SAML digest algorithm.
    pub digest: String,
    /// OIDC client ID.
    pub client_id: String,
    /// Whether every member must log in through SSO.
    pub require_sso_for_all_members: bool,
}

/// Body of an SSO settings update. Unset fields are left out.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SsoOps {
    /// `SAML` or `OIDC`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub sso_type: Option<String>,
    /// SAML login URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sso_url: Option<String>,
    /// Identity provider issuer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    /// SAML signing certificate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,
    /// SAML signature algorithm.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// SAML digest algorithm.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    /// OIDC client ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// OIDC client secret. Never returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// Whether every member must log in through SSO.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_sso_for_all_members: Option<bool>,
}

impl BuddyClient {
    /// SSO settings of the workspace.
    pub async fn get_sso(&self, domain: &str) -> Result<Sso, ApiError> {
        self.get(&format!("/workspaces/{domain}/sso")).await
    }

    /// Write the SSO settings.
    pub async fn update_sso(&self, domain: &str, ops: &SsoOps) -> Result<Sso, ApiError> {
        self.patch(&format!("/workspaces/{domain}/sso"), ops).await
    }

    /// Turn SSO on before its settings can be written.
    pub async fn enable_sso(&self, domain: &str) -> Result<(), ApiError> {
        self.post_action(&format!("/workspaces/{domain}/sso/enable"))
            .await
    }

    /// Turn SSO off.
    pub async fn disable_sso(&self, domain: &str) -> Result<(), ApiError> {
        self.post_action(&format!("/workspaces/{domain}/sso/disable"))
            .await
    }
}

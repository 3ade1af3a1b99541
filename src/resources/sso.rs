//! `buddy_sso`: SAML or OIDC single sign-on for a workspace.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::client::{Sso, SsoOps};
use crate::convert::required;
use crate::error::{ApiResultExt, ProviderError};
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::value::{BoolValue, StringValue, Value};

use super::workspace::domain_attribute;
use super::{imported, Context, Resource};

const HASHES: &[&str] = &["sha1", "sha256", "sha512"];

/// Workspace single sign-on. Creating enables SSO, destroying disables it.
pub struct SsoResource;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsoState {
    pub id: StringValue,
    pub domain: StringValue,
    #[serde(rename = "type")]
    pub sso_type: StringValue,
    pub sso_url: StringValue,
    pub issuer: StringValue,
    pub certificate: StringValue,
    pub signature: StringValue,
    pub digest: StringValue,
    pub client_id: StringValue,
    pub client_secret: StringValue,
    pub require_sso_for_all_members: BoolValue,
    pub html_url: StringValue,
}

impl SsoState {
    fn to_ops(&self) -> SsoOps {
        SsoOps {
            sso_type: self.sso_type.cloned(),
            sso_url: self.sso_url.cloned(),
            issuer: self.issuer.cloned(),
            certificate: self.certificate.cloned(),
            signature: self.signature.cloned(),
            digest: self.digest.cloned(),
            client_id: self.client_id.cloned(),
            client_secret: self.client_secret.cloned(),
            require_sso_for_all_members: self.require_sso_for_all_members.cloned(),
        }
    }

    fn apply(&mut self, domain: &str, sso: &Sso) {
        self.id = Value::Known(domain.to_string());
        self.domain = Value::Known(domain.to_string());
        self.sso_type = Value::Known(sso.sso_type.clone());
        self.sso_url = StringValue::non_empty(Some(sso.sso_url.clone()));
        self.issuer = StringValue::non_empty(Some(sso.issuer.clone()));
        self.certificate = StringValue::non_empty(Some(sso.certificate.clone()));
        self.signature = StringValue::non_empty(Some(sso.signature.clone()));
        self.digest = StringValue::non_empty(Some(sso.digest.clone()));
        self.client_id = StringValue::non_empty(Some(sso.client_id.clone()));
        self.require_sso_for_all_members = Value::Known(sso.require_sso_for_all_members);
        self.html_url = Value::Known(sso.html_url.clone());
    }

    fn field(&self, name: &str) -> &StringValue {
        match name {
            "sso_url" => &self.sso_url,
            "issuer" => &self.issuer,
            "certificate" => &self.certificate,
            "signature" => &self.signature,
            "digest" => &self.digest,
            "client_id" => &self.client_id,
            _ => &self.client_secret,
        }
    }
}

#[async_trait]
impl Resource for SsoResource {
    type State = SsoState;

    fn name(&self) -> &'static str {
        "buddy_sso"
    }

    fn schema(&self) -> Schema {
        Schema::resource("Single sign-on settings of a workspace")
            .with_attribute("domain", domain_attribute())
            .with_attribute("type", Attribute::required_string().one_of(&["SAML", "OIDC"]))
            .with_attribute("sso_url", Attribute::optional_string())
            .with_attribute("issuer", Attribute::optional_string())
            .with_attribute("certificate", Attribute::optional_string().sensitive())
            .with_attribute("signature", Attribute::optional_string().one_of(HASHES))
            .with_attribute("digest", Attribute::optional_string().one_of(HASHES))
            .with_attribute("client_id", Attribute::optional_string())
            .with_attribute("client_secret", Attribute::optional_string().sensitive())
            .with_attribute(
                "require_sso_for_all_members",
                Attribute::optional_computed_bool(),
            )
            .with_attribute("html_url", Attribute::computed_string().use_state_for_unknown())
    }

    fn validate(&self, config: &SsoState) -> Vec<Diagnostic> {
        let required: &[&str] = match config.sso_type.get().map(String::as_str) {
            Some("SAML") => &["sso_url", "issuer", "certificate", "signature", "digest"],
            Some("OIDC") => &["issuer", "client_id", "client_secret"],
            _ => return Vec::new(),
        };
        let sso_type = config.sso_type.as_str();
        required
            .iter()
            .filter(|name| config.field(name).is_null())
            .map(|name| {
                Diagnostic::error(format!("{sso_type} single sign-on requires '{name}'"))
                    .with_attribute(*name)
            })
            .collect()
    }

    async fn create(&self, ctx: &Context, planned: SsoState) -> Result<SsoState, ProviderError> {
        let domain = required(&planned.domain, "domain")?.clone();
        ctx.client.enable_sso(&domain).await.or_api_err("enable sso")?;
        info!(domain = %domain, "Enabled single sign-on");
        let sso = match ctx
            .client
            .update_sso(&domain, &planned.to_ops())
            .await
            .or_api_err("update sso")
        {
            Ok(sso) => sso,
            Err(err) => {
                // Enabled but unconfigured: record only the identity so the
                // next refresh reads the settings back and plans an update.
                let enabled = SsoState {
                    id: Value::Known(domain.clone()),
                    domain: Value::Known(domain),
                    ..Default::default()
                };
                return Err(err.with_state(serde_json::to_value(&enabled)?));
            }
        };

        let mut state = planned;
        state.apply(&domain, &sso);
        Ok(state)
    }

    async fn read(
        &self,
        ctx: &Context,
        current: SsoState,
    ) -> Result<Option<SsoState>, ProviderError> {
        let domain = required(&current.id, "id")?.clone();
        let Some(sso) = ctx.client.get_sso(&domain).await.found("read sso")? else {
            warn!(domain = %domain, "Single sign-on is not configured, removing from state");
            return Ok(None);
        };
        let mut state = current;
        state.apply(&domain, &sso);
        Ok(Some(state))
    }

    async fn update(
        &self,
        ctx: &Context,
        prior: SsoState,
        planned: SsoState,
    ) -> Result<SsoState, ProviderError> {
        let domain = required(&prior.id, "id")?.clone();
        let sso = ctx
            .client
            .update_sso(&domain, &planned.to_ops())
            .await
            .or_api_err("update sso")?;
        let mut state = planned;
        state.apply(&domain, &sso);
        Ok(state)
    }

    async fn delete(&self, ctx: &Context, current: SsoState) -> Result<(), ProviderError> {
        let domain = required(&current.id, "id")?.clone();
        ctx.client
            .disable_sso(&domain)
            .await
            .ignore_not_found("disable sso")?;
        info!(domain = %domain, "Disabled single sign-on");
        Ok(())
    }

    async fn import(&self, ctx: &Context, id: &str) -> Result<SsoState, ProviderError> {
        let state = SsoState {
            id: Value::Known(id.to_string()),
            ..Default::default()
        };
        imported(id, self.read(ctx, state).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oidc_requirements() {
        let config = SsoState {
            sso_type: Value::Known("OIDC".to_string()),
            issuer: Value::Known("https://login.acme.io".to_string()),
            client_secret: Value::Unknown,
            ..Default::default()
        };
        let diagnostics = SsoResource.validate(&config);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "OIDC single sign-on requires 'client_id'");
    }

    #[test]
    fn test_saml_requirements() {
        let config = SsoState {
            sso_type: Value::Known("SAML".to_string()),
            ..Default::default()
        };
        assert_eq!(SsoResource.validate(&config).len(), 5);
    }

    #[test]
    fn test_apply_keeps_client_secret() {
        let mut state = SsoState {
            client_secret: Value::Known("shh".to_string()),
            ..Default::default()
        };
        state.apply(
            "acme",
            &Sso {
                sso_type: "OIDC".to_string(),
                client_id: "buddy".to_string(),
                ..Default::default()
            },
        );
        assert_eq!(state.client_secret.as_str(), "shh");
        assert!(state.sso_url.is_null());
        assert_eq!(state.id.as_str(), "acme");
    }
}

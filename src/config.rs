//! Provider configuration.
//!
//! The Configure payload carries `token`, `base_url` and `insecure`; each
//! falls back to `BUDDY_TOKEN`, `BUDDY_BASE_URL` and `BUDDY_INSECURE`.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ProviderError;
use crate::schema::{Attribute, Schema, Validator};

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.buddy.works";

/// Raw provider configuration as sent by the engine.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API token.
    pub token: Option<String>,
    /// API endpoint.
    pub base_url: Option<String>,
    /// Skip TLS certificate verification.
    pub insecure: Option<bool>,
}

/// Configuration after environment fallback.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// API token.
    pub token: String,
    /// API endpoint without a trailing slash.
    pub base_url: String,
    /// Skip TLS certificate verification.
    pub insecure: bool,
}

impl std::fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("token", &"***")
            .field("base_url", &self.base_url)
            .field("insecure", &self.insecure)
            .finish()
    }
}

impl ProviderConfig {
    /// Parse the Configure payload. `null` is an empty configuration.
    pub fn from_json(value: serde_json::Value) -> Result<Self, ProviderError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value)
            .map_err(|e| {
                ProviderError::Configuration(format!("invalid provider configuration: {e}"))
            })
    }

    /// Fill gaps from the process environment.
    pub fn resolve(self) -> Result<ResolvedConfig, ProviderError> {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// Fill gaps from `env`.
    pub fn resolve_with(
        self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<ResolvedConfig, ProviderError> {
        let token = self
            .token
            .filter(|t| !t.is_empty())
            .or_else(|| env("BUDDY_TOKEN").filter(|t| !t.is_empty()))
            .ok_or_else(|| {
                ProviderError::Configuration(
                    "token is required; set it in the provider block or BUDDY_TOKEN".to_string(),
                )
            })?;
        let base_url = self
            .base_url
            .filter(|u| !u.is_empty())
            .or_else(|| env("BUDDY_BASE_URL").filter(|u| !u.is_empty()))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let insecure = match self.insecure {
            Some(v) => v,
            None => env("BUDDY_INSECURE")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        };
        Ok(ResolvedConfig {
            token,
            base_url,
            insecure,
        })
    }
}

/// Schema of the provider block.
pub fn provider_schema() -> Schema {
    Schema::v0()
        .with_attribute(
            "token",
            Attribute::optional_string()
                .sensitive()
                .with_description("Personal access token. Falls back to BUDDY_TOKEN"),
        )
        .with_attribute(
            "base_url",
            Attribute::optional_string()
                .with_validator(Validator::regex(
                    r"^https?://",
                    "must be an http(s) URL",
                ))
                .with_description(
                    "API endpoint. Falls back to BUDDY_BASE_URL, then https://api.buddy.works",
                ),
        )
        .with_attribute(
            "insecure",
            Attribute::optional_bool()
                .with_description("Skip TLS verification. Falls back to BUDDY_INSECURE"),
        )
}

/// Process-level knobs that are not part of user configuration.
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    /// Delay between sandbox status polls.
    pub poll_interval: Duration,
    /// How long to wait for a stopped sandbox to come back after a start.
    pub start_timeout: Duration,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            start_timeout: Duration::from_secs(120),
        }
    }
}

impl ProviderOptions {
    /// Set the delay between status polls.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set how long a create waits for a sandbox to run.
    pub fn with_start_timeout(mut self, timeout: Duration) -> Self {
        self.start_timeout = timeout;
        self
    }
}

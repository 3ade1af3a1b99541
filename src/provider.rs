//! The Buddy provider: protocol dispatch onto resource and data source
//! handlers.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{watch, RwLock};
use tracing::{info, warn};

use crate::client::BuddyClient;
use crate::config::{provider_schema, ProviderConfig, ProviderOptions};
use crate::data_sources::{self, DynamicDataSource};
use crate::error::ProviderError;
use crate::planner;
use crate::resources::{self, Context, DynamicResource};
use crate::schema::{Diagnostic, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};
use crate::validation;

/// Provider state shared by every request. Only `Configure` writes the
/// client.
pub struct BuddyProvider {
    client: RwLock<Option<Arc<BuddyClient>>>,
    resources: BTreeMap<&'static str, Arc<dyn DynamicResource>>,
    data_sources: BTreeMap<&'static str, Arc<dyn DynamicDataSource>>,
    options: ProviderOptions,
    shutdown: watch::Sender<bool>,
}

impl BuddyProvider {
    /// A provider with default polling options.
    pub fn new() -> Self {
        Self::with_options(ProviderOptions::default())
    }

    /// An unconfigured provider with every resource and data source registered.
    pub fn with_options(options: ProviderOptions) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            client: RwLock::new(None),
            resources: resources::registry(),
            data_sources: data_sources::registry(),
            options,
            shutdown,
        }
    }

    async fn context(&self) -> Result<Context, ProviderError> {
        let client = self.client.read().await.clone().ok_or_else(|| {
            ProviderError::Configuration(
                "the provider has not been configured; Configure must run first".to_string(),
            )
        })?;
        Ok(Context::new(
            client,
            self.options.clone(),
            self.shutdown.subscribe(),
        ))
    }

    fn resource(&self, resource_type: &str) -> Result<&Arc<dyn DynamicResource>, ProviderError> {
        self.resources
            .get(resource_type)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    fn data_source(
        &self,
        data_source_type: &str,
    ) -> Result<&Arc<dyn DynamicDataSource>, ProviderError> {
        self.data_sources
            .get(data_source_type)
            .ok_or_else(|| ProviderError::UnknownResource(data_source_type.to_string()))
    }
}

impl Default for BuddyProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderService for BuddyProvider {
    fn schema(&self) -> ProviderSchema {
        let mut schema = ProviderSchema::new().with_provider_config(provider_schema());
        for (name, handler) in &self.resources {
            schema = schema.with_resource(*name, handler.schema());
        }
        for (name, source) in &self.data_sources {
            schema = schema.with_data_source(*name, source.schema());
        }
        schema
    }

    async fn validate_provider_config(
        &self,
        config: serde_json::Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validation::validate(&provider_schema(), &config))
    }

    async fn configure(&self, config: serde_json::Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let resolved = ProviderConfig::from_json(config)?.resolve()?;
        let client = BuddyClient::new(&resolved.base_url, &resolved.token, resolved.insecure)
            .map_err(|e| {
                ProviderError::Configuration(format!("failed to build HTTP client: {e}"))
            })?;

        let mut diagnostics = Vec::new();
        if resolved.insecure {
            warn!("TLS verification is disabled");
            diagnostics.push(
                Diagnostic::warning("TLS certificate verification is disabled")
                    .with_attribute("insecure"),
            );
        }
        *self.client.write().await = Some(Arc::new(client));
        info!(base_url = %resolved.base_url, "Configured Buddy client");
        Ok(diagnostics)
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        self.shutdown.send_replace(true);
        Ok(())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: serde_json::Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(self.resource(resource_type)?.validate(&config))
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<serde_json::Value>,
        proposed_state: serde_json::Value,
        config: serde_json::Value,
    ) -> Result<PlanResult, ProviderError> {
        let handler = self.resource(resource_type)?;
        if !proposed_state.is_null() {
            let diagnostics = handler.validate(&config);
            if diagnostics.iter().any(Diagnostic::is_error) {
                return Err(ProviderError::Diagnostics(diagnostics));
            }
        }
        Ok(planner::plan(
            &handler.schema(),
            prior_state.as_ref(),
            &proposed_state,
            &config,
        ))
    }

    async fn create(
        &self,
        resource_type: &str,
        planned_state: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        let handler = self.resource(resource_type)?;
        handler.create(&self.context().await?, planned_state).await
    }

    async fn read(
        &self,
        resource_type: &str,
        current_state: serde_json::Value,
    ) -> Result<Option<serde_json::Value>, ProviderError> {
        let handler = self.resource(resource_type)?;
        handler.read(&self.context().await?, current_state).await
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: serde_json::Value,
        planned_state: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        let handler = self.resource(resource_type)?;
        handler
            .update(&self.context().await?, prior_state, planned_state)
            .await
    }

    async fn delete(
        &self,
        resource_type: &str,
        current_state: serde_json::Value,
    ) -> Result<(), ProviderError> {
        let handler = self.resource(resource_type)?;
        handler.delete(&self.context().await?, current_state).await
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let handler = self.resource(resource_type)?;
        let state = handler.import(&self.context().await?, id).await?;
        Ok(vec![ImportedResource::new(resource_type, state)])
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: serde_json::Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(self.data_source(data_source_type)?.validate(&config))
    }

    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        let source = self.data_source(data_source_type)?;
        source.read(&self.context().await?, config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_schema_lists_everything() {
        let schema = BuddyProvider::new().schema();
        assert_eq!(schema.resources.len(), 23);
        assert_eq!(schema.data_sources.len(), 3);
        assert!(schema.provider.block.attributes["token"].flags.sensitive);
    }

    #[tokio::test]
    async fn test_operations_before_configure_fail() {
        let provider = BuddyProvider::new();
        let err = tokio_test::assert_err!(
            provider
                .create("buddy_workspace", json!({"domain": "acme"}))
                .await
        );
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_unknown_resource_type() {
        let provider = BuddyProvider::new();
        let err = provider
            .validate_resource_config("buddy_nope", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }

    #[tokio::test]
    async fn test_plan_rejects_invalid_config() {
        let provider = BuddyProvider::new();
        let config = json!({"domain": "acme", "key": "K", "value": "v", "pipeline_id": 3});
        let err = provider
            .plan("buddy_variable", None, config.clone(), config)
            .await
            .unwrap_err();
        let diagnostics = err.into_diagnostics();
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("pipeline_id"));
    }

    #[tokio::test]
    async fn test_stop_signals_handlers() {
        let provider = BuddyProvider::new();
        let mut rx = provider.shutdown.subscribe();
        tokio_test::assert_ok!(provider.stop().await);
        assert!(*rx.borrow_and_update());
    }
}

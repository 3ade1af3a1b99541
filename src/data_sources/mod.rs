//! Read-only lookups.
//!
//! A [`DataSource`] takes its configuration as a typed state and fills in
//! the computed attributes from the Service.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ProviderError;
use crate::resources::{decode, Context, DOMAIN_PATTERN};
use crate::schema::{Attribute, Diagnostic, Schema, Validator};
use crate::validation;

mod profile;
mod project;
mod workspace;

pub use profile::ProfileDataSource;
pub use project::ProjectDataSource;
pub use workspace::WorkspaceDataSource;

/// A read-only lookup.
#[async_trait]
pub trait DataSource: Send + Sync + 'static {
    /// Typed configuration plus computed results.
    type State: Serialize + DeserializeOwned + Default + Send + Sync;

    /// Data source type name, e.g. `buddy_workspace`.
    fn name(&self) -> &'static str;

    /// Lookup arguments and computed results.
    fn schema(&self) -> Schema;

    /// Look the object up and fill in the computed attributes.
    async fn read(&self, ctx: &Context, config: Self::State) -> Result<Self::State, ProviderError>;
}

/// JSON-facing view of a [`DataSource`].
#[async_trait]
pub trait DynamicDataSource: Send + Sync {
    /// See [`DataSource::name`].
    fn name(&self) -> &'static str;
    /// See [`DataSource::schema`].
    fn schema(&self) -> Schema;
    /// Schema validation of a lookup configuration.
    fn validate(&self, config: &serde_json::Value) -> Vec<Diagnostic>;
    /// See [`DataSource::read`].
    async fn read(
        &self,
        ctx: &Context,
        config: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError>;
}

#[async_trait]
impl<D: DataSource> DynamicDataSource for D {
    fn name(&self) -> &'static str {
        DataSource::name(self)
    }

    fn schema(&self) -> Schema {
        DataSource::schema(self)
    }

    fn validate(&self, config: &serde_json::Value) -> Vec<Diagnostic> {
        validation::validate(&DataSource::schema(self), config)
    }

    async fn read(
        &self,
        ctx: &Context,
        config: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        let config = decode(&DataSource::schema(self), config)?;
        let state = DataSource::read(self, ctx, config).await?;
        Ok(serde_json::to_value(state)?)
    }
}

/// Lookup key naming a workspace.
fn domain_argument() -> Attribute {
    Attribute::required_string()
        .with_description("Workspace domain")
        .with_validator(Validator::regex(
            DOMAIN_PATTERN,
            "must be a workspace domain (lowercase letters, digits and hyphens)",
        ))
}

/// All data sources keyed by type name.
pub fn registry() -> BTreeMap<&'static str, Arc<dyn DynamicDataSource>> {
    let sources: Vec<Arc<dyn DynamicDataSource>> = vec![
        Arc::new(WorkspaceDataSource),
        Arc::new(ProjectDataSource),
        Arc::new(ProfileDataSource),
    ];
    sources.into_iter().map(|s| (s.name(), s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_names() {
        let names: Vec<_> = registry().keys().copied().collect();
        assert_eq!(names, vec!["buddy_profile", "buddy_project", "buddy_workspace"]);
    }

    #[test]
    fn test_lookup_keys_are_validated() {
        let registry = registry();
        let workspace = &registry["buddy_workspace"];
        assert!(workspace.validate(&json!({"domain": "acme"})).is_empty());
        assert_eq!(workspace.validate(&json!({"domain": "Not A Domain"})).len(), 1);
        assert_eq!(workspace.validate(&json!({})).len(), 1);

        let project = &registry["buddy_project"];
        let diagnostics = project.validate(&json!({"domain": "acme"}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("name"));
    }
}

//! Test harness that drives a [`ProviderService`] the way the plan engine
//! does, without a gRPC server.
//!
//! ```ignore
//! let server = wiremock::MockServer::start().await;
//! let tester = ProviderTester::buddy(&server.uri()).await;
//! let state = tester.apply("buddy_workspace", json!({"domain": "acme"})).await?;
//! ```

use std::time::Duration;

use serde_json::{json, Value};

use crate::config::ProviderOptions;
use crate::error::ProviderError;
use crate::provider::BuddyProvider;
use crate::schema::{Diagnostic, DiagnosticSeverity};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};

/// Wraps a provider and replays engine call sequences against it.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl ProviderTester<BuddyProvider> {
    /// A Buddy provider configured against `base_url` that polls sandboxes
    /// every 10 ms.
    pub async fn buddy(base_url: &str) -> Self {
        Self::buddy_with_options(
            base_url,
            ProviderOptions::default()
                .with_poll_interval(Duration::from_millis(10))
                .with_start_timeout(Duration::from_secs(1)),
        )
        .await
    }

    /// Like [`ProviderTester::buddy`] with explicit options.
    pub async fn buddy_with_options(base_url: &str, options: ProviderOptions) -> Self {
        let tester = Self::new(BuddyProvider::with_options(options));
        if let Err(e) = tester
            .configure(json!({"token": "test-token", "base_url": base_url}))
            .await
        {
            panic!("test provider failed to configure: {e}");
        }
        tester
    }
}

impl<P: ProviderService> ProviderTester<P> {
    /// Wrap `provider`.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Configure the provider; error diagnostics become [`TestError::Diagnostics`].
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Signal shutdown to in-flight operations.
    pub async fn stop(&self) -> Result<(), ProviderError> {
        self.provider.stop().await
    }

    /// Validate a resource configuration.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a create where the configuration is the proposed state.
    pub async fn plan_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, config.clone(), config)
            .await
    }

    /// Plan a change of an existing resource to `config`.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), config.clone(), config)
            .await
    }

    /// Create from a planned state.
    pub async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Refresh a state; `None` means the resource is gone.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Option<Value>, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update from prior to planned state.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete the resource behind `current_state`.
    pub async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import an existing object by ID.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    /// Read a data source.
    pub async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .read_data_source(data_source_type, config)
            .await
    }

    /// Plan then create, as `apply` does for a new resource.
    pub async fn apply(&self, resource_type: &str, config: Value) -> Result<Value, ProviderError> {
        let plan = self.plan_create(resource_type, config).await?;
        self.create(resource_type, plan.planned_state).await
    }

    /// Plan then update an existing resource.
    pub async fn apply_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self
            .plan_update(resource_type, prior_state.clone(), config)
            .await?;
        self.update(resource_type, prior_state, plan.planned_state)
            .await
    }
}

/// Failure of a call that answers with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// Validation or planning reported errors.
    Diagnostics(Vec<Diagnostic>),
    /// The provider call itself failed.
    Provider(ProviderError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "{} error diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  {}", diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {detail}")?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {attr})")?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            }
            TestError::Provider(e) => write!(f, "provider error: {e}"),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics
        .into_iter()
        .filter(|d| d.severity == DiagnosticSeverity::Error)
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

/// Assert that the plan replaces the resource.
///
/// # Panics
///
/// Panics if it does not.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "Expected plan to require replacement, but it does not"
    );
}

/// Assert that the plan leaves everything as is.
///
/// # Panics
///
/// Panics on any change.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, but got {:?}",
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that some error diagnostic's summary contains `substring`.
///
/// # Panics
///
/// Panics if none does.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    assert!(
        diagnostics
            .iter()
            .any(|d| d.is_error() && d.summary.contains(substring)),
        "Expected an error containing '{}', got {:?}",
        substring,
        diagnostics.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_configure_requires_token() {
        let tester = ProviderTester::new(BuddyProvider::new());
        let err = tester
            .configure(json!({"token": "", "base_url": "http://127.0.0.1:9"}))
            .await;
        // Only fails when BUDDY_TOKEN is unset in the environment.
        if std::env::var("BUDDY_TOKEN").map_or(true, |t| t.is_empty()) {
            assert!(matches!(err, Err(TestError::Provider(ProviderError::Configuration(_)))));
        }
    }

    #[tokio::test]
    async fn test_plan_create_marks_computed_unknown() {
        let tester = ProviderTester::new(BuddyProvider::new());
        let plan = tester
            .plan_create("buddy_group", json!({"domain": "acme", "name": "devs"}))
            .await
            .unwrap();
        assert_eq!(plan.planned_state["name"], "devs");
        assert_eq!(plan.planned_state["group_id"], crate::value::UNKNOWN_VALUE);
        assert!(!plan.requires_replace);
    }

    #[tokio::test]
    async fn test_domain_change_replaces() {
        let tester = ProviderTester::new(BuddyProvider::new());
        let prior = json!({
            "id": "acme:7",
            "domain": "acme",
            "name": "devs",
            "description": null,
            "auto_assign_to_new_projects": false,
            "auto_assign_permission_set_id": null,
            "group_id": 7,
            "html_url": "https://app.buddy.works/acme/-/groups/7"
        });
        let plan = tester
            .plan_update("buddy_group", prior.clone(), json!({"domain": "other", "name": "devs"}))
            .await
            .unwrap();
        assert_plan_replaces(&plan);

        let plan = tester
            .plan_update("buddy_group", prior, json!({"domain": "acme", "name": "devs"}))
            .await
            .unwrap();
        assert_plan_no_changes(&plan);
    }

    #[test]
    fn test_error_display() {
        let err = TestError::Diagnostics(vec![
            Diagnostic::error("Missing required attribute 'name'").with_attribute("name"),
        ]);
        let display = err.to_string();
        assert!(display.contains("(at name)"));
        assert_error_contains(&[Diagnostic::error("Invalid value")], "Invalid");
    }
}

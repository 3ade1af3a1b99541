//! Error types for the Buddy provider.
//!
//! Every failure a handler can hit is a [`ProviderError`]. The gRPC layer
//! turns it into protocol diagnostics exactly once, through
//! [`ProviderError::into_diagnostics`].

use thiserror::Error;

use crate::client::ApiError;
use crate::schema::Diagnostic;

/// Errors that can occur while serving a provider operation.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The Service rejected a call.
    #[error("{operation}: {message}")]
    Api {
        /// Operation label, e.g. `create pipeline`.
        operation: String,
        /// The SDK error string.
        message: String,
    },

    /// A composite ID could not be parsed.
    #[error("Invalid resource ID: {0}")]
    Decompose(String),

    /// A bounded sandbox poll did not observe the expected status in time.
    #[error("Timed out after {waited_secs}s waiting for sandbox {sandbox} to be {phase}")]
    SandboxTimeout {
        /// Sandbox id.
        sandbox: String,
        /// The awaited phase, e.g. `running`.
        phase: &'static str,
        /// Seconds waited.
        waited_secs: u64,
    },

    /// A sandbox poll observed a terminal failure status.
    #[error("Sandbox {sandbox} failed while waiting to be {phase}: {status}")]
    SandboxFailed {
        /// Sandbox id.
        sandbox: String,
        /// The awaited phase.
        phase: &'static str,
        /// The observed status field and value, e.g. `setup_status=FAILED`.
        status: String,
    },

    /// Validation failures.
    #[error("{}", summarize(.0))]
    Diagnostics(Vec<Diagnostic>),

    /// The operation failed after the remote side changed. `state` is what
    /// the engine should store so the next refresh can reconcile.
    #[error("{source}")]
    Partial {
        /// State to persist despite the failure.
        state: serde_json::Value,
        /// The underlying failure.
        source: Box<ProviderError>,
    },

    /// The provider is not configured, or its configuration is invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource or data source type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// Operation not supported by this resource.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// The provider is stopping.
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// A state or config document did not match the resource schema.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProviderError {
    /// An API error labelled with the operation that failed.
    pub fn api(operation: impl Into<String>, err: ApiError) -> Self {
        Self::Api {
            operation: operation.into(),
            message: err.to_string(),
        }
    }

    /// A single validation failure.
    pub fn invalid(diagnostic: Diagnostic) -> Self {
        Self::Diagnostics(vec![diagnostic])
    }

    /// Wrap `self` with the state that must still be written.
    pub fn with_state(self, state: serde_json::Value) -> Self {
        Self::Partial {
            state,
            source: Box::new(self),
        }
    }

    /// Convert into protocol diagnostics.
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        match self {
            Self::Diagnostics(diagnostics) => diagnostics,
            Self::Partial { source, .. } => source.into_diagnostics(),
            Self::Decompose(id) => vec![Diagnostic::error(format!("Invalid resource ID: {id}"))
                .with_detail(
                    "The ID could not be split into its natural keys; \
                     the state may come from an incompatible provider version",
                )
                .with_attribute("id")],
            Self::Api { operation, message } => {
                vec![Diagnostic::error(format!("Unable to {operation}")).with_detail(message)]
            }
            other => vec![Diagnostic::error(other.to_string())],
        }
    }
}

fn summarize(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| match &d.attribute {
            Some(attr) => format!("{} (at {})", d.summary, attr),
            None => d.summary.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Helpers that label SDK results for the reconciliation paths.
pub trait ApiResultExt<T> {
    /// Any error becomes an API error for `operation`.
    fn or_api_err(self, operation: &str) -> Result<T, ProviderError>;

    /// Read path: "not found" becomes `Ok(None)` so the caller can drop the
    /// resource from state.
    fn found(self, operation: &str) -> Result<Option<T>, ProviderError>;

    /// Delete path: "not found" means already gone.
    fn ignore_not_found(self, operation: &str) -> Result<(), ProviderError>;
}

impl<T> ApiResultExt<T> for Result<T, ApiError> {
    fn or_api_err(self, operation: &str) -> Result<T, ProviderError> {
        self.map_err(|e| ProviderError::api(operation, e))
    }

    fn found(self, operation: &str) -> Result<Option<T>, ProviderError> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(ProviderError::api(operation, e)),
        }
    }

    fn ignore_not_found(self, operation: &str) -> Result<(), ProviderError> {
        match self {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(ProviderError::api(operation, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DiagnosticSeverity;

    fn not_found() -> ApiError {
        ApiError::Http {
            status: 404,
            message: "Group not found".to_string(),
        }
    }

    fn server_error() -> ApiError {
        ApiError::Http {
            status: 500,
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_error_display() {
        let err = ProviderError::api("create pipeline", server_error());
        assert_eq!(err.to_string(), "create pipeline: HTTP 500: boom");

        let err = ProviderError::Decompose("acme".to_string());
        assert_eq!(err.to_string(), "Invalid resource ID: acme");

        let err = ProviderError::SandboxTimeout {
            sandbox: "sb1".to_string(),
            phase: "running",
            waited_secs: 60,
        };
        assert_eq!(
            err.to_string(),
            "Timed out after 60s waiting for sandbox sb1 to be running"
        );
    }

    #[test]
    fn test_found_maps_not_found_to_none() {
        let result: Result<u32, ApiError> = Err(not_found());
        assert!(result.found("get group").unwrap().is_none());

        let result: Result<u32, ApiError> = Ok(7);
        assert_eq!(result.found("get group").unwrap(), Some(7));

        let result: Result<u32, ApiError> = Err(server_error());
        assert!(matches!(
            result.found("get group"),
            Err(ProviderError::Api { operation, .. }) if operation == "get group"
        ));
    }

    #[test]
    fn test_ignore_not_found() {
        let result: Result<(), ApiError> = Err(not_found());
        assert!(result.ignore_not_found("delete group").is_ok());

        let result: Result<(), ApiError> = Err(server_error());
        assert!(result.ignore_not_found("delete group").is_err());
    }

    #[test]
    fn test_diagnostics_expand() {
        let err = ProviderError::Diagnostics(vec![
            Diagnostic::error("first").with_attribute("refs"),
            Diagnostic::error("second"),
        ]);
        assert_eq!(err.to_string(), "first (at refs); second");
        assert_eq!(err.into_diagnostics().len(), 2);
    }

    #[test]
    fn test_partial_reports_source() {
        let err = ProviderError::Decompose("x".to_string())
            .with_state(serde_json::json!({"id": "x"}));
        assert_eq!(err.to_string(), "Invalid resource ID: x");
        let diagnostics = err.into_diagnostics();
        assert_eq!(diagnostics[0].severity, DiagnosticSeverity::Error);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("id"));
    }

    #[test]
    fn test_api_diagnostic_carries_operation() {
        let diagnostics = ProviderError::api("update sso", server_error()).into_diagnostics();
        assert_eq!(diagnostics[0].summary, "Unable to update sso");
        assert_eq!(diagnostics[0].detail.as_deref(), Some("HTTP 500: boom"));
    }
}

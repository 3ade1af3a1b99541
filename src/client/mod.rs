//! Narrow, typed client for the Buddy REST API.
//!
//! [`BuddyClient`] wraps a `reqwest::Client` with bearer authentication and
//! maps every non-2xx response to [`ApiError`]. The per-area submodules add
//! the domain models and the calls the resource handlers need; each call
//! takes the natural keys that address the object in the URL.

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

mod domain;
mod environment;
mod integration;
mod member;
mod pipeline;
mod profile;
mod project;
mod sandbox;
mod sso;
mod target;
mod variable;
mod webhook;
mod workspace;

pub use domain::*;
pub use environment::*;
pub use integration::*;
pub use member::*;
pub use pipeline::*;
pub use profile::*;
pub use project::*;
pub use sandbox::*;
pub use sso::*;
pub use target::*;
pub use variable::*;
pub use webhook::*;
pub use workspace::*;

/// Errors returned by [`BuddyClient`].
#[derive(Debug, Error)]
pub enum ApiError {
    /// The Service answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Error message extracted from the body.
        message: String,
    },

    /// The request could not be sent or the body could not be read.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The response body did not match the expected model.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Whether the error means the addressed object does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            ApiError::Http { status, message } => {
                *status == StatusCode::NOT_FOUND.as_u16()
                    || message.to_lowercase().contains("not found")
            }
            _ => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    #[serde(default)]
    message: String,
}

/// Reference to an object by numeric id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRef {
    /// Object id.
    pub id: i64,
}

/// Reference to an object by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRef {
    /// Object name.
    pub name: String,
}

/// Reference to an object by hash id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashIdRef {
    /// Object hash id.
    pub hash_id: String,
}

/// Access granted to one user or group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessEntry {
    /// Member or group ID.
    pub id: i64,
    /// Access level granted.
    pub access_level: String,
}

/// Permission overrides of a pipeline, environment or target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourcePermissions {
    /// Access for everyone not listed.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub others: String,
    /// Per-user access.
    pub users: Vec<AccessEntry>,
    /// Per-group access.
    pub groups: Vec<AccessEntry>,
}

/// Client for the Buddy REST API.
#[derive(Debug, Clone)]
pub struct BuddyClient {
    http: Client,
    base_url: String,
    token: String,
}

impl BuddyClient {
    /// Create a client for `base_url` authenticating with `token`.
    pub fn new(base_url: &str, token: &str, insecure: bool) -> Result<Self, ApiError> {
        let http = Client::builder()
            .danger_accept_invalid_certs(insecure)
            .user_agent(concat!("hemmer-provider-buddy/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_http_client(base_url, token, http))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_http_client(base_url: &str, token: &str, http: Client) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    /// The API base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        debug!(method = "GET", path, "Buddy API request");
        self.send(self.http.get(self.url(path))).await
    }

    pub(crate) async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        debug!(method = "POST", path, "Buddy API request");
        self.send(self.http.post(self.url(path)).json(body)).await
    }

    pub(crate) async fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        debug!(method = "PATCH", path, "Buddy API request");
        self.send(self.http.patch(self.url(path)).json(body)).await
    }

    /// POST without a body, ignoring whatever comes back.
    pub(crate) async fn post_action(&self, path: &str) -> Result<(), ApiError> {
        debug!(method = "POST", path, "Buddy API request");
        self.execute(self.http.post(self.url(path))).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), ApiError> {
        debug!(method = "DELETE", path, "Buddy API request");
        self.execute(self.http.delete(self.url(path))).await
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = builder.bearer_auth(&self.token).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(error_from(status, &body));
        }
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<(), ApiError> {
        let response = builder.bearer_auth(&self.token).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(error_from(status, &body))
    }
}

fn error_from(status: StatusCode, body: &str) -> ApiError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|b| {
            b.errors
                .into_iter()
                .map(|e| e.message)
                .filter(|m| !m.is_empty())
                .collect::<Vec<_>>()
                .join("; ")
        })
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_string()
            } else {
                body.to_string()
            }
        });
    ApiError::Http {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        let err = ApiError::Http {
            status: 404,
            message: "whatever".to_string(),
        };
        assert!(err.is_not_found());

        let err = ApiError::Http {
            status: 400,
            message: "Project Not Found".to_string(),
        };
        assert!(err.is_not_found());

        let err = ApiError::Http {
            status: 403,
            message: "Forbidden".to_string(),
        };
        assert!(!err.is_not_found());

        assert!(!ApiError::Decode("bad".to_string()).is_not_found());
    }

    #[test]
    fn test_error_body_messages_joined() {
        let err = error_from(
            StatusCode::BAD_REQUEST,
            r#"{"errors":[{"message":"Name is required"},{"message":"Domain taken"}]}"#,
        );
        assert_eq!(err.to_string(), "HTTP 400: Name is required; Domain taken");
    }

    #[test]
    fn test_error_body_fallbacks() {
        let err = error_from(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(err.to_string(), "HTTP 502: upstream down");

        let err = error_from(StatusCode::NOT_FOUND, "");
        assert_eq!(err.to_string(), "HTTP 404: Not Found");
    }

    #[test]
    fn test_base_url_normalized() {
        let client = BuddyClient::new("https://api.buddy.works/", "t", false).unwrap();
        assert_eq!(client.base_url(), "https://api.buddy.works");
        assert_eq!(client.url("/workspaces/acme"), "https://api.buddy.works/workspaces/acme");
    }
}

//! Converters between typed resource states and SDK models.
//!
//! Handlers build request payloads from plan values (forwarding only present
//! values) and fold responses back into state without disturbing attributes
//! the Service does not echo.

pub mod collections;
pub mod environment;
pub mod permissions;
pub mod pipeline;
pub mod sandbox;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::ProviderError;
use crate::schema::Diagnostic;
use crate::value::{StringValue, Value};

/// The known value of a required attribute.
///
/// Required attributes are present once validation has passed; a null or
/// unknown value here means the state does not match the schema.
pub fn required<'a, T>(value: &'a Value<T>, attribute: &str) -> Result<&'a T, ProviderError> {
    value.get().ok_or_else(|| {
        ProviderError::invalid(
            Diagnostic::error(format!("Missing required attribute '{attribute}'"))
                .with_attribute(attribute),
        )
    })
}

/// Service timestamps normalised to RFC 3339 in UTC. Strings that do not
/// parse are kept verbatim; empty strings are null.
pub fn timestamp(raw: &str) -> StringValue {
    if raw.is_empty() {
        return Value::Null;
    }
    match DateTime::parse_from_rfc3339(raw) {
        Ok(t) => Value::Known(
            t.with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::AutoSi, true),
        ),
        Err(_) => Value::Known(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_present() {
        let name = StringValue::known("acme".to_string());
        assert_eq!(required(&name, "name").unwrap(), "acme");
    }

    #[test]
    fn test_required_missing_names_attribute() {
        let err = required(&StringValue::Unknown, "domain").unwrap_err();
        let diagnostics = err.into_diagnostics();
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("domain"));
    }

    #[test]
    fn test_timestamp_normalised() {
        assert_eq!(
            timestamp("2024-03-01T10:15:30+02:00").as_str(),
            "2024-03-01T08:15:30Z"
        );
        assert_eq!(
            timestamp("2024-03-01T08:15:30.250Z").as_str(),
            "2024-03-01T08:15:30.250Z"
        );
        assert_eq!(timestamp("yesterday").as_str(), "yesterday");
        assert!(timestamp("").is_null());
    }
}

//! Composite resource identifiers.
//!
//! Resources are addressed by the natural keys the Service uses in its URLs
//! (workspace domain, project name, numeric ids). The engine stores a
//! single string ID, so the keys are joined with [`SEPARATOR`] and split
//! again on refresh, update, delete and import.
//!
//! ```
//! use hemmer_provider_buddy::identity::{compose_triple, decompose_triple, parse_component};
//!
//! let id = compose_triple("acme", "backend", 42);
//! assert_eq!(id, "acme:backend:42");
//!
//! let (domain, project, pipeline) = decompose_triple(&id).unwrap();
//! assert_eq!((domain.as_str(), project.as_str()), ("acme", "backend"));
//! assert_eq!(parse_component::<i64>(&id, &pipeline).unwrap(), 42);
//! ```

use std::fmt::Display;
use std::str::FromStr;

use crate::error::ProviderError;

/// Reserved separator between ID components.
pub const SEPARATOR: char = ':';

/// Join two components.
pub fn compose_double(a: impl Display, b: impl Display) -> String {
    format!("{a}{SEPARATOR}{b}")
}

/// Join three components.
pub fn compose_triple(a: impl Display, b: impl Display, c: impl Display) -> String {
    format!("{a}{SEPARATOR}{b}{SEPARATOR}{c}")
}

/// Split an ID made by [`compose_double`].
pub fn decompose_double(id: &str) -> Result<(String, String), ProviderError> {
    match split(id, 2)?.as_slice() {
        [a, b] => Ok((a.clone(), b.clone())),
        _ => Err(ProviderError::Decompose(id.to_string())),
    }
}

/// Split an ID made by [`compose_triple`].
pub fn decompose_triple(id: &str) -> Result<(String, String, String), ProviderError> {
    match split(id, 3)?.as_slice() {
        [a, b, c] => Ok((a.clone(), b.clone(), c.clone())),
        _ => Err(ProviderError::Decompose(id.to_string())),
    }
}

/// Parse a numeric (or otherwise typed) component of `id`.
pub fn parse_component<T: FromStr>(id: &str, component: &str) -> Result<T, ProviderError> {
    component
        .parse()
        .map_err(|_| ProviderError::Decompose(id.to_string()))
}

fn split(id: &str, arity: usize) -> Result<Vec<String>, ProviderError> {
    let parts: Vec<String> = id.split(SEPARATOR).map(str::to_string).collect();
    if parts.len() != arity || parts.iter().any(String::is_empty) {
        return Err(ProviderError::Decompose(id.to_string()));
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_round_trip() {
        let id = compose_double("acme", 1234);
        assert_eq!(id, "acme:1234");
        let (domain, member) = decompose_double(&id).unwrap();
        assert_eq!(domain, "acme");
        assert_eq!(parse_component::<i64>(&id, &member).unwrap(), 1234);
    }

    #[test]
    fn test_triple_round_trip() {
        let id = compose_triple("acme", "www.acme.com", "A");
        let parts = decompose_triple(&id).unwrap();
        assert_eq!(
            parts,
            (
                "acme".to_string(),
                "www.acme.com".to_string(),
                "A".to_string()
            )
        );
    }

    #[test]
    fn test_arity_mismatch_is_decompose_error() {
        assert!(matches!(
            decompose_double("acme:backend:7"),
            Err(ProviderError::Decompose(id)) if id == "acme:backend:7"
        ));
        assert!(decompose_triple("acme:7").is_err());
        assert!(decompose_double("acme").is_err());
    }

    #[test]
    fn test_empty_component_rejected() {
        assert!(decompose_double("acme:").is_err());
        assert!(decompose_triple(":p:1").is_err());
    }

    #[test]
    fn test_non_numeric_component() {
        let err = parse_component::<i64>("acme:abc", "abc").unwrap_err();
        assert_eq!(err.to_string(), "Invalid resource ID: acme:abc");
    }
}

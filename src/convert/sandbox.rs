//! Sandbox endpoints and status classification.

use std::collections::BTreeMap;

use crate::value::{MapValue, Value};

use super::collections::map_from;

/// Endpoint map for a request.
pub fn endpoints_to_api(endpoints: &MapValue<String>) -> Option<BTreeMap<String, String>> {
    endpoints.cloned()
}

/// Fold returned endpoints into state; an empty map stays null when unset.
pub fn endpoints_from_api(
    remote: &BTreeMap<String, String>,
    prior: &MapValue<String>,
) -> MapValue<String> {
    map_from(remote.clone(), prior)
}

/// Whether a status string is one the Service reports for a sandbox that is
/// still coming up.
pub fn is_transitional(status: &str) -> bool {
    matches!(status, "CREATING" | "STARTING" | "STOPPING" | "RESTORING")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        let mut remote = BTreeMap::new();
        remote.insert("www".to_string(), "80".to_string());
        let read = endpoints_from_api(&remote, &Value::Null);
        assert_eq!(endpoints_to_api(&read), Some(remote));
        assert!(endpoints_from_api(&BTreeMap::new(), &Value::Null).is_null());
    }

    #[test]
    fn test_transitional() {
        assert!(is_transitional("CREATING"));
        assert!(!is_transitional("RUNNING"));
        assert!(!is_transitional("FAILED"));
    }
}

//! String/int sets, lists and maps.
//!
//! The Service answers `[]` for unset collections. A collection read back
//! as empty stays null when configuration never set it, so `[]` and null
//! never churn between plans.

use std::collections::BTreeMap;

use crate::value::{same_elements, MapValue, Value};

/// Fold a Service list into state.
///
/// Keeps the prior ordering when the elements are unchanged, so set
/// attributes do not reorder on every refresh.
pub fn list_from<T: Clone + PartialEq>(remote: Vec<T>, prior: &Value<Vec<T>>) -> Value<Vec<T>> {
    match prior {
        Value::Known(p) if same_elements(p, &remote) => Value::Known(p.clone()),
        Value::Known(_) => Value::Known(remote),
        _ if remote.is_empty() => Value::Null,
        _ => Value::Known(remote),
    }
}

/// Fold a Service map into state. Same null rules as [`list_from`].
pub fn map_from<V: Clone>(remote: BTreeMap<String, V>, prior: &MapValue<V>) -> MapValue<V> {
    match prior {
        Value::Known(_) => Value::Known(remote),
        _ if remote.is_empty() => Value::Null,
        _ => Value::Known(remote),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::SetValue;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_remote_stays_null_when_unconfigured() {
        let prior: SetValue<String> = Value::Null;
        assert!(list_from(Vec::new(), &prior).is_null());

        let prior: SetValue<String> = Value::Unknown;
        assert!(list_from(Vec::new(), &prior).is_null());
    }

    #[test]
    fn test_empty_remote_stays_empty_when_configured_empty() {
        let prior: SetValue<String> = Value::Known(Vec::new());
        assert_eq!(list_from(Vec::new(), &prior), Value::Known(Vec::new()));
    }

    #[test]
    fn test_set_keeps_prior_order() {
        let prior = Value::Known(strings(&["main", "develop"]));
        let read = list_from(strings(&["develop", "main"]), &prior);
        assert_eq!(read, Value::Known(strings(&["main", "develop"])));
    }

    #[test]
    fn test_drift_takes_remote() {
        let prior = Value::Known(strings(&["main"]));
        let read = list_from(strings(&["release"]), &prior);
        assert_eq!(read, Value::Known(strings(&["release"])));
    }

    #[test]
    fn test_map_from() {
        let prior: MapValue<String> = Value::Null;
        assert!(map_from(BTreeMap::new(), &prior).is_null());

        let mut remote = BTreeMap::new();
        remote.insert("web".to_string(), "8080".to_string());
        let read = map_from(remote.clone(), &prior);
        assert_eq!(read, Value::Known(remote));
    }
}

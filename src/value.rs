//! Three-state values exchanged with the plan engine.
//!
//! Every attribute of a resource state is either **known**, **null**
//! (absent from configuration) or **unknown** (the plan engine has not
//! resolved it yet, typically a computed attribute during planning).
//! [`Value`] carries that distinction through typed resource states so
//! handlers can forward only present values to the Service.
//!
//! # Wire representation
//!
//! States travel as JSON. `null` is [`Value::Null`]; the reserved string
//! [`UNKNOWN_VALUE`] marks [`Value::Unknown`] for every attribute type; any
//! other JSON value is decoded into `T` and becomes [`Value::Known`]. Fields
//! missing from the JSON object decode as null when the containing struct
//! uses `#[serde(default)]`.
//!
//! ```
//! use hemmer_provider_buddy::value::{StringValue, Value};
//!
//! let name: StringValue = serde_json::from_str("\"backend\"").unwrap();
//! assert!(name.is_present());
//! assert_eq!(name.get().map(String::as_str), Some("backend"));
//!
//! let pending: StringValue = serde_json::from_value(Value::<String>::unknown_json()).unwrap();
//! assert!(pending.is_unknown());
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Marker string standing in for an unknown value of any type.
pub const UNKNOWN_VALUE: &str = "74D93920-ED26-11E3-AC10-0800200C9A66";

/// A nullable, possibly-unknown attribute value.
#[derive(Clone, PartialEq, Eq)]
pub enum Value<T> {
    /// Absent.
    Null,
    /// Not yet resolved by the plan engine.
    Unknown,
    /// Resolved.
    Known(T),
}

/// A string attribute.
pub type StringValue = Value<String>;
/// A boolean attribute.
pub type BoolValue = Value<bool>;
/// A 32-bit integer attribute.
pub type Int32Value = Value<i32>;
/// A 64-bit integer attribute.
pub type Int64Value = Value<i64>;
/// An ordered list attribute or list block.
pub type ListValue<T> = Value<Vec<T>>;
/// An unordered set attribute or set block. Order is whatever the
/// Service or the configuration produced; comparisons that must ignore
/// order go through [`same_elements`].
pub type SetValue<T> = Value<Vec<T>>;
/// A string-keyed map attribute.
pub type MapValue<V> = Value<BTreeMap<String, V>>;

impl<T> Value<T> {
    /// A known value.
    pub fn known(value: T) -> Self {
        Value::Known(value)
    }

    /// A null value.
    pub fn null() -> Self {
        Value::Null
    }

    /// Known when `Some`, null when `None`.
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => Value::Known(v),
            None => Value::Null,
        }
    }

    /// Whether the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether the value is unknown.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown)
    }

    /// Whether the value is known and non-null. This is the guard used
    /// before forwarding anything to the Service.
    pub fn is_present(&self) -> bool {
        matches!(self, Value::Known(_))
    }

    /// The underlying value when known.
    pub fn get(&self) -> Option<&T> {
        match self {
            Value::Known(v) => Some(v),
            _ => None,
        }
    }

    /// Consume into the underlying value when known.
    pub fn into_option(self) -> Option<T> {
        match self {
            Value::Known(v) => Some(v),
            _ => None,
        }
    }

    /// Keep `self` when present, otherwise fall back to `prior`.
    ///
    /// Used for attributes the Service accepts but never returns.
    pub fn or_keep(self, prior: Value<T>) -> Value<T> {
        match self {
            Value::Known(v) => Value::Known(v),
            _ => prior,
        }
    }

    /// Replace an unknown value with null. Computed attributes left unknown
    /// after an apply would otherwise never converge.
    pub fn resolve_unknown(self) -> Value<T> {
        match self {
            Value::Unknown => Value::Null,
            other => other,
        }
    }

    /// Map the known value.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Value<U> {
        match self {
            Value::Null => Value::Null,
            Value::Unknown => Value::Unknown,
            Value::Known(v) => Value::Known(f(v)),
        }
    }

    /// The JSON encoding of an unknown value.
    pub fn unknown_json() -> serde_json::Value {
        serde_json::Value::String(UNKNOWN_VALUE.to_string())
    }
}

impl<T: Clone> Value<T> {
    /// Clone out the known value.
    pub fn cloned(&self) -> Option<T> {
        self.get().cloned()
    }
}

impl StringValue {
    /// The known string, or `""`.
    pub fn as_str(&self) -> &str {
        self.get().map(String::as_str).unwrap_or_default()
    }

    /// Known when `Some` and non-empty, otherwise null. The Service returns
    /// `""` for unset optional strings.
    pub fn non_empty(value: Option<String>) -> Self {
        match value {
            Some(v) if !v.is_empty() => Value::Known(v),
            _ => Value::Null,
        }
    }
}

impl<T> Value<Vec<T>> {
    /// Known when `Some` and non-empty, otherwise null.
    pub fn non_empty_list(value: Option<Vec<T>>) -> Self {
        match value {
            Some(v) if !v.is_empty() => Value::Known(v),
            _ => Value::Null,
        }
    }
}

impl<T> Default for Value<T> {
    fn default() -> Self {
        Value::Null
    }
}

impl<T> From<T> for Value<T> {
    fn from(value: T) -> Self {
        Value::Known(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for Value<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Unknown => f.write_str("(unknown)"),
            Value::Known(v) => v.fmt(f),
        }
    }
}

impl<T: Serialize> Serialize for Value<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Unknown => serializer.serialize_str(UNKNOWN_VALUE),
            Value::Known(v) => v.serialize(serializer),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Value<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        match raw {
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::String(ref s) if s == UNKNOWN_VALUE => Ok(Value::Unknown),
            other => serde_json::from_value(other)
                .map(Value::Known)
                .map_err(D::Error::custom),
        }
    }
}

/// Whether a raw JSON value is the unknown marker.
pub fn is_unknown_json(value: &serde_json::Value) -> bool {
    matches!(value, serde_json::Value::String(s) if s == UNKNOWN_VALUE)
}

/// Whether two set values hold the same elements regardless of order.
/// Duplicates count: `[a, a, b]` and `[a, b, b]` differ.
pub fn same_elements<T: PartialEq>(a: &[T], b: &[T]) -> bool {
    let count = |list: &[T], x: &T| list.iter().filter(|y| *y == x).count();
    a.len() == b.len() && a.iter().all(|x| count(a, x) == count(b, x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct Sample {
        name: StringValue,
        count: Int64Value,
        tags: SetValue<String>,
    }

    #[test]
    fn test_three_states_decode() {
        let sample: Sample = serde_json::from_value(json!({
            "name": "api",
            "count": UNKNOWN_VALUE,
        }))
        .unwrap();

        assert_eq!(sample.name, Value::known("api".to_string()));
        assert!(sample.count.is_unknown());
        assert!(sample.tags.is_null());
    }

    #[test]
    fn test_encode_preserves_states() {
        let sample = Sample {
            name: Value::Unknown,
            count: Value::known(3),
            tags: Value::Null,
        };
        let encoded = serde_json::to_value(&sample).unwrap();
        assert_eq!(
            encoded,
            json!({"name": UNKNOWN_VALUE, "count": 3, "tags": null})
        );
        let back: Sample = serde_json::from_value(encoded).unwrap();
        assert_eq!(back, sample);
    }

    #[test]
    fn test_is_present_guard() {
        assert!(Value::known(false).is_present());
        assert!(!BoolValue::Null.is_present());
        assert!(!BoolValue::Unknown.is_present());
    }

    #[test]
    fn test_or_keep_prefers_present() {
        let prior = Value::known("secret".to_string());
        assert_eq!(StringValue::Null.or_keep(prior.clone()), prior);
        assert_eq!(
            Value::known("new".to_string()).or_keep(prior),
            Value::known("new".to_string())
        );
    }

    #[test]
    fn test_non_empty_helpers() {
        assert!(StringValue::non_empty(Some(String::new())).is_null());
        assert!(StringValue::non_empty(None).is_null());
        assert!(ListValue::<String>::non_empty_list(Some(vec![])).is_null());
        assert_eq!(
            ListValue::non_empty_list(Some(vec![1])),
            Value::known(vec![1])
        );
    }

    #[test]
    fn test_into_option_drops_unknown() {
        assert_eq!(Value::known(7).into_option(), Some(7));
        assert_eq!(Int32Value::Unknown.into_option(), None);
        assert_eq!(Int32Value::Null.into_option(), None);
    }

    #[test]
    fn test_int32_out_of_range_is_error() {
        let port: Int32Value = serde_json::from_value(json!(8080)).unwrap();
        assert_eq!(port, Value::known(8080));
        let result: Result<Int32Value, _> = serde_json::from_value(json!(i64::MAX));
        assert!(result.is_err());
    }

    #[test]
    fn test_type_mismatch_is_error() {
        let result: Result<Int64Value, _> = serde_json::from_value(json!("ten"));
        assert!(result.is_err());
    }

    #[test]
    fn test_same_elements_ignores_order() {
        assert!(same_elements(&["a", "b"], &["b", "a"]));
        assert!(!same_elements(&["a"], &["a", "b"]));
        assert!(!same_elements(&["a", "a", "b"], &["a", "b", "b"]));
    }
}

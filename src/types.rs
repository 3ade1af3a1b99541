//! Plan and import results in JSON terms, plus the handshake constants.
//!
//! The server turns these into protobuf messages; everything above it
//! works with `serde_json::Value`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Handshake line prefix written to stdout.
pub const HANDSHAKE_PREFIX: &str = "HEMMER_PROVIDER";

/// Protocol version announced in the handshake.
pub const PROTOCOL_VERSION: u32 = 1;

/// One top-level attribute that differs between prior and planned state.
/// `None` stands for null on either side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// Top-level attribute name.
    pub path: String,
    /// Prior value.
    pub before: Option<Value>,
    /// Planned value.
    pub after: Option<Value>,
}

impl AttributeChange {
    /// A change from `before` to `after`; JSON null becomes `None`.
    pub fn between(path: impl Into<String>, before: &Value, after: &Value) -> Self {
        let present = |v: &Value| (!v.is_null()).then(|| v.clone());
        Self {
            path: path.into(),
            before: present(before),
            after: present(after),
        }
    }
}

fn json_bytes(value: Option<Value>) -> Vec<u8> {
    value
        .and_then(|v| serde_json::to_vec(&v).ok())
        .unwrap_or_default()
}

impl From<AttributeChange> for crate::generated::AttributeChange {
    fn from(change: AttributeChange) -> Self {
        Self {
            path: change.path,
            before: json_bytes(change.before),
            after: json_bytes(change.after),
        }
    }
}

/// Outcome of planning one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// Planned state, with unknown markers for values the apply decides.
    pub planned_state: Value,
    /// Attributes whose planned value differs from the prior one.
    pub changes: Vec<AttributeChange>,
    /// Whether the change destroys and recreates the resource.
    pub requires_replace: bool,
}

impl PlanResult {
    /// The plan for a resource that is going away.
    pub fn destroy() -> Self {
        Self {
            planned_state: Value::Null,
            changes: Vec::new(),
            requires_replace: false,
        }
    }
}

/// State produced by ImportResourceState for one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    /// Resource type name, e.g. `buddy_project`.
    pub resource_type: String,
    /// Refreshed state of the imported resource.
    pub state: Value,
}

impl ImportedResource {
    /// An imported resource of `resource_type`.
    pub fn new(resource_type: impl Into<String>, state: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            state,
        }
    }
}

/// Answer to GetMetadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// Resource type names.
    pub resources: Vec<String>,
    /// Data source type names.
    pub data_sources: Vec<String>,
    /// Whether Plan accepts a null proposed state.
    pub plan_destroy: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_change_between_maps_null_to_none() {
        let created = AttributeChange::between("id", &Value::Null, &json!("acme:7"));
        assert!(created.before.is_none());
        assert_eq!(created.after, Some(json!("acme:7")));

        let cleared = AttributeChange::between("description", &json!("old"), &Value::Null);
        assert_eq!(cleared.before, Some(json!("old")));
        assert!(cleared.after.is_none());
    }

    #[test]
    fn test_change_to_proto() {
        let proto: crate::generated::AttributeChange =
            AttributeChange::between("ttl", &json!(300), &json!(600)).into();
        assert_eq!(proto.path, "ttl");
        assert_eq!(proto.before, b"300");
        assert_eq!(proto.after, b"600");

        let proto: crate::generated::AttributeChange =
            AttributeChange::between("id", &Value::Null, &json!("acme")).into();
        assert!(proto.before.is_empty());
        assert_eq!(proto.after, b"\"acme\"");
    }

    #[test]
    fn test_destroy_plan() {
        let plan = PlanResult::destroy();
        assert!(plan.planned_state.is_null());
        assert!(plan.changes.is_empty());
    }
}

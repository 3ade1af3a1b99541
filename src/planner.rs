//! Provider half of the plan step.
//!
//! The engine sends prior state, proposed state and raw configuration; the
//! planner decides the planned value of every top-level attribute, which of
//! them changed, and whether the change needs a replacement.

use serde_json::{Map, Value};

use crate::schema::{Attribute, BlockNestingMode, PlanModifier, Schema};
use crate::types::{AttributeChange, PlanResult};
use crate::value::{is_unknown_json, same_elements, UNKNOWN_VALUE};

/// Compute the plan for one resource.
///
/// A `null` proposed state is a destroy plan.
pub fn plan(
    schema: &Schema,
    prior: Option<&Value>,
    proposed: &Value,
    config: &Value,
) -> PlanResult {
    if proposed.is_null() {
        return PlanResult::destroy();
    }

    let empty = Map::new();
    let config = config.as_object().unwrap_or(&empty);
    let prior_obj = prior.and_then(Value::as_object);

    let configured = |name: &str| config.get(name).filter(|v| !v.is_null());
    let prior_of = |name: &str| prior_obj.and_then(|p| p.get(name)).unwrap_or(&Value::Null);

    let mut planned = Map::new();

    // Configurable attributes and blocks first; whether any of them moved
    // decides what unconfigured computed attributes plan to.
    let mut config_changed = prior_obj.is_none();
    for (name, attr) in &schema.block.attributes {
        if attr.flags.is_computed_only() {
            continue;
        }
        if let Some(v) = configured(name).cloned().or_else(|| attr.default.clone()) {
            if !values_equal(prior_of(name), &v, attr.attr_type.is_set()) {
                config_changed = true;
            }
            planned.insert(name.clone(), v);
        } else if !attr.flags.computed {
            if !prior_of(name).is_null() {
                config_changed = true;
            }
            planned.insert(name.clone(), Value::Null);
        }
    }
    for (name, block) in &schema.block.blocks {
        let v = config.get(name).cloned().unwrap_or(Value::Null);
        let unordered = block.nesting_mode == BlockNestingMode::Set;
        if !blocks_equal(prior_of(name), &v, unordered) {
            config_changed = true;
        }
        planned.insert(name.clone(), v);
    }

    for (name, attr) in &schema.block.attributes {
        if planned.contains_key(name) {
            continue;
        }
        let prior_value = prior_of(name);
        let keep = !prior_value.is_null()
            && (attr.has_plan_modifier(PlanModifier::UseStateForUnknown) || !config_changed);
        let value = if keep {
            prior_value.clone()
        } else {
            Value::String(UNKNOWN_VALUE.to_string())
        };
        planned.insert(name.clone(), value);
    }

    let mut changes = Vec::new();
    let mut requires_replace = false;
    for (name, after) in &planned {
        let before = prior_of(name);
        let unordered = match schema.block.attributes.get(name) {
            Some(attr) => attr.attr_type.is_set(),
            None => schema
                .block
                .blocks
                .get(name)
                .is_some_and(|b| b.nesting_mode == BlockNestingMode::Set),
        };
        let same = if schema.block.blocks.contains_key(name) {
            blocks_equal(before, after, unordered)
        } else {
            values_equal(before, after, unordered)
        };
        if same {
            continue;
        }
        if prior_obj.is_some() {
            if let Some(attr) = schema.block.attributes.get(name) {
                // An unconfigured computed value going unknown is the
                // Service's to decide and never forces a replacement.
                let pending = attr.flags.computed
                    && configured(name).is_none()
                    && is_unknown_json(after);
                if !pending && replaces(attr, configured(name).is_some()) {
                    requires_replace = true;
                }
            }
        }
        changes.push(AttributeChange::between(name.as_str(), before, after));
    }

    PlanResult {
        planned_state: Value::Object(planned),
        changes,
        requires_replace,
    }
}

fn replaces(attr: &Attribute, configured: bool) -> bool {
    attr.has_plan_modifier(PlanModifier::RequiresReplace)
        || (configured && attr.has_plan_modifier(PlanModifier::RequiresReplaceIfConfigured))
}

/// Attribute equality. Unknown is never equal to anything.
fn values_equal(a: &Value, b: &Value, unordered: bool) -> bool {
    if is_unknown_json(a) || is_unknown_json(b) {
        return false;
    }
    match (a, b) {
        (Value::Array(x), Value::Array(y)) if unordered => same_elements(x, y),
        _ => a == b,
    }
}

/// Block equality; an absent block and an empty list are the same.
fn blocks_equal(a: &Value, b: &Value, unordered: bool) -> bool {
    let empty = |v: &Value| v.is_null() || v.as_array().is_some_and(Vec::is_empty);
    if empty(a) && empty(b) {
        return true;
    }
    values_equal(a, b, unordered)
}

//! Schema validation.
//!
//! Checks a configuration document (`serde_json::Value`) against a [`Schema`]:
//! presence of required attributes, attribute types, nested block
//! cardinality, and every [`Validator`] attached to an attribute. Values equal
//! to the unknown marker are skipped entirely.
//!
//! # Example
//!
//! ```
//! use hemmer_provider_buddy::schema::{Attribute, Schema, Validator};
//! use hemmer_provider_buddy::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("custom_repo_url", Attribute::optional_string())
//!     .with_attribute(
//!         "integration_id",
//!         Attribute::optional_string()
//!             .with_validator(Validator::conflicts_with(&["custom_repo_url"])),
//!     );
//!
//! let diagnostics = validate(&schema, &json!({
//!     "custom_repo_url": "https://git.example.com/repo.git",
//!     "integration_id": "abc",
//! }));
//! assert_eq!(diagnostics.len(), 1);
//! assert!(diagnostics[0].summary.contains("custom_repo_url"));
//! ```

use regex::Regex;
use serde_json::{Map, Value};

use crate::schema::{
    Attribute, AttributeType, Block, BlockNestingMode, Diagnostic, NestedBlock, Schema, Validator,
};
use crate::value::is_unknown_json;

/// Validate a JSON value against a schema.
///
/// Returns a list of diagnostics for any validation errors found.
/// An empty list means the value is valid.
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(&schema.block, value, "", &mut diagnostics);
    diagnostics
}

/// Validate a JSON value against a schema, returning Ok if valid or Err with diagnostics.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.iter().any(Diagnostic::is_error) {
        Err(diagnostics)
    } else {
        Ok(())
    }
}

/// Whether a configuration value counts as "set" for cross-attribute rules.
/// Absent blocks arrive as `null` or `[]`.
pub fn is_set(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

fn validate_block(block: &Block, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return,
        v if is_unknown_json(v) => return,
        _ => {
            let mut diag = Diagnostic::error("Expected object")
                .with_detail(format!("Got {}", value_type_name(value)));
            if !path.is_empty() {
                diag = diag.with_attribute(path);
            }
            diagnostics.push(diag);
            return;
        }
    };

    for (name, attr) in &block.attributes {
        let attr_path = join_path(path, name);
        validate_attribute(attr, obj, name, &attr_path, diagnostics);
    }

    for (name, nested_block) in &block.blocks {
        let block_path = join_path(path, name);
        validate_nested_block(nested_block, obj.get(name), &block_path, diagnostics);
    }
}

fn validate_attribute(
    attr: &Attribute,
    siblings: &Map<String, Value>,
    name: &str,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.is_computed_only() {
        return;
    }

    match siblings.get(name) {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        }
        Some(v) if is_unknown_json(v) => {}
        Some(v) => {
            let before = diagnostics.len();
            validate_attribute_type(&attr.attr_type, v, path, diagnostics);
            if diagnostics.len() == before {
                for validator in &attr.validators {
                    apply_validator(validator, v, siblings, name, path, diagnostics);
                }
            }
        }
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if is_unknown_json(value) {
        return;
    }
    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        }
        AttributeType::Int64 => {
            if !is_int64(value) {
                diagnostics.push(type_error(path, "int64", value));
            }
        }
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        }
        AttributeType::List(element_type) | AttributeType::Set(element_type) => {
            if let Some(arr) = value.as_array() {
                for (i, elem) in arr.iter().enumerate() {
                    let elem_path = format!("{}.{}", path, i);
                    validate_attribute_type(element_type, elem, &elem_path, diagnostics);
                }
            } else {
                let expected = if attr_type.is_set() { "set" } else { "list" };
                diagnostics.push(type_error(path, expected, value));
            }
        }
        AttributeType::Map(value_type) => {
            if let Some(obj) = value.as_object() {
                for (key, val) in obj {
                    let key_path = format!("{}.{}", path, key);
                    validate_attribute_type(value_type, val, &key_path, diagnostics);
                }
            } else {
                diagnostics.push(type_error(path, "map", value));
            }
        }
    }
}

fn apply_validator(
    validator: &Validator,
    value: &Value,
    siblings: &Map<String, Value>,
    name: &str,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match validator {
        Validator::OneOf(allowed) => {
            for (elem_path, s) in strings_of(value, path) {
                if !allowed.iter().any(|a| a == s) {
                    diagnostics.push(
                        Diagnostic::error(format!("Invalid value for attribute '{}'", elem_path))
                            .with_detail(format!(
                                "Value \"{}\" must be one of: {}",
                                s,
                                allowed.join(", ")
                            ))
                            .with_attribute(elem_path),
                    );
                }
            }
        }
        Validator::Length { min, max } => {
            if let Some(s) = value.as_str() {
                let len = s.chars().count();
                if len < *min || max.is_some_and(|m| len > m) {
                    let bound = match max {
                        Some(m) => format!("between {} and {}", min, m),
                        None => format!("at least {}", min),
                    };
                    diagnostics.push(
                        Diagnostic::error(format!("Invalid length for attribute '{}'", path))
                            .with_detail(format!(
                                "Length must be {} characters, got {}",
                                bound, len
                            ))
                            .with_attribute(path),
                    );
                }
            }
        }
        Validator::Regex { pattern, message } => {
            let re = match Regex::new(pattern) {
                Ok(re) => re,
                Err(e) => {
                    diagnostics.push(
                        Diagnostic::error(format!("Invalid pattern for attribute '{}'", path))
                            .with_detail(e.to_string())
                            .with_attribute(path),
                    );
                    return;
                }
            };
            for (elem_path, s) in strings_of(value, path) {
                if !re.is_match(s) {
                    diagnostics.push(
                        Diagnostic::error(format!("Invalid value for attribute '{}'", elem_path))
                            .with_detail(message.clone())
                            .with_attribute(elem_path),
                    );
                }
            }
        }
        Validator::Int64Range { min, max } => {
            if let Some(n) = value.as_i64() {
                let below = min.is_some_and(|m| n < m);
                let above = max.is_some_and(|m| n > m);
                if below || above {
                    let bound = match (min, max) {
                        (Some(lo), Some(hi)) => format!("between {} and {}", lo, hi),
                        (Some(lo), None) => format!("at least {}", lo),
                        (None, Some(hi)) => format!("at most {}", hi),
                        (None, None) => String::new(),
                    };
                    diagnostics.push(
                        Diagnostic::error(format!("Value out of range for attribute '{}'", path))
                            .with_detail(format!("Value must be {}, got {}", bound, n))
                            .with_attribute(path),
                    );
                }
            }
        }
        Validator::ListLength { min, max } => {
            let len = match value {
                Value::Array(items) => items.len(),
                Value::Object(map) => map.len(),
                _ => return,
            };
            if len < *min || max.is_some_and(|m| len > m) {
                let bound = match max {
                    Some(m) => format!("between {} and {}", min, m),
                    None => format!("at least {}", min),
                };
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Invalid number of elements for attribute '{}'",
                        path
                    ))
                        .with_detail(format!("Must contain {} element(s), got {}", bound, len))
                        .with_attribute(path),
                );
            }
        }
        Validator::ConflictsWith(others) => {
            for other in others {
                if is_set(siblings.get(other)) {
                    diagnostics.push(
                        Diagnostic::error(format!(
                            "Conflicting attributes '{}' and '{}'",
                            name, other
                        ))
                        .with_detail(format!(
                            "Attribute '{}' cannot be specified when '{}' is specified",
                            name, other
                        ))
                        .with_attribute(path),
                    );
                }
            }
        }
        Validator::AlsoRequires(others) => {
            for other in others {
                if !is_set(siblings.get(other)) {
                    diagnostics.push(
                        Diagnostic::error(format!("Missing attribute '{}'", other))
                            .with_detail(format!(
                                "Attribute '{}' must be specified when '{}' is specified",
                                other, name
                            ))
                            .with_attribute(path),
                    );
                }
            }
        }
    }
}

/// Strings a string validator applies to: the value itself, or every known
/// string element of a list or set.
fn strings_of<'a>(value: &'a Value, path: &str) -> Vec<(String, &'a str)> {
    match value {
        Value::String(s) if !is_unknown_json(value) => vec![(path.to_string(), s.as_str())],
        Value::Array(items) => items
            .iter()
            .enumerate()
            .filter(|(_, v)| !is_unknown_json(v))
            .filter_map(|(i, v)| v.as_str().map(|s| (format!("{}.{}", path, i), s)))
            .collect(),
        _ => Vec::new(),
    }
}

fn validate_nested_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if value.is_some_and(is_unknown_json) {
        return;
    }
    match nested.nesting_mode {
        BlockNestingMode::Single => match value {
            None | Some(Value::Null) => {
                if nested.min_items > 0 {
                    diagnostics.push(
                        Diagnostic::error(format!("Missing required block '{}'", path))
                            .with_detail("At least one block is required")
                            .with_attribute(path),
                    );
                }
            }
            // A single block may also arrive as a one-element list.
            Some(Value::Array(arr)) => {
                validate_items(nested, arr.iter().enumerate(), arr.len(), path, diagnostics)
            }
            Some(v) => validate_block(&nested.block, v, path, diagnostics),
        },
        BlockNestingMode::List | BlockNestingMode::Set => match value {
            None | Some(Value::Null) => check_count(nested, 0, path, diagnostics),
            Some(Value::Array(arr)) => {
                validate_items(nested, arr.iter().enumerate(), arr.len(), path, diagnostics)
            }
            Some(v) => diagnostics.push(
                Diagnostic::error(format!("Expected list for block '{}'", path))
                    .with_detail(format!("Got {}", value_type_name(v)))
                    .with_attribute(path),
            ),
        },
        BlockNestingMode::Map => match value {
            None | Some(Value::Null) => check_count(nested, 0, path, diagnostics),
            Some(Value::Object(obj)) => {
                check_count(nested, obj.len(), path, diagnostics);
                for (key, item) in obj {
                    let item_path = format!("{}.{}", path, key);
                    validate_block(&nested.block, item, &item_path, diagnostics);
                }
            }
            Some(v) => diagnostics.push(
                Diagnostic::error(format!("Expected map for block '{}'", path))
                    .with_detail(format!("Got {}", value_type_name(v)))
                    .with_attribute(path),
            ),
        },
    }
}

fn validate_items<'a>(
    nested: &NestedBlock,
    items: impl Iterator<Item = (usize, &'a Value)>,
    len: usize,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    check_count(nested, len, path, diagnostics);
    for (i, item) in items {
        let item_path = format!("{}.{}", path, i);
        validate_block(&nested.block, item, &item_path, diagnostics);
    }
}

fn check_count(nested: &NestedBlock, len: usize, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let len = len as u32;
    if len < nested.min_items {
        diagnostics.push(
            Diagnostic::error(format!(
                "Block '{}' requires at least {} item(s), got {}",
                path, nested.min_items, len
            ))
            .with_attribute(path),
        );
    }
    if nested.max_items > 0 && len > nested.max_items {
        diagnostics.push(
            Diagnostic::error(format!(
                "Block '{}' allows at most {} item(s), got {}",
                path, nested.max_items, len
            ))
            .with_attribute(path),
        );
    }
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            n.is_i64()
                || n.as_f64()
                    .is_some_and(|f| {
                        f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64
                    })
        }
        _ => false,
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, value_type_name(got)))
        .with_attribute(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeFlags, Block, NestedBlock, Schema};
    use crate::value::UNKNOWN_VALUE;
    use serde_json::json;

    #[test]
    fn test_validate_required_string() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        assert!(validate(&schema, &json!({"name": "test"})).is_empty());

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("name".to_string()));

        let diagnostics = validate(&schema, &json!({"name": null}));
        assert_eq!(diagnostics.len(), 1);

        let diagnostics = validate(&schema, &json!({"name": 123}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_unknown_values_are_skipped() {
        let schema = Schema::v0()
            .with_attribute("priority", Attribute::optional_string().one_of(&["LOW", "HIGH"]))
            .with_attribute(
                "ttl",
                Attribute::required_int64().with_validator(Validator::between(60, 86400)),
            );

        let diagnostics = validate(
            &schema,
            &json!({"priority": UNKNOWN_VALUE, "ttl": UNKNOWN_VALUE}),
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_computed_attribute_skipped() {
        let schema = Schema::v0().with_attribute("id", Attribute::computed_string());
        assert!(validate(&schema, &json!({"id": 123})).is_empty());
    }

    #[test]
    fn test_one_of() {
        let schema = Schema::v0().with_attribute(
            "priority",
            Attribute::optional_string().one_of(&["LOW", "NORMAL", "HIGH"]),
        );
        assert!(validate(&schema, &json!({"priority": "LOW"})).is_empty());

        let diagnostics = validate(&schema, &json!({"priority": "URGENT"}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].detail.as_deref().unwrap().contains("LOW, NORMAL, HIGH"));
    }

    #[test]
    fn test_one_of_applies_to_set_elements() {
        let schema = Schema::v0().with_attribute(
            "events",
            Attribute::string_set(AttributeFlags::required()).one_of(&["PUSH", "EXECUTION_FAILED"]),
        );
        let diagnostics = validate(&schema, &json!({"events": ["PUSH", "BOGUS"]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("events.1"));
    }

    #[test]
    fn test_regex_and_length() {
        let schema = Schema::v0()
            .with_attribute(
                "domain",
                Attribute::required_string().with_validator(Validator::regex(
                    "^[a-z0-9][a-z0-9-]{1,}[a-z0-9]$",
                    "must be lowercase letters, digits and dashes",
                )),
            )
            .with_attribute(
                "name",
                Attribute::optional_string().with_validator(Validator::not_empty()),
            );

        assert!(validate(&schema, &json!({"domain": "acme"})).is_empty());

        let diagnostics = validate(&schema, &json!({"domain": "Acme!", "name": ""}));
        assert_eq!(diagnostics.len(), 2);
    }

    #[test]
    fn test_int64_range() {
        let schema = Schema::v0().with_attribute(
            "ttl",
            Attribute::required_int64().with_validator(Validator::between(60, 86400)),
        );
        assert!(validate(&schema, &json!({"ttl": 300})).is_empty());
        let diagnostics = validate(&schema, &json!({"ttl": 5}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].detail.as_deref().unwrap().contains("between 60 and 86400"));
    }

    #[test]
    fn test_list_length() {
        let schema = Schema::v0().with_attribute(
            "value",
            Attribute::string_list(AttributeFlags::required())
                .with_validator(Validator::min_items(1)),
        );
        assert!(validate(&schema, &json!({"value": ["1.2.3.4"]})).is_empty());
        assert_eq!(validate(&schema, &json!({"value": []})).len(), 1);
    }

    #[test]
    fn test_conflicts_with_names_both_attributes() {
        let schema = Schema::v0()
            .with_attribute(
                "refs",
                Attribute::string_set(AttributeFlags::optional())
                    .with_validator(Validator::conflicts_with(&["event"])),
            )
            .with_block(
                "event",
                NestedBlock::set(Block::new().with_attribute("type", Attribute::required_string())),
            );

        let diagnostics = validate(
            &schema,
            &json!({"refs": ["main"], "event": [{"type": "PUSH"}]}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("refs"));
        assert!(diagnostics[0].summary.contains("event"));

        // An absent block arrives as an empty list.
        assert!(validate(&schema, &json!({"refs": ["main"], "event": []})).is_empty());
    }

    #[test]
    fn test_also_requires() {
        let schema = Schema::v0()
            .with_attribute("start_date", Attribute::optional_string())
            .with_attribute(
                "delay",
                Attribute::optional_int64()
                    .with_validator(Validator::also_requires(&["start_date"])),
            );

        let diagnostics = validate(&schema, &json!({"delay": 5}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].detail.as_deref().unwrap().contains("start_date"));

        let config = json!({"delay": 5, "start_date": "2024-01-01T00:00:00Z"});
        assert!(validate(&schema, &config).is_empty());
        // Unknown counts as set.
        assert!(validate(&schema, &json!({"delay": 5, "start_date": UNKNOWN_VALUE})).is_empty());
    }

    #[test]
    fn test_validate_nested_block_single() {
        let schema = Schema::v0().with_block(
            "auth",
            NestedBlock::single(
                Block::new().with_attribute(
                    "method",
                    Attribute::required_string().one_of(&["PASS", "SSH_KEY"]),
                ),
            ),
        );

        assert!(validate(&schema, &json!({"auth": {"method": "PASS"}})).is_empty());
        assert!(validate(&schema, &json!({})).is_empty());

        let diagnostics = validate(&schema, &json!({"auth": {"method": "TOKEN"}}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("auth.method".to_string()));
    }

    #[test]
    fn test_validate_nested_block_list() {
        let schema = Schema::v0().with_block(
            "trigger_condition",
            NestedBlock::list(
                Block::new().with_attribute("condition", Attribute::required_string()),
            )
                .with_min_items(1)
                .with_max_items(2),
        );

        let config = json!({"trigger_condition": [{"condition": "ON_CHANGE"}]});
        assert!(validate(&schema, &config).is_empty());

        let diagnostics = validate(&schema, &json!({"trigger_condition": []}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("at least 1"));

        let diagnostics = validate(
            &schema,
            &json!({"trigger_condition": [
                {"condition": "A"},
                {"condition": "B"},
                {"condition": "C"},
            ]}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("at most 2"));

        let diagnostics = validate(&schema, &json!({"trigger_condition": [{"condition": 1}]}));
        assert_eq!(diagnostics[0].attribute, Some("trigger_condition.0.condition".to_string()));
    }

    #[test]
    fn test_validate_int64() {
        let schema = Schema::v0().with_attribute("count", Attribute::required_int64());
        assert!(validate(&schema, &json!({"count": 42})).is_empty());
        assert!(validate(&schema, &json!({"count": 42.0})).is_empty());
        assert_eq!(validate(&schema, &json!({"count": 42.5})).len(), 1);
        assert_eq!(validate(&schema, &json!({"count": "42"})).len(), 1);
    }

    #[test]
    fn test_validate_map() {
        let schema = Schema::v0()
            .with_attribute("endpoints", Attribute::string_map(AttributeFlags::optional()));
        assert!(validate(&schema, &json!({"endpoints": {"web": "80"}})).is_empty());
        let diagnostics = validate(&schema, &json!({"endpoints": {"web": 80}}));
        assert_eq!(diagnostics[0].attribute, Some("endpoints.web".to_string()));
    }

    #[test]
    fn test_validate_result_helper() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());
        assert!(validate_result(&schema, &json!({"name": "test"})).is_ok());
        assert_eq!(validate_result(&schema, &json!({})).unwrap_err().len(), 1);
    }

    #[test]
    fn test_validate_root_not_object() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());
        let diagnostics = validate(&schema, &json!("not an object"));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Expected object"));
    }
}

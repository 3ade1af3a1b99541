//! Attribute schemas for the provider block, resources and data sources.
//!
//! Besides the wire-visible shape (types and cardinality flags),
//! each attribute carries the [`Validator`]s enforced before any call to the
//! Service and the [`PlanModifier`]s consumed by the planner.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Wire type of an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// UTF-8 string.
    String,
    /// 64-bit signed integer.
    Int64,
    /// Boolean.
    Bool,
    /// Ordered list.
    List(Box<AttributeType>),
    /// Unordered; plan comparisons ignore element order.
    Set(Box<AttributeType>),
    /// String keys.
    Map(Box<AttributeType>),
}

impl AttributeType {
    /// A list of `element_type`.
    pub fn list(element_type: AttributeType) -> Self {
        Self::List(Box::new(element_type))
    }

    /// A set of `element_type`.
    pub fn set(element_type: AttributeType) -> Self {
        Self::Set(Box::new(element_type))
    }

    /// A string-keyed map of `element_type`.
    pub fn map(element_type: AttributeType) -> Self {
        Self::Map(Box::new(element_type))
    }

    /// Whether element order is irrelevant for comparisons.
    pub fn is_set(&self) -> bool {
        matches!(self, Self::Set(_))
    }
}

/// Who sets an attribute: the configuration, the Service, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AttributeFlags {
    /// Must be configured.
    pub required: bool,
    /// May be configured.
    pub optional: bool,
    /// Filled in from Service responses.
    pub computed: bool,
    /// Redacted by the engine; never logged by handlers.
    pub sensitive: bool,
}

impl AttributeFlags {
    /// Required flags.
    pub fn required() -> Self {
        Self {
            required: true,
            ..Default::default()
        }
    }

    /// Optional flags.
    pub fn optional() -> Self {
        Self {
            optional: true,
            ..Default::default()
        }
    }

    /// Computed-only flags.
    pub fn computed() -> Self {
        Self {
            computed: true,
            ..Default::default()
        }
    }

    /// Configurable; the Service picks a value when unset.
    pub fn optional_computed() -> Self {
        Self {
            optional: true,
            computed: true,
            ..Default::default()
        }
    }

    /// Whether the attribute can only be set by the provider.
    pub fn is_computed_only(&self) -> bool {
        self.computed && !self.optional && !self.required
    }
}

/// A configuration check attached to an attribute.
///
/// Validators only look at known values; an unknown value is checked on a
/// later plan once it resolves. Cross-attribute validators name sibling
/// attributes or blocks of the same block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validator {
    /// The string (or every string element) must be one of the values.
    OneOf(Vec<String>),
    /// String length in characters.
    Length {
        /// Minimum length.
        min: usize,
        /// Maximum length, if bounded.
        max: Option<usize>,
    },
    /// The string must match `pattern`.
    Regex {
        /// Regular expression.
        pattern: String,
        /// Error detail shown on mismatch.
        message: String,
    },
    /// Inclusive integer range.
    Int64Range {
        /// Lower bound.
        min: Option<i64>,
        /// Upper bound.
        max: Option<i64>,
    },
    /// Number of list, set or map elements.
    ListLength {
        /// Minimum element count.
        min: usize,
        /// Maximum element count, if bounded.
        max: Option<usize>,
    },
    /// Must not be set together with any of the named attributes.
    ConflictsWith(Vec<String>),
    /// When set, every named attribute must be set too.
    AlsoRequires(Vec<String>),
}

impl Validator {
    /// String enumeration.
    pub fn one_of(values: &[&str]) -> Self {
        Self::OneOf(values.iter().map(|v| v.to_string()).collect())
    }

    /// Regular expression with a human-readable mismatch message.
    pub fn regex(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Regex {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Integer lower bound.
    pub fn at_least(min: i64) -> Self {
        Self::Int64Range {
            min: Some(min),
            max: None,
        }
    }

    /// Inclusive integer range.
    pub fn between(min: i64, max: i64) -> Self {
        Self::Int64Range {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Non-empty string.
    pub fn not_empty() -> Self {
        Self::Length { min: 1, max: None }
    }

    /// Minimum number of elements.
    pub fn min_items(min: usize) -> Self {
        Self::ListLength { min, max: None }
    }

    /// Mutual exclusion.
    pub fn conflicts_with(attrs: &[&str]) -> Self {
        Self::ConflictsWith(attrs.iter().map(|a| a.to_string()).collect())
    }

    /// Dependency on other attributes.
    pub fn also_requires(attrs: &[&str]) -> Self {
        Self::AlsoRequires(attrs.iter().map(|a| a.to_string()).collect())
    }
}

/// Plan-time behaviour of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanModifier {
    /// A computed value not present in configuration keeps its prior value.
    UseStateForUnknown,
    /// Any change forces destroy-then-create.
    RequiresReplace,
    /// A configured value that differs from prior state forces replacement.
    RequiresReplaceIfConfigured,
}

/// One attribute of a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Value type.
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    /// Who sets the attribute.
    #[serde(flatten)]
    pub flags: AttributeFlags,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Planned when the configuration leaves the attribute unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Configuration checks.
    #[serde(skip)]
    pub validators: Vec<Validator>,
    /// Plan-time behaviour.
    #[serde(skip)]
    pub plan_modifiers: Vec<PlanModifier>,
}

impl Attribute {
    /// An attribute with no description, default or modifiers.
    pub fn new(attr_type: AttributeType, flags: AttributeFlags) -> Self {
        Self {
            attr_type,
            flags,
            description: None,
            default: None,
            validators: Vec::new(),
            plan_modifiers: Vec::new(),
        }
    }

    /// Create a required string attribute.
    pub fn required_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::required())
    }

    /// Create an optional string attribute.
    pub fn optional_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::optional())
    }

    /// Create an optional string attribute the Service fills in when unset.
    pub fn optional_computed_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::optional_computed())
    }

    /// Create a string attribute only the Service sets.
    pub fn computed_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::computed())
    }

    /// Create a required integer attribute.
    pub fn required_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::required())
    }

    /// Create an optional integer attribute.
    pub fn optional_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::optional())
    }

    /// Create an optional integer attribute the Service fills in when unset.
    pub fn optional_computed_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::optional_computed())
    }

    /// Create an integer attribute only the Service sets.
    pub fn computed_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::computed())
    }

    /// Create an optional boolean attribute.
    pub fn optional_bool() -> Self {
        Self::new(AttributeType::Bool, AttributeFlags::optional())
    }

    /// Create an optional boolean attribute the Service fills in when unset.
    pub fn optional_computed_bool() -> Self {
        Self::new(AttributeType::Bool, AttributeFlags::optional_computed())
    }

    /// Create a boolean attribute only the Service sets.
    pub fn computed_bool() -> Self {
        Self::new(AttributeType::Bool, AttributeFlags::computed())
    }

    /// A set of strings.
    pub fn string_set(flags: AttributeFlags) -> Self {
        Self::new(AttributeType::set(AttributeType::String), flags)
    }

    /// A list of strings.
    pub fn string_list(flags: AttributeFlags) -> Self {
        Self::new(AttributeType::list(AttributeType::String), flags)
    }

    /// A set of integers.
    pub fn int64_set(flags: AttributeFlags) -> Self {
        Self::new(AttributeType::set(AttributeType::Int64), flags)
    }

    /// A map of strings.
    pub fn string_map(flags: AttributeFlags) -> Self {
        Self::new(AttributeType::map(AttributeType::String), flags)
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the value planned when the attribute is unset.
    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Mark the attribute sensitive.
    pub fn sensitive(mut self) -> Self {
        self.flags.sensitive = true;
        self
    }

    /// Add a validator.
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Restrict a string (or string collection) to an enumeration.
    pub fn one_of(self, values: &[&str]) -> Self {
        self.with_validator(Validator::one_of(values))
    }

    /// Changing this attribute forces resource replacement.
    pub fn requires_replace(self) -> Self {
        self.with_plan_modifier(PlanModifier::RequiresReplace)
    }

    /// Changing a configured value forces resource replacement.
    pub fn requires_replace_if_configured(self) -> Self {
        self.with_plan_modifier(PlanModifier::RequiresReplaceIfConfigured)
    }

    /// Keep the prior value while planning instead of marking it unknown.
    pub fn use_state_for_unknown(self) -> Self {
        self.with_plan_modifier(PlanModifier::UseStateForUnknown)
    }

    /// Add a plan modifier.
    pub fn with_plan_modifier(mut self, modifier: PlanModifier) -> Self {
        if !self.plan_modifiers.contains(&modifier) {
            self.plan_modifiers.push(modifier);
        }
        self
    }

    /// Whether the plan modifier is present.
    pub fn has_plan_modifier(&self, modifier: PlanModifier) -> bool {
        self.plan_modifiers.contains(&modifier)
    }

    /// Wire-level `force_new` flag.
    pub fn force_new(&self) -> bool {
        self.has_plan_modifier(PlanModifier::RequiresReplace)
            || self.has_plan_modifier(PlanModifier::RequiresReplaceIfConfigured)
    }
}

/// How many instances of a nested block may appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BlockNestingMode {
    /// At most one.
    #[default]
    Single,
    /// Ordered instances.
    List,
    /// Unordered.
    Set,
    /// Keyed by string; part of the protocol, no Buddy resource uses it.
    Map,
}

/// Attributes and nested blocks, such as a pipeline's `event` or a
/// target's `auth`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Attributes by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Attribute>,
    /// Nested blocks by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub blocks: BTreeMap<String, NestedBlock>,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Block {
    /// An empty block.
    pub fn new() -> Self {
        Self {
            attributes: BTreeMap::new(),
            blocks: BTreeMap::new(),
            description: None,
        }
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.attributes.insert(name.into(), attr);
        self
    }

    /// Add a nested block.
    pub fn with_block(mut self, name: impl Into<String>, block: NestedBlock) -> Self {
        self.blocks.insert(name.into(), block);
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Default for Block {
    fn default() -> Self {
        Self::new()
    }
}

/// A block used inside another block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedBlock {
    /// Contents of the block.
    #[serde(flatten)]
    pub block: Block,
    /// How many instances may appear and how they compare.
    #[serde(default)]
    pub nesting_mode: BlockNestingMode,
    /// Minimum number of instances.
    #[serde(default)]
    pub min_items: u32,
    /// 0 means unbounded.
    #[serde(default)]
    pub max_items: u32,
}

impl NestedBlock {
    fn nested(block: Block, nesting_mode: BlockNestingMode, max_items: u32) -> Self {
        Self {
            block,
            nesting_mode,
            min_items: 0,
            max_items,
        }
    }

    /// At most one instance.
    pub fn single(block: Block) -> Self {
        Self::nested(block, BlockNestingMode::Single, 1)
    }

    /// An ordered list of instances.
    pub fn list(block: Block) -> Self {
        Self::nested(block, BlockNestingMode::List, 0)
    }

    /// An unordered set of instances.
    pub fn set(block: Block) -> Self {
        Self::nested(block, BlockNestingMode::Set, 0)
    }

    /// Set the minimum number of instances.
    pub fn with_min_items(mut self, min: u32) -> Self {
        self.min_items = min;
        self
    }

    /// Set the maximum number of instances.
    pub fn with_max_items(mut self, max: u32) -> Self {
        self.max_items = max;
        self
    }
}

/// Schema of a resource, data source or the provider block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Bumped when stored state needs an upgrade.
    #[serde(default)]
    pub version: u64,
    /// Contents of the block.
    #[serde(flatten)]
    pub block: Block,
}

impl Schema {
    /// An empty schema at `version`.
    pub fn new(version: u64) -> Self {
        Self {
            version,
            block: Block::new(),
        }
    }

    /// An empty version 0 schema.
    pub fn v0() -> Self {
        Self::new(0)
    }

    /// A version 0 resource schema with the computed `id` attribute.
    pub fn resource(description: impl Into<String>) -> Self {
        let mut schema = Self::v0().with_attribute(
            "id",
            Attribute::computed_string()
                .use_state_for_unknown()
                .with_description("The composite resource ID"),
        );
        schema.block.description = Some(description.into());
        schema
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.block.attributes.insert(name.into(), attr);
        self
    }

    /// Add a nested block.
    pub fn with_block(mut self, name: impl Into<String>, block: NestedBlock) -> Self {
        self.block.blocks.insert(name.into(), block);
        self
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::v0()
    }
}

/// Everything GetSchema returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProviderSchema {
    /// Provider configuration block.
    #[serde(default)]
    pub provider: Schema,
    /// Resource schemas by type name.
    #[serde(default)]
    pub resources: BTreeMap<String, Schema>,
    /// Data source schemas by type name.
    #[serde(default)]
    pub data_sources: BTreeMap<String, Schema>,
}

impl ProviderSchema {
    /// An empty provider schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the provider configuration schema.
    pub fn with_provider_config(mut self, schema: Schema) -> Self {
        self.provider = schema;
        self
    }

    /// Register a resource schema.
    pub fn with_resource(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.resources.insert(name.into(), schema);
        self
    }

    /// Register a data source schema.
    pub fn with_data_source(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.data_sources.insert(name.into(), schema);
        self
    }
}

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// Fails the operation.
    Error,
    /// Shown to the user; the operation goes on.
    Warning,
}

/// A problem reported back to the engine, optionally tied to an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Error or warning.
    pub severity: DiagnosticSeverity,
    /// One-line summary.
    pub summary: String,
    /// Longer explanation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Dotted path, e.g. `trigger_condition.0.branch`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    fn new(severity: DiagnosticSeverity, summary: impl Into<String>) -> Self {
        Self {
            severity,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// An error diagnostic.
    pub fn error(summary: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Error, summary)
    }

    /// A warning diagnostic.
    pub fn warning(summary: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Warning, summary)
    }

    /// Attach a detail message.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Tie the diagnostic to an attribute path.
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Whether the diagnostic fails the operation.
    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_type_constructors() {
        let set = AttributeType::set(AttributeType::String);
        assert!(set.is_set());

        let map = AttributeType::map(AttributeType::Int64);
        assert!(matches!(map, AttributeType::Map(_)));
        assert!(!map.is_set());
    }

    #[test]
    fn test_attribute_flags() {
        let required = AttributeFlags::required();
        assert!(required.required);
        assert!(!required.is_computed_only());

        let computed = AttributeFlags::computed();
        assert!(computed.is_computed_only());

        let optional_computed = AttributeFlags::optional_computed();
        assert!(optional_computed.optional);
        assert!(optional_computed.computed);
        assert!(!optional_computed.is_computed_only());
    }

    #[test]
    fn test_attribute_builders() {
        let attr = Attribute::required_string()
            .with_description("Workspace domain")
            .requires_replace()
            .one_of(&["a", "b"]);

        assert_eq!(attr.attr_type, AttributeType::String);
        assert!(attr.flags.required);
        assert_eq!(attr.description.as_deref(), Some("Workspace domain"));
        assert!(attr.force_new());
        assert_eq!(attr.validators, vec![Validator::one_of(&["a", "b"])]);
    }

    #[test]
    fn test_plan_modifiers_deduplicate() {
        let attr = Attribute::computed_string()
            .use_state_for_unknown()
            .use_state_for_unknown();
        assert_eq!(attr.plan_modifiers, vec![PlanModifier::UseStateForUnknown]);
        assert!(!attr.force_new());

        let attr = Attribute::optional_string().requires_replace_if_configured();
        assert!(attr.force_new());
    }

    #[test]
    fn test_resource_schema_has_id() {
        let schema = Schema::resource("A group")
            .with_attribute("name", Attribute::required_string())
            .with_block(
                "config",
                NestedBlock::single(
                    Block::new().with_attribute("enabled", Attribute::optional_bool()),
                ),
            );

        let id = &schema.block.attributes["id"];
        assert!(id.flags.is_computed_only());
        assert!(id.has_plan_modifier(PlanModifier::UseStateForUnknown));
        assert_eq!(schema.block.description.as_deref(), Some("A group"));
        assert!(schema.block.blocks.contains_key("config"));
    }

    #[test]
    fn test_validators_not_serialized() {
        let attr = Attribute::required_string().with_validator(Validator::not_empty());
        let json = serde_json::to_value(&attr).unwrap();
        assert!(json.get("validators").is_none());
        assert_eq!(json["type"], "string");
        assert_eq!(json["required"], true);
    }

    #[test]
    fn test_provider_schema() {
        let provider_schema = ProviderSchema::new()
            .with_provider_config(
                Schema::v0().with_attribute("token", Attribute::optional_string().sensitive()),
            )
            .with_resource("buddy_group", Schema::resource("group"))
            .with_data_source("buddy_profile", Schema::v0());

        assert!(provider_schema.provider.block.attributes["token"].flags.sensitive);
        assert!(provider_schema.resources.contains_key("buddy_group"));
        assert!(provider_schema.data_sources.contains_key("buddy_profile"));
    }

    #[test]
    fn test_diagnostic() {
        let err = Diagnostic::error("Invalid configuration")
            .with_detail("The value must be positive")
            .with_attribute("ttl");

        assert!(err.is_error());
        assert_eq!(err.summary, "Invalid configuration");
        assert_eq!(err.detail, Some("The value must be positive".to_string()));
        assert_eq!(err.attribute, Some("ttl".to_string()));
        assert!(!Diagnostic::warning("w").is_error());
    }

    #[test]
    fn test_nested_block_modes() {
        let single = NestedBlock::single(Block::new());
        assert_eq!(single.nesting_mode, BlockNestingMode::Single);
        assert_eq!(single.max_items, 1);

        let list = NestedBlock::list(Block::new())
            .with_min_items(1)
            .with_max_items(5);
        assert_eq!(list.nesting_mode, BlockNestingMode::List);
        assert_eq!(list.min_items, 1);
        assert_eq!(list.max_items, 5);
    }
}

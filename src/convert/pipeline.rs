//! Pipeline blocks: git config, events, trigger conditions and remote
//! parameters.
//!
//! Trigger conditions travel as one flat object whose meaningful fields
//! depend on the `trigger_condition` discriminator. In between they are a
//! [`TriggerCondition`], so only the fields of the selected variant are
//! ever sent or stored.

use serde::{Deserialize, Serialize};

use crate::client::{GitConfig, PipelineEvent, RemoteParameter, TriggerConditionBody};
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, Block, Diagnostic, NestedBlock, Validator};
use crate::value::{SetValue, StringValue, Value};

use super::collections::list_from;

/// Pipeline event types.
pub const EVENT_TYPES: &[&str] = &[
    "PUSH",
    "CREATE_REF",
    "DELETE_REF",
    "PULL_REQUEST",
    "SCHEDULE",
    "WEBHOOK",
];

/// Trigger condition discriminators.
pub const TRIGGER_CONDITIONS: &[&str] = &[
    "ON_CHANGE",
    "ON_CHANGE_AT_PATH",
    "VAR_IS",
    "VAR_IS_NOT",
    "VAR_CONTAINS",
    "VAR_NOT_CONTAINS",
    "DATETIME",
    "SUCCESS_PIPELINE",
    "TRIGGERING_USER_IS",
    "TRIGGERING_USER_IS_NOT",
    "TRIGGERING_USER_IS_IN_GROUP",
    "TRIGGERING_USER_IS_NOT_IN_GROUP",
];

/// The `git_config` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfigBlock {
    /// Project holding the YAML file.
    pub project: StringValue,
    /// Branch holding the definition.
    pub branch: StringValue,
    /// Path of the YAML file.
    pub path: StringValue,
}

/// One `event` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventBlock {
    /// Event type, e.g. `PUSH`.
    #[serde(rename = "type")]
    pub event_type: StringValue,
    /// Refs the event applies to.
    pub refs: SetValue<String>,
}

/// One `trigger_condition` block. Which fields apply depends on `condition`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConditionBlock {
    /// Condition type, e.g. `ON_CHANGE_AT_PATH`.
    pub condition: StringValue,
    /// Paths watched for changes.
    pub paths: SetValue<String>,
    /// Variable name.
    pub variable_key: StringValue,
    /// Expected variable value.
    pub variable_value: StringValue,
    /// Hours of the day, 0 to 23.
    pub hours: SetValue<i64>,
    /// Days of the week, 1 to 7.
    pub days: SetValue<i64>,
    /// Time zone of time conditions.
    pub zone_id: StringValue,
    /// Project URL handle.
    pub project_name: StringValue,
    /// Pipeline name.
    pub pipeline_name: StringValue,
    /// Email for trigger-by-user conditions.
    pub trigger_user: StringValue,
    /// Group for trigger-by-group conditions.
    pub trigger_group: StringValue,
}

/// One `remote_parameter` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteParameterBlock {
    /// Parameter name.
    pub key: StringValue,
    /// Parameter value.
    pub value: StringValue,
}

/// Schema of the `git_config` block.
pub fn git_config_block() -> NestedBlock {
    NestedBlock::single(
        Block::new()
            .with_description("Repository location of the pipeline YAML definition")
            .with_attribute("project", Attribute::required_string())
            .with_attribute("branch", Attribute::required_string())
            .with_attribute("path", Attribute::required_string()),
    )
    .with_max_items(1)
}

/// Schema of the `event` set block.
pub fn event_block() -> NestedBlock {
    NestedBlock::set(
        Block::new()
            .with_attribute("type", Attribute::required_string().one_of(EVENT_TYPES))
            .with_attribute("refs", Attribute::string_set(AttributeFlags::optional())),
    )
}

/// Schema of the ordered `trigger_condition` block.
pub fn trigger_condition_block() -> NestedBlock {
    NestedBlock::list(
        Block::new()
            .with_attribute(
                "condition",
                Attribute::required_string().one_of(TRIGGER_CONDITIONS),
            )
            .with_attribute("paths", Attribute::string_set(AttributeFlags::optional()))
            .with_attribute("variable_key", Attribute::optional_string())
            .with_attribute("variable_value", Attribute::optional_string())
            .with_attribute(
                "hours",
                Attribute::int64_set(AttributeFlags::optional()),
            )
            .with_attribute(
                "days",
                Attribute::int64_set(AttributeFlags::optional()),
            )
            .with_attribute("zone_id", Attribute::optional_string())
            .with_attribute("project_name", Attribute::optional_string())
            .with_attribute("pipeline_name", Attribute::optional_string())
            .with_attribute("trigger_user", Attribute::optional_string())
            .with_attribute("trigger_group", Attribute::optional_string()),
    )
}

/// Schema of the `remote_parameter` set block.
pub fn remote_parameter_block() -> NestedBlock {
    NestedBlock::set(
        Block::new()
            .with_attribute(
                "key",
                Attribute::required_string().with_validator(Validator::not_empty()),
            )
            .with_attribute("value", Attribute::required_string()),
    )
}

/// A trigger condition with exactly the fields its discriminator uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerCondition {
    /// Something changed since the last run.
    OnChange,
    /// One of `paths` changed.
    OnChangeAtPath {
        /// Watched paths.
        paths: Vec<String>,
    },
    /// Variable `key` equals `value`.
    VarIs {
        /// Variable name.
        key: String,
        /// Expected value.
        value: String,
    },
    /// Variable `key` differs from `value`.
    VarIsNot {
        /// Variable name.
        key: String,
        /// Rejected value.
        value: String,
    },
    /// Variable `key` contains `value`.
    VarContains {
        /// Variable name.
        key: String,
        /// Expected substring.
        value: String,
    },
    /// Variable `key` does not contain `value`.
    VarNotContains {
        /// Variable name.
        key: String,
        /// Rejected substring.
        value: String,
    },
    /// The run starts within the given hours and days.
    DateTime {
        /// Hours of the day, 0 to 23.
        hours: Vec<i64>,
        /// Days of the week, 1 to 7.
        days: Vec<i64>,
        /// Time zone, UTC when unset.
        zone_id: Option<String>,
    },
    /// Another pipeline last finished successfully.
    SuccessPipeline {
        /// Project of the other pipeline.
        project: String,
        /// Name of the other pipeline.
        pipeline: String,
    },
    /// Started by `user`.
    TriggeringUserIs {
        /// Member email.
        user: String,
    },
    /// Not started by `user`.
    TriggeringUserIsNot {
        /// Member email.
        user: String,
    },
    /// Started by a member of `group`.
    TriggeringUserIsInGroup {
        /// Group name.
        group: String,
    },
    /// Started by someone outside `group`.
    TriggeringUserIsNotInGroup {
        /// Group name.
        group: String,
    },
}

/// Block attributes a discriminator cannot do without.
pub fn required_fields(condition: &str) -> &'static [&'static str] {
    match condition {
        "ON_CHANGE_AT_PATH" => &["paths"],
        "VAR_IS" | "VAR_IS_NOT" | "VAR_CONTAINS" | "VAR_NOT_CONTAINS" => {
            &["variable_key", "variable_value"]
        }
        "DATETIME" => &["hours", "days"],
        "SUCCESS_PIPELINE" => &["project_name", "pipeline_name"],
        "TRIGGERING_USER_IS" | "TRIGGERING_USER_IS_NOT" => &["trigger_user"],
        "TRIGGERING_USER_IS_IN_GROUP" | "TRIGGERING_USER_IS_NOT_IN_GROUP" => &["trigger_group"],
        _ => &[],
    }
}

impl TriggerConditionBlock {
    /// Whether the named attribute is null. Unknown counts as set.
    pub fn is_null(&self, field: &str) -> bool {
        match field {
            "paths" => self.paths.is_null(),
            "variable_key" => self.variable_key.is_null(),
            "variable_value" => self.variable_value.is_null(),
            "hours" => self.hours.is_null(),
            "days" => self.days.is_null(),
            "project_name" => self.project_name.is_null(),
            "pipeline_name" => self.pipeline_name.is_null(),
            "trigger_user" => self.trigger_user.is_null(),
            "trigger_group" => self.trigger_group.is_null(),
            _ => true,
        }
    }
}

impl TriggerCondition {
    /// Parse the `index`-th `trigger_condition` block.
    pub fn from_block(block: &TriggerConditionBlock, index: usize) -> Result<Self, ProviderError> {
        let path = format!("trigger_condition.{index}");
        let missing = |field: &str| {
            ProviderError::invalid(
                Diagnostic::error(format!(
                    "Trigger condition {} requires '{field}'",
                    block.condition.as_str()
                ))
                .with_attribute(format!("{path}.{field}")),
            )
        };
        let string =
            |value: &StringValue, field: &str| value.cloned().ok_or_else(|| missing(field));
        let ints =
            |value: &SetValue<i64>, field: &str| value.cloned().ok_or_else(|| missing(field));

        let condition = match block.condition.as_str() {
            "ON_CHANGE" => Self::OnChange,
            "ON_CHANGE_AT_PATH" => Self::OnChangeAtPath {
                paths: block.paths.cloned().ok_or_else(|| missing("paths"))?,
            },
            c @ ("VAR_IS" | "VAR_IS_NOT" | "VAR_CONTAINS" | "VAR_NOT_CONTAINS") => {
                let key = string(&block.variable_key, "variable_key")?;
                let value = string(&block.variable_value, "variable_value")?;
                match c {
                    "VAR_IS" => Self::VarIs { key, value },
                    "VAR_IS_NOT" => Self::VarIsNot { key, value },
                    "VAR_CONTAINS" => Self::VarContains { key, value },
                    _ => Self::VarNotContains { key, value },
                }
            }
            "DATETIME" => Self::DateTime {
                hours: ints(&block.hours, "hours")?,
                days: ints(&block.days, "days")?,
                zone_id: block.zone_id.cloned(),
            },
            "SUCCESS_PIPELINE" => Self::SuccessPipeline {
                project: string(&block.project_name, "project_name")?,
                pipeline: string(&block.pipeline_name, "pipeline_name")?,
            },
            "TRIGGERING_USER_IS" => Self::TriggeringUserIs {
                user: string(&block.trigger_user, "trigger_user")?,
            },
            "TRIGGERING_USER_IS_NOT" => Self::TriggeringUserIsNot {
                user: string(&block.trigger_user, "trigger_user")?,
            },
            "TRIGGERING_USER_IS_IN_GROUP" => Self::TriggeringUserIsInGroup {
                group: string(&block.trigger_group, "trigger_group")?,
            },
            "TRIGGERING_USER_IS_NOT_IN_GROUP" => Self::TriggeringUserIsNotInGroup {
                group: string(&block.trigger_group, "trigger_group")?,
            },
            other => {
                return Err(ProviderError::invalid(
                    Diagnostic::error(format!("Unsupported trigger condition '{other}'"))
                        .with_attribute(format!("{path}.condition")),
                ))
            }
        };
        Ok(condition)
    }

    /// Parse the wire form. `None` for a discriminator this provider does
    /// not model.
    pub fn from_body(body: &TriggerConditionBody) -> Option<Self> {
        let var = || (body.trigger_variable_key.clone(), body.trigger_variable_value.clone());
        let condition = match body.trigger_condition.as_str() {
            "ON_CHANGE" => Self::OnChange,
            "ON_CHANGE_AT_PATH" => Self::OnChangeAtPath {
                paths: body.trigger_condition_paths.clone(),
            },
            "VAR_IS" => {
                let (key, value) = var();
                Self::VarIs { key, value }
            }
            "VAR_IS_NOT" => {
                let (key, value) = var();
                Self::VarIsNot { key, value }
            }
            "VAR_CONTAINS" => {
                let (key, value) = var();
                Self::VarContains { key, value }
            }
            "VAR_NOT_CONTAINS" => {
                let (key, value) = var();
                Self::VarNotContains { key, value }
            }
            "DATETIME" => Self::DateTime {
                hours: body.trigger_hours.clone(),
                days: body.trigger_days.clone(),
                zone_id: Some(body.zone_id.clone()).filter(|z| !z.is_empty()),
            },
            "SUCCESS_PIPELINE" => Self::SuccessPipeline {
                project: body.trigger_project_name.clone(),
                pipeline: body.trigger_pipeline_name.clone(),
            },
            "TRIGGERING_USER_IS" => Self::TriggeringUserIs {
                user: body.trigger_user.clone(),
            },
            "TRIGGERING_USER_IS_NOT" => Self::TriggeringUserIsNot {
                user: body.trigger_user.clone(),
            },
            "TRIGGERING_USER_IS_IN_GROUP" => Self::TriggeringUserIsInGroup {
                group: body.trigger_group.clone(),
            },
            "TRIGGERING_USER_IS_NOT_IN_GROUP" => Self::TriggeringUserIsNotInGroup {
                group: body.trigger_group.clone(),
            },
            _ => return None,
        };
        Some(condition)
    }

    /// The discriminator string.
    pub fn discriminator(&self) -> &'static str {
        match self {
            Self::OnChange => "ON_CHANGE",
            Self::OnChangeAtPath { .. } => "ON_CHANGE_AT_PATH",
            Self::VarIs { .. } => "VAR_IS",
            Self::VarIsNot { .. } => "VAR_IS_NOT",
            Self::VarContains { .. } => "VAR_CONTAINS",
            Self::VarNotContains { .. } => "VAR_NOT_CONTAINS",
            Self::DateTime { .. } => "DATETIME",
            Self::SuccessPipeline { .. } => "SUCCESS_PIPELINE",
            Self::TriggeringUserIs { .. } => "TRIGGERING_USER_IS",
            Self::TriggeringUserIsNot { .. } => "TRIGGERING_USER_IS_NOT",
            Self::TriggeringUserIsInGroup { .. } => "TRIGGERING_USER_IS_IN_GROUP",
            Self::TriggeringUserIsNotInGroup { .. } => "TRIGGERING_USER_IS_NOT_IN_GROUP",
        }
    }

    /// Request body carrying only the fields of this condition.
    pub fn to_body(&self) -> TriggerConditionBody {
        let mut body = TriggerConditionBody {
            trigger_condition: self.discriminator().to_string(),
            ..Default::default()
        };
        match self {
            Self::OnChange => {}
            Self::OnChangeAtPath { paths } => body.trigger_condition_paths = paths.clone(),
            Self::VarIs { key, value }
            | Self::VarIsNot { key, value }
            | Self::VarContains { key, value }
            | Self::VarNotContains { key, value } => {
                body.trigger_variable_key = key.clone();
                body.trigger_variable_value = value.clone();
            }
            Self::DateTime { hours, days, zone_id } => {
                body.trigger_hours = hours.clone();
                body.trigger_days = days.clone();
                body.zone_id = zone_id.clone().unwrap_or_default();
            }
            Self::SuccessPipeline { project, pipeline } => {
                body.trigger_project_name = project.clone();
                body.trigger_pipeline_name = pipeline.clone();
            }
            Self::TriggeringUserIs { user } | Self::TriggeringUserIsNot { user } => {
                body.trigger_user = user.clone();
            }
            Self::TriggeringUserIsInGroup { group }
            | Self::TriggeringUserIsNotInGroup { group } => {
                body.trigger_group = group.clone();
            }
        }
        body
    }

    /// State block with only the fields of this condition set.
    pub fn to_block(&self) -> TriggerConditionBlock {
        let mut block = TriggerConditionBlock {
            condition: Value::Known(self.discriminator().to_string()),
            ..Default::default()
        };
        match self {
            Self::OnChange => {}
            Self::OnChangeAtPath { paths } => block.paths = Value::Known(paths.clone()),
            Self::VarIs { key, value }
            | Self::VarIsNot { key, value }
            | Self::VarContains { key, value }
            | Self::VarNotContains { key, value } => {
                block.variable_key = Value::Known(key.clone());
                block.variable_value = Value::Known(value.clone());
            }
            Self::DateTime { hours, days, zone_id } => {
                block.hours = Value::Known(hours.clone());
                block.days = Value::Known(days.clone());
                block.zone_id = Value::from_option(zone_id.clone());
            }
            Self::SuccessPipeline { project, pipeline } => {
                block.project_name = Value::Known(project.clone());
                block.pipeline_name = Value::Known(pipeline.clone());
            }
            Self::TriggeringUserIs { user } | Self::TriggeringUserIsNot { user } => {
                block.trigger_user = Value::Known(user.clone());
            }
            Self::TriggeringUserIsInGroup { group }
            | Self::TriggeringUserIsNotInGroup { group } => {
                block.trigger_group = Value::Known(group.clone());
            }
        }
        block
    }
}

/// Request payload for `git_config`.
pub fn git_config_to_api(block: &Value<GitConfigBlock>) -> Option<GitConfig> {
    block.get().map(|b| GitConfig {
        project: b.project.as_str().to_string(),
        branch: b.branch.as_str().to_string(),
        path: b.path.as_str().to_string(),
    })
}

/// State for `git_config`; an all-empty response means unset.
pub fn git_config_from_api(remote: Option<&GitConfig>) -> Value<GitConfigBlock> {
    match remote {
        Some(g) if !(g.project.is_empty() && g.branch.is_empty() && g.path.is_empty()) => {
            Value::Known(GitConfigBlock {
                project: StringValue::non_empty(Some(g.project.clone())),
                branch: StringValue::non_empty(Some(g.branch.clone())),
                path: StringValue::non_empty(Some(g.path.clone())),
            })
        }
        _ => Value::Null,
    }
}

/// Request payload for the `event` blocks.
pub fn events_to_api(events: &SetValue<EventBlock>) -> Option<Vec<PipelineEvent>> {
    events.get().map(|events| {
        events
            .iter()
            .map(|e| PipelineEvent {
                event_type: e.event_type.as_str().to_string(),
                refs: e.refs.cloned().unwrap_or_default(),
            })
            .collect()
    })
}

/// Fold returned events into state.
pub fn events_from_api(
    remote: &[PipelineEvent],
    prior: &SetValue<EventBlock>,
) -> SetValue<EventBlock> {
    let events = remote
        .iter()
        .map(|e| EventBlock {
            event_type: Value::Known(e.event_type.clone()),
            refs: Value::non_empty_list(Some(e.refs.clone())),
        })
        .collect();
    list_from(events, prior)
}

/// Check each `trigger_condition` block and build its request body.
pub fn trigger_conditions_to_api(
    blocks: &Value<Vec<TriggerConditionBlock>>,
) -> Result<Option<Vec<TriggerConditionBody>>, ProviderError> {
    let Some(blocks) = blocks.get() else {
        return Ok(None);
    };
    blocks
        .iter()
        .enumerate()
        .map(|(i, b)| TriggerCondition::from_block(b, i).map(|c| c.to_body()))
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

/// Fold returned conditions into state. Unrecognized discriminators keep
/// only the `condition` field.
pub fn trigger_conditions_from_api(
    remote: &[TriggerConditionBody],
    prior: &Value<Vec<TriggerConditionBlock>>,
) -> Value<Vec<TriggerConditionBlock>> {
    let blocks = remote
        .iter()
        .map(|body| match TriggerCondition::from_body(body) {
            Some(condition) => condition.to_block(),
            None => TriggerConditionBlock {
                condition: Value::Known(body.trigger_condition.clone()),
                ..Default::default()
            },
        })
        .collect();
    list_from(blocks, prior)
}

/// Request payload for `remote_parameter` blocks.
pub fn remote_parameters_to_api(
    params: &SetValue<RemoteParameterBlock>,
) -> Option<Vec<RemoteParameter>> {
    params.get().map(|params| {
        params
            .iter()
            .map(|p| RemoteParameter {
                key: p.key.as_str().to_string(),
                value: p.value.as_str().to_string(),
            })
            .collect()
    })
}

/// Fold returned remote parameters into state.
pub fn remote_parameters_from_api(
    remote: &[RemoteParameter],
    prior: &SetValue<RemoteParameterBlock>,
) -> SetValue<RemoteParameterBlock> {
    let params = remote
        .iter()
        .map(|p| RemoteParameterBlock {
            key: Value::Known(p.key.clone()),
            value: Value::Known(p.value.clone()),
        })
        .collect();
    list_from(params, prior)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn var_block(condition: &str) -> TriggerConditionBlock {
        TriggerConditionBlock {
            condition: Value::Known(condition.to_string()),
            variable_key: Value::Known("ENV".to_string()),
            variable_value: Value::Known("prod".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_only_discriminator_fields_sent() {
        let mut block = var_block("VAR_IS");
        block.trigger_user = Value::Known("ignored@example.com".to_string());
        let body = TriggerCondition::from_block(&block, 0).unwrap().to_body();
        assert_eq!(
            body,
            TriggerConditionBody {
                trigger_condition: "VAR_IS".to_string(),
                trigger_variable_key: "ENV".to_string(),
                trigger_variable_value: "prod".to_string(),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_missing_auxiliary_field_is_reported() {
        let block = TriggerConditionBlock {
            condition: Value::Known("SUCCESS_PIPELINE".to_string()),
            project_name: Value::Known("backend".to_string()),
            ..Default::default()
        };
        let err = TriggerCondition::from_block(&block, 2).unwrap_err();
        let diagnostics = err.into_diagnostics();
        assert_eq!(
            diagnostics[0].attribute.as_deref(),
            Some("trigger_condition.2.pipeline_name")
        );
    }

    #[test]
    fn test_datetime_body_to_block() {
        let body = TriggerConditionBody {
            trigger_condition: "DATETIME".to_string(),
            trigger_hours: vec![8, 20],
            trigger_days: vec![1, 2, 3],
            zone_id: "Europe/Warsaw".to_string(),
            ..Default::default()
        };
        let block = TriggerCondition::from_body(&body).unwrap().to_block();
        assert_eq!(block.hours, Value::Known(vec![8, 20]));
        assert_eq!(block.days, Value::Known(vec![1, 2, 3]));
        assert_eq!(block.zone_id.as_str(), "Europe/Warsaw");
        assert!(block.trigger_user.is_null());
    }

    #[test]
    fn test_unmodelled_condition_read_back_raw() {
        let remote = vec![TriggerConditionBody {
            trigger_condition: "SOMETHING_NEW".to_string(),
            ..Default::default()
        }];
        let read = trigger_conditions_from_api(&remote, &Value::Null);
        let read = read.get().unwrap();
        assert_eq!(read[0].condition.as_str(), "SOMETHING_NEW");
    }

    #[test]
    fn test_required_fields_table() {
        assert_eq!(required_fields("ON_CHANGE"), &[] as &[&str]);
        assert_eq!(required_fields("TRIGGERING_USER_IS_IN_GROUP"), &["trigger_group"]);
        let block = var_block("VAR_CONTAINS");
        assert!(required_fields("VAR_CONTAINS").iter().all(|f| !block.is_null(f)));
    }

    #[test]
    fn test_git_config_empty_reads_null() {
        assert!(git_config_from_api(Some(&GitConfig::default())).is_null());
        let read = git_config_from_api(Some(&GitConfig {
            project: "infra".to_string(),
            branch: "main".to_string(),
            path: "pipelines/build.yml".to_string(),
        }));
        assert_eq!(read.get().unwrap().branch.as_str(), "main");
    }

    #[test]
    fn test_events_round() {
        let events = Value::Known(vec![EventBlock {
            event_type: Value::Known("PUSH".to_string()),
            refs: Value::Known(vec!["refs/heads/main".to_string()]),
        }]);
        let api = events_to_api(&events).unwrap();
        assert_eq!(api[0].event_type, "PUSH");
        assert_eq!(events_from_api(&api, &events), events);
    }
}

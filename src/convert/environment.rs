//! Environment variables and allowed pipelines.

use serde::{Deserialize, Serialize};

use crate::client::{EnvironmentVariable, IdRef};
use crate::schema::{Attribute, Block, NestedBlock, Validator};
use crate::value::{SetValue, StringValue, Value, BoolValue};

use super::collections::list_from;

/// One `variable` block of an environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariableBlock {
    /// Variable name.
    pub key: StringValue,
    /// Variable value.
    pub value: StringValue,
    /// Whether the value is stored encrypted.
    pub encrypted: BoolValue,
    /// Free-form description.
    pub description: StringValue,
    /// Whether runs may override the value.
    pub settable: BoolValue,
}

/// Schema of the `variable` set block.
pub fn variable_block() -> NestedBlock {
    NestedBlock::set(
        Block::new()
            .with_description("Variable scoped to the environment")
            .with_attribute(
                "key",
                Attribute::required_string().with_validator(Validator::not_empty()),
            )
            .with_attribute("value", Attribute::required_string().sensitive())
            .with_attribute("encrypted", Attribute::optional_bool())
            .with_attribute("description", Attribute::optional_string())
            .with_attribute("settable", Attribute::optional_bool()),
    )
}

/// Request payload for the configured variables. Unset flags are sent as `false`.
pub fn variables_to_api(vars: &SetValue<VariableBlock>) -> Option<Vec<EnvironmentVariable>> {
    vars.get().map(|vars| {
        vars.iter()
            .map(|v| EnvironmentVariable {
                key: v.key.as_str().to_string(),
                value: v.value.as_str().to_string(),
                encrypted: v.encrypted.cloned().unwrap_or(false),
                description: v.description.as_str().to_string(),
                settable: v.settable.cloned().unwrap_or(false),
            })
            .collect()
    })
}

/// Fold Service variables into state. Encrypted values come back as
/// ciphertext, so the plaintext of the prior entry with the same key is
/// kept.
pub fn variables_from_api(
    remote: &[EnvironmentVariable],
    prior: &SetValue<VariableBlock>,
) -> SetValue<VariableBlock> {
    let prior_entries = prior.get().map(Vec::as_slice).unwrap_or_default();
    let vars = remote
        .iter()
        .map(|v| {
            let previous = prior_entries.iter().find(|p| p.key.as_str() == v.key);
            let value = match previous {
                Some(p) if v.encrypted => p.value.clone(),
                _ => Value::Known(v.value.clone()),
            };
            // Optional flags stay null unless configured or set remotely.
            let flag = |remote: bool, prior: Option<&BoolValue>| match prior {
                Some(Value::Known(_)) => Value::Known(remote),
                _ if remote => Value::Known(true),
                _ => Value::Null,
            };
            VariableBlock {
                key: Value::Known(v.key.clone()),
                value,
                encrypted: flag(v.encrypted, previous.map(|p| &p.encrypted)),
                description: StringValue::non_empty(Some(v.description.clone())),
                settable: flag(v.settable, previous.map(|p| &p.settable)),
            }
        })
        .collect();
    list_from(vars, prior)
}

/// Pipeline references for `allowed_pipelines`.
pub fn allowed_pipelines_to_api(ids: &SetValue<i64>) -> Option<Vec<IdRef>> {
    ids.get()
        .map(|ids| ids.iter().map(|&id| IdRef { id }).collect())
}

/// Fold the allowed pipeline IDs into state.
pub fn allowed_pipelines_from_api(remote: &[IdRef], prior: &SetValue<i64>) -> SetValue<i64> {
    list_from(remote.iter().map(|r| r.id).collect(), prior)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(key: &str, value: &str, encrypted: bool) -> VariableBlock {
        VariableBlock {
            key: Value::Known(key.to_string()),
            value: Value::Known(value.to_string()),
            encrypted: Value::Known(encrypted),
            description: Value::Null,
            settable: Value::Null,
        }
    }

    #[test]
    fn test_encrypted_value_preserved() {
        let prior = Value::Known(vec![
            var("API_KEY", "plaintext", true),
            var("REGION", "eu", false),
        ]);
        let remote = vec![
            EnvironmentVariable {
                key: "API_KEY".to_string(),
                value: "secure!abc==".to_string(),
                encrypted: true,
                ..Default::default()
            },
            EnvironmentVariable {
                key: "REGION".to_string(),
                value: "us".to_string(),
                ..Default::default()
            },
        ];
        let read = variables_from_api(&remote, &prior);
        let read = read.get().unwrap();
        assert_eq!(read[0].value.as_str(), "plaintext");
        assert_eq!(read[1].value.as_str(), "us");
        assert_eq!(read[1].encrypted, Value::Known(false));
        assert!(read[1].settable.is_null());
    }

    #[test]
    fn test_allowed_pipelines() {
        let ids = Value::Known(vec![3, 1]);
        let api = allowed_pipelines_to_api(&ids).unwrap();
        assert_eq!(api, vec![IdRef { id: 3 }, IdRef { id: 1 }]);
        let back = allowed_pipelines_from_api(&[IdRef { id: 1 }, IdRef { id: 3 }], &ids);
        assert_eq!(back, ids);
        assert!(allowed_pipelines_from_api(&[], &Value::Null).is_null());
    }
}

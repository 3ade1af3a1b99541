//! The `permissions` block shared by pipelines, environments and targets.

use serde::{Deserialize, Serialize};

use crate::client::{AccessEntry, ResourcePermissions};
use crate::error::ProviderError;
use crate::schema::{Attribute, Block, Diagnostic, NestedBlock};
use crate::value::{Int64Value, SetValue, StringValue, Value};

/// Access levels for pipeline permissions.
pub const PIPELINE_ACCESS_LEVELS: &[&str] =
    &["DEFAULT", "DENIED", "READ_ONLY", "RUN_ONLY", "READ_WRITE"];

/// Access levels for environment and target permissions.
pub const USE_ACCESS_LEVELS: &[&str] = &["DEFAULT", "DENIED", "READ_ONLY", "USE_ONLY", "MANAGE"];

/// Typed form of the block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionsBlock {
    /// Access for everyone not listed.
    pub others: StringValue,
    /// Per-user access.
    pub user: SetValue<AccessBlock>,
    /// Per-group access.
    pub group: SetValue<AccessBlock>,
}

/// One `user` or `group` entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessBlock {
    /// Member or group ID.
    pub id: Int64Value,
    /// Access level granted.
    pub access_level: StringValue,
}

/// Schema of the block for the given access levels.
pub fn permissions_block(levels: &[&str]) -> NestedBlock {
    let entry = || {
        NestedBlock::set(
            Block::new()
                .with_attribute("id", Attribute::required_int64())
                .with_attribute("access_level", Attribute::required_string().one_of(levels)),
        )
    };
    NestedBlock::single(
        Block::new()
            .with_description("Access overrides; omit to inherit workspace defaults")
            .with_attribute("others", Attribute::required_string().one_of(levels))
            .with_block("user", entry())
            .with_block("group", entry()),
    )
    .with_max_items(1)
}

/// Build the request payload. `None` when the block is not configured.
pub fn to_api(
    block: &Value<PermissionsBlock>,
) -> Result<Option<ResourcePermissions>, ProviderError> {
    let Some(block) = block.get() else {
        return Ok(None);
    };
    Ok(Some(ResourcePermissions {
        others: block.others.as_str().to_string(),
        users: entries_to_api(&block.user, "permissions.user")?,
        groups: entries_to_api(&block.group, "permissions.group")?,
    }))
}

fn entries_to_api(
    entries: &SetValue<AccessBlock>,
    path: &str,
) -> Result<Vec<AccessEntry>, ProviderError> {
    let Some(entries) = entries.get() else {
        return Ok(Vec::new());
    };
    entries
        .iter()
        .map(|e| match (e.id.get(), e.access_level.get()) {
            (Some(id), Some(level)) => Ok(AccessEntry {
                id: *id,
                access_level: level.clone(),
            }),
            _ => Err(ProviderError::invalid(
                Diagnostic::error("Access entry needs both 'id' and 'access_level'")
                    .with_attribute(path),
            )),
        })
        .collect()
}

/// Fold the Service permissions into state.
///
/// Permissions are only tracked when configured; an unconfigured block
/// stays null whatever workspace defaults the Service reports.
pub fn from_api(
    remote: Option<&ResourcePermissions>,
    prior: &Value<PermissionsBlock>,
) -> Value<PermissionsBlock> {
    let Value::Known(prior) = prior else {
        return Value::Null;
    };
    let Some(remote) = remote else {
        return Value::Null;
    };
    Value::Known(PermissionsBlock {
        others: StringValue::non_empty(Some(remote.others.clone())),
        user: entries_from_api(&remote.users, &prior.user),
        group: entries_from_api(&remote.groups, &prior.group),
    })
}

fn entries_from_api(
    remote: &[AccessEntry],
    prior: &SetValue<AccessBlock>,
) -> SetValue<AccessBlock> {
    let entries = remote
        .iter()
        .map(|e| AccessBlock {
            id: Value::Known(e.id),
            access_level: Value::Known(e.access_level.clone()),
        })
        .collect();
    super::collections::list_from(entries, prior)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: i64, level: &str) -> AccessBlock {
        AccessBlock {
            id: Value::Known(id),
            access_level: Value::Known(level.to_string()),
        }
    }

    #[test]
    fn test_to_api() {
        let block = Value::Known(PermissionsBlock {
            others: Value::Known("DENIED".to_string()),
            user: Value::Known(vec![entry(7, "READ_WRITE")]),
            group: Value::Null,
        });
        let api = to_api(&block).unwrap().unwrap();
        assert_eq!(api.others, "DENIED");
        assert_eq!(api.users, vec![AccessEntry { id: 7, access_level: "READ_WRITE".to_string() }]);
        assert!(api.groups.is_empty());

        assert!(to_api(&Value::Null).unwrap().is_none());
    }

    #[test]
    fn test_to_api_rejects_incomplete_entry() {
        let block = Value::Known(PermissionsBlock {
            others: Value::Known("DEFAULT".to_string()),
            user: Value::Null,
            group: Value::Known(vec![AccessBlock {
                id: Value::Known(3),
                access_level: Value::Null,
            }]),
        });
        let err = to_api(&block).unwrap_err();
        assert_eq!(err.into_diagnostics()[0].attribute.as_deref(), Some("permissions.group"));
    }

    #[test]
    fn test_from_api_untracked_when_unconfigured() {
        let remote = ResourcePermissions {
            others: "DEFAULT".to_string(),
            ..Default::default()
        };
        assert!(from_api(Some(&remote), &Value::Null).is_null());
    }

    #[test]
    fn test_from_api_reads_drift() {
        let prior = Value::Known(PermissionsBlock {
            others: Value::Known("DENIED".to_string()),
            user: Value::Known(vec![entry(7, "READ_WRITE")]),
            group: Value::Null,
        });
        let remote = ResourcePermissions {
            others: "READ_ONLY".to_string(),
            users: vec![AccessEntry { id: 7, access_level: "READ_ONLY".to_string() }],
            groups: Vec::new(),
        };
        let read = from_api(Some(&remote), &prior);
        let read = read.get().unwrap();
        assert_eq!(read.others.as_str(), "READ_ONLY");
        assert_eq!(read.user, Value::Known(vec![entry(7, "READ_ONLY")]));
        assert!(read.group.is_null());
    }
}

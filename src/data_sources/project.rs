//! `buddy_project` data source: a project looked up by workspace and name.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::Project;
use crate::convert::{required, timestamp};
use crate::error::{ApiResultExt, ProviderError};
use crate::identity::compose_double;
use crate::resources::Context;
use crate::schema::{Attribute, Schema};
use crate::value::{BoolValue, StringValue, Value};

use super::{domain_argument, DataSource};

/// Looks up a project by workspace domain and URL handle.
pub struct ProjectDataSource;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectLookup {
    pub id: StringValue,
    pub domain: StringValue,
    pub name: StringValue,
    pub display_name: StringValue,
    pub status: StringValue,
    pub access: StringValue,
    pub default_branch: StringValue,
    pub without_repository: BoolValue,
    pub create_date: StringValue,
    pub html_url: StringValue,
}

impl ProjectLookup {
    fn apply(&mut self, domain: &str, p: &Project) {
        self.id = Value::Known(compose_double(domain, &p.name));
        self.display_name = Value::Known(p.display_name.clone());
        self.status = Value::Known(p.status.clone());
        self.access = Value::Known(p.access.clone());
        self.default_branch = StringValue::non_empty(Some(p.default_branch.clone()));
        self.without_repository = Value::Known(p.without_repository);
        self.create_date = timestamp(&p.create_date);
        self.html_url = Value::Known(p.html_url.clone());
    }
}

#[async_trait]
impl DataSource for ProjectDataSource {
    type State = ProjectLookup;

    fn name(&self) -> &'static str {
        "buddy_project"
    }

    fn schema(&self) -> Schema {
        Schema::resource("Look up a project by name")
            .with_attribute("domain", domain_argument())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("display_name", Attribute::computed_string())
            .with_attribute("status", Attribute::computed_string())
            .with_attribute("access", Attribute::computed_string())
            .with_attribute("default_branch", Attribute::computed_string())
            .with_attribute("without_repository", Attribute::computed_bool())
            .with_attribute("create_date", Attribute::computed_string())
            .with_attribute("html_url", Attribute::computed_string())
    }

    async fn read(
        &self,
        ctx: &Context,
        config: ProjectLookup,
    ) -> Result<ProjectLookup, ProviderError> {
        let domain = required(&config.domain, "domain")?.clone();
        let name = required(&config.name, "name")?;
        let project = ctx
            .client
            .get_project(&domain, name)
            .await
            .or_api_err("read project")?;
        let mut state = config;
        state.apply(&domain, &project);
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_keeps_lookup_keys() {
        let mut state = ProjectLookup {
            domain: Value::Known("acme".to_string()),
            name: Value::Known("web".to_string()),
            ..Default::default()
        };
        state.apply(
            "acme",
            &Project {
                name: "web".to_string(),
                display_name: "Web".to_string(),
                status: "ACTIVE".to_string(),
                ..Default::default()
            },
        );
        assert_eq!(state.id.as_str(), "acme:web");
        assert_eq!(state.display_name.as_str(), "Web");
        assert!(state.default_branch.is_null());
        assert!(state.create_date.is_null());
    }
}

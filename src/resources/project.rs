//! `buddy_project`, ID `<domain>:<project_name>`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::client::{HashIdRef, Project, ProjectOps};
use crate::convert::{required, timestamp};
use crate::error::{ApiResultExt, ProviderError};
use crate::identity::{compose_double, decompose_double};
use crate::schema::{Attribute, Schema, Validator};
use crate::value::{BoolValue, Int64Value, StringValue, Value};

use super::workspace::domain_attribute;
use super::{imported, Context, Resource};

/// Projects, addressed by workspace domain and URL handle.
pub struct ProjectResource;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectState {
    pub id: StringValue,
    pub domain: StringValue,
    pub display_name: StringValue,
    pub name: StringValue,
    pub integration_id: StringValue,
    pub external_project_id: StringValue,
    pub git_lab_project_id: StringValue,
    pub custom_repo_url: StringValue,
    pub custom_repo_ssh_key_id: Int64Value,
    pub custom_repo_user: StringValue,
    pub custom_repo_pass: StringValue,
    pub access: StringValue,
    pub allow_pull_requests: BoolValue,
    pub fetch_submodules: BoolValue,
    pub fetch_submodules_env_key: StringValue,
    pub update_default_branch_from_external: BoolValue,
    pub without_repository: BoolValue,
    pub html_url: StringValue,
    pub status: StringValue,
    pub create_date: StringValue,
    pub default_branch: StringValue,
}

impl ProjectState {
    fn to_ops(&self) -> ProjectOps {
        ProjectOps {
            name: self.name.cloned(),
            display_name: self.display_name.cloned(),
            integration: self
                .integration_id
                .cloned()
                .map(|hash_id| HashIdRef { hash_id }),
            external_project_id: self.external_project_id.cloned(),
            git_lab_project_id: self.git_lab_project_id.cloned(),
            custom_repo_url: self.custom_repo_url.cloned(),
            custom_repo_user: self.custom_repo_user.cloned(),
            custom_repo_pass: self.custom_repo_pass.cloned(),
            custom_repo_ssh_key_id: self.custom_repo_ssh_key_id.cloned(),
            access: self.access.cloned(),
            allow_pull_requests: self.allow_pull_requests.cloned(),
            fetch_submodules: self.fetch_submodules.cloned(),
            fetch_submodules_env_key: self.fetch_submodules_env_key.cloned(),
            update_default_branch_from_external: self.update_default_branch_from_external.cloned(),
            without_repository: self.without_repository.cloned(),
        }
    }

    fn apply(&mut self, domain: &str, p: &Project) {
        self.id = Value::Known(compose_double(domain, &p.name));
        self.domain = Value::Known(domain.to_string());
        self.name = Value::Known(p.name.clone());
        self.display_name = Value::Known(p.display_name.clone());
        self.integration_id =
            StringValue::non_empty(p.integration.as_ref().map(|i| i.hash_id.clone()));
        self.external_project_id = StringValue::non_empty(Some(p.external_project_id.clone()));
        self.git_lab_project_id = StringValue::non_empty(Some(p.git_lab_project_id.clone()));
        self.custom_repo_url = StringValue::non_empty(Some(p.custom_repo_url.clone()));
        self.custom_repo_user = StringValue::non_empty(Some(p.custom_repo_user.clone()));
        self.custom_repo_ssh_key_id = Value::from_option(p.custom_repo_ssh_key_id);
        self.access = Value::Known(p.access.clone());
        self.allow_pull_requests = Value::Known(p.allow_pull_requests);
        self.fetch_submodules = Value::Known(p.fetch_submodules);
        self.fetch_submodules_env_key = Value::Known(p.fetch_submodules_env_key.clone());
        self.update_default_branch_from_external =
            Value::Known(p.update_default_branch_from_external);
        self.without_repository = Value::Known(p.without_repository);
        self.html_url = Value::Known(p.html_url.clone());
        self.status = Value::Known(p.status.clone());
        self.create_date = timestamp(&p.create_date);
        self.default_branch = StringValue::non_empty(Some(p.default_branch.clone()));
    }
}

#[async_trait]
impl Resource for ProjectResource {
    type State = ProjectState;

    fn name(&self) -> &'static str {
        "buddy_project"
    }

    fn schema(&self) -> Schema {
        Schema::resource("A project in a Buddy workspace")
            .with_attribute("domain", domain_attribute())
            .with_attribute("display_name", Attribute::required_string())
            .with_attribute(
                "name",
                Attribute::optional_computed_string()
                    .use_state_for_unknown()
                    .with_description("URL handle; derived from display_name when omitted"),
            )
            .with_attribute(
                "integration_id",
                Attribute::optional_string()
                    .requires_replace()
                    .with_validator(Validator::also_requires(&["external_project_id"]))
                    .with_validator(Validator::conflicts_with(&["custom_repo_url"])),
            )
            .with_attribute(
                "external_project_id",
                Attribute::optional_string()
                    .requires_replace()
                    .with_validator(Validator::also_requires(&["integration_id"])),
            )
            .with_attribute(
                "git_lab_project_id",
                Attribute::optional_string()
                    .requires_replace()
                    .with_validator(Validator::also_requires(&[
                        "integration_id",
                        "external_project_id",
                    ])),
            )
            .with_attribute(
                "custom_repo_url",
                Attribute::optional_string()
                    .requires_replace()
                    .with_validator(Validator::conflicts_with(&["integration_id"])),
            )
            .with_attribute(
                "custom_repo_ssh_key_id",
                Attribute::optional_int64()
                    .with_validator(Validator::also_requires(&["custom_repo_url"]))
                    .with_validator(Validator::conflicts_with(&["custom_repo_user"])),
            )
            .with_attribute(
                "custom_repo_user",
                Attribute::optional_string().with_validator(Validator::also_requires(&[
                    "custom_repo_url",
                    "custom_repo_pass",
                ])),
            )
            .with_attribute("custom_repo_pass", Attribute::optional_string().sensitive())
            .with_attribute(
                "access",
                Attribute::optional_computed_string().one_of(&["PRIVATE", "PUBLIC"]),
            )
            .with_attribute("allow_pull_requests", Attribute::optional_computed_bool())
            .with_attribute("fetch_submodules", Attribute::optional_computed_bool())
            .with_attribute("fetch_submodules_env_key", Attribute::optional_computed_string())
            .with_attribute(
                "update_default_branch_from_external",
                Attribute::optional_computed_bool(),
            )
            .with_attribute(
                "without_repository",
                Attribute::optional_computed_bool().requires_replace_if_configured(),
            )
            .with_attribute("html_url", Attribute::computed_string().use_state_for_unknown())
            .with_attribute("status", Attribute::computed_string())
            .with_attribute("create_date", Attribute::computed_string().use_state_for_unknown())
            .with_attribute("default_branch", Attribute::computed_string())
    }

    async fn create(
        &self,
        ctx: &Context,
        planned: ProjectState,
    ) -> Result<ProjectState, ProviderError> {
        let domain = required(&planned.domain, "domain")?.clone();
        let project = ctx
            .client
            .create_project(&domain, &planned.to_ops())
            .await
            .or_api_err("create project")?;
        info!(domain = %domain, project = %project.name, "Created project");

        let mut state = planned;
        state.apply(&domain, &project);
        Ok(state)
    }

    async fn read(
        &self,
        ctx: &Context,
        current: ProjectState,
    ) -> Result<Option<ProjectState>, ProviderError> {
        let (domain, name) = decompose_double(required(&current.id, "id")?)?;
        let Some(project) = ctx
            .client
            .get_project(&domain, &name)
            .await
            .found("read project")?
        else {
            warn!(
                domain = %domain,
                project = %name,
                "Project no longer exists, removing from state"
            );
            return Ok(None);
        };
        let mut state = current;
        state.apply(&domain, &project);
        Ok(Some(state))
    }

    async fn update(
        &self,
        ctx: &Context,
        prior: ProjectState,
        planned: ProjectState,
    ) -> Result<ProjectState, ProviderError> {
        let (domain, name) = decompose_double(required(&prior.id, "id")?)?;
        let project = ctx
            .client
            .update_project(&domain, &name, &planned.to_ops())
            .await
            .or_api_err("update project")?;

        let mut state = planned;
        state.apply(&domain, &project);
        Ok(state)
    }

    async fn delete(&self, ctx: &Context, current: ProjectState) -> Result<(), ProviderError> {
        let (domain, name) = decompose_double(required(&current.id, "id")?)?;
        ctx.client
            .delete_project(&domain, &name)
            .await
            .ignore_not_found("delete project")?;
        info!(domain = %domain, project = %name, "Deleted project");
        Ok(())
    }

    async fn import(&self, ctx: &Context, id: &str) -> Result<ProjectState, ProviderError> {
        decompose_double(id)?;
        let state = ProjectState {
            id: Value::Known(id.to_string()),
            ..Default::default()
        };
        imported(id, self.read(ctx, state).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate;
    use serde_json::json;

    fn summaries(config: serde_json::Value) -> Vec<String> {
        validate(&ProjectResource.schema(), &config)
            .into_iter()
            .map(|d| d.summary)
            .collect()
    }

    #[test]
    fn test_integration_conflicts_with_custom_repo() {
        let errors = summaries(json!({
            "domain": "acme",
            "display_name": "Backend",
            "integration_id": "abc",
            "external_project_id": "acme/backend",
            "custom_repo_url": "https://git.example.com/backend.git"
        }));
        assert!(errors
            .iter()
            .any(|e| e.contains("integration_id") && e.contains("custom_repo_url")));
    }

    #[test]
    fn test_custom_repo_user_needs_password() {
        let errors = summaries(json!({
            "domain": "acme",
            "display_name": "Backend",
            "custom_repo_url": "https://git.example.com/backend.git",
            "custom_repo_user": "ci"
        }));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("custom_repo_pass"));
    }

    #[test]
    fn test_apply_preserves_password() {
        let mut state = ProjectState {
            custom_repo_pass: Value::Known("hunter2".to_string()),
            ..Default::default()
        };
        state.apply(
            "acme",
            &Project {
                name: "backend".to_string(),
                display_name: "Backend".to_string(),
                custom_repo_url: "https://git.example.com/backend.git".to_string(),
                custom_repo_user: "ci".to_string(),
                access: "PRIVATE".to_string(),
                ..Default::default()
            },
        );
        assert_eq!(state.id.as_str(), "acme:backend");
        assert_eq!(state.custom_repo_pass.as_str(), "hunter2");
        assert!(state.integration_id.is_null());
        assert!(state.external_project_id.is_null());
    }

    #[test]
    fn test_ops_forward_only_present_values() {
        let state = ProjectState {
            display_name: Value::Known("Backend".to_string()),
            name: Value::Unknown,
            ..Default::default()
        };
        let body = serde_json::to_value(state.to_ops()).unwrap();
        assert_eq!(body, json!({"display_name": "Backend"}));
    }
}

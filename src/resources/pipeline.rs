//! `buddy_pipeline`.
//!
//! Events, trigger conditions and remote parameters are nested blocks
//! converted in [`crate::convert::pipeline`]. ID
//! `<domain>:<project_name>:<pipeline_id>`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::client::{Pipeline, PipelineOps};
use crate::convert::collections::list_from;
use crate::convert::permissions::{self, PermissionsBlock, PIPELINE_ACCESS_LEVELS};
use crate::convert::pipeline::{
    event_block, events_from_api, events_to_api, git_config_block, git_config_from_api,
    git_config_to_api, remote_parameter_block, remote_parameters_from_api,
    remote_parameters_to_api, required_fields, trigger_condition_block,
    trigger_conditions_from_api, trigger_conditions_to_api, EventBlock, GitConfigBlock,
    RemoteParameterBlock, TriggerConditionBlock,
};
use crate::convert::{required, timestamp};
use crate::error::{ApiResultExt, ProviderError};
use crate::identity::{compose_triple, decompose_triple, parse_component};
use crate::schema::{Attribute, AttributeFlags, Diagnostic, Schema, Validator};
use crate::value::{BoolValue, Int64Value, ListValue, SetValue, StringValue, Value};

use super::workspace::domain_attribute;
use super::{imported, Context, Resource};

/// Pipelines of a project.
pub struct PipelineResource;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineState {
    pub id: StringValue,
    pub domain: StringValue,
    pub project_name: StringValue,
    pub name: StringValue,
    pub identifier: StringValue,
    pub on: StringValue,
    pub refs: SetValue<String>,
    pub event: SetValue<EventBlock>,
    pub trigger_condition: ListValue<TriggerConditionBlock>,
    pub priority: StringValue,
    pub cpu: StringValue,
    pub git_config_ref: StringValue,
    pub git_config: Value<GitConfigBlock>,
    pub definition_source: StringValue,
    pub remote_project_name: StringValue,
    pub remote_branch: StringValue,
    pub remote_path: StringValue,
    pub remote_parameter: SetValue<RemoteParameterBlock>,
    pub permissions: Value<PermissionsBlock>,
    pub git_changeset_base: StringValue,
    pub filesystem_changeset_base: StringValue,
    pub clone_depth: Int64Value,
    pub paused: BoolValue,
    pub disabled: BoolValue,
    pub disabling_reason: StringValue,
    pub always_from_scratch: BoolValue,
    pub fail_on_prepare_env_warning: BoolValue,
    pub fetch_all_refs: BoolValue,
    pub auto_clear_cache: BoolValue,
    pub no_skip_to_most_recent: BoolValue,
    pub do_not_create_commit_status: BoolValue,
    pub ignore_fail_on_project_status: BoolValue,
    pub concurrent_pipeline_runs: BoolValue,
    pub description_required: BoolValue,
    pub execution_message_template: StringValue,
    pub target_site_url: StringValue,
    pub cron: StringValue,
    pub delay: Int64Value,
    pub start_date: StringValue,
    pub pause_on_repeated_failures: Int64Value,
    pub tags: SetValue<String>,
    pub worker: StringValue,
    pub manage_permissions_by_yaml: BoolValue,
    pub manage_variables_by_yaml: BoolValue,
    pub pipeline_id: Int64Value,
    pub html_url: StringValue,
    pub last_execution_status: StringValue,
    pub last_execution_revision: StringValue,
    pub create_date: StringValue,
    pub creator_member_id: Int64Value,
}

impl PipelineState {
    fn to_ops(&self) -> Result<PipelineOps, ProviderError> {
        Ok(PipelineOps {
            name: self.name.cloned(),
            identifier: self.identifier.cloned(),
            on: self.on.cloned(),
            refs: self.refs.cloned(),
            events: events_to_api(&self.event),
            trigger_conditions: trigger_conditions_to_api(&self.trigger_condition)?,
            priority: self.priority.cloned(),
            cpu: self.cpu.cloned(),
            git_config_ref: self.git_config_ref.cloned(),
            git_config: git_config_to_api(&self.git_config),
            definition_source: self.definition_source.cloned(),
            remote_project_name: self.remote_project_name.cloned(),
            remote_branch: self.remote_branch.cloned(),
            remote_path: self.remote_path.cloned(),
            remote_parameters: remote_parameters_to_api(&self.remote_parameter),
            permissions: permissions::to_api(&self.permissions)?,
            git_changeset_base: self.git_changeset_base.cloned(),
            filesystem_changeset_base: self.filesystem_changeset_base.cloned(),
            clone_depth: self.clone_depth.cloned(),
            paused: self.paused.cloned(),
            disabled: self.disabled.cloned(),
            disabling_reason: self.disabling_reason.cloned(),
            always_from_scratch: self.always_from_scratch.cloned(),
            fail_on_prepare_env_warning: self.fail_on_prepare_env_warning.cloned(),
            fetch_all_refs: self.fetch_all_refs.cloned(),
            auto_clear_cache: self.auto_clear_cache.cloned(),
            no_skip_to_most_recent: self.no_skip_to_most_recent.cloned(),
            do_not_create_commit_status: self.do_not_create_commit_status.cloned(),
            ignore_fail_on_project_status: self.ignore_fail_on_project_status.cloned(),
            concurrent_pipeline_runs: self.concurrent_pipeline_runs.cloned(),
            description_required: self.description_required.cloned(),
            execution_message_template: self.execution_message_template.cloned(),
            target_site_url: self.target_site_url.cloned(),
            cron: self.cron.cloned(),
            delay: self.delay.cloned(),
            start_date: self.start_date.cloned(),
            pause_on_repeated_failures: self.pause_on_repeated_failures.cloned(),
            tags: self.tags.cloned(),
            worker: self.worker.cloned(),
            manage_permissions_by_yaml: self.manage_permissions_by_yaml.cloned(),
            manage_variables_by_yaml: self.manage_variables_by_yaml.cloned(),
        })
    }

    fn apply(&mut self, domain: &str, project: &str, p: &Pipeline) {
        self.id = Value::Known(compose_triple(domain, project, p.id));
        self.domain = Value::Known(domain.to_string());
        self.project_name = Value::Known(project.to_string());
        self.pipeline_id = Value::Known(p.id);
        self.name = Value::Known(p.name.clone());
        self.identifier = Value::Known(p.identifier.clone());
        self.on = Value::Known(p.on.clone());
        self.refs = list_from(p.refs.clone(), &self.refs);
        self.event = events_from_api(&p.events, &self.event);
        self.trigger_condition =
            trigger_conditions_from_api(&p.trigger_conditions, &self.trigger_condition);
        self.priority = Value::Known(p.priority.clone());
        self.cpu = Value::Known(p.cpu.clone());
        self.git_config_ref = Value::Known(p.git_config_ref.clone());
        self.git_config = git_config_from_api(p.git_config.as_ref());
        self.definition_source = Value::Known(p.definition_source.clone());
        self.remote_project_name = StringValue::non_empty(Some(p.remote_project_name.clone()));
        self.remote_branch = StringValue::non_empty(Some(p.remote_branch.clone()));
        self.remote_path = StringValue::non_empty(Some(p.remote_path.clone()));
        self.remote_parameter =
            remote_parameters_from_api(&p.remote_parameters, &self.remote_parameter);
        self.permissions = permissions::from_api(p.permissions.as_ref(), &self.permissions);
        self.git_changeset_base = Value::Known(p.git_changeset_base.clone());
        self.filesystem_changeset_base = Value::Known(p.filesystem_changeset_base.clone());
        self.clone_depth = Value::Known(p.clone_depth);
        self.paused = Value::Known(p.paused);
        self.disabled = Value::Known(p.disabled);
        self.disabling_reason = StringValue::non_empty(Some(p.disabling_reason.clone()));
        self.always_from_scratch = Value::Known(p.always_from_scratch);
        self.fail_on_prepare_env_warning = Value::Known(p.fail_on_prepare_env_warning);
        self.fetch_all_refs = Value::Known(p.fetch_all_refs);
        self.auto_clear_cache = Value::Known(p.auto_clear_cache);
        self.no_skip_to_most_recent = Value::Known(p.no_skip_to_most_recent);
        self.do_not_create_commit_status = Value::Known(p.do_not_create_commit_status);
        self.ignore_fail_on_project_status = Value::Known(p.ignore_fail_on_project_status);
        self.concurrent_pipeline_runs = Value::Known(p.concurrent_pipeline_runs);
        self.description_required = Value::Known(p.description_required);
        self.execution_message_template = Value::Known(p.execution_message_template.clone());
        self.target_site_url = StringValue::non_empty(Some(p.target_site_url.clone()));
        self.cron = StringValue::non_empty(Some(p.cron.clone()));
        self.delay = Value::from_option(p.delay);
        self.start_date = StringValue::non_empty(Some(p.start_date.clone()));
        self.pause_on_repeated_failures = Value::Known(p.pause_on_repeated_failures);
        self.tags = list_from(p.tags.clone(), &self.tags);
        self.worker = StringValue::non_empty(Some(p.worker.clone()));
        self.manage_permissions_by_yaml = Value::Known(p.manage_permissions_by_yaml);
        self.manage_variables_by_yaml = Value::Known(p.manage_variables_by_yaml);
        self.html_url = Value::Known(p.html_url.clone());
        self.last_execution_status = StringValue::non_empty(Some(p.last_execution_status.clone()));
        self.last_execution_revision =
            StringValue::non_empty(Some(p.last_execution_revision.clone()));
        self.create_date = timestamp(&p.create_date);
        self.creator_member_id = Value::from_option(p.creator.map(|c| c.id));
    }
}

fn keys(id: &StringValue) -> Result<(String, String, i64), ProviderError> {
    let raw = required(id, "id")?;
    let (domain, project, pipeline) = decompose_triple(raw)?;
    Ok((domain, project, parse_component(raw, &pipeline)?))
}

#[async_trait]
impl Resource for PipelineResource {
    type State = PipelineState;

    fn name(&self) -> &'static str {
        "buddy_pipeline"
    }

    fn schema(&self) -> Schema {
        let bool_setting = Attribute::optional_computed_bool;
        Schema::resource("A pipeline in a Buddy project")
            .with_attribute("domain", domain_attribute())
            .with_attribute("project_name", Attribute::required_string().requires_replace())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("identifier", Attribute::optional_computed_string())
            .with_attribute(
                "on",
                Attribute::optional_computed_string().one_of(&["CLICK", "EVENT", "SCHEDULE"]),
            )
            .with_attribute(
                "refs",
                Attribute::string_set(AttributeFlags::optional())
                    .with_validator(Validator::conflicts_with(&["event"])),
            )
            .with_block("event", event_block())
            .with_block("trigger_condition", trigger_condition_block())
            .with_attribute(
                "priority",
                Attribute::optional_computed_string().one_of(&["LOW", "NORMAL", "HIGH"]),
            )
            .with_attribute("cpu", Attribute::optional_computed_string().one_of(&["X64", "ARM"]))
            .with_attribute(
                "git_config_ref",
                Attribute::optional_computed_string().one_of(&["NONE", "FIXED", "DYNAMIC"]),
            )
            .with_block("git_config", git_config_block())
            .with_attribute(
                "definition_source",
                Attribute::optional_computed_string().one_of(&["LOCAL", "REMOTE"]),
            )
            .with_attribute(
                "remote_project_name",
                Attribute::optional_string()
                    .with_validator(Validator::also_requires(&["definition_source"])),
            )
            .with_attribute(
                "remote_branch",
                Attribute::optional_string()
                    .with_validator(Validator::also_requires(&["definition_source"])),
            )
            .with_attribute(
                "remote_path",
                Attribute::optional_string()
                    .with_validator(Validator::also_requires(&["definition_source"])),
            )
            .with_block("remote_parameter", remote_parameter_block())
            .with_block("permissions", permissions::permissions_block(PIPELINE_ACCESS_LEVELS))
            .with_attribute(
                "git_changeset_base",
                Attribute::optional_computed_string().one_of(&[
                    "LATEST_RUN",
                    "LATEST_RUN_MATCHING_REF",
                    "PULL_REQUEST",
                ]),
            )
            .with_attribute(
                "filesystem_changeset_base",
                Attribute::optional_computed_string().one_of(&["DATE_MODIFIED", "CONTENTS"]),
            )
            .with_attribute(
                "clone_depth",
                Attribute::optional_computed_int64().with_validator(Validator::at_least(0)),
            )
            .with_attribute("paused", bool_setting())
            .with_attribute("disabled", bool_setting())
            .with_attribute(
                "disabling_reason",
                Attribute::optional_string()
                    .with_validator(Validator::also_requires(&["disabled"])),
            )
            .with_attribute("always_from_scratch", bool_setting())
            .with_attribute("fail_on_prepare_env_warning", bool_setting())
            .with_attribute("fetch_all_refs", bool_setting())
            .with_attribute("auto_clear_cache", bool_setting())
            .with_attribute("no_skip_to_most_recent", bool_setting())
            .with_attribute("do_not_create_commit_status", bool_setting())
            .with_attribute("ignore_fail_on_project_status", bool_setting())
            .with_attribute("concurrent_pipeline_runs", bool_setting())
            .with_attribute("description_required", bool_setting())
            .with_attribute("execution_message_template", Attribute::optional_computed_string())
            .with_attribute("target_site_url", Attribute::optional_string())
            .with_attribute(
                "cron",
                Attribute::optional_string()
                    .with_validator(Validator::conflicts_with(&["delay", "start_date"])),
            )
            .with_attribute(
                "delay",
                Attribute::optional_int64()
                    .with_description("Minutes between scheduled runs")
                    .with_validator(Validator::at_least(1))
                    .with_validator(Validator::also_requires(&["start_date"])),
            )
            .with_attribute("start_date", Attribute::optional_string())
            .with_attribute("pause_on_repeated_failures", Attribute::optional_computed_int64())
            .with_attribute("tags", Attribute::string_set(AttributeFlags::optional()))
            .with_attribute("worker", Attribute::optional_string())
            .with_attribute("manage_permissions_by_yaml", bool_setting())
            .with_attribute("manage_variables_by_yaml", bool_setting())
            .with_attribute("pipeline_id", Attribute::computed_int64().use_state_for_unknown())
            .with_attribute("html_url", Attribute::computed_string().use_state_for_unknown())
            .with_attribute("last_execution_status", Attribute::computed_string())
            .with_attribute("last_execution_revision", Attribute::computed_string())
            .with_attribute("create_date", Attribute::computed_string().use_state_for_unknown())
            .with_attribute(
                "creator_member_id",
                Attribute::computed_int64().use_state_for_unknown(),
            )
    }

    fn validate(&self, config: &PipelineState) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        if let Value::Known(git_ref) = &config.git_config_ref {
            let has_config = !config.git_config.is_null();
            match git_ref.as_str() {
                "NONE" if has_config => diagnostics.push(
                    Diagnostic::error("git_config must be empty when git_config_ref is NONE")
                        .with_attribute("git_config"),
                ),
                "FIXED" | "DYNAMIC" if !has_config => diagnostics.push(
                    Diagnostic::error(format!(
                        "git_config is required when git_config_ref is {git_ref}"
                    ))
                    .with_attribute("git_config"),
                ),
                _ => {}
            }
        }

        if let Value::Known(conditions) = &config.trigger_condition {
            for (i, block) in conditions.iter().enumerate() {
                let Value::Known(condition) = &block.condition else {
                    continue;
                };
                for field in required_fields(condition) {
                    if block.is_null(field) {
                        diagnostics.push(
                            Diagnostic::error(format!(
                                "Trigger condition {condition} requires '{field}'"
                            ))
                            .with_attribute(format!("trigger_condition.{i}.{field}")),
                        );
                    }
                }
            }
        }

        diagnostics
    }

    async fn create(
        &self,
        ctx: &Context,
        planned: PipelineState,
    ) -> Result<PipelineState, ProviderError> {
        let domain = required(&planned.domain, "domain")?.clone();
        let project = required(&planned.project_name, "project_name")?.clone();
        let pipeline = ctx
            .client
            .create_pipeline(&domain, &project, &planned.to_ops()?)
            .await
            .or_api_err("create pipeline")?;
        info!(domain = %domain, project = %project, pipeline_id = pipeline.id, "Created pipeline");

        let mut state = planned;
        state.apply(&domain, &project, &pipeline);
        Ok(state)
    }

    async fn read(
        &self,
        ctx: &Context,
        current: PipelineState,
    ) -> Result<Option<PipelineState>, ProviderError> {
        let (domain, project, pipeline_id) = keys(&current.id)?;
        let Some(pipeline) = ctx
            .client
            .get_pipeline(&domain, &project, pipeline_id)
            .await
            .found("read pipeline")?
        else {
            warn!(
                domain = %domain,
                project = %project,
                pipeline_id,
                "Pipeline no longer exists, removing from state"
            );
            return Ok(None);
        };
        let mut state = current;
        state.apply(&domain, &project, &pipeline);
        Ok(Some(state))
    }

    async fn update(
        &self,
        ctx: &Context,
        prior: PipelineState,
        planned: PipelineState,
    ) -> Result<PipelineState, ProviderError> {
        let (domain, project, pipeline_id) = keys(&prior.id)?;
        let pipeline = ctx
            .client
            .update_pipeline(&domain, &project, pipeline_id, &planned.to_ops()?)
            .await
            .or_api_err("update pipeline")?;

        let mut state = planned;
        state.apply(&domain, &project, &pipeline);
        Ok(state)
    }

    async fn delete(&self, ctx: &Context, current: PipelineState) -> Result<(), ProviderError> {
        let (domain, project, pipeline_id) = keys(&current.id)?;
        ctx.client
            .delete_pipeline(&domain, &project, pipeline_id)
            .await
            .ignore_not_found("delete pipeline")?;
        info!(domain = %domain, project = %project, pipeline_id, "Deleted pipeline");
        Ok(())
    }

    async fn import(&self, ctx: &Context, id: &str) -> Result<PipelineState, ProviderError> {
        let state = PipelineState {
            id: Value::Known(id.to_string()),
            ..Default::default()
        };
        keys(&state.id)?;
        imported(id, self.read(ctx, state).await?)
    }
}

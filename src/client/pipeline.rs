//! Pipeline endpoints and models.

use serde::{Deserialize, Serialize};

use super::{ApiError, BuddyClient, IdRef, ResourcePermissions};

/// Where a pipeline reads its YAML definition from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    /// Project holding the YAML file.
    pub project: String,
    /// Branch holding the definition.
    pub branch: String,
    /// Path of the YAML file.
    pub path: String,
}

/// An event that triggers a pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineEvent {
    /// Event type, e.g. `PUSH`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Refs the event applies to.
    pub refs: Vec<String>,
}

/// A trigger condition in its flat wire form. Which auxiliary fields are
/// meaningful depends on `trigger_condition`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConditionBody {
    /// Condition type.
    pub trigger_condition: String,
    /// Paths for path conditions.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trigger_condition_paths: Vec<String>,
    /// Variable for variable conditions.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub trigger_variable_key: String,
    /// Expected value for variable conditions.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub trigger_variable_value: String,
    /// Hours for time conditions.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trigger_hours: Vec<i64>,
    /// Days for time conditions.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trigger_days: Vec<i64>,
    /// Time zone of time conditions.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub zone_id: String,
    /// Project for success-in-pipeline conditions.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub trigger_project_name: String,
    /// Pipeline for success-in-pipeline conditions.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub trigger_pipeline_name: String,
    /// Email for trigger-by-user conditions.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub trigger_user: String,
    /// Group for trigger-by-group conditions.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub trigger_group: String,
}

/// Parameter passed to a remote pipeline definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteParameter {
    /// Parameter name.
    pub key: String,
    /// Parameter value.
    pub value: String,
}

/// A pipeline as returned by the Service.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Pipeline {
    /// Service identifier.
    pub id: i64,
    /// API URL.
    pub url: String,
    /// Link to the web UI.
    pub html_url: String,
    /// Pipeline name.
    pub name: String,
    /// Stable handle used in YAML.
    pub identifier: String,
    /// `CLICK`, `EVENT` or `SCHEDULE`.
    pub on: String,
    /// Refs that trigger the pipeline.
    pub refs: Vec<String>,
    /// Events that trigger the pipeline.
    pub events: Vec<PipelineEvent>,
    /// Conditions that must hold for a run to start.
    pub trigger_conditions: Vec<TriggerConditionBody>,
    /// `LOW`, `NORMAL` or `HIGH`.
    pub priority: String,
    /// `X64` or `ARM`.
    pub cpu: String,
    /// `NONE`, `FIXED` or `DYNAMIC`.
    pub git_config_ref: String,
    /// Repository location of the YAML definition.
    pub git_config: Option<GitConfig>,
    /// `LOCAL` or `REMOTE` YAML definition.
    pub definition_source: String,
    /// Project holding the remote definition.
    pub remote_project_name: String,
    /// Branch of the remote definition.
    pub remote_branch: String,
    /// Path of the remote definition.
    pub remote_path: String,
    /// Parameters passed to the remote definition.
    pub remote_parameters: Vec<RemoteParameter>,
    /// Per-user and per-group access.
    pub permissions: Option<ResourcePermissions>,
    /// Revision changes are computed against.
    pub git_changeset_base: String,
    /// How changed files are detected.
    pub filesystem_changeset_base: String,
    /// Git clone depth; 0 clones everything.
    pub clone_depth: i64,
    /// Whether the pipeline is paused.
    pub paused: bool,
    /// Whether the pipeline is disabled.
    pub disabled: bool,
    /// Why the pipeline is disabled.
    pub disabling_reason: String,
    /// Whether every run starts from an empty filesystem.
    pub always_from_scratch: bool,
    /// Whether environment warnings fail the run.
    pub fail_on_prepare_env_warning: bool,
    /// Whether all refs are fetched.
    pub fetch_all_refs: bool,
    /// Whether the cache is cleared before each run.
    pub auto_clear_cache: bool,
    /// Whether queued runs are kept instead of skipped.
    pub no_skip_to_most_recent: bool,
    /// Whether commit statuses are skipped.
    pub do_not_create_commit_status: bool,
    /// Whether a failure leaves the project status alone.
    pub ignore_fail_on_project_status: bool,
    /// Whether runs may overlap.
    pub concurrent_pipeline_runs: bool,
    /// Whether a run needs a comment.
    pub description_required: bool,
    /// Template for run titles.
    pub execution_message_template: String,
    /// Site URL shown after deployment.
    pub target_site_url: String,
    /// Cron expression for scheduled runs.
    pub cron: String,
    /// Minutes between scheduled runs.
    pub delay: Option<i64>,
    /// First scheduled run.
    pub start_date: String,
    /// Failures in a row before the pipeline pauses.
    pub pause_on_repeated_failures: i64,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Worker the runs are pinned to.
    pub worker: String,
    /// Whether permissions come from YAML.
    pub manage_permissions_by_yaml: bool,
    /// Whether variables come from YAML.
    pub manage_variables_by_yaml: bool,
    /// Status of the last run.
    pub last_execution_status: String,
    /// Revision of the last run.
    pub last_execution_revision: String,
    /// Creation timestamp as sent by the Service.
    pub create_date: String,
    /// Member who created the pipeline.
    pub creator: Option<IdRef>,
}

/// Create and update payload for a pipeline.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineOps {
    /// Pipeline name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Stable handle used in YAML.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// `CLICK`, `EVENT` or `SCHEDULE`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on: Option<String>,
    /// Refs that trigger the pipeline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refs: Option<Vec<String>>,
    /// Events that trigger the pipeline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<PipelineEvent>>,
    /// Conditions that must hold for a run to start.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_conditions: Option<Vec<TriggerConditionBody>>,
    /// `LOW`, `NORMAL` or `HIGH`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    /// `X64` or `ARM`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    /// `NONE`, `FIXED` or `DYNAMIC`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_config_ref: Option<String>,
    /// Repository location of the YAML definition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_config: Option<GitConfig>,
    /// `LOCAL` or `REMOTE` YAML definition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition_source: Option<String>,
    /// Project holding the remote definition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_project_name: Option<String>,
    /// Branch of the remote definition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_branch: Option<String>,
    /// Path of the remote definition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_path: Option<String>,
    /// Parameters passed to the remote definition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_parameters: Option<Vec<RemoteParameter>>,
    /// Per-user and per-group access.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<ResourcePermissions>,
    /// Revision changes are computed against.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_changeset_base: Option<String>,
    /// How changed files are detected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesystem_changeset_base: Option<String>,
    /// Git clone depth; 0 clones everything.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clone_depth: Option<i64>,
    /// Whether the pipeline is paused.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paused: Option<bool>,
    /// Whether the pipeline is disabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    /// Why the pipeline is disabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabling_reason: Option<String>,
    /// Whether every run starts from an empty filesystem.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub always_from_scratch: Option<bool>,
    /// Whether environment warnings fail the run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_on_prepare_env_warning: Option<bool>,
    /// Whether all refs are fetched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_all_refs: Option<bool>,
    /// Whether the cache is cleared before each run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_clear_cache: Option<bool>,
    /// Whether queued runs are kept instead of skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_skip_to_most_recent: Option<bool>,
    /// Whether commit statuses are skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub do_not_create_commit_status: Option<bool>,
    /// Whether a failure leaves the project status alone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_fail_on_project_status: Option<bool>,
    /// Whether runs may overlap.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrent_pipeline_runs: Option<bool>,
    /// Whether a run needs a comment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_required: Option<bool>,
    /// Template for run titles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_message_template: Option<String>,
    /// Site URL shown after deployment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_site_url: Option<String>,
    /// Cron expression for scheduled runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,
    /// Minutes between scheduled runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<i64>,
    /// First scheduled run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    /// Failures in a row before the pipeline pauses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pause_on_repeated_failures: Option<i64>,
    /// Free-form tags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Worker the runs are pinned to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker: Option<String>,
    /// Whether permissions come from YAML.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manage_permissions_by_yaml: Option<bool>,
    /// Whether variables come from YAML.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manage_variables_by_yaml: Option<bool>,
}

impl BuddyClient {
    /// Create a pipeline.
    pub async fn create_pipeline(
        &self,
        domain: &str,
        project: &str,
        ops: &PipelineOps,
    ) -> Result<Pipeline, ApiError> {
        self.post(
            &format!("/workspaces/{domain}/projects/{project}/pipelines"),
            ops,
        )
        .await
    }

    /// Fetch a pipeline.
    pub async fn get_pipeline(
        &self,
        domain: &str,
        project: &str,
        pipeline_id: i64,
    ) -> Result<Pipeline, ApiError> {
        self.get(&format!(
            "/workspaces/{domain}/projects/{project}/pipelines/{pipeline_id}"
        ))
        .await
    }

    /// Update a pipeline.
    pub async fn update_pipeline(
        &self,
        domain: &str,
        project: &str,
        pipeline_id: i64,
        ops: &PipelineOps,
    ) -> Result<Pipeline, ApiError> {
        self.patch(
            &format!("/workspaces/{domain}/projects/{project}/pipelines/{pipeline_id}"),
            ops,
        )
        .await
    }

    /// Delete a pipeline.
    pub async fn delete_pipeline(
        &self,
        domain: &str,
        project: &str,
        pipeline_id: i64,
    ) -> Result<(), ApiError> {
        self.delete(&format!(
            "/workspaces/{domain}/projects/{project}/pipelines/{pipeline_id}"
        ))
        .await
    }
}

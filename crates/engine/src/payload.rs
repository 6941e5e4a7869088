//! Launch payload assembly.
//!
//! Only fields the template prompts for are mapped, and only when the form
//! holds a defined value for them. Labels typed by the user but unknown to
//! the server are collected as pending names and created through a
//! [`LabelStore`] before submission.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use indexmap::IndexMap;
use launchdeck_api::ControllerClient;
use launchdeck_types::Label;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::form::FormState;
use crate::steps::{
    CredentialPasswordsStep, DIFF_MODE_FIELD, EXECUTION_ENVIRONMENT_FIELD, EXTRA_VARS_FIELD, FORKS_FIELD,
    INSTANCE_GROUPS_FIELD, INVENTORY_FIELD, JOB_SLICE_COUNT_FIELD, JOB_TAGS_FIELD, JOB_TYPE_FIELD, LABELS_FIELD,
    LIMIT_FIELD, SCM_BRANCH_FIELD, SKIP_TAGS_FIELD, StepContext, SurveyStep, TIMEOUT_FIELD, VERBOSITY_FIELD, as_integer,
    parse_variables, selected_credentials,
};

/// Body of `POST <template>/launch/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LaunchPayload {
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub credential_passwords: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_tags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_tags: Option<String>,
    /// YAML document: the prompted variables merged with survey answers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_vars: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scm_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbosity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forks: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_slice_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_environment: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_groups: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<i64>>,
    /// Label names that still need to be created server-side.
    #[serde(skip)]
    pub pending_labels: Vec<String>,
    /// The merged variables as a JSON object, as schedules store them.
    #[serde(skip)]
    pub extra_data: Map<String, Value>,
}

impl LaunchPayload {
    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).context("serialize launch payload")
    }
}

fn text_field(form: &FormState, enabled: bool, field: &str) -> Option<String> {
    if !enabled {
        return None;
    }
    form.get(field).and_then(Value::as_str).map(str::to_string)
}

fn integer_field(form: &FormState, enabled: bool, field: &str) -> Option<i64> {
    if !enabled {
        return None;
    }
    form.get(field).and_then(as_integer)
}

fn id_of(value: &Value) -> Option<i64> {
    value.get("id").and_then(Value::as_i64)
}

fn ids_of(value: &Value) -> Vec<i64> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(id_of).collect())
        .unwrap_or_default()
}

/// Map the form onto a launch payload for the steps active in `ctx`.
pub fn build_launch_payload(ctx: &StepContext<'_>) -> Result<LaunchPayload> {
    let config = ctx.config;
    let form = ctx.form;
    let mut payload = LaunchPayload::default();

    if let Some(step) = CredentialPasswordsStep::for_context(ctx) {
        payload.credential_passwords = step.passwords(form);
    }
    if config.ask_inventory_on_launch {
        payload.inventory_id = id_of(form.value(INVENTORY_FIELD));
    }
    if config.ask_credential_on_launch {
        payload.credentials = Some(selected_credentials(form).iter().map(|credential| credential.id).collect());
    }

    payload.job_type = text_field(form, config.ask_job_type_on_launch, JOB_TYPE_FIELD);
    payload.limit = text_field(form, config.ask_limit_on_launch, LIMIT_FIELD);
    payload.job_tags = text_field(form, config.ask_tags_on_launch, JOB_TAGS_FIELD);
    payload.skip_tags = text_field(form, config.ask_skip_tags_on_launch, SKIP_TAGS_FIELD);
    payload.scm_branch = text_field(form, config.ask_scm_branch_on_launch, SCM_BRANCH_FIELD);
    payload.verbosity = integer_field(form, config.ask_verbosity_on_launch, VERBOSITY_FIELD);
    payload.timeout = integer_field(form, config.ask_timeout_on_launch, TIMEOUT_FIELD);
    payload.forks = integer_field(form, config.ask_forks_on_launch, FORKS_FIELD);
    payload.job_slice_count = integer_field(form, config.ask_job_slice_count_on_launch, JOB_SLICE_COUNT_FIELD);
    if config.ask_diff_mode_on_launch {
        payload.diff_mode = form.get(DIFF_MODE_FIELD).and_then(Value::as_bool);
    }

    let survey = SurveyStep::for_context(ctx);
    if config.ask_variables_on_launch || survey.is_some() {
        let mut variables = if config.ask_variables_on_launch {
            parse_variables(form.text(EXTRA_VARS_FIELD)).map_err(anyhow::Error::msg)?
        } else {
            Map::new()
        };
        if let Some(survey) = &survey {
            variables.extend(survey.answers(form));
        }
        payload.extra_vars =
            Some(serde_yaml::to_string(&Value::Object(variables.clone())).context("serialize extra_vars")?);
        payload.extra_data = variables;
    }

    if config.ask_execution_environment_on_launch {
        payload.execution_environment = id_of(form.value(EXECUTION_ENVIRONMENT_FIELD));
    }
    if config.ask_instance_groups_on_launch {
        payload.instance_groups = Some(ids_of(form.value(INSTANCE_GROUPS_FIELD)));
    }
    if config.ask_labels_on_launch {
        let labels: Vec<Label> = serde_json::from_value(form.value(LABELS_FIELD).clone()).unwrap_or_default();
        let mut ids = Vec::new();
        for label in labels {
            match label.id {
                Some(id) => ids.push(id),
                None => payload.pending_labels.push(label.name),
            }
        }
        payload.labels = Some(ids);
    }

    debug!(
        credentials = payload.credentials.as_ref().map(Vec::len),
        pending_labels = payload.pending_labels.len(),
        "built launch payload"
    );
    Ok(payload)
}

/// Server-side label creation.
#[async_trait]
pub trait LabelStore: Send + Sync {
    async fn create_label(&self, name: &str, organization: i64) -> Result<Label>;
}

#[async_trait]
impl LabelStore for ControllerClient {
    async fn create_label(&self, name: &str, organization: i64) -> Result<Label> {
        ControllerClient::create_label(self, name, organization).await
    }
}

/// Create every pending label and append the new ids to `payload.labels`.
pub async fn resolve_labels(
    payload: &mut LaunchPayload,
    store: &dyn LabelStore,
    organization: Option<i64>,
) -> Result<()> {
    if payload.pending_labels.is_empty() {
        return Ok(());
    }
    let Some(organization) = organization else {
        bail!("new labels need an organization, but the template has none");
    };
    for name in std::mem::take(&mut payload.pending_labels) {
        let label = store.create_label(&name, organization).await?;
        let Some(id) = label.id else {
            bail!("label '{}' was created without an id", name);
        };
        info!(label = %name, id, "resolved new label");
        payload.labels.get_or_insert_with(Vec::new).push(id);
    }
    Ok(())
}

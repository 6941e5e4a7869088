//! Prompt steps of the launch wizard.
//!
//! Each promptable capability has a factory that looks at the launch
//! configuration and returns `Some(step)` only when the capability applies.
//! Steps are rebuilt from scratch whenever the wizard needs them; their only
//! identity is their [`StepId`], and they only communicate through the shared
//! [`FormState`](crate::FormState) and [`VisitedSet`](crate::VisitedSet).

mod credential_passwords;
mod credentials;
mod execution_environment;
mod instance_groups;
mod inventory;
mod other_prompts;
mod preview;
mod survey;

use std::fmt;

use indexmap::IndexMap;
use launchdeck_types::{LaunchConfiguration, LaunchSideData, Resource, SurveySpec};
use serde_json::Value;

use crate::error::ContentError;
use crate::form::{FormState, VisitedSet};
use crate::loader::{LoadState, OptionLoader, OptionQuery};

pub use credential_passwords::{CredentialPasswordsStep, PASSWORD_BLANK_MESSAGE, PASSWORD_FIELD_PREFIX};
pub use credentials::{CREDENTIALS_FIELD, CredentialsStep, selected_credentials};
pub use execution_environment::{EXECUTION_ENVIRONMENT_FIELD, ExecutionEnvironmentStep};
pub use instance_groups::{INSTANCE_GROUPS_FIELD, InstanceGroupsStep};
pub use inventory::{INVENTORY_FIELD, INVENTORY_REQUIRED_MESSAGE, InventoryStep};
pub use other_prompts::{
    DIFF_MODE_FIELD, EXTRA_VARS_FIELD, FORKS_FIELD, JOB_SLICE_COUNT_FIELD, JOB_TAGS_FIELD, JOB_TYPE_FIELD,
    LABELS_FIELD, LIMIT_FIELD, OtherPromptsStep, SCM_BRANCH_FIELD, SKIP_TAGS_FIELD, TIMEOUT_FIELD, VERBOSITY_FIELD,
    parse_variables,
};
pub use preview::PreviewStep;
pub(crate) use other_prompts::as_integer;
pub use survey::SurveyStep;

/// Identifier of a wizard step. The derived ordering is the canonical
/// order in which steps appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StepId {
    Inventory,
    Credentials,
    CredentialPasswords,
    ExecutionEnvironment,
    InstanceGroups,
    OtherPrompts,
    Survey,
    Preview,
}

impl StepId {
    pub const ALL: [StepId; 8] = [
        StepId::Inventory,
        StepId::Credentials,
        StepId::CredentialPasswords,
        StepId::ExecutionEnvironment,
        StepId::InstanceGroups,
        StepId::OtherPrompts,
        StepId::Survey,
        StepId::Preview,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StepId::Inventory => "inventory",
            StepId::Credentials => "credentials",
            StepId::CredentialPasswords => "credentialPasswords",
            StepId::ExecutionEnvironment => "executionEnvironment",
            StepId::InstanceGroups => "instanceGroups",
            StepId::OtherPrompts => "other",
            StepId::Survey => "survey",
            StepId::Preview => "preview",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            StepId::Inventory => "Inventory",
            StepId::Credentials => "Credentials",
            StepId::CredentialPasswords => "Credential passwords",
            StepId::ExecutionEnvironment => "Execution Environment",
            StepId::InstanceGroups => "Instance Groups",
            StepId::OtherPrompts => "Other prompts",
            StepId::Survey => "Survey",
            StepId::Preview => "Preview",
        }
    }

    pub fn parse(value: &str) -> Option<StepId> {
        StepId::ALL.into_iter().find(|step| step.as_str() == value)
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-wizard options that do not come from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardOptions {
    /// False for schedules and workflow nodes, which cannot prompt.
    pub allow_credentials_with_passwords: bool,
    pub page_size: u32,
}

impl Default for WizardOptions {
    fn default() -> Self {
        Self {
            allow_credentials_with_passwords: true,
            page_size: 20,
        }
    }
}

/// Everything a step factory may look at.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub config: &'a LaunchConfiguration,
    pub survey: Option<&'a SurveySpec>,
    pub resource: &'a Resource,
    pub side_data: &'a LaunchSideData,
    pub options: &'a WizardOptions,
    pub form: &'a FormState,
    pub visited: &'a VisitedSet,
    pub loader: &'a OptionLoader,
}

impl StepContext<'_> {
    pub(crate) fn load_state(&self, step: StepId) -> Option<&LoadState> {
        self.loader.state(step)
    }
}

/// Behaviour shared by all wizard steps.
///
/// Implementors describe their fields and errors; the default methods turn
/// those into validation, visit tracking and the error flag.
pub trait PromptStep: fmt::Debug {
    fn id(&self) -> StepId;

    fn display_name(&self) -> &'static str {
        self.id().display_name()
    }

    /// Form fields owned by this step.
    fn field_names(&self) -> Vec<String>;

    /// Values this step seeds the form with.
    fn initial_values(&self) -> IndexMap<String, Value>;

    /// Current validation errors keyed by field, computed from `form`.
    fn field_errors(&self, form: &FormState) -> IndexMap<String, String>;

    /// Replace this step's errors in `form` with freshly computed ones.
    /// Calling it again with unchanged values yields the same error map.
    fn validate(&self, form: &mut FormState) {
        for field in self.field_names() {
            form.clear_error(&field);
        }
        for (field, message) in self.field_errors(form) {
            form.set_error(field, message);
        }
    }

    /// Errors only count once the user has left the step at least once.
    fn is_errored(&self, form: &FormState, visited: &VisitedSet) -> bool {
        visited.contains(self.id()) && !self.field_errors(form).is_empty()
    }

    /// Touch every owned field so its errors become visible.
    fn mark_visited(&self, form: &mut FormState) {
        for field in self.field_names() {
            form.touch(field);
        }
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn content_error(&self) -> Option<&ContentError> {
        None
    }

    /// Option data the step needs fetched before it is ready.
    fn option_query(&self) -> Option<OptionQuery> {
        None
    }

    /// Whether the wizard may move past this step.
    fn enable_next(&self) -> bool {
        true
    }
}

/// Instantiate `step` if it applies to `ctx`. Preview is never produced
/// here; [`build_steps`] always appends it.
fn instantiate(step: StepId, ctx: &StepContext<'_>) -> Option<Box<dyn PromptStep>> {
    match step {
        StepId::Inventory => InventoryStep::for_context(ctx).map(boxed),
        StepId::Credentials => CredentialsStep::for_context(ctx).map(boxed),
        StepId::CredentialPasswords => CredentialPasswordsStep::for_context(ctx).map(boxed),
        StepId::ExecutionEnvironment => ExecutionEnvironmentStep::for_context(ctx).map(boxed),
        StepId::InstanceGroups => InstanceGroupsStep::for_context(ctx).map(boxed),
        StepId::OtherPrompts => OtherPromptsStep::for_context(ctx).map(boxed),
        StepId::Survey => SurveyStep::for_context(ctx).map(boxed),
        StepId::Preview => None,
    }
}

fn boxed<S: PromptStep + 'static>(step: S) -> Box<dyn PromptStep> {
    Box::new(step)
}

/// Build the active steps for `ctx` in canonical order, Preview last.
pub fn build_steps(ctx: &StepContext<'_>) -> Vec<Box<dyn PromptStep>> {
    let mut steps: Vec<Box<dyn PromptStep>> = StepId::ALL
        .into_iter()
        .filter_map(|step| instantiate(step, ctx))
        .collect();
    let has_errors = steps.iter().any(|step| step.is_errored(ctx.form, ctx.visited));
    steps.push(Box::new(PreviewStep::new(has_errors)));
    steps
}

/// Shared readiness and content-error bookkeeping for lookup-backed steps.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LookupStatus {
    ready: bool,
    error: Option<ContentError>,
}

impl LookupStatus {
    pub(crate) fn of(ctx: &StepContext<'_>, step: StepId) -> Self {
        match ctx.load_state(step) {
            Some(LoadState::Loaded(_)) => Self { ready: true, error: None },
            Some(LoadState::Failed(error)) => Self {
                ready: true,
                error: Some(error.clone()),
            },
            Some(LoadState::Loading) | None => Self { ready: false, error: None },
        }
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.ready
    }

    pub(crate) fn content_error(&self) -> Option<&ContentError> {
        self.error.as_ref()
    }
}

pub(crate) fn single_field(name: &str, value: Value) -> IndexMap<String, Value> {
    IndexMap::from([(name.to_string(), value)])
}


#[cfg(test)]
mod tests {
    use super::test_support::Fixture;
    use super::*;

    fn ids(fixture: &Fixture) -> Vec<StepId> {
        build_steps(&fixture.ctx()).iter().map(|step| step.id()).collect()
    }

    #[test]
    fn no_prompts_yields_only_preview() {
        let fixture = Fixture::default();
        assert_eq!(ids(&fixture), vec![StepId::Preview]);
    }

    #[test]
    fn every_flag_combination_keeps_canonical_order() {
        for mask in 0u32..(1 << 6) {
            let mut fixture = Fixture::default();
            fixture.config.ask_inventory_on_launch = mask & 1 != 0;
            fixture.config.ask_credential_on_launch = mask & 2 != 0;
            fixture.config.ask_execution_environment_on_launch = mask & 4 != 0;
            fixture.config.ask_instance_groups_on_launch = mask & 8 != 0;
            fixture.config.ask_limit_on_launch = mask & 16 != 0;
            fixture.config.survey_enabled = mask & 32 != 0;
            fixture.survey = Some(
                serde_json::from_value(serde_json::json!({
                    "spec": [{ "variable": "x", "type": "text" }]
                }))
                .expect("survey parse"),
            );

            let steps = ids(&fixture);
            let expected_len = mask.count_ones() as usize + 1;
            assert_eq!(steps.len(), expected_len, "mask {mask:#08b}");
            assert!(steps.windows(2).all(|pair| pair[0] < pair[1]), "mask {mask:#08b}");
            assert_eq!(steps.last(), Some(&StepId::Preview));
        }
    }

    #[test]
    fn preview_blocks_next_while_a_visited_step_has_errors() {
        let mut fixture = Fixture::default();
        fixture.config.ask_forks_on_launch = true;
        fixture.form.set("forks", serde_json::json!(-2));

        let steps = build_steps(&fixture.ctx());
        assert!(steps.iter().all(|step| step.enable_next()));

        fixture.visited.insert(StepId::OtherPrompts);
        let steps = build_steps(&fixture.ctx());
        let preview = steps.last().expect("preview step");
        assert_eq!(preview.id(), StepId::Preview);
        assert!(!preview.enable_next());
        assert!(steps[..steps.len() - 1].iter().all(|step| step.enable_next()));
    }

    #[test]
    fn step_ids_round_trip_through_names() {
        for step in StepId::ALL {
            assert_eq!(StepId::parse(step.as_str()), Some(step));
        }
        assert_eq!(StepId::parse("bogus"), None);
    }
}

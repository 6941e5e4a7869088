//! The launch prompt wizard.
//!
//! [`LaunchWizard`] owns the form state, the visited set and the option
//! loader, and rebuilds its step list from them on every query. The phase
//! follows `Loading -> Ready -> (Navigating <-> Validating) -> Submitting ->
//! {Closed | Error}`.
//!
//! The form is reset from the steps' initial values once every step is
//! ready, and again whenever the set of active steps or their fields
//! changes. Values already in the form survive each reset.

use anyhow::Result;
use futures_util::future::join_all;
use indexmap::IndexMap;
use launchdeck_types::{Credential, LaunchConfiguration, LaunchSideData, LookupData, Resource, SurveySpec};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::credentials;
use crate::error::{ContentError, WizardError};
use crate::form::{FormState, VisitedSet};
use crate::loader::{FetchTicket, OptionLoader, OptionSource, fetch_lookup};
use crate::payload::{LabelStore, LaunchPayload, build_launch_payload, resolve_labels};
use crate::steps::{
    CREDENTIALS_FIELD, PromptStep, StepContext, StepId, WizardOptions, build_steps, selected_credentials,
};

/// Everything the surrounding screen fetched before opening the wizard.
#[derive(Debug, Clone, Default)]
pub struct WizardInput {
    pub config: LaunchConfiguration,
    pub survey: Option<SurveySpec>,
    pub resource: Resource,
    pub side_data: LaunchSideData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardPhase {
    Loading,
    Ready,
    Navigating,
    Validating,
    Submitting,
    Closed,
    Error,
}

/// What a shell needs to render one entry of the step list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepView {
    pub id: StepId,
    pub name: &'static str,
    pub is_errored: bool,
    pub is_ready: bool,
    pub fields: Vec<String>,
    /// Only false on Preview while another step reports errors.
    pub enable_next: bool,
}

type StepSignature = Vec<(StepId, Vec<String>)>;

#[derive(Debug)]
pub struct LaunchWizard {
    input: WizardInput,
    options: WizardOptions,
    form: FormState,
    visited: VisitedSet,
    loader: OptionLoader,
    phase: WizardPhase,
    current: Option<StepId>,
    reset_signature: Option<StepSignature>,
}

impl LaunchWizard {
    pub fn new(input: WizardInput, options: WizardOptions) -> Self {
        let mut wizard = Self {
            input,
            options,
            form: FormState::default(),
            visited: VisitedSet::default(),
            loader: OptionLoader::default(),
            phase: WizardPhase::Loading,
            current: None,
            reset_signature: None,
        };
        wizard.refresh();
        wizard
    }

    fn ctx(&self) -> StepContext<'_> {
        StepContext {
            config: &self.input.config,
            survey: self.input.survey.as_ref(),
            resource: &self.input.resource,
            side_data: &self.input.side_data,
            options: &self.options,
            form: &self.form,
            visited: &self.visited,
            loader: &self.loader,
        }
    }

    fn build(&self) -> Vec<Box<dyn PromptStep>> {
        build_steps(&self.ctx())
    }

    fn find(&self, step: StepId) -> Result<Box<dyn PromptStep>, WizardError> {
        self.build()
            .into_iter()
            .find(|candidate| candidate.id() == step)
            .ok_or(WizardError::UnknownStep(step))
    }

    pub fn phase(&self) -> WizardPhase {
        self.phase
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn visited(&self) -> &VisitedSet {
        &self.visited
    }

    pub fn current_step(&self) -> Option<StepId> {
        self.current
    }

    pub fn lookup(&self, step: StepId) -> Option<&LookupData> {
        self.loader.lookup(step)
    }

    /// Active steps in canonical order, Preview last.
    pub fn steps(&self) -> Vec<StepView> {
        self.build()
            .iter()
            .map(|step| StepView {
                id: step.id(),
                name: step.display_name(),
                is_errored: step.is_errored(&self.form, &self.visited),
                is_ready: step.is_ready(),
                fields: step.field_names(),
                enable_next: step.enable_next(),
            })
            .collect()
    }

    pub fn has_errors(&self) -> bool {
        self.build()
            .iter()
            .any(|step| step.is_errored(&self.form, &self.visited))
    }

    /// True once every step is ready and the form has been seeded.
    pub fn is_ready(&self) -> bool {
        self.reset_signature.is_some() && self.build().iter().all(|step| step.is_ready())
    }

    /// The first failed option load, if any.
    pub fn content_error(&self) -> Option<ContentError> {
        self.build().iter().find_map(|step| step.content_error().cloned())
    }

    /// Register fetches for every step whose option query is new.
    pub fn pending_fetches(&mut self) -> Vec<FetchTicket> {
        let queries: Vec<_> = self
            .build()
            .iter()
            .filter_map(|step| step.option_query().map(|query| (step.id(), query)))
            .collect();
        queries
            .into_iter()
            .filter_map(|(step, query)| self.loader.request(step, query))
            .collect()
    }

    /// Apply one fetch result. Stale results and results after close are
    /// dropped and reported as `false`.
    pub fn apply_fetch(&mut self, ticket: &FetchTicket, result: Result<LookupData>) -> bool {
        let applied = self.loader.complete(ticket, result);
        if applied {
            self.refresh();
        }
        applied
    }

    /// Fetch every pending option list from `source` concurrently.
    pub async fn load(&mut self, source: &dyn OptionSource) -> Result<(), WizardError> {
        self.ensure_open()?;
        let tickets = self.pending_fetches();
        debug!(fetches = tickets.len(), "loading step options");
        let results = join_all(tickets.iter().map(|ticket| fetch_lookup(source, ticket))).await;
        for (ticket, result) in tickets.iter().zip(results) {
            self.apply_fetch(ticket, result);
        }
        self.refresh();
        match self.content_error() {
            Some(error) => Err(WizardError::Content(error)),
            None => Ok(()),
        }
    }

    /// Recompute the step list and reset the form when it changed.
    ///
    /// A reset can itself change the step list (seeding `credentials`
    /// brings in credential passwords), so this repeats until the active
    /// steps settle. Resets only add values, which bounds the repetition.
    pub fn refresh(&mut self) {
        if self.phase == WizardPhase::Closed {
            return;
        }
        for _ in 0..StepId::ALL.len() {
            let steps = self.build();
            if let Some(error) = steps.iter().find_map(|step| step.content_error().cloned()) {
                warn!(step = %error.step, message = %error.message, "step content failed to load");
                self.phase = WizardPhase::Error;
                return;
            }
            if !steps.iter().all(|step| step.is_ready()) {
                return;
            }

            let signature: StepSignature = steps.iter().map(|step| (step.id(), step.field_names())).collect();
            if self.reset_signature.as_ref() == Some(&signature) {
                break;
            }
            let mut initial = IndexMap::new();
            for step in &steps {
                initial.extend(step.initial_values());
            }
            self.form.reset_with(initial);
            debug!(steps = signature.len(), "active steps changed, form reset");
            self.reset_signature = Some(signature);
        }

        if self.phase == WizardPhase::Loading {
            self.phase = WizardPhase::Ready;
            self.current = self.build().first().map(|step| step.id());
            info!(steps = self.step_ids().len(), "launch wizard ready");
        }
    }

    fn ensure_open(&self) -> Result<(), WizardError> {
        if self.phase == WizardPhase::Closed {
            return Err(WizardError::Closed);
        }
        Ok(())
    }

    fn ensure_interactive(&self) -> Result<(), WizardError> {
        self.ensure_open()?;
        if let Some(error) = self.content_error() {
            return Err(WizardError::Content(error));
        }
        if !self.is_ready() {
            return Err(WizardError::NotReady);
        }
        Ok(())
    }

    /// Set a field and re-run validation for its step once the field has
    /// been touched.
    pub fn set_value(&mut self, field: &str, value: Value) -> Result<(), WizardError> {
        self.ensure_open()?;
        self.form.set(field, value);
        self.refresh();
        if self.form.is_touched(field)
            && let Some(step) = self
                .build()
                .into_iter()
                .find(|step| step.field_names().iter().any(|name| name == field))
        {
            step.validate(&mut self.form);
        }
        Ok(())
    }

    /// Add a credential, replacing any selected one with the same type and
    /// vault id.
    pub fn select_credential(&mut self, credential: Credential) -> Result<(), WizardError> {
        let mut selected = selected_credentials(&self.form);
        credentials::select_credential(&mut selected, credential);
        self.set_credentials(&selected)
    }

    pub fn deselect_credential(&mut self, id: i64) -> Result<(), WizardError> {
        let mut selected = selected_credentials(&self.form);
        credentials::deselect_credential(&mut selected, id);
        self.set_credentials(&selected)
    }

    fn set_credentials(&mut self, selected: &[Credential]) -> Result<(), WizardError> {
        let value = serde_json::to_value(selected).map_err(|error| WizardError::Submit(error.into()))?;
        self.set_value(CREDENTIALS_FIELD, value)
    }

    pub fn validate_step(&mut self, step: StepId) -> Result<(), WizardError> {
        let step = self.find(step)?;
        step.validate(&mut self.form);
        Ok(())
    }

    /// Mark `step` visited, touch its fields and validate it.
    pub fn visit_step(&mut self, step: StepId) -> Result<(), WizardError> {
        let step = self.find(step)?;
        self.visited.insert(step.id());
        step.mark_visited(&mut self.form);
        step.validate(&mut self.form);
        Ok(())
    }

    /// Visit every step at once so all latent errors surface.
    pub fn visit_all_steps(&mut self) {
        for step in self.build() {
            self.visited.insert(step.id());
            step.mark_visited(&mut self.form);
            step.validate(&mut self.form);
        }
    }

    fn step_ids(&self) -> Vec<StepId> {
        self.build().iter().map(|step| step.id()).collect()
    }

    pub fn next(&mut self) -> Result<StepId, WizardError> {
        self.ensure_interactive()?;
        let ids = self.step_ids();
        let target = match self.current {
            Some(current) => ids.iter().copied().find(|id| *id > current),
            None => ids.first().copied(),
        }
        .ok_or(WizardError::NoAdjacentStep)?;
        self.transition(target, false)
    }

    pub fn back(&mut self) -> Result<StepId, WizardError> {
        self.ensure_interactive()?;
        let current = self.current.ok_or(WizardError::NoAdjacentStep)?;
        let target = self
            .step_ids()
            .into_iter()
            .rev()
            .find(|id| *id < current)
            .ok_or(WizardError::NoAdjacentStep)?;
        self.transition(target, true)
    }

    pub fn go_to(&mut self, target: StepId) -> Result<StepId, WizardError> {
        self.ensure_interactive()?;
        if !self.step_ids().contains(&target) {
            return Err(WizardError::UnknownStep(target));
        }
        self.transition(target, false)
    }

    /// Leave the current step, then validate `target` before showing it.
    /// Moving forward into Preview visits every step instead.
    fn transition(&mut self, target: StepId, backwards: bool) -> Result<StepId, WizardError> {
        self.phase = WizardPhase::Navigating;
        if target == StepId::Preview && !backwards {
            self.visit_all_steps();
        } else if let Some(current) = self.current
            && self.step_ids().contains(&current)
        {
            self.visit_step(current)?;
        }

        self.phase = WizardPhase::Validating;
        self.validate_step(target)?;
        self.refresh();

        self.phase = WizardPhase::Navigating;
        debug!(from = ?self.current, to = %target, "wizard navigated");
        self.current = Some(target);
        Ok(target)
    }

    /// The payload the current form would submit. Unlike [`submit`](Self::submit)
    /// this neither creates labels nor closes the wizard.
    pub fn preview(&mut self) -> Result<LaunchPayload, WizardError> {
        self.ensure_interactive()?;
        self.visit_all_steps();
        if self.has_errors() {
            return Err(WizardError::HasErrors);
        }
        build_launch_payload(&self.ctx()).map_err(WizardError::Submit)
    }

    /// Build the launch payload, creating new labels first.
    ///
    /// Every step is visited before the error check, so a submission from
    /// any step surfaces all errors.
    pub async fn submit(&mut self, labels: &dyn LabelStore) -> Result<LaunchPayload, WizardError> {
        self.ensure_interactive()?;
        self.visit_all_steps();
        if self.has_errors() {
            return Err(WizardError::HasErrors);
        }

        self.phase = WizardPhase::Submitting;
        let built = build_launch_payload(&self.ctx());
        let organization = self.input.resource.organization;
        let result = match built {
            Ok(mut payload) => resolve_labels(&mut payload, labels, organization).await.map(|()| payload),
            Err(error) => Err(error),
        };
        match result {
            Ok(payload) => {
                info!(resource = self.input.resource.id, "launch prompts submitted");
                self.close();
                Ok(payload)
            }
            Err(error) => {
                self.phase = WizardPhase::Error;
                Err(WizardError::Submit(error))
            }
        }
    }

    /// Close the wizard. Later fetch results are ignored and the form is
    /// discarded.
    pub fn close(&mut self) {
        self.loader.close();
        self.form = FormState::default();
        self.visited.clear();
        self.current = None;
        self.phase = WizardPhase::Closed;
    }
}

use indexmap::IndexMap;
use serde_json::Value;

use super::{PromptStep, StepId};
use crate::form::{FormState, VisitedSet};

/// Final summary step. Never skippable; blocks submission while any other
/// step reports errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewStep {
    has_errors: bool,
}

impl PreviewStep {
    pub fn new(has_errors: bool) -> Self {
        Self { has_errors }
    }
}

impl PromptStep for PreviewStep {
    fn id(&self) -> StepId {
        StepId::Preview
    }

    fn field_names(&self) -> Vec<String> {
        Vec::new()
    }

    fn initial_values(&self) -> IndexMap<String, Value> {
        IndexMap::new()
    }

    fn field_errors(&self, _form: &FormState) -> IndexMap<String, String> {
        IndexMap::new()
    }

    fn is_errored(&self, _form: &FormState, _visited: &VisitedSet) -> bool {
        false
    }

    fn enable_next(&self) -> bool {
        !self.has_errors
    }
}

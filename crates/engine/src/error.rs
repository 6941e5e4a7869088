//! Error types surfaced by the wizard and the recurrence builder.

use std::fmt;

use thiserror::Error;

use crate::steps::StepId;

/// A step's supporting data could not be loaded. Shown in place of the
/// wizard body; never retried automatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentError {
    pub step: StepId,
    pub message: String,
}

impl fmt::Display for ContentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} step failed to load: {}", self.step, self.message)
    }
}

#[derive(Debug, Error)]
pub enum WizardError {
    #[error("the wizard is still loading")]
    NotReady,
    #[error("the wizard has been closed")]
    Closed,
    #[error("step '{0}' is not part of this wizard")]
    UnknownStep(StepId),
    #[error("there is no step in that direction")]
    NoAdjacentStep,
    #[error("the launch prompts contain errors")]
    HasErrors,
    #[error("{0}")]
    Content(ContentError),
    #[error("submission failed: {0:#}")]
    Submit(anyhow::Error),
}

/// Raised when schedule fields hold a value the builder has no case for.
///
/// These indicate the form's option lists and the builder disagree; they
/// are not user mistakes and are never shown as field errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("frequency did not match an expected value: '{0}'")]
    UnknownFrequency(String),
    #[error("end did not match an expected value: '{0}'")]
    UnknownEnd(String),
    #[error("run on did not match an expected value: '{0}'")]
    UnknownRunOn(String),
    #[error("day did not match an expected value: '{0}'")]
    UnknownDay(String),
    #[error("{field} is required for this frequency")]
    MissingField { field: &'static str },
    #[error("{field} must be an integer, got '{value}'")]
    InvalidNumber { field: &'static str, value: String },
    #[error("invalid timestamp '{0}', expected YYYY-MM-DDTHH:MM[:SS]")]
    InvalidTimestamp(String),
    #[error("malformed recurrence rule: {0}")]
    Malformed(String),
}

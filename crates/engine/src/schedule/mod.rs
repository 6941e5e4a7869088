//! Schedule recurrence rules.
//!
//! [`build_rule`] turns schedule form values into a [`RecurrenceSpec`],
//! whose `Display` is the exact text the controller stores. [`parse_rule`]
//! goes the other way for the edit flow.

mod builder;
mod parse;
mod payload;
mod rule;
mod validation;

use indexmap::IndexMap;
use thiserror::Error;

pub use builder::{build_rule, parse_form_timestamp};
pub use parse::{parse_recurrence, parse_rule};
pub use payload::{SchedulePayload, build_schedule_payload};
pub use rule::{Frequency, RecurrenceSpec, RuleComponent, STAMP_FORMAT, Weekday, days_for_token, token_for_days};
pub use validation::{
    DAY_NUMBER_MESSAGE, END_BEFORE_START_MESSAGE, INTEGER_MESSAGE, POSITIVE_MESSAGE, REQUIRED_CHOICE_MESSAGE,
    TIMESTAMP_MESSAGE, validate_schedule,
};

use crate::error::RuleError;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("schedule name must not be blank")]
    MissingName,
    #[error("schedule form has errors: {}", describe(.0))]
    Invalid(IndexMap<String, String>),
    #[error(transparent)]
    Rule(#[from] RuleError),
}

fn describe(errors: &IndexMap<String, String>) -> String {
    errors
        .iter()
        .map(|(field, message)| format!("{}: {}", field, message))
        .collect::<Vec<_>>()
        .join("; ")
}

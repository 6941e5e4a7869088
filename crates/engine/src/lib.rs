//! # Launchdeck Engine
//!
//! The engine behind the launch prompt wizard and the schedule editor. It
//! decides which prompt steps a template needs, validates what the user
//! entered, assembles the launch payload, and turns schedule form values
//! into the recurrence rule text the controller stores.
//!
//! ## Key Features
//!
//! - **Step registry**: one factory per promptable capability, composed in a
//!   fixed order with Preview last
//! - **Form state**: a single owner of values, errors and touch flags, reset
//!   without clobbering edits when the step set changes
//! - **Credential rules**: default-credential coverage and the password
//!   prompt ban for schedules and workflow nodes
//! - **Option loading**: generation-guarded fetches that drop stale results
//! - **Recurrence rules**: build and parse `DTSTART ... RRULE:...` text
//!
//! ## Usage
//!
//! ```rust
//! use launchdeck_engine::build_rule;
//! use launchdeck_types::ScheduleFormValues;
//!
//! let values = ScheduleFormValues {
//!     frequency: "week".to_string(),
//!     start_date_time: "2020-03-25T10:45:00".to_string(),
//!     days_of_week: vec!["MO".to_string(), "WE".to_string(), "FR".to_string()],
//!     ..ScheduleFormValues::default()
//! };
//! let rule = build_rule(&values)?;
//! assert_eq!(
//!     rule.to_string(),
//!     "DTSTART;TZID=America/New_York:20200325T104500 RRULE:INTERVAL=1;FREQ=WEEKLY;BYDAY=MO,WE,FR"
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - **`form`**: `FormState` and `VisitedSet`
//! - **`steps`**: the `PromptStep` trait, step factories and `build_steps`
//! - **`credentials`**: the credential compatibility validator
//! - **`loader`**: `OptionSource` and the generation-guarded `OptionLoader`
//! - **`wizard`**: `LaunchWizard`, navigation and submission
//! - **`payload`**: launch payload assembly and label creation
//! - **`schedule`**: recurrence rule builder, parser, validation and payload

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

pub mod credentials;
pub mod error;
pub mod form;
pub mod loader;
pub mod payload;
pub mod schedule;
pub mod steps;
pub mod wizard;

pub use credentials::{deselect_credential, select_credential, validate_credentials};
pub use error::{ContentError, RuleError, WizardError};
pub use form::{FormState, VisitedSet};
pub use loader::{FetchTicket, LoadState, OptionLoader, OptionQuery, OptionSource, fetch_lookup};
pub use payload::{LabelStore, LaunchPayload, build_launch_payload, resolve_labels};
pub use schedule::{
    Frequency, RecurrenceSpec, RuleComponent, ScheduleError, SchedulePayload, Weekday, build_rule,
    build_schedule_payload, parse_recurrence, parse_rule, validate_schedule,
};
pub use steps::{PromptStep, StepContext, StepId, WizardOptions, build_steps};
pub use wizard::{LaunchWizard, StepView, WizardInput, WizardPhase};

/// Loads a YAML or JSON document (schedule form values, survey answers,
/// launch configurations) from disk.
///
/// JSON is a subset of YAML, so a single YAML parse handles both.
///
/// # Errors
///
/// Fails when the file cannot be read or does not deserialize into `T`.
pub fn read_document<T: DeserializeOwned>(file_path: impl AsRef<Path>) -> Result<T> {
    let file_path = file_path.as_ref();
    let content =
        fs::read_to_string(file_path).with_context(|| format!("Failed to read document: {}", file_path.display()))?;
    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse document: {}", file_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use launchdeck_types::{FieldNumber, ScheduleFormValues};

    #[test]
    fn read_document_accepts_yaml_schedule_values() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("schedule.yaml");
        fs::write(
            &path,
            r#"
startDateTime: "2020-03-25T10:00"
frequency: month
runOn: day
runOnDayNumber: 15
"#,
        )
        .expect("write");

        let values: ScheduleFormValues = read_document(&path).expect("parse");
        assert_eq!(values.run_on_day_number, Some(FieldNumber::Integer(15)));
        assert!(build_rule(&values).expect("rule").to_string().ends_with("FREQ=MONTHLY;BYMONTHDAY=15"));
    }

    #[test]
    fn read_document_accepts_json() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("answers.json");
        fs::write(&path, r#"{ "survey_region": "us" }"#).expect("write");

        let answers: serde_json::Map<String, serde_json::Value> = read_document(&path).expect("parse");
        assert_eq!(answers["survey_region"], "us");
    }

    #[test]
    fn read_document_reports_missing_files() {
        let error = read_document::<ScheduleFormValues>("/nonexistent/schedule.yaml").expect_err("missing");
        assert!(error.to_string().contains("Failed to read document"));
    }
}

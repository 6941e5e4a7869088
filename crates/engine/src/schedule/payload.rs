use launchdeck_types::ScheduleFormValues;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::{ScheduleError, build_rule, validate_schedule};
use crate::payload::LaunchPayload;

/// Body of `POST <template>/schedules/`.
///
/// Credentials, labels and instance groups are associated with a schedule
/// through separate calls and are not part of this body.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchedulePayload {
    pub name: String,
    pub description: String,
    pub rrule: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub extra_data: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_environment: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_tags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_tags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scm_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbosity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forks: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_slice_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i64>,
}

/// Validate the schedule form, build its rule and attach any prompted
/// launch fields.
pub fn build_schedule_payload(
    name: &str,
    description: &str,
    values: &ScheduleFormValues,
    prompts: Option<&LaunchPayload>,
) -> Result<SchedulePayload, ScheduleError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ScheduleError::MissingName);
    }
    let errors = validate_schedule(values);
    if !errors.is_empty() {
        return Err(ScheduleError::Invalid(errors));
    }
    let rule = build_rule(values)?;

    let mut payload = SchedulePayload {
        name: name.to_string(),
        description: description.to_string(),
        rrule: rule.to_string(),
        ..SchedulePayload::default()
    };
    if let Some(prompts) = prompts {
        payload.extra_data = prompts.extra_data.clone();
        payload.inventory = prompts.inventory_id;
        payload.execution_environment = prompts.execution_environment;
        payload.job_type = prompts.job_type.clone();
        payload.limit = prompts.limit.clone();
        payload.job_tags = prompts.job_tags.clone();
        payload.skip_tags = prompts.skip_tags.clone();
        payload.scm_branch = prompts.scm_branch.clone();
        payload.verbosity = prompts.verbosity;
        payload.diff_mode = prompts.diff_mode;
        payload.forks = prompts.forks;
        payload.job_slice_count = prompts.job_slice_count;
        payload.timeout = prompts.timeout;
    }
    debug!(schedule = %payload.name, rrule = %payload.rrule, "built schedule payload");
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values() -> ScheduleFormValues {
        ScheduleFormValues {
            start_date_time: "2020-03-25T10:00:00".to_string(),
            ..ScheduleFormValues::default()
        }
    }

    #[test]
    fn payload_carries_rule_and_prompted_fields() {
        let mut prompts = LaunchPayload {
            inventory_id: Some(3),
            limit: Some("web".to_string()),
            credentials: Some(vec![9]),
            ..LaunchPayload::default()
        };
        prompts.extra_data.insert("region".to_string(), json!("us"));

        let payload = build_schedule_payload(" Nightly ", "", &values(), Some(&prompts)).expect("payload");
        assert_eq!(
            serde_json::to_value(&payload).expect("value"),
            json!({
                "name": "Nightly",
                "description": "",
                "rrule": "DTSTART;TZID=America/New_York:20200325T100000 RRULE:INTERVAL=1;COUNT=1;FREQ=MINUTELY",
                "extra_data": { "region": "us" },
                "inventory": 3,
                "limit": "web"
            })
        );
    }

    #[test]
    fn blank_name_and_invalid_fields_are_rejected() {
        assert!(matches!(
            build_schedule_payload("  ", "", &values(), None),
            Err(ScheduleError::MissingName)
        ));

        let mut invalid = values();
        invalid.frequency = "week".to_string();
        match build_schedule_payload("Weekly", "", &invalid, None) {
            Err(ScheduleError::Invalid(errors)) => assert!(errors.contains_key("daysOfWeek")),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn rule_faults_pass_through() {
        let mut invalid = values();
        invalid.frequency = "fortnight".to_string();
        assert!(matches!(
            build_schedule_payload("Odd", "", &invalid, None),
            Err(ScheduleError::Rule(_))
        ));
    }
}

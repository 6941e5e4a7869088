//! Schedule form values as edited by users.
//!
//! The fields are deliberately loose (strings for enumerations, numbers that
//! may still be text) because they mirror what a form holds before
//! validation. `launchdeck-engine` turns them into a typed recurrence rule.

use serde::{Deserialize, Serialize};

/// A numeric form input that may not have been parsed yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldNumber {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FieldNumber {
    /// The value as an integer, if it is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldNumber::Integer(value) => Some(*value),
            FieldNumber::Float(value) if value.fract() == 0.0 => Some(*value as i64),
            FieldNumber::Float(_) => None,
            FieldNumber::Text(text) => text.trim().parse::<i64>().ok(),
        }
    }

    /// True when the input holds nothing at all.
    pub fn is_empty(&self) -> bool {
        matches!(self, FieldNumber::Text(text) if text.trim().is_empty())
    }
}

impl From<i64> for FieldNumber {
    fn from(value: i64) -> Self {
        FieldNumber::Integer(value)
    }
}

/// Values of the schedule recurrence form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleFormValues {
    /// Local timestamp, `YYYY-MM-DDTHH:MM[:SS]`.
    pub start_date_time: String,
    /// IANA zone name.
    pub timezone: String,
    pub interval: Option<FieldNumber>,
    /// One of `none`, `minute`, `hour`, `day`, `week`, `month`, `year`.
    pub frequency: String,
    /// Two-letter weekday codes (`MO`, `TU`, ...) for weekly rules.
    pub days_of_week: Vec<String>,
    /// `day` or `the`.
    pub run_on: Option<String>,
    pub run_on_day_number: Option<FieldNumber>,
    pub run_on_day_month: Option<FieldNumber>,
    pub run_on_the_occurrence: Option<FieldNumber>,
    /// `sunday` .. `saturday`, `day`, `weekday` or `weekendDay`.
    pub run_on_the_day: Option<String>,
    pub run_on_the_month: Option<FieldNumber>,
    /// `never`, `after` or `onDate`.
    pub end: Option<String>,
    pub occurrences: Option<FieldNumber>,
    pub end_date_time: Option<String>,
}

impl Default for ScheduleFormValues {
    fn default() -> Self {
        Self {
            start_date_time: String::new(),
            timezone: "America/New_York".to_string(),
            interval: Some(FieldNumber::Integer(1)),
            frequency: "none".to_string(),
            days_of_week: Vec::new(),
            run_on: Some("day".to_string()),
            run_on_day_number: Some(FieldNumber::Integer(1)),
            run_on_day_month: Some(FieldNumber::Integer(1)),
            run_on_the_occurrence: Some(FieldNumber::Integer(1)),
            run_on_the_day: Some("sunday".to_string()),
            run_on_the_month: Some(FieldNumber::Integer(1)),
            end: Some("never".to_string()),
            occurrences: Some(FieldNumber::Integer(1)),
            end_date_time: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_fields_with_loose_numbers_deserialize() {
        let values: ScheduleFormValues = serde_yaml::from_str(
            r#"
startDateTime: "2020-03-25T10:00"
timezone: UTC
frequency: month
interval: "2"
runOn: the
runOnTheOccurrence: -1
runOnTheDay: tuesday
"#,
        )
        .expect("values parse");

        assert_eq!(values.interval.as_ref().and_then(FieldNumber::as_integer), Some(2));
        assert_eq!(values.run_on_the_occurrence, Some(FieldNumber::Integer(-1)));
        assert_eq!(values.end.as_deref(), Some("never"));
    }

    #[test]
    fn fractional_and_blank_inputs_are_not_integers() {
        assert_eq!(FieldNumber::Float(2.5).as_integer(), None);
        assert_eq!(FieldNumber::Float(3.0).as_integer(), Some(3));
        assert!(FieldNumber::Text("  ".to_string()).is_empty());
        assert_eq!(FieldNumber::Text("x".to_string()).as_integer(), None);
    }
}

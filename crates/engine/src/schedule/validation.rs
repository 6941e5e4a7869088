use indexmap::IndexMap;
use launchdeck_types::{FieldNumber, ScheduleFormValues};

use super::builder::parse_form_timestamp;

pub const INTEGER_MESSAGE: &str = "This field must be an integer";
pub const POSITIVE_MESSAGE: &str = "This field must be greater than 0";
pub const REQUIRED_CHOICE_MESSAGE: &str = "Select a value for this field";
pub const DAY_NUMBER_MESSAGE: &str = "Please select a day number between 1 and 31.";
pub const END_BEFORE_START_MESSAGE: &str = "Please select an end date/time that comes after the start date/time.";
pub const TIMESTAMP_MESSAGE: &str = "Please enter a valid date and time.";

fn check_positive(errors: &mut IndexMap<String, String>, field: &str, value: Option<&FieldNumber>) {
    let Some(value) = value.filter(|value| !value.is_empty()) else {
        errors.insert(field.to_string(), REQUIRED_CHOICE_MESSAGE.to_string());
        return;
    };
    match value.as_integer() {
        None => {
            errors.insert(field.to_string(), INTEGER_MESSAGE.to_string());
        }
        Some(number) if number <= 0 => {
            errors.insert(field.to_string(), POSITIVE_MESSAGE.to_string());
        }
        Some(_) => {}
    }
}

fn check_choice(errors: &mut IndexMap<String, String>, field: &str, value: Option<&String>) {
    if value.is_none_or(|value| value.is_empty()) {
        errors.insert(field.to_string(), REQUIRED_CHOICE_MESSAGE.to_string());
    }
}

fn check_number_present(errors: &mut IndexMap<String, String>, field: &str, value: Option<&FieldNumber>) {
    match value.filter(|value| !value.is_empty()) {
        None => {
            errors.insert(field.to_string(), REQUIRED_CHOICE_MESSAGE.to_string());
        }
        Some(value) if value.as_integer().is_none() => {
            errors.insert(field.to_string(), INTEGER_MESSAGE.to_string());
        }
        Some(_) => {}
    }
}

/// Field errors of a schedule form, keyed by form field name.
///
/// Only user mistakes are reported here. Values outside the form's option
/// lists (an unknown frequency, say) are left for [`build_rule`](super::build_rule)
/// to reject.
pub fn validate_schedule(values: &ScheduleFormValues) -> IndexMap<String, String> {
    let mut errors = IndexMap::new();

    let start = if values.start_date_time.trim().is_empty() {
        errors.insert("startDateTime".to_string(), REQUIRED_CHOICE_MESSAGE.to_string());
        None
    } else {
        match parse_form_timestamp(&values.start_date_time) {
            Ok(start) => Some(start),
            Err(_) => {
                errors.insert("startDateTime".to_string(), TIMESTAMP_MESSAGE.to_string());
                None
            }
        }
    };
    if values.timezone.trim().is_empty() {
        errors.insert("timezone".to_string(), REQUIRED_CHOICE_MESSAGE.to_string());
    }

    let frequency = values.frequency.as_str();
    if frequency == "none" {
        return errors;
    }
    check_positive(&mut errors, "interval", values.interval.as_ref());

    if frequency == "week" && values.days_of_week.is_empty() {
        errors.insert("daysOfWeek".to_string(), REQUIRED_CHOICE_MESSAGE.to_string());
    }

    if matches!(frequency, "month" | "year") {
        match values.run_on.as_deref() {
            Some("day") => {
                let day_number = values.run_on_day_number.as_ref().filter(|value| !value.is_empty());
                match day_number.map(FieldNumber::as_integer) {
                    None => {
                        errors.insert("runOnDayNumber".to_string(), REQUIRED_CHOICE_MESSAGE.to_string());
                    }
                    Some(None) => {
                        errors.insert("runOnDayNumber".to_string(), INTEGER_MESSAGE.to_string());
                    }
                    Some(Some(day)) if !(1..=31).contains(&day) => {
                        errors.insert("runOnDayNumber".to_string(), DAY_NUMBER_MESSAGE.to_string());
                    }
                    Some(Some(_)) => {}
                }
                if frequency == "year" {
                    check_number_present(&mut errors, "runOnDayMonth", values.run_on_day_month.as_ref());
                }
            }
            Some("the") => {
                check_number_present(&mut errors, "runOnTheOccurrence", values.run_on_the_occurrence.as_ref());
                check_choice(&mut errors, "runOnTheDay", values.run_on_the_day.as_ref());
                if frequency == "year" {
                    check_number_present(&mut errors, "runOnTheMonth", values.run_on_the_month.as_ref());
                }
            }
            Some(_) => {}
            None => {
                errors.insert("runOn".to_string(), REQUIRED_CHOICE_MESSAGE.to_string());
            }
        }
    }

    match values.end.as_deref() {
        Some("after") => check_positive(&mut errors, "occurrences", values.occurrences.as_ref()),
        Some("onDate") => match values.end_date_time.as_deref().filter(|end| !end.trim().is_empty()) {
            None => {
                errors.insert("endDateTime".to_string(), REQUIRED_CHOICE_MESSAGE.to_string());
            }
            Some(end) => match parse_form_timestamp(end) {
                Err(_) => {
                    errors.insert("endDateTime".to_string(), TIMESTAMP_MESSAGE.to_string());
                }
                Ok(end) if start.is_some_and(|start| end <= start) => {
                    errors.insert("endDateTime".to_string(), END_BEFORE_START_MESSAGE.to_string());
                }
                Ok(_) => {}
            },
        },
        _ => {}
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(frequency: &str) -> ScheduleFormValues {
        ScheduleFormValues {
            frequency: frequency.to_string(),
            start_date_time: "2020-03-25T10:00:00".to_string(),
            ..ScheduleFormValues::default()
        }
    }

    #[test]
    fn defaults_are_valid_for_every_frequency_but_week() {
        for frequency in ["none", "minute", "hour", "day", "month", "year"] {
            assert!(validate_schedule(&form(frequency)).is_empty(), "{frequency}");
        }
        assert_eq!(validate_schedule(&form("week"))["daysOfWeek"], REQUIRED_CHOICE_MESSAGE);
    }

    #[test]
    fn interval_must_be_a_positive_integer() {
        let mut values = form("day");
        values.interval = Some(FieldNumber::Text("two".to_string()));
        assert_eq!(validate_schedule(&values)["interval"], INTEGER_MESSAGE);

        values.interval = Some(FieldNumber::Integer(0));
        assert_eq!(validate_schedule(&values)["interval"], POSITIVE_MESSAGE);
    }

    #[test]
    fn day_number_must_be_in_month_range() {
        let mut values = form("month");
        values.run_on_day_number = Some(FieldNumber::Integer(32));
        assert_eq!(validate_schedule(&values)["runOnDayNumber"], DAY_NUMBER_MESSAGE);
    }

    #[test]
    fn end_date_must_follow_start() {
        let mut values = form("day");
        values.end = Some("onDate".to_string());
        values.end_date_time = Some("2020-03-25T09:00".to_string());
        assert_eq!(validate_schedule(&values)["endDateTime"], END_BEFORE_START_MESSAGE);

        values.end_date_time = Some("2020-03-26T09:00".to_string());
        assert!(validate_schedule(&values).is_empty());
    }

    #[test]
    fn occurrences_must_be_positive() {
        let mut values = form("hour");
        values.end = Some("after".to_string());
        values.occurrences = Some(FieldNumber::Integer(-3));
        assert_eq!(validate_schedule(&values)["occurrences"], POSITIVE_MESSAGE);
    }
}

use chrono::NaiveDateTime;
use launchdeck_types::{FieldNumber, ScheduleFormValues};
use tracing::debug;

use super::rule::{Frequency, RecurrenceSpec, RuleComponent, Weekday, days_for_token};
use crate::error::RuleError;

const FORM_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Parse a form timestamp, `YYYY-MM-DDTHH:MM[:SS]`. Seconds default to 0.
pub fn parse_form_timestamp(value: &str) -> Result<NaiveDateTime, RuleError> {
    let trimmed = value.trim();
    FORM_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| RuleError::InvalidTimestamp(value.to_string()))
}

fn required_integer(field: &'static str, value: Option<&FieldNumber>) -> Result<i64, RuleError> {
    let value = value.filter(|number| !number.is_empty()).ok_or(RuleError::MissingField { field })?;
    value.as_integer().ok_or_else(|| RuleError::InvalidNumber {
        field,
        value: match value {
            FieldNumber::Text(text) => text.clone(),
            FieldNumber::Integer(number) => number.to_string(),
            FieldNumber::Float(number) => number.to_string(),
        },
    })
}

fn required_text<'a>(field: &'static str, value: Option<&'a String>) -> Result<&'a str, RuleError> {
    value
        .map(String::as_str)
        .filter(|text| !text.is_empty())
        .ok_or(RuleError::MissingField { field })
}

/// Build the recurrence rule described by schedule form values.
///
/// Unknown `frequency`, `end`, `runOn` or day tokens are faults of the
/// caller's option lists and come back as [`RuleError`].
pub fn build_rule(values: &ScheduleFormValues) -> Result<RecurrenceSpec, RuleError> {
    let frequency = match values.frequency.as_str() {
        "none" => None,
        "minute" => Some(Frequency::Minutely),
        "hour" => Some(Frequency::Hourly),
        "day" => Some(Frequency::Daily),
        "week" => Some(Frequency::Weekly),
        "month" => Some(Frequency::Monthly),
        "year" => Some(Frequency::Yearly),
        other => return Err(RuleError::UnknownFrequency(other.to_string())),
    };

    let dtstart = parse_form_timestamp(&values.start_date_time)?;
    let mut rule = RecurrenceSpec::new(dtstart, values.timezone.clone());

    if let Some(interval) = values.interval.as_ref().filter(|interval| !interval.is_empty()) {
        rule.push(RuleComponent::Interval(required_integer("interval", Some(interval))?));
    }

    let Some(frequency) = frequency else {
        rule.push(RuleComponent::Count(1));
        rule.push(RuleComponent::Freq(Frequency::Minutely));
        debug!(rule = %rule, "built run-once rule");
        return Ok(rule);
    };
    rule.push(RuleComponent::Freq(frequency));

    match frequency {
        Frequency::Weekly => {
            let days = values
                .days_of_week
                .iter()
                .map(|code| Weekday::parse(code))
                .collect::<Result<Vec<_>, _>>()?;
            rule.push(RuleComponent::ByDay(days));
        }
        Frequency::Monthly | Frequency::Yearly => push_run_on(&mut rule, values, frequency)?,
        _ => {}
    }

    match values.end.as_deref().unwrap_or("never") {
        "never" => {}
        "after" => {
            let occurrences = required_integer("occurrences", values.occurrences.as_ref())?;
            rule.push(RuleComponent::Count(occurrences));
        }
        "onDate" => {
            let end = required_text("endDateTime", values.end_date_time.as_ref())?;
            rule.push(RuleComponent::Until(parse_form_timestamp(end)?));
        }
        other => return Err(RuleError::UnknownEnd(other.to_string())),
    }

    debug!(rule = %rule, "built recurrence rule");
    Ok(rule)
}

/// Day-of-month or nth-weekday qualifiers for monthly and yearly rules.
fn push_run_on(rule: &mut RecurrenceSpec, values: &ScheduleFormValues, frequency: Frequency) -> Result<(), RuleError> {
    let yearly = frequency == Frequency::Yearly;
    match required_text("runOn", values.run_on.as_ref())? {
        "day" => {
            if yearly {
                rule.push(RuleComponent::ByMonth(required_integer(
                    "runOnDayMonth",
                    values.run_on_day_month.as_ref(),
                )?));
            }
            rule.push(RuleComponent::ByMonthDay(required_integer(
                "runOnDayNumber",
                values.run_on_day_number.as_ref(),
            )?));
        }
        "the" => {
            rule.push(RuleComponent::BySetPos(required_integer(
                "runOnTheOccurrence",
                values.run_on_the_occurrence.as_ref(),
            )?));
            let token = required_text("runOnTheDay", values.run_on_the_day.as_ref())?;
            rule.push(RuleComponent::ByDay(days_for_token(token)?));
            if yearly {
                rule.push(RuleComponent::ByMonth(required_integer(
                    "runOnTheMonth",
                    values.run_on_the_month.as_ref(),
                )?));
            }
        }
        other => return Err(RuleError::UnknownRunOn(other.to_string())),
    }
    Ok(())
}

//! Turn a stored rule back into schedule form values for editing.

use chrono::NaiveDateTime;
use launchdeck_types::{FieldNumber, ScheduleFormValues};

use super::rule::{Frequency, RecurrenceSpec, RuleComponent, STAMP_FORMAT, Weekday, token_for_days};
use crate::error::RuleError;

const FORM_TIMESTAMP: &str = "%Y-%m-%dT%H:%M:%S";

fn parse_stamp(value: &str) -> Result<NaiveDateTime, RuleError> {
    let stamp = value.strip_suffix('Z').unwrap_or(value);
    NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).map_err(|_| RuleError::InvalidTimestamp(value.to_string()))
}

fn parse_number(key: &str, value: &str) -> Result<i64, RuleError> {
    value
        .parse()
        .map_err(|_| RuleError::Malformed(format!("{} is not an integer: '{}'", key, value)))
}

/// Parse `DTSTART[;TZID=<zone>]:<stamp> RRULE:<components>` into a typed rule.
///
/// A `DTSTART` without `TZID` is taken as UTC. Newlines between the two
/// parts are accepted.
pub fn parse_recurrence(text: &str) -> Result<RecurrenceSpec, RuleError> {
    let mut parts = text.split_whitespace();
    let (Some(start), Some(rrule), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(RuleError::Malformed("expected a DTSTART and an RRULE part".to_string()));
    };

    let start = start
        .strip_prefix("DTSTART")
        .ok_or_else(|| RuleError::Malformed(format!("expected DTSTART, got '{}'", start)))?;
    let (tzid, stamp) = match start.strip_prefix(";TZID=") {
        Some(rest) => rest
            .split_once(':')
            .ok_or_else(|| RuleError::Malformed("DTSTART has no timestamp".to_string()))?,
        None => (
            "UTC",
            start
                .strip_prefix(':')
                .ok_or_else(|| RuleError::Malformed("DTSTART has no timestamp".to_string()))?,
        ),
    };
    let mut rule = RecurrenceSpec::new(parse_stamp(stamp)?, tzid);

    let components = rrule
        .strip_prefix("RRULE:")
        .ok_or_else(|| RuleError::Malformed(format!("expected RRULE, got '{}'", rrule)))?;
    for component in components.split(';').filter(|component| !component.is_empty()) {
        let (key, value) = component
            .split_once('=')
            .ok_or_else(|| RuleError::Malformed(format!("component without value: '{}'", component)))?;
        rule.push(match key {
            "INTERVAL" => RuleComponent::Interval(parse_number(key, value)?),
            "COUNT" => RuleComponent::Count(parse_number(key, value)?),
            "UNTIL" => RuleComponent::Until(parse_stamp(value)?),
            "FREQ" => RuleComponent::Freq(Frequency::parse(value)?),
            "BYDAY" => RuleComponent::ByDay(
                value
                    .split(',')
                    .map(Weekday::parse)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            "BYMONTHDAY" => RuleComponent::ByMonthDay(parse_number(key, value)?),
            "BYSETPOS" => RuleComponent::BySetPos(parse_number(key, value)?),
            "BYMONTH" => RuleComponent::ByMonth(parse_number(key, value)?),
            other => return Err(RuleError::Malformed(format!("unsupported component '{}'", other))),
        });
    }
    Ok(rule)
}

/// Inverse of [`build_rule`](super::build_rule): the form values that would
/// rebuild `text`.
pub fn parse_rule(text: &str) -> Result<ScheduleFormValues, RuleError> {
    let rule = parse_recurrence(text)?;
    let freq = rule
        .freq()
        .ok_or_else(|| RuleError::Malformed("rule has no FREQ".to_string()))?;

    let mut values = ScheduleFormValues {
        start_date_time: rule.dtstart.format(FORM_TIMESTAMP).to_string(),
        timezone: rule.tzid.clone(),
        interval: None,
        end: Some("never".to_string()),
        ..ScheduleFormValues::default()
    };

    if rule.is_run_once() {
        values.frequency = "none".to_string();
        values.interval = rule.components.iter().find_map(|component| match component {
            RuleComponent::Interval(interval) => Some(FieldNumber::Integer(*interval)),
            _ => None,
        });
        return Ok(values);
    }
    values.frequency = freq.form_name().to_string();

    let by_set_pos = rule
        .components
        .iter()
        .any(|component| matches!(component, RuleComponent::BySetPos(_)));
    for component in &rule.components {
        match component {
            RuleComponent::Interval(interval) => values.interval = Some(FieldNumber::Integer(*interval)),
            RuleComponent::Freq(_) => {}
            RuleComponent::Count(count) => {
                values.end = Some("after".to_string());
                values.occurrences = Some(FieldNumber::Integer(*count));
            }
            RuleComponent::Until(until) => {
                values.end = Some("onDate".to_string());
                values.end_date_time = Some(until.format(FORM_TIMESTAMP).to_string());
            }
            RuleComponent::ByDay(days) if freq == Frequency::Weekly => {
                values.days_of_week = days.iter().map(|day| day.as_str().to_string()).collect();
            }
            RuleComponent::ByDay(days) if by_set_pos => {
                values.run_on_the_day = Some(token_for_days(days)?.to_string());
            }
            RuleComponent::ByDay(_) => {
                return Err(RuleError::Malformed(format!(
                    "BYDAY needs BYSETPOS for {} rules",
                    freq.as_str()
                )));
            }
            RuleComponent::BySetPos(position) => {
                values.run_on = Some("the".to_string());
                values.run_on_the_occurrence = Some(FieldNumber::Integer(*position));
            }
            RuleComponent::ByMonthDay(day) => {
                values.run_on = Some("day".to_string());
                values.run_on_day_number = Some(FieldNumber::Integer(*day));
            }
            RuleComponent::ByMonth(month) if by_set_pos => {
                values.run_on_the_month = Some(FieldNumber::Integer(*month));
            }
            RuleComponent::ByMonth(month) => values.run_on_day_month = Some(FieldNumber::Integer(*month)),
        }
    }
    Ok(values)
}

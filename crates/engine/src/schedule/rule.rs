//! Typed recurrence rules and their wire text.
//!
//! The wire shape is `DTSTART;TZID=<zone>:<stamp> RRULE:<KEY>=<value>;...`
//! with components in the order they were added. The controller's parser
//! is order-sensitive in practice, so components are kept as a list rather
//! than a struct of optionals.

use std::fmt;

use chrono::NaiveDateTime;

use crate::error::RuleError;

/// Timestamp layout used by `DTSTART` and `UNTIL`.
pub const STAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Minutely => "MINUTELY",
            Frequency::Hourly => "HOURLY",
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        }
    }

    pub fn parse(value: &str) -> Result<Self, RuleError> {
        Ok(match value {
            "MINUTELY" => Frequency::Minutely,
            "HOURLY" => Frequency::Hourly,
            "DAILY" => Frequency::Daily,
            "WEEKLY" => Frequency::Weekly,
            "MONTHLY" => Frequency::Monthly,
            "YEARLY" => Frequency::Yearly,
            other => return Err(RuleError::UnknownFrequency(other.to_string())),
        })
    }

    /// The schedule form's name for this frequency.
    pub fn form_name(self) -> &'static str {
        match self {
            Frequency::Minutely => "minute",
            Frequency::Hourly => "hour",
            Frequency::Daily => "day",
            Frequency::Weekly => "week",
            Frequency::Monthly => "month",
            Frequency::Yearly => "year",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];
    pub const WEEKDAYS: [Weekday; 5] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
    ];
    pub const WEEKEND: [Weekday; 2] = [Weekday::Saturday, Weekday::Sunday];

    pub fn as_str(self) -> &'static str {
        match self {
            Weekday::Monday => "MO",
            Weekday::Tuesday => "TU",
            Weekday::Wednesday => "WE",
            Weekday::Thursday => "TH",
            Weekday::Friday => "FR",
            Weekday::Saturday => "SA",
            Weekday::Sunday => "SU",
        }
    }

    /// Parse a two-letter code. Lowercase codes are accepted.
    pub fn parse(code: &str) -> Result<Self, RuleError> {
        let upper = code.trim().to_ascii_uppercase();
        Weekday::ALL
            .into_iter()
            .find(|day| day.as_str() == upper)
            .ok_or_else(|| RuleError::UnknownDay(code.to_string()))
    }

    /// Full lowercase name as used by the "run on the" day picker.
    pub fn name(self) -> &'static str {
        match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
            Weekday::Sunday => "sunday",
        }
    }
}

/// Days selected by a "run on the" day token.
pub fn days_for_token(token: &str) -> Result<Vec<Weekday>, RuleError> {
    match token {
        "day" => Ok(Weekday::ALL.to_vec()),
        "weekday" => Ok(Weekday::WEEKDAYS.to_vec()),
        "weekendDay" => Ok(Weekday::WEEKEND.to_vec()),
        name => Weekday::ALL
            .into_iter()
            .find(|day| day.name() == name)
            .map(|day| vec![day])
            .ok_or_else(|| RuleError::UnknownDay(name.to_string())),
    }
}

/// Inverse of [`days_for_token`].
pub fn token_for_days(days: &[Weekday]) -> Result<&'static str, RuleError> {
    let mut sorted = days.to_vec();
    sorted.sort();
    sorted.dedup();
    match sorted.as_slice() {
        [single] => Ok(single.name()),
        set if set == Weekday::ALL => Ok("day"),
        set if set == Weekday::WEEKDAYS => Ok("weekday"),
        set if set == Weekday::WEEKEND => Ok("weekendDay"),
        other => Err(RuleError::UnknownDay(join_days(other))),
    }
}

fn join_days(days: &[Weekday]) -> String {
    days.iter().map(|day| day.as_str()).collect::<Vec<_>>().join(",")
}

/// One `KEY=value` pair of an `RRULE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleComponent {
    Interval(i64),
    Count(i64),
    Until(NaiveDateTime),
    Freq(Frequency),
    ByDay(Vec<Weekday>),
    ByMonthDay(i64),
    BySetPos(i64),
    ByMonth(i64),
}

impl fmt::Display for RuleComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleComponent::Interval(value) => write!(f, "INTERVAL={}", value),
            RuleComponent::Count(value) => write!(f, "COUNT={}", value),
            RuleComponent::Until(value) => write!(f, "UNTIL={}", value.format(STAMP_FORMAT)),
            RuleComponent::Freq(value) => write!(f, "FREQ={}", value.as_str()),
            RuleComponent::ByDay(days) => write!(f, "BYDAY={}", join_days(days)),
            RuleComponent::ByMonthDay(value) => write!(f, "BYMONTHDAY={}", value),
            RuleComponent::BySetPos(value) => write!(f, "BYSETPOS={}", value),
            RuleComponent::ByMonth(value) => write!(f, "BYMONTH={}", value),
        }
    }
}

/// A start time in a named zone plus an ordered list of rule components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceSpec {
    pub dtstart: NaiveDateTime,
    pub tzid: String,
    pub components: Vec<RuleComponent>,
}

impl RecurrenceSpec {
    pub fn new(dtstart: NaiveDateTime, tzid: impl Into<String>) -> Self {
        Self {
            dtstart,
            tzid: tzid.into(),
            components: Vec::new(),
        }
    }

    pub fn push(&mut self, component: RuleComponent) {
        self.components.push(component);
    }

    pub fn freq(&self) -> Option<Frequency> {
        self.components.iter().find_map(|component| match component {
            RuleComponent::Freq(freq) => Some(*freq),
            _ => None,
        })
    }

    pub fn count(&self) -> Option<i64> {
        self.components.iter().find_map(|component| match component {
            RuleComponent::Count(count) => Some(*count),
            _ => None,
        })
    }

    pub fn until(&self) -> Option<NaiveDateTime> {
        self.components.iter().find_map(|component| match component {
            RuleComponent::Until(until) => Some(*until),
            _ => None,
        })
    }

    /// True for the "run once" encoding, `COUNT=1;FREQ=MINUTELY`.
    pub fn is_run_once(&self) -> bool {
        self.freq() == Some(Frequency::Minutely) && self.count() == Some(1)
    }
}

impl fmt::Display for RecurrenceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DTSTART;TZID={}:{} RRULE:", self.tzid, self.dtstart.format(STAMP_FORMAT))?;
        for (index, component) in self.components.iter().enumerate() {
            if index > 0 {
                f.write_str(";")?;
            }
            write!(f, "{}", component)?;
        }
        Ok(())
    }
}

//! Recurrence rules and next-occurrence computation.
//!
//! A task's recurrence is stored as a type tag plus a JSON rule payload. At the
//! boundary that loose pair is parsed into [`Recurrence`], a sum type with one
//! variant per kind, so the computation below matches exhaustively instead of
//! probing a dictionary.
//!
//! Every computed date is strictly after the supplied `today`, never merely
//! after the previous due date: a task completed months late does not come back
//! overdue.

use chrono::{Datelike, NaiveDate};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Upper bound on the number of entries in a custom-dates rule.
pub const MAX_CUSTOM_DATES: usize = 52;

/// Number of calendar years (starting with the current one) searched for the
/// next custom date.
const CUSTOM_DATES_SCAN_YEARS: i32 = 3;

const WEEKDAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceValidationError {
    #[error("Invalid recurrence type: '{0}'. Must be one of none, daily, weekly, monthly, yearly, custom_dates.")]
    UnknownType(String),

    #[error("Malformed {kind} rule: {reason}")]
    MalformedRule { kind: &'static str, reason: String },

    #[error("{kind} recurrence requires '{field}'.")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },

    #[error("Weekly recurrence requires a non-empty 'days' list.")]
    EmptyWeekdays,

    #[error("Invalid weekday: {0}. Valid days are 0 (Monday) through 6 (Sunday).")]
    InvalidWeekday(i64),

    #[error("Invalid day_of_month: {0}. Must be between 1 and 31.")]
    InvalidDayOfMonth(i64),

    #[error("Invalid month: {0}. Must be between 1 and 12.")]
    InvalidMonth(i64),

    #[error("Invalid day: {0}. Must be between 1 and 31.")]
    InvalidDay(i64),

    #[error("Custom dates recurrence requires a non-empty 'dates' list.")]
    EmptyDates,

    #[error("Custom dates list cannot exceed {MAX_CUSTOM_DATES} entries (got {0}).")]
    TooManyDates(usize),

    #[error("Invalid date format: '{0}'. Expected MM-DD format.")]
    InvalidMonthDay(String),
}

/// A month/day pair without a year, written `MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthDay {
    month: u32,
    day: u32,
}

impl MonthDay {
    pub fn new(month: u32, day: u32) -> Result<Self, RecurrenceValidationError> {
        if !(1..=12).contains(&month) {
            return Err(RecurrenceValidationError::InvalidMonth(month as i64));
        }
        if !(1..=31).contains(&day) {
            return Err(RecurrenceValidationError::InvalidDay(day as i64));
        }
        Ok(Self { month, day })
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    /// This month/day in `year`, with the day clamped to the month's length.
    pub fn in_year(&self, year: i32) -> Option<NaiveDate> {
        clamped_date(year, self.month, self.day)
    }
}

impl FromStr for MonthDay {
    type Err = RecurrenceValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RecurrenceValidationError::InvalidMonthDay(s.to_string());
        let bytes = s.as_bytes();
        let well_formed = bytes.len() == 5
            && bytes[2] == b'-'
            && bytes[..2].iter().all(u8::is_ascii_digit)
            && bytes[3..].iter().all(u8::is_ascii_digit);
        if !well_formed {
            return Err(invalid());
        }
        let month: u32 = s[..2].parse().map_err(|_| invalid())?;
        let day: u32 = s[3..].parse().map_err(|_| invalid())?;
        MonthDay::new(month, day).map_err(|_| invalid())
    }
}

impl fmt::Display for MonthDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}", self.month, self.day)
    }
}

/// How a task repeats once completed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    /// Weekday indices, Monday = 0.
    Weekly { days: BTreeSet<u32> },
    /// Clamped to the length of the target month.
    Monthly { day_of_month: u32 },
    Yearly { month: u32, day: u32 },
    /// Searched in list order within each year.
    CustomDates { dates: Vec<MonthDay> },
}

impl Recurrence {
    /// Stored type tags, in declaration order.
    pub const KINDS: [&'static str; 6] = [
        "none",
        "daily",
        "weekly",
        "monthly",
        "yearly",
        "custom_dates",
    ];

    /// Parses a stored `(type, rule)` pair and validates it.
    pub fn from_parts(kind: &str, rule: &Value) -> Result<Self, RecurrenceValidationError> {
        let recurrence = match kind {
            "none" => Recurrence::None,
            "daily" => Recurrence::Daily,
            "weekly" => {
                let raw: WeeklyRule = parse_rule("weekly", rule)?;
                if raw.days.is_empty() {
                    return Err(RecurrenceValidationError::EmptyWeekdays);
                }
                let mut days = BTreeSet::new();
                for day in raw.days {
                    if !(0..=6).contains(&day) {
                        return Err(RecurrenceValidationError::InvalidWeekday(day));
                    }
                    days.insert(day as u32);
                }
                Recurrence::Weekly { days }
            }
            "monthly" => {
                let raw: MonthlyRule = parse_rule("monthly", rule)?;
                let day_of_month = raw.day_of_month.ok_or(RecurrenceValidationError::MissingField {
                    kind: "monthly",
                    field: "day_of_month",
                })?;
                if !(1..=31).contains(&day_of_month) {
                    return Err(RecurrenceValidationError::InvalidDayOfMonth(day_of_month));
                }
                Recurrence::Monthly {
                    day_of_month: day_of_month as u32,
                }
            }
            "yearly" => {
                let raw: YearlyRule = parse_rule("yearly", rule)?;
                let month = raw.month.ok_or(RecurrenceValidationError::MissingField {
                    kind: "yearly",
                    field: "month",
                })?;
                let day = raw.day.ok_or(RecurrenceValidationError::MissingField {
                    kind: "yearly",
                    field: "day",
                })?;
                if !(1..=12).contains(&month) {
                    return Err(RecurrenceValidationError::InvalidMonth(month));
                }
                if !(1..=31).contains(&day) {
                    return Err(RecurrenceValidationError::InvalidDay(day));
                }
                Recurrence::Yearly {
                    month: month as u32,
                    day: day as u32,
                }
            }
            "custom_dates" => {
                let raw: CustomDatesRule = parse_rule("custom_dates", rule)?;
                if raw.dates.is_empty() {
                    return Err(RecurrenceValidationError::EmptyDates);
                }
                if raw.dates.len() > MAX_CUSTOM_DATES {
                    return Err(RecurrenceValidationError::TooManyDates(raw.dates.len()));
                }
                let dates = raw
                    .dates
                    .iter()
                    .map(|entry| entry.parse::<MonthDay>())
                    .collect::<Result<Vec<_>, _>>()?;
                Recurrence::CustomDates { dates }
            }
            other => return Err(RecurrenceValidationError::UnknownType(other.to_string())),
        };
        Ok(recurrence)
    }

    /// Checks a value built in code rather than parsed from storage.
    pub fn validate(&self) -> Result<(), RecurrenceValidationError> {
        match self {
            Recurrence::None | Recurrence::Daily => Ok(()),
            Recurrence::Weekly { days } => {
                if days.is_empty() {
                    return Err(RecurrenceValidationError::EmptyWeekdays);
                }
                match days.iter().find(|day| **day > 6) {
                    Some(day) => Err(RecurrenceValidationError::InvalidWeekday(*day as i64)),
                    None => Ok(()),
                }
            }
            Recurrence::Monthly { day_of_month } => {
                if (1..=31).contains(day_of_month) {
                    Ok(())
                } else {
                    Err(RecurrenceValidationError::InvalidDayOfMonth(*day_of_month as i64))
                }
            }
            Recurrence::Yearly { month, day } => MonthDay::new(*month, *day).map(|_| ()),
            Recurrence::CustomDates { dates } => {
                if dates.is_empty() {
                    Err(RecurrenceValidationError::EmptyDates)
                } else if dates.len() > MAX_CUSTOM_DATES {
                    Err(RecurrenceValidationError::TooManyDates(dates.len()))
                } else {
                    Ok(())
                }
            }
        }
    }

    /// The stored type tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Recurrence::None => "none",
            Recurrence::Daily => "daily",
            Recurrence::Weekly { .. } => "weekly",
            Recurrence::Monthly { .. } => "monthly",
            Recurrence::Yearly { .. } => "yearly",
            Recurrence::CustomDates { .. } => "custom_dates",
        }
    }

    /// The stored rule payload.
    pub fn rule(&self) -> Value {
        match self {
            Recurrence::None | Recurrence::Daily => json!({}),
            Recurrence::Weekly { days } => json!({ "days": days }),
            Recurrence::Monthly { day_of_month } => json!({ "day_of_month": day_of_month }),
            Recurrence::Yearly { month, day } => json!({ "month": month, "day": day }),
            Recurrence::CustomDates { dates } => {
                let dates: Vec<String> = dates.iter().map(MonthDay::to_string).collect();
                json!({ "dates": dates })
            }
        }
    }

    pub fn is_recurring(&self) -> bool {
        !matches!(self, Recurrence::None)
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recurrence::None => write!(f, "none"),
            Recurrence::Daily => write!(f, "daily"),
            Recurrence::Weekly { days } => {
                let names: Vec<&str> = days
                    .iter()
                    .filter_map(|day| WEEKDAY_NAMES.get(*day as usize).copied())
                    .collect();
                write!(f, "weekly on {}", names.join(", "))
            }
            Recurrence::Monthly { day_of_month } => write!(f, "monthly on day {}", day_of_month),
            Recurrence::Yearly { month, day } => write!(f, "yearly on {:02}-{:02}", month, day),
            Recurrence::CustomDates { dates } => {
                let dates: Vec<String> = dates.iter().map(MonthDay::to_string).collect();
                write!(f, "on {}", dates.join(", "))
            }
        }
    }
}

#[derive(Deserialize)]
struct WeeklyRule {
    #[serde(default)]
    days: Vec<i64>,
}

#[derive(Deserialize)]
struct MonthlyRule {
    day_of_month: Option<i64>,
}

#[derive(Deserialize)]
struct YearlyRule {
    month: Option<i64>,
    day: Option<i64>,
}

#[derive(Deserialize)]
struct CustomDatesRule {
    #[serde(default)]
    dates: Vec<String>,
}

fn parse_rule<T: DeserializeOwned>(
    kind: &'static str,
    rule: &Value,
) -> Result<T, RecurrenceValidationError> {
    let rule = if rule.is_null() { json!({}) } else { rule.clone() };
    serde_json::from_value(rule).map_err(|e| RecurrenceValidationError::MalformedRule {
        kind,
        reason: e.to_string(),
    })
}

/// Validates a loosely typed `(type, rule)` pair, returning the typed rule.
pub fn validate_recurrence_rule(
    kind: &str,
    rule: &Value,
) -> Result<Recurrence, RecurrenceValidationError> {
    Recurrence::from_parts(kind, rule)
}

/// Computes the due date of the occurrence that follows `current_due`.
///
/// Returns `None` for [`Recurrence::None`] and for rules that cannot produce
/// a date (an empty weekday set or date list). Any returned date is strictly
/// after `today`.
pub fn compute_next_due_date(
    recurrence: &Recurrence,
    current_due: Option<NaiveDate>,
    today: NaiveDate,
) -> Option<NaiveDate> {
    let base = current_due.unwrap_or(today);

    match recurrence {
        Recurrence::None => None,
        Recurrence::Daily => base.max(today).succ_opt(),
        Recurrence::Weekly { days } => {
            let mut next = base.succ_opt()?;
            for _ in 0..8 {
                if days.contains(&weekday_index(next)) && next > today {
                    return Some(next);
                }
                next = next.succ_opt()?;
            }
            // Completed more than a week late: first matching day after today.
            let mut next = today.succ_opt()?;
            for _ in 0..7 {
                if days.contains(&weekday_index(next)) {
                    return Some(next);
                }
                next = next.succ_opt()?;
            }
            None
        }
        Recurrence::Monthly { day_of_month } => {
            let (mut year, mut month) = (base.year(), base.month());
            loop {
                (year, month) = following_month(year, month);
                let candidate = clamped_date(year, month, *day_of_month)?;
                if candidate > today {
                    return Some(candidate);
                }
            }
        }
        Recurrence::Yearly { month, day } => {
            let mut year = base.year() + 1;
            loop {
                let candidate = clamped_date(year, *month, *day)?;
                if candidate > today {
                    return Some(candidate);
                }
                year += 1;
            }
        }
        Recurrence::CustomDates { dates } => {
            for offset in 0..CUSTOM_DATES_SCAN_YEARS {
                let year = today.year() + offset;
                for entry in dates {
                    let candidate = entry.in_year(year)?;
                    if candidate > today {
                        return Some(candidate);
                    }
                }
            }
            None
        }
    }
}

fn weekday_index(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_monday()
}

fn following_month(year: i32, month: u32) -> (i32, u32) {
    if month >= 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

/// Number of days in `month` of `year`.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = following_month(year, month);
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    if !(1..=12).contains(&month) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day.min(days_in_month(year, month)))
}

use anyhow::{anyhow, Result};
use chrono::{Datelike, NaiveDate, NaiveTime, Utc};
use chrono_english::{parse_date_string, Dialect};
use std::collections::BTreeSet;
use trellis_core::recurrence::{MonthDay, Recurrence};

use crate::cli::{RepeatArgs, RepeatShortcut};

/// Parses an ISO date or a phrase like "tomorrow" or "next friday".
pub fn parse_due_date(date_str: &str) -> Result<NaiveDate> {
    let input = date_str.trim();
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date);
    }
    parse_date_string(input, Utc::now(), Dialect::Us)
        .map(|dt| dt.date_naive())
        .map_err(|e| anyhow!("Failed to parse due date '{}': {}", date_str, e))
}

/// Parse time string like "9:00 AM", "14:30", "9pm", "noon", "midnight"
pub fn parse_time_string(time_str: &str) -> Result<NaiveTime> {
    let input = time_str.trim().to_lowercase();

    let special = match input.as_str() {
        "noon" => NaiveTime::from_hms_opt(12, 0, 0),
        "midnight" => NaiveTime::from_hms_opt(0, 0, 0),
        _ => None,
    };
    if let Some(time) = special {
        return Ok(time);
    }

    let formats = [
        "%H:%M:%S",    // 14:30:00
        "%H:%M",       // 14:30
        "%I:%M %p",    // 9:00 am
        "%I:%M%p",     // 9:00am
    ];
    for format in &formats {
        if let Ok(time) = NaiveTime::parse_from_str(&input, format) {
            return Ok(time);
        }
    }

    // "9pm" / "9 pm" carry no minutes, which NaiveTime parsing requires
    let compact = input.replace(' ', "");
    if let Some(hour) = compact
        .strip_suffix("am")
        .or_else(|| compact.strip_suffix("pm"))
        .and_then(|h| h.parse::<u32>().ok())
    {
        if (1..=12).contains(&hour) {
            let hour = match (hour, compact.ends_with("pm")) {
                (12, false) => 0,
                (12, true) => 12,
                (h, true) => h + 12,
                (h, false) => h,
            };
            if let Some(time) = NaiveTime::from_hms_opt(hour, 0, 0) {
                return Ok(time);
            }
        }
    }

    Err(anyhow!(
        "Invalid time format: '{}'\n\nSupported formats:\n  • 24-hour: '14:30', '09:00'\n  • 12-hour: '2:30 PM', '9am'\n  • Special: 'noon', 'midnight'",
        time_str
    ))
}

/// Parse days string like "mon,tue,wed" or "monday,friday" into weekday
/// indices, Monday = 0.
pub fn parse_days_string(days_str: &str) -> Result<BTreeSet<u32>> {
    let mut days = BTreeSet::new();
    let mut invalid_days = Vec::new();

    for day in days_str.to_lowercase().split(',') {
        let day = day.trim();
        if day.is_empty() {
            continue;
        }
        let index = match day {
            "mon" | "monday" => 0,
            "tue" | "tuesday" => 1,
            "wed" | "wednesday" => 2,
            "thu" | "thursday" => 3,
            "fri" | "friday" => 4,
            "sat" | "saturday" => 5,
            "sun" | "sunday" => 6,
            _ => {
                invalid_days.push(day.to_string());
                continue;
            }
        };
        days.insert(index);
    }

    if !invalid_days.is_empty() {
        return Err(anyhow!(
            "Invalid day(s): {}\n\nUse names like 'mon,wed,fri' or 'monday,friday'",
            invalid_days.join(", ")
        ));
    }
    if days.is_empty() {
        return Err(anyhow!("No valid days specified in: '{}'", days_str));
    }
    Ok(days)
}

/// Builds a recurrence from the `--every` family of flags. Rules that need a
/// day default to `anchor`, the task's due date or today.
pub fn parse_recurrence(args: &RepeatArgs, anchor: NaiveDate) -> Result<Option<Recurrence>> {
    let Some(every) = args.every else {
        if args.on.is_some() || args.day.is_some() || args.date.is_some() || args.dates.is_some() {
            return Err(anyhow!("--on, --day, --date and --dates require --every"));
        }
        return Ok(None);
    };

    let recurrence = match every {
        RepeatShortcut::Daily => Recurrence::Daily,
        RepeatShortcut::Weekly => {
            let days = match &args.on {
                Some(on) => parse_days_string(on)?,
                None => BTreeSet::from([anchor.weekday().num_days_from_monday()]),
            };
            Recurrence::Weekly { days }
        }
        RepeatShortcut::Weekdays => Recurrence::Weekly {
            days: (0..5).collect(),
        },
        RepeatShortcut::Weekends => Recurrence::Weekly {
            days: BTreeSet::from([5, 6]),
        },
        RepeatShortcut::Monthly => Recurrence::Monthly {
            day_of_month: args.day.unwrap_or_else(|| anchor.day()),
        },
        RepeatShortcut::Yearly => {
            let date = match &args.date {
                Some(raw) => raw.parse::<MonthDay>()?,
                None => MonthDay::new(anchor.month(), anchor.day())?,
            };
            Recurrence::Yearly {
                month: date.month(),
                day: date.day(),
            }
        }
        RepeatShortcut::Dates => {
            let raw = args
                .dates
                .as_deref()
                .ok_or_else(|| anyhow!("--every dates requires --dates MM-DD[,MM-DD...]"))?;
            let dates = raw
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::parse::<MonthDay>)
                .collect::<Result<Vec<_>, _>>()?;
            Recurrence::CustomDates { dates }
        }
    };

    recurrence.validate()?;
    Ok(Some(recurrence))
}

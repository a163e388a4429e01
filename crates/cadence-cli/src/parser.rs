use anyhow::{anyhow, Context, Result};
use cadence_core::models::{MonthDay, RecurrenceType, RuleSpec, WeekdaySet};
use chrono::{Days, NaiveDate};

use crate::cli::RuleArgs;

/// Parses `YYYY-MM-DD`, `today` or `tomorrow` relative to `today`.
pub fn parse_date(input: &str, today: NaiveDate) -> Result<NaiveDate> {
    match input.trim().to_lowercase().as_str() {
        "today" => Ok(today),
        "tomorrow" => today
            .checked_add_days(Days::new(1))
            .ok_or_else(|| anyhow!("Date out of range")),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d").with_context(|| {
            format!("Failed to parse date '{}': expected YYYY-MM-DD, today or tomorrow", input)
        }),
    }
}

/// Parses a month day: `1`..`31`, or `last` / `-1` for the month's last day.
pub fn parse_month_day(input: &str) -> Result<i32> {
    match input.trim().to_lowercase().as_str() {
        "last" => Ok(MonthDay::LAST_SENTINEL),
        other => other
            .parse::<i32>()
            .with_context(|| format!("Invalid day of month '{}'", input)),
    }
}

/// Builds an unvalidated rule from command-line flags. Range checks are left to
/// the core so every caller reports them the same way.
pub fn rule_spec(
    args: &RuleArgs,
    recurrence_type: RecurrenceType,
    today: NaiveDate,
) -> Result<RuleSpec> {
    let weekdays = match &args.on {
        Some(days) => days
            .parse::<WeekdaySet>()
            .map_err(|e| anyhow!("{}", e))?
            .iter()
            .collect(),
        None => Vec::new(),
    };

    Ok(RuleSpec {
        recurrence_type,
        interval: args.interval.unwrap_or(1),
        weekdays,
        month_day: args.day.as_deref().map(parse_month_day).transpose()?,
        end_date: args
            .until
            .as_deref()
            .map(|d| parse_date(d, today))
            .transpose()?,
        end_after_count: args.times,
    })
}

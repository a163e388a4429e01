use chrono::{DateTime, Datelike, NaiveDate, Utc};
use uuid::Uuid;

use crate::calendar;
use crate::error::CoreError;
use crate::models::{
    EndCondition, MonthDay, Pattern, RecurrenceRule, RecurrenceType, RuleSpec, WeekdaySet,
};

/// Upper bound on `interval`. Keeps every candidate date far inside chrono's range.
pub const MAX_INTERVAL: u32 = 1000;

/// Outcome of evaluating a rule against an anchor date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextOccurrence {
    Occurrence(NaiveDate),
    /// The end condition is met; the series produces nothing further.
    Exhausted,
}

impl NextOccurrence {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            NextOccurrence::Occurrence(date) => Some(*date),
            NextOccurrence::Exhausted => None,
        }
    }
}

/// A [`RuleSpec`] that passed validation, with `custom` resolved to the
/// frequency its populated fields describe.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRule {
    pub recurrence_type: RecurrenceType,
    /// Never `Custom`.
    pub frequency: RecurrenceType,
    pub interval: u32,
    pub weekdays: WeekdaySet,
    pub month_day: Option<MonthDay>,
    pub end: EndCondition,
}

impl ValidatedRule {
    /// Fixes the evaluation pattern. A monthly rule without an explicit day
    /// keeps the anchor's day of month for the rest of the series.
    pub fn pattern_for(&self, anchor: NaiveDate) -> Pattern {
        match self.frequency {
            RecurrenceType::Weekly => Pattern::Weekly {
                weekdays: self.weekdays,
            },
            RecurrenceType::Monthly => Pattern::Monthly {
                day: self
                    .month_day
                    .unwrap_or(MonthDay::Day(anchor.day() as u8)),
            },
            RecurrenceType::Yearly => Pattern::Yearly,
            RecurrenceType::Daily | RecurrenceType::Custom => Pattern::Daily,
        }
    }

    pub fn into_rule(
        self,
        task_id: Uuid,
        anchor: NaiveDate,
        completed_count: u32,
        now: DateTime<Utc>,
    ) -> RecurrenceRule {
        RecurrenceRule {
            task_id,
            recurrence_type: self.recurrence_type,
            interval: self.interval,
            pattern: self.pattern_for(anchor),
            end: self.end,
            completed_count,
            next_due_date: anchor,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Pure recurrence computations. Nothing here touches a store or the clock.
pub struct RuleEvaluator;

impl RuleEvaluator {
    /// Checks a submitted rule against the model invariants.
    ///
    /// Rejects conflicting end conditions, an interval outside `1..=MAX_INTERVAL`,
    /// weekdays on anything but a weekly rule, month days on anything but a
    /// monthly rule, and out-of-range weekday or month-day values.
    pub fn validate(spec: &RuleSpec) -> Result<ValidatedRule, CoreError> {
        if spec.interval < 1 || spec.interval > MAX_INTERVAL {
            return Err(CoreError::Validation(format!(
                "interval must be between 1 and {}, got {}",
                MAX_INTERVAL, spec.interval
            )));
        }

        let end = match (spec.end_date, spec.end_after_count) {
            (Some(_), Some(_)) => {
                return Err(CoreError::Validation(
                    "a rule can end on a date or after a count, not both".to_string(),
                ))
            }
            (Some(date), None) => EndCondition::OnDate(date),
            (None, Some(0)) => {
                return Err(CoreError::Validation(
                    "end-after count must be at least 1".to_string(),
                ))
            }
            (None, Some(count)) => EndCondition::AfterCount(count),
            (None, None) => EndCondition::Never,
        };

        let weekdays = WeekdaySet::from_indices(&spec.weekdays).ok_or_else(|| {
            CoreError::Validation(format!(
                "weekdays must be indices 0 (Sunday) to 6 (Saturday), got {:?}",
                spec.weekdays
            ))
        })?;

        let month_day = spec
            .month_day
            .map(|raw| {
                MonthDay::from_raw(raw).ok_or_else(|| {
                    CoreError::Validation(format!(
                        "month day must be 1..31 or -1 for the last day, got {}",
                        raw
                    ))
                })
            })
            .transpose()?;

        let frequency = match spec.recurrence_type {
            RecurrenceType::Custom => match (weekdays.is_empty(), month_day.is_some()) {
                (false, true) => {
                    return Err(CoreError::Validation(
                        "a custom rule cannot combine weekdays with a month day".to_string(),
                    ))
                }
                (false, false) => RecurrenceType::Weekly,
                (true, true) => RecurrenceType::Monthly,
                (true, false) => RecurrenceType::Daily,
            },
            other => other,
        };

        if !weekdays.is_empty() && frequency != RecurrenceType::Weekly {
            return Err(CoreError::Validation(format!(
                "weekdays only apply to weekly rules, not {}",
                spec.recurrence_type
            )));
        }
        if month_day.is_some() && frequency != RecurrenceType::Monthly {
            return Err(CoreError::Validation(format!(
                "a month day only applies to monthly rules, not {}",
                spec.recurrence_type
            )));
        }

        Ok(ValidatedRule {
            recurrence_type: spec.recurrence_type,
            frequency,
            interval: spec.interval,
            weekdays,
            month_day,
            end,
        })
    }

    /// Computes the occurrence that follows `anchor`, then applies the end
    /// condition. Identical inputs always give identical output.
    pub fn compute_next(rule: &RecurrenceRule, anchor: NaiveDate) -> NextOccurrence {
        let Some(candidate) = Self::candidate_after(rule.pattern, rule.interval, anchor) else {
            tracing::debug!(%anchor, "no representable occurrence after anchor");
            return NextOccurrence::Exhausted;
        };

        match rule.end {
            EndCondition::OnDate(end_date) if candidate > end_date => NextOccurrence::Exhausted,
            EndCondition::AfterCount(limit) if rule.completed_count.saturating_add(1) > limit => {
                NextOccurrence::Exhausted
            }
            _ => NextOccurrence::Occurrence(candidate),
        }
    }

    /// The raw next date for a pattern, ignoring end conditions. `None` only when
    /// the result would fall outside the calendar.
    pub fn candidate_after(pattern: Pattern, interval: u32, anchor: NaiveDate) -> Option<NaiveDate> {
        let interval = interval.max(1);
        match pattern {
            Pattern::Daily => calendar::add_days(anchor, u64::from(interval)),
            Pattern::Weekly { weekdays } if weekdays.is_empty() => {
                calendar::add_days(anchor, 7 * u64::from(interval))
            }
            Pattern::Weekly { weekdays } => Self::next_listed_weekday(weekdays, interval, anchor),
            Pattern::Monthly {
                day: MonthDay::Day(day),
            } => calendar::add_months_clamped(anchor, interval, u32::from(day)),
            Pattern::Monthly { day: MonthDay::Last } => calendar::end_of_month_after(anchor, interval),
            Pattern::Yearly => calendar::add_years_clamped(anchor, interval),
        }
    }

    /// Walks forward day by day from the day after `anchor`. Weeks start on
    /// Sunday; the first time the walk enters a new week it jumps `interval - 1`
    /// further weeks before continuing.
    fn next_listed_weekday(weekdays: WeekdaySet, interval: u32, anchor: NaiveDate) -> Option<NaiveDate> {
        let anchor_week = calendar::week_start(anchor)?;
        let mut candidate = calendar::add_days(anchor, 1)?;
        let mut skipped = interval <= 1;

        // At most six days remain in the anchor's week, then one full week.
        for _ in 0..14 {
            if !skipped && calendar::week_start(candidate)? > anchor_week {
                candidate = calendar::add_days(candidate, 7 * u64::from(interval - 1))?;
                skipped = true;
            }
            if weekdays.contains(calendar::weekday_index(candidate)) {
                return Some(candidate);
            }
            candidate = calendar::add_days(candidate, 1)?;
        }
        None
    }

    /// Upcoming due dates as if each open instance were completed in turn.
    pub fn preview(rule: &RecurrenceRule, count: usize) -> Vec<NaiveDate> {
        let mut cursor = rule.clone();
        let mut dates = Vec::with_capacity(count.min(64));
        while dates.len() < count {
            match Self::compute_next(&cursor, cursor.next_due_date) {
                NextOccurrence::Occurrence(date) => {
                    dates.push(date);
                    cursor.next_due_date = date;
                    cursor.completed_count += 1;
                }
                NextOccurrence::Exhausted => break,
            }
        }
        dates
    }

    /// Human-readable label, e.g. "every 2 weeks on Mon, Wed".
    pub fn describe(rule: &RecurrenceRule) -> String {
        let unit = match rule.pattern {
            Pattern::Daily => "day",
            Pattern::Weekly { .. } => "week",
            Pattern::Monthly { .. } => "month",
            Pattern::Yearly => "year",
        };
        let mut label = if rule.interval == 1 {
            format!("every {}", unit)
        } else {
            format!("every {} {}s", rule.interval, unit)
        };

        match rule.pattern {
            Pattern::Weekly { weekdays } if !weekdays.is_empty() => {
                label.push_str(&format!(" on {}", weekdays));
            }
            Pattern::Monthly {
                day: MonthDay::Day(day),
            } => label.push_str(&format!(" on the {}", ordinal(u32::from(day)))),
            Pattern::Monthly { day: MonthDay::Last } => label.push_str(" on the last day"),
            Pattern::Yearly => {
                label.push_str(&format!(" on {}", rule.next_due_date.format("%b %-d")));
            }
            _ => {}
        }

        match rule.end {
            EndCondition::Never => {}
            EndCondition::OnDate(date) => label.push_str(&format!(", until {}", date)),
            EndCondition::AfterCount(1) => label.push_str(", once"),
            EndCondition::AfterCount(count) => label.push_str(&format!(", {} times", count)),
        }
        label
    }
}

fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

//! Calendar helpers over local dates.
//!
//! Every month-length and leap-year decision in the crate goes through
//! [`last_day_of_month`] so clamping stays consistent across centuries.
//! Weekday indices follow the product convention: 0 = Sunday .. 6 = Saturday.

use chrono::{Datelike, Days, Months, NaiveDate};

/// Number of the last day in the given month, or `None` if the month is outside
/// chrono's representable range.
pub fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
    NaiveDate::from_ymd_opt(year, month, 1)?
        .checked_add_months(Months::new(1))?
        .pred_opt()
        .map(|d| d.day())
}

/// Moves `months` months forward from `date` and lands on `day`, clamped to the
/// length of the target month. Never rolls into the following month.
pub fn add_months_clamped(date: NaiveDate, months: u32, day: u32) -> Option<NaiveDate> {
    let first = date.with_day(1)?.checked_add_months(Months::new(months))?;
    let last = last_day_of_month(first.year(), first.month())?;
    first.with_day(day.clamp(1, last))
}

/// Last calendar day of the month `months` months after `date`.
pub fn end_of_month_after(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    let first = date.with_day(1)?.checked_add_months(Months::new(months))?;
    let last = last_day_of_month(first.year(), first.month())?;
    first.with_day(last)
}

/// Same month and day `years` years later; Feb 29 clamps to Feb 28 in common years.
pub fn add_years_clamped(date: NaiveDate, years: u32) -> Option<NaiveDate> {
    let year = date.year().checked_add(i32::try_from(years).ok()?)?;
    let last = last_day_of_month(year, date.month())?;
    NaiveDate::from_ymd_opt(year, date.month(), date.day().min(last))
}

pub fn add_days(date: NaiveDate, days: u64) -> Option<NaiveDate> {
    date.checked_add_days(Days::new(days))
}

/// Weekday index with Sunday = 0.
#[inline]
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// The Sunday that opens the week containing `date`.
pub fn week_start(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_sub_days(Days::new(u64::from(weekday_index(date))))
}

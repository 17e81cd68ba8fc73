//! Business-day arithmetic for retention deadlines
//!
//! Turns "retain N days" into a concrete deadline, skipping weekends and
//! observed US federal holidays. Only used to stamp
//! `expected_termination_time`; the cleanup due-check compares wall clocks
//! directly against the stamped deadline.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use std::collections::HashSet;

/// Clock and grace-period arithmetic consumed by rules and the engine
pub trait Calendar: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Add `days` business days to `start`, preserving time-of-day
    fn business_days_after(&self, start: DateTime<Utc>, days: u32) -> DateTime<Utc>;
}

/// Production calendar: weekends plus observed US federal holidays
#[derive(Debug, Default, Clone)]
pub struct BusinessCalendar;

impl BusinessCalendar {
    pub fn new() -> Self {
        Self
    }

    fn is_business_day(date: NaiveDate, holidays: &HashSet<NaiveDate>) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !holidays.contains(&date)
    }
}

impl Calendar for BusinessCalendar {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn business_days_after(&self, start: DateTime<Utc>, days: u32) -> DateTime<Utc> {
        // Observed New Year's can shift into the prior year, so cover the
        // neighboring years too.
        let mut holidays = HashSet::new();
        for year in start.year() - 1..=start.year() + 1 + (days as i32 / 200) {
            holidays.extend(observed_federal_holidays(year));
        }

        let mut current = start;
        let mut remaining = days;
        while remaining > 0 {
            current += Duration::days(1);
            if Self::is_business_day(current.date_naive(), &holidays) {
                remaining -= 1;
            }
        }
        current
    }
}

/// Observed dates of the US federal holidays for `year`
///
/// Fixed-date holidays falling on a Saturday are observed the Friday before,
/// on a Sunday the Monday after.
pub fn observed_federal_holidays(year: i32) -> Vec<NaiveDate> {
    vec![
        observed(ymd(year, 1, 1)),                       // New Year's Day
        nth_weekday(year, 1, Weekday::Mon, 3),           // Martin Luther King Jr. Day
        nth_weekday(year, 2, Weekday::Mon, 3),           // Washington's Birthday
        last_weekday(year, 5, Weekday::Mon),             // Memorial Day
        observed(ymd(year, 6, 19)),                      // Juneteenth
        observed(ymd(year, 7, 4)),                       // Independence Day
        nth_weekday(year, 9, Weekday::Mon, 1),           // Labor Day
        nth_weekday(year, 10, Weekday::Mon, 2),          // Columbus Day
        observed(ymd(year, 11, 11)),                     // Veterans Day
        nth_weekday(year, 11, Weekday::Thu, 4),          // Thanksgiving
        observed(ymd(year, 12, 25)),                     // Christmas
    ]
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    // Inputs are fixed holiday dates; always valid.
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn observed(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date - Duration::days(1),
        Weekday::Sun => date + Duration::days(1),
        _ => date,
    }
}

fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u32) -> NaiveDate {
    let first = ymd(year, month, 1);
    let offset = (weekday.num_days_from_monday() + 7 - first.weekday().num_days_from_monday()) % 7;
    first + Duration::days(i64::from(offset + 7 * (n - 1)))
}

fn last_weekday(year: i32, month: u32, weekday: Weekday) -> NaiveDate {
    let next_month = if month == 12 {
        ymd(year + 1, 1, 1)
    } else {
        ymd(year, month + 1, 1)
    };
    let last = next_month - Duration::days(1);
    let offset = (last.weekday().num_days_from_monday() + 7 - weekday.num_days_from_monday()) % 7;
    last - Duration::days(i64::from(offset))
}

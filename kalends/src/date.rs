//! Calendar dates and pure Gregorian arithmetic.
//!
//! ## Usage
//!
//! Everything in the engine that touches a date goes through [`CalendarDate`]
//! and [`YearMonth`]; all arithmetic is done on civil day numbers so that
//! years 0-99 stay literal years and are never reinterpreted against a
//! 1900/2000 epoch.

use std::{
    fmt,
    str::FromStr,
    time::{SystemTime, UNIX_EPOCH},
};

use thiserror::Error;

/// Days of the week in Monday-first order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weekday {
    /// Monday.
    Monday,
    /// Tuesday.
    Tuesday,
    /// Wednesday.
    Wednesday,
    /// Thursday.
    Thursday,
    /// Friday.
    Friday,
    /// Saturday.
    Saturday,
    /// Sunday.
    Sunday,
}

impl Weekday {
    pub(crate) fn index_from_monday(self) -> i32 {
        match self {
            Weekday::Monday => 0,
            Weekday::Tuesday => 1,
            Weekday::Wednesday => 2,
            Weekday::Thursday => 3,
            Weekday::Friday => 4,
            Weekday::Saturday => 5,
            Weekday::Sunday => 6,
        }
    }

    pub(crate) fn from_monday_index(index: i32) -> Self {
        match index.rem_euclid(7) {
            0 => Weekday::Monday,
            1 => Weekday::Tuesday,
            2 => Weekday::Wednesday,
            3 => Weekday::Thursday,
            4 => Weekday::Friday,
            5 => Weekday::Saturday,
            _ => Weekday::Sunday,
        }
    }
}

/// Error returned when an ISO-8601 date string cannot be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateParseError {
    /// The string does not have the `YYYY-MM-DD` shape.
    #[error("expected an ISO date in YYYY-MM-DD form, got {0:?}")]
    Malformed(String),
    /// The components parsed but do not name a real calendar date.
    #[error("{0:?} is not a valid calendar date")]
    OutOfRange(String),
}

/// A calendar date expressed as year, month, and day.
///
/// Ordering follows the calendar: field order is year, month, day, so the
/// derived `Ord` compares chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CalendarDate {
    year: i32,
    month: u8,
    day: u8,
}

impl CalendarDate {
    /// Creates a calendar date if the values are valid.
    pub fn new(year: i32, month: u8, day: u8) -> Option<Self> {
        if !(1..=12).contains(&month) {
            return None;
        }
        let max_day = days_in_month(year, month);
        if day == 0 || day > max_day {
            return None;
        }
        Some(Self { year, month, day })
    }

    /// Returns the year.
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Returns the month (1-12).
    pub fn month(&self) -> u8 {
        self.month
    }

    /// Returns the day of the month (1-31).
    pub fn day(&self) -> u8 {
        self.day
    }

    /// Returns the current date in UTC.
    pub fn today() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let days = (duration.as_secs() / 86_400) as i64;
        Self::from_days(days)
    }

    /// Returns the year and month of this date.
    pub fn year_month(&self) -> YearMonth {
        YearMonth::new_unchecked(self.year, self.month)
    }

    /// Days since 1970-01-01, negative before the epoch.
    pub fn to_days(&self) -> i64 {
        days_from_civil(self.year, self.month, self.day)
    }

    /// Inverse of [`to_days`](Self::to_days).
    pub fn from_days(days: i64) -> Self {
        let (year, month, day) = civil_from_days(days);
        Self::new_unchecked(year, month, day)
    }

    /// Moves the date by whole days.
    pub fn add_days(&self, n: i64) -> Self {
        Self::from_days(self.to_days() + n)
    }

    /// Moves the date by whole months, clamping the day to the length of the
    /// target month so the result never spills into the month after it.
    pub fn add_months(&self, n: i32) -> Self {
        let month = self.year_month().add_months(n);
        let day = self.day.min(days_in_month(month.year(), month.month()));
        Self::new_unchecked(month.year(), month.month(), day)
    }

    /// Moves the date by whole years, with the same day clamping as
    /// [`add_months`](Self::add_months) (Feb 29 in a non-leap target year
    /// becomes Feb 28).
    pub fn add_years(&self, n: i32) -> Self {
        self.add_months(n.saturating_mul(12))
    }

    /// First day of this date's month.
    pub fn start_of_month(&self) -> Self {
        Self::new_unchecked(self.year, self.month, 1)
    }

    /// Last day of this date's month.
    pub fn end_of_month(&self) -> Self {
        Self::new_unchecked(self.year, self.month, days_in_month(self.year, self.month))
    }

    /// Returns the day of the week.
    pub fn weekday(&self) -> Weekday {
        let days = self.to_days();
        // 1970-01-01 was a Thursday, index 3 from Monday.
        let index = ((days + 3).rem_euclid(7)) as i32;
        Weekday::from_monday_index(index)
    }

    fn new_unchecked(year: i32, month: u8, day: u8) -> Self {
        Self { year, month, day }
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl FromStr for CalendarDate {
    type Err = DateParseError;

    /// Parses a strict `YYYY-MM-DD` string. The year keeps at least four
    /// digits, so `"0099-01-15"` round-trips as literal year 99.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || DateParseError::Malformed(s.to_string());
        let mut parts = s.splitn(3, '-');
        let year_part = parts.next().ok_or_else(malformed)?;
        let month_part = parts.next().ok_or_else(malformed)?;
        let day_part = parts.next().ok_or_else(malformed)?;
        if year_part.len() < 4 || month_part.len() != 2 || day_part.len() != 2 {
            return Err(malformed());
        }
        let year: i32 = year_part.parse().map_err(|_| malformed())?;
        let month: u8 = month_part.parse().map_err(|_| malformed())?;
        let day: u8 = day_part.parse().map_err(|_| malformed())?;
        CalendarDate::new(year, month, day)
            .ok_or_else(|| DateParseError::OutOfRange(s.to_string()))
    }
}

/// A year and month pair used for month navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct YearMonth {
    year: i32,
    month: u8,
}

impl YearMonth {
    /// Creates a year/month pair if the values are valid.
    pub fn new(year: i32, month: u8) -> Option<Self> {
        if !(1..=12).contains(&month) {
            return None;
        }
        Some(Self { year, month })
    }

    /// Returns the year.
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Returns the month (1-12).
    pub fn month(&self) -> u8 {
        self.month
    }

    /// Returns the date for this month at the provided day.
    pub fn to_date(&self, day: u8) -> Option<CalendarDate> {
        CalendarDate::new(self.year, self.month, day)
    }

    /// First day of the month.
    pub fn first_day(&self) -> CalendarDate {
        CalendarDate::new_unchecked(self.year, self.month, 1)
    }

    /// Last day of the month.
    pub fn last_day(&self) -> CalendarDate {
        CalendarDate::new_unchecked(self.year, self.month, days_in_month(self.year, self.month))
    }

    /// Number of days in the month.
    pub fn len_days(&self) -> u8 {
        days_in_month(self.year, self.month)
    }

    /// Adds or subtracts months, adjusting the year as needed.
    pub fn add_months(&self, delta: i32) -> Self {
        let total = self.year * 12 + (self.month as i32 - 1) + delta;
        let year = total.div_euclid(12);
        let month = (total.rem_euclid(12) + 1) as u8;
        Self { year, month }
    }

    /// Signed number of months from `other` to `self`.
    pub fn months_since(&self, other: YearMonth) -> i32 {
        (self.year * 12 + self.month as i32) - (other.year * 12 + other.month as i32)
    }

    pub(crate) fn new_unchecked(year: i32, month: u8) -> Self {
        Self { year, month }
    }
}

/// Number of days in the given month.
pub fn days_in_month(year: i32, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 30,
    }
}

/// Gregorian leap year test.
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

fn days_from_civil(year: i32, month: u8, day: u8) -> i64 {
    let mut y = year;
    let m = month as i32;
    let d = day as i32;
    y -= if m <= 2 { 1 } else { 0 };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let mp = m + if m > 2 { -3 } else { 9 };
    let doy = (153 * mp + 2) / 5 + d - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    (era as i64) * 146_097 + (doe as i64) - 719_468
}

fn civil_from_days(days: i64) -> (i32, u8, u8) {
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = mp + if mp < 10 { 3 } else { -9 };
    let year = y + if month <= 2 { 1 } else { 0 };
    (year as i32, month as u8, day as u8)
}

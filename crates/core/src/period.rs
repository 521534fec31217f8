//! Calendar period bounds (day, ISO week, month) evaluated in a fixed
//! UTC offset.
//!
//! Both event stores compute list ranges through [`CalendarPeriod::bounds`]
//! so that the in-memory and SQL backends agree on what "the same day" means.

use chrono::{Datelike, Duration, FixedOffset, Months, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::error::CoreError;
use crate::types::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarPeriod {
    Day,
    /// ISO 8601 week, Monday through Sunday.
    Week,
    Month,
}

impl CalendarPeriod {
    /// Half-open `[start, end)` range of the period containing `date`, as
    /// seen from the `tz` offset.
    pub fn bounds(self, date: Timestamp, tz: FixedOffset) -> (Timestamp, Timestamp) {
        let local = date.with_timezone(&tz).date_naive();

        let (first, next) = match self {
            CalendarPeriod::Day => (local, local + Duration::days(1)),
            CalendarPeriod::Week => {
                let monday =
                    local - Duration::days(i64::from(local.weekday().num_days_from_monday()));
                (monday, monday + Duration::days(7))
            }
            CalendarPeriod::Month => {
                let first = local - Duration::days(i64::from(local.day0()));
                let next = first
                    .checked_add_months(Months::new(1))
                    .unwrap_or(NaiveDate::MAX);
                (first, next)
            }
        };

        (local_midnight(first, tz), local_midnight(next, tz))
    }

    /// Whether `instant` falls in the same period as `date`.
    pub fn contains(self, date: Timestamp, tz: FixedOffset, instant: Timestamp) -> bool {
        let (start, end) = self.bounds(date, tz);
        start <= instant && instant < end
    }
}

fn local_midnight(day: NaiveDate, tz: FixedOffset) -> Timestamp {
    let local = day.and_time(NaiveTime::MIN);
    Utc.from_utc_datetime(&(local - Duration::seconds(i64::from(tz.local_minus_utc()))))
}

/// Parse a UTC offset written as `Z`, `UTC`, `+HH:MM`, `-HH:MM` or `+HHMM`.
pub fn parse_offset(input: &str) -> Result<FixedOffset, CoreError> {
    let invalid = || CoreError::InvalidOffset(input.to_string());
    let trimmed = input.trim();

    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let (sign, rest) = match trimmed.as_bytes().first() {
        Some(b'+') => (1, &trimmed[1..]),
        Some(b'-') => (-1, &trimmed[1..]),
        _ => return Err(invalid()),
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
    let minutes: i32 = digits[2..].parse().map_err(|_| invalid())?;
    if minutes >= 60 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

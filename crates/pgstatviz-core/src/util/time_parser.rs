//! Time parser for `--daterange` bounds.
//!
//! Supported formats (all UTC unless an offset is given):
//! - RFC 3339: `2024-01-01T10:00:00+02:00`
//! - ISO 8601: `2024-01-01T10:00:00`, `2024-01-01T10:00`, `2024-01-01 10:00:00`
//! - Date only: `2024-01-01` (midnight)
//! - Date+time: `2024-01-01:10:00` or `2024-01-01:10:00:00`
//! - Unix timestamp: `1704103200`
//! - Relative: `-30s`, `-30m`, `-1h`, `-2d`, `-1w`
//! - `now`

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::source::DateRange;

/// Error type for time parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeParseError {
    pub input: String,
    pub message: String,
}

impl std::fmt::Display for TimeParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to parse time '{}': {}", self.input, self.message)
    }
}

impl std::error::Error for TimeParseError {}

/// Parses a time relative to the current instant.
pub fn parse_time(input: &str) -> Result<DateTime<Utc>, TimeParseError> {
    parse_time_at(input, Utc::now())
}

/// Parses a time; relative expressions count back from `now`.
pub fn parse_time_at(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, TimeParseError> {
    let input = input.trim();
    let parsed = if input.eq_ignore_ascii_case("now") {
        Some(now)
    } else if let Some(delta) = relative_offset(input) {
        now.checked_sub_signed(delta)
    } else {
        unix_timestamp(input)
            .or_else(|| iso8601(input))
            .or_else(|| date_colon_time(input))
            .or_else(|| date_only(input))
    };
    parsed.ok_or_else(|| TimeParseError {
        input: input.to_string(),
        message: "Unrecognized format. Use: ISO 8601 (2024-01-01T10:00:00), \
                  Unix timestamp (1704103200), relative (-1h, -30m, -2d), \
                  date:time (2024-01-01:10:00) or now"
            .to_string(),
    })
}

/// Parses both `--daterange` bounds into a range, swapping reversed bounds.
pub fn parse_date_range(from: &str, to: &str) -> Result<DateRange, TimeParseError> {
    let now = Utc::now();
    Ok(DateRange::new(
        Some(parse_time_at(from, now)?),
        Some(parse_time_at(to, now)?),
    ))
}

fn unix_timestamp(input: &str) -> Option<DateTime<Utc>> {
    if input.is_empty() || !input.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Utc.timestamp_opt(input.parse().ok()?, 0).single()
}

/// `-<n><unit>` as a positive duration to subtract.
fn relative_offset(input: &str) -> Option<Duration> {
    let rest = input.strip_prefix('-')?;
    let unit = rest.chars().last()?;
    let number: i64 = rest[..rest.len() - unit.len_utf8()].parse().ok()?;
    match unit {
        's' => Duration::try_seconds(number),
        'm' => Duration::try_minutes(number),
        'h' => Duration::try_hours(number),
        'd' => Duration::try_days(number),
        'w' => Duration::try_weeks(number),
        _ => None,
    }
}

fn iso8601(input: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
    .map(|ndt| Utc.from_utc_datetime(&ndt))
}

/// `YYYY-MM-DD:HH:MM[:SS]`.
fn date_colon_time(input: &str) -> Option<DateTime<Utc>> {
    let (date_part, time_part) = (input.get(..10)?, input.get(10..)?.strip_prefix(':')?);
    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    let time = match time_part.len() {
        5 => NaiveTime::parse_from_str(time_part, "%H:%M").ok()?,
        8 => NaiveTime::parse_from_str(time_part, "%H:%M:%S").ok()?,
        _ => return None,
    };
    Some(Utc.from_utc_datetime(&NaiveDateTime::new(date, time)))
}

fn date_only(input: &str) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

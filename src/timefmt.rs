//! Time and display formatting helpers shared by the dashboard modules.
//!
//! All functions are pure: instants come in as `DateTime<Utc>`, display
//! timezones as IANA labels carried on the appointment record. A label that
//! fails to parse falls back to the clinic default rather than erroring;
//! the timezone is presentation-only data.

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;

use crate::config;

/// Avatar background palette, keyed by the digits of a patient id.
const AVATAR_COLORS: &[&str] = &[
    "#1B5E40", "#1E40AF", "#B45309", "#0F766E", "#5B21B6", "#9F1239", "#374151",
];

/// Minutes between two instants, rounded to the nearest whole minute.
pub fn duration_minutes(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let millis = (end - start).num_milliseconds() as f64;
    (millis / 60_000.0).round() as i64
}

/// Parse an IANA timezone label, falling back to the clinic default.
pub fn parse_tz(label: &str) -> Tz {
    label
        .parse::<Tz>()
        .unwrap_or(chrono_tz::America::Chicago)
}

/// Format an instant as a short localized date, e.g. "Mar 4, 2026".
pub fn fmt_date(ts: DateTime<Utc>, tz_label: &str) -> String {
    ts.with_timezone(&parse_tz(tz_label))
        .format("%b %-d, %Y")
        .to_string()
}

/// Format an instant as a localized 12-hour clock time, e.g. "2:30 PM".
pub fn fmt_time(ts: DateTime<Utc>, tz_label: &str) -> String {
    ts.with_timezone(&parse_tz(tz_label))
        .format("%-I:%M %p")
        .to_string()
}

/// The calendar date of an instant in its display timezone.
pub fn local_date(ts: DateTime<Utc>, tz_label: &str) -> NaiveDate {
    ts.with_timezone(&parse_tz(tz_label)).date_naive()
}

/// Whole years between a date of birth and a reference date.
pub fn calc_age(dob: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        age -= 1;
    }
    age
}

/// Uppercased first letters of a first/last name pair.
pub fn initials(first: &str, last: &str) -> String {
    first
        .chars()
        .next()
        .into_iter()
        .chain(last.chars().next())
        .flat_map(|c| c.to_uppercase())
        .collect()
}

/// Deterministic avatar color for a patient id: digits mod palette size.
/// Ids without digits map to the first palette entry.
pub fn avatar_color(id: &str) -> &'static str {
    let digits: String = id.chars().filter(|c| c.is_ascii_digit()).collect();
    let index = digits
        .parse::<u64>()
        .map(|n| (n % AVATAR_COLORS.len() as u64) as usize)
        .unwrap_or(0);
    AVATAR_COLORS[index]
}

/// Time-of-day greeting for the page header.
pub fn greeting(now: DateTime<Utc>, tz_label: &str) -> &'static str {
    match now.with_timezone(&parse_tz(tz_label)).hour() {
        0..=11 => "Good morning",
        12..=16 => "Good afternoon",
        _ => "Good evening",
    }
}

/// Default display timezone when a record carries none.
pub fn default_tz_label() -> &'static str {
    config::DEFAULT_TIMEZONE
}

//! Best-effort parsing of the (date phrase, time phrase) pairs found on event pages,
//! e.g. `("Friday, June 27, 2025", "10:00 p.m.")`.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;

use super::base;

/// Tried in order; the first pattern that parses wins.
pub const DATE_TIME_PATTERNS: [&str; 4] = [
    "%B %d %Y %I:%M %p",
    "%B %d, %Y %I:%M %p",
    "%b %d %Y %I:%M %p",
    "%b %d, %Y %I:%M %p",
];

static WEEKDAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?:thurs|thur|thu|tues|tue|wed|mon|fri|sat|sun)(?:nesday|urday|sday|day)?\b\.?\s*,?\s*",
    )
        .expect("valid weekday regex")
});
static DAY_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})(\d{4})").expect("valid day-year regex"));
static MERIDIEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b([ap])\.\s?m\.?").expect("valid meridiem regex"));
static SPACES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid spaces regex"));

/// Drops a leading weekday (`Friday, `, `Fri `) from a date phrase.
pub fn strip_weekday(date: &str) -> String {
    WEEKDAY_RE.replace(date, "").trim().to_string()
}

/// `June 272025` -> `June 27 2025`.
pub fn repair_day_year(date: &str) -> String {
    DAY_YEAR_RE.replace_all(date, "$1 $2").into_owned()
}

/// `10:00 p.m.` -> `10:00 PM`.
pub fn normalize_meridiem(time: &str) -> String {
    MERIDIEM_RE
        .replace_all(time, |caps: &regex::Captures<'_>| {
            format!("{}M", caps[1].to_uppercase())
        })
        .into_owned()
}

pub fn collapse_spaces(input: &str) -> String {
    SPACES_RE.replace_all(input.trim(), " ").into_owned()
}

/// One strategy: a single chrono pattern, tried on the raw string and then
/// on a whitespace-collapsed copy.
fn parse_with_pattern(input: &str, pattern: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(input, pattern)
        .or_else(|_| NaiveDateTime::parse_from_str(&collapse_spaces(input), pattern))
        .ok()
}

/// Builds the combined `"<date> <time>"` string the patterns are matched against.
pub fn prepare(date: &str, time: &str) -> String {
    let date = repair_day_year(&strip_weekday(date));
    normalize_meridiem(&format!("{} {}", date, time.trim()))
}

pub fn parse_naive(date: &str, time: &str) -> Option<NaiveDateTime> {
    let combined = prepare(date, time);
    DATE_TIME_PATTERNS
        .iter()
        .find_map(|pattern| parse_with_pattern(&combined, pattern))
}

/// Parses a date/time pair in the venue's timezone. Unparseable input is logged
/// and yields `None`.
pub fn parse_date_time(date: &str, time: &str, tz: Tz) -> Option<DateTime<FixedOffset>> {
    match parse_naive(date, time).and_then(|naive| base::to_timezone_datetime(naive, tz)) {
        Some(dt) => Some(dt),
        None => {
            tracing::warn!(
                date,
                time,
                combined = %prepare(date, time),
                "could not parse date/time"
            );
            None
        }
    }
}

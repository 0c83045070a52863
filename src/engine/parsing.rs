//! Cell-level parsing heuristics shared by loading, validation and type
//! enforcement.
//!
//! Everything here is lenient: a value either parses or it does not, there is
//! no error to propagate.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

/// Accepted true-like tokens (compared case-insensitively).
pub const TRUE_TOKENS: [&str; 5] = ["true", "1", "yes", "y", "t"];
/// Accepted false-like tokens (compared case-insensitively).
pub const FALSE_TOKENS: [&str; 5] = ["false", "0", "no", "n", "f"];

const DATE_FORMATS: [&str; 8] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

const DATETIME_FORMATS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Parse a finite number. Surrounding whitespace is ignored.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Parse a boolean token from [`TRUE_TOKENS`] / [`FALSE_TOKENS`].
pub fn parse_bool(raw: &str) -> Option<bool> {
    let lower = raw.trim().to_lowercase();
    if TRUE_TOKENS.contains(&lower.as_str()) {
        Some(true)
    } else if FALSE_TOKENS.contains(&lower.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// Parse a date or date-time. Date-only values land on midnight; RFC 3339
/// values with an offset are converted to UTC.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date.and_time(NaiveTime::MIN));
        }
    }

    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.naive_utc())
}

/// Share of `values` for which `parse` succeeds. Empty input scores 0.
pub fn parse_rate<'a, I, F>(values: I, parse: F) -> f64
where
    I: IntoIterator<Item = &'a str>,
    F: Fn(&str) -> bool,
{
    let mut total = 0_usize;
    let mut ok = 0_usize;
    for value in values {
        total += 1;
        if parse(value) {
            ok += 1;
        }
    }
    if total == 0 {
        0.0
    } else {
        ok as f64 / total as f64
    }
}

//! Normalization of counters and timestamps scraped from channel pages.

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

/// A timestamp that could not be parsed as ISO-8601.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid date: {0:?}")]
pub struct InvalidDate(pub String);

/// Convert an abbreviated counter such as `"4.9K"` or `"1.2M"` to an integer.
///
/// Anything unparseable yields 0.
#[must_use]
pub fn parse_count(text: &str) -> u64 {
    let normalized = text.trim().to_uppercase();

    let multiplier = match normalized.chars().last() {
        Some('K') => 1_000.0,
        Some('M') => 1_000_000.0,
        _ => 1.0,
    };

    let numeric: String = normalized
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let value = leading_float(&numeric).unwrap_or(0.0);
    (value * multiplier).round() as u64
}

/// Parse the longest leading `digits[.digits]` prefix, so `"1.2.3"` reads as 1.2.
fn leading_float(numeric: &str) -> Option<f64> {
    let end = numeric
        .char_indices()
        .filter(|&(_, c)| c == '.')
        .nth(1)
        .map_or(numeric.len(), |(i, _)| i);
    numeric[..end].parse().ok()
}

/// Re-emit an ISO-8601 timestamp in UTC with millisecond precision, e.g.
/// `2024-01-15T10:30:00.000Z`.
///
/// # Errors
///
/// Returns [`InvalidDate`] if the input is not an RFC 3339 timestamp.
pub fn normalize_date(input: &str) -> Result<String, InvalidDate> {
    DateTime::parse_from_rfc3339(input.trim())
        .map(|dt| {
            dt.with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Millis, true)
        })
        .map_err(|_| InvalidDate(input.to_string()))
}

//! Duration parsing for configuration fields (`cache.ttl`, `retry.base_delay`,
//! `timeout`, ...).

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DurationParseError {
    #[error("invalid duration format: {0}")]
    InvalidFormat(String),

    #[error("invalid number: {0}")]
    InvalidNumber(String),

    #[error("unknown unit: {0}")]
    UnknownUnit(String),

    #[error("empty duration string")]
    EmptyString,
}

/// Parse a duration string such as `"5s"`, `"200ms"`, `"1h 30m"`, or
/// `"2h 15m 30s"`. Recognized units: `us`, `ms`, `s`, `m`, `h`, `d`, `w`.
/// Components are summed, so `"1h 30m"` is `5400s` regardless of order.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use pulsearc_common::time::duration::parse_duration;
///
/// assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
/// assert_eq!(parse_duration("200ms").unwrap(), Duration::from_millis(200));
/// assert_eq!(parse_duration("1h 30m").unwrap(), Duration::from_secs(5400));
/// ```
pub fn parse_duration(s: &str) -> Result<Duration, DurationParseError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(DurationParseError::EmptyString);
    }

    let mut total = Duration::ZERO;
    let mut current_number = String::new();
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch.is_ascii_digit() || ch == '.' {
            current_number.push(ch);
            continue;
        }
        if ch.is_whitespace() {
            continue;
        }

        if current_number.is_empty() {
            return Err(DurationParseError::InvalidFormat("expected number before unit".into()));
        }
        let value: f64 = current_number
            .parse()
            .map_err(|_| DurationParseError::InvalidNumber(current_number.clone()))?;
        current_number.clear();

        let unit = if ch == 'm' && chars.peek() == Some(&'s') {
            chars.next();
            "ms".to_string()
        } else if ch == 'u' && chars.peek() == Some(&'s') {
            chars.next();
            "us".to_string()
        } else {
            ch.to_string()
        };

        let unit_duration = match unit.as_str() {
            "us" => Duration::from_micros(value as u64),
            "ms" => Duration::from_millis(value as u64),
            "s" => Duration::from_secs_f64(value),
            "m" => Duration::from_secs_f64(value * 60.0),
            "h" => Duration::from_secs_f64(value * 3600.0),
            "d" => Duration::from_secs_f64(value * 86400.0),
            "w" => Duration::from_secs_f64(value * 604800.0),
            other => return Err(DurationParseError::UnknownUnit(other.to_string())),
        };
        total += unit_duration;
    }

    if !current_number.is_empty() {
        return Err(DurationParseError::InvalidFormat("missing unit after number".into()));
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_units() {
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("10m").unwrap(), Duration::from_secs(600));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("1d").unwrap(), Duration::from_secs(86400));
        assert_eq!(parse_duration("1w").unwrap(), Duration::from_secs(604800));
        assert_eq!(parse_duration("200ms").unwrap(), Duration::from_millis(200));
        assert_eq!(parse_duration("1500us").unwrap(), Duration::from_micros(1500));
    }

    #[test]
    fn parses_compound_durations() {
        assert_eq!(parse_duration("1h 30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("2h 15m 30s").unwrap(), Duration::from_secs(8130));
        assert_eq!(parse_duration("1s 500ms").unwrap(), Duration::from_millis(1500));
    }

    #[test]
    fn trims_surrounding_and_internal_whitespace() {
        assert_eq!(parse_duration("  5s  ").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("1h  30m").unwrap(), Duration::from_secs(5400));
    }

    #[test]
    fn parses_decimal_values() {
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::from_secs_f64(5400.0));
        assert_eq!(parse_duration("0.5s").unwrap(), Duration::from_millis(500));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(matches!(parse_duration(""), Err(DurationParseError::EmptyString)));
        assert!(parse_duration("5").is_err());
        assert!(parse_duration("x").is_err());
        assert!(parse_duration("5x").is_err());
    }
}

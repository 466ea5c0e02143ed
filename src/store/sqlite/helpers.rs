// src/store/sqlite/helpers.rs

use std::convert::TryFrom;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{Result, TrackerError};

pub fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| TrackerError::Parse(format!("value {} exceeds SQLite INTEGER range", value)))
}

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| TrackerError::Parse(format!("{} contains negative value {}", field, value)))
}

/// Fixed-width UTC text so that string order matches time order
pub fn format_datetime(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| TrackerError::Parse(format!("failed to parse {} '{}': {}", field, value, err)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datetime_text_sorts_chronologically() {
        let early = parse_datetime("2024-01-01T09:00:00.5Z", "t").unwrap();
        let late = parse_datetime("2024-01-01T10:00:00Z", "t").unwrap();

        let (a, b) = (format_datetime(&early), format_datetime(&late));
        assert_eq!(a, "2024-01-01T09:00:00.500000000Z");
        assert!(a < b);
        assert_eq!(parse_datetime(&a, "t").unwrap(), early);
    }

    #[test]
    fn test_datetime_keeps_sub_millisecond_precision() {
        let precise = parse_datetime("2024-01-01T10:00:00.123456789Z", "t").unwrap();
        let text = format_datetime(&precise);

        assert_eq!(text, "2024-01-01T10:00:00.123456789Z");
        assert_eq!(parse_datetime(&text, "t").unwrap(), precise);
        assert!(text < format_datetime(&(precise + chrono::Duration::nanoseconds(1))));
    }

    #[test]
    fn test_integer_range_checks() {
        assert_eq!(to_i64(42).unwrap(), 42);
        assert!(to_i64(u64::MAX).is_err());
        assert!(to_u64(-1, "duration_seconds").is_err());
    }
}

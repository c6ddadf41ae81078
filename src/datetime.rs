//! Date/time helpers for FeedFlow.
//!
//! Timestamps are stored as UTC text in SQLite's `YYYY-MM-DD HH:MM:SS` form,
//! which sorts lexicographically in chronological order.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Storage format for timestamps.
pub const SQL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Storage format for calendar dates.
pub const SQL_DATE_FORMAT: &str = "%Y-%m-%d";

/// Format a UTC timestamp for storage.
pub fn to_sql(dt: &DateTime<Utc>) -> String {
    dt.format(SQL_DATETIME_FORMAT).to_string()
}

/// Format a calendar date for storage.
pub fn date_to_sql(date: &NaiveDate) -> String {
    date.format(SQL_DATE_FORMAT).to_string()
}

/// Parse a stored timestamp.
///
/// Accepts the storage format and RFC 3339.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, SQL_DATETIME_FORMAT) {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse a stored calendar date.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, SQL_DATE_FORMAT).ok()
}

/// Today's date in UTC.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_to_sql() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 12, 30, 5).unwrap();
        assert_eq!(to_sql(&dt), "2024-01-15 12:30:05");
    }

    #[test]
    fn test_parse_datetime_sql_format() {
        let dt = parse_datetime("2024-01-15 12:30:05").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 15, 12, 30, 5).unwrap());
    }

    #[test]
    fn test_parse_datetime_rfc3339() {
        let dt = parse_datetime("2024-01-15T21:30:05+09:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 15, 12, 30, 5).unwrap());
    }

    #[test]
    fn test_parse_datetime_invalid() {
        assert!(parse_datetime("not a date").is_none());
        assert!(parse_datetime("").is_none());
    }

    #[test]
    fn test_date_roundtrip_ordering() {
        let a = to_sql(&Utc.with_ymd_and_hms(2024, 1, 9, 23, 0, 0).unwrap());
        let b = to_sql(&Utc.with_ymd_and_hms(2024, 1, 10, 1, 0, 0).unwrap());
        assert!(a < b);
        assert_eq!(parse_date("2024-01-10"), NaiveDate::from_ymd_opt(2024, 1, 10));
        assert_eq!(
            date_to_sql(&NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
            "2024-03-01"
        );
    }
}

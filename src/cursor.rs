//! The creation-date boundary carried between runs.
//!
//! A cursor is stored with microsecond precision and used with millisecond
//! precision: the stored text minus its last three characters is what the
//! archive filter receives. Text that is already at millisecond precision
//! or coarser is used as is.
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

const STORED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";
const EFFECTIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";
const PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const FALLBACK_DAYS: i64 = 31;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor(String);

impl Cursor {
    pub fn at(time: DateTime<Utc>) -> Self {
        Self(time.format(STORED_FORMAT).to_string())
    }

    /// Wraps persisted text. Returns `None` for blank content.
    pub fn from_stored(content: &str) -> Option<Self> {
        let content = content.trim();
        if content.is_empty() {
            return None;
        }
        Some(Self(content.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The millisecond timestamp the next fetch starts from, or `None` when
    /// the stored text is not a timestamp. Text already at millisecond
    /// precision or coarser is used as stored.
    pub fn since(&self) -> Option<String> {
        let parsed = NaiveDateTime::parse_from_str(&self.0, PARSE_FORMAT).ok()?;
        let fraction_digits = self.0.rsplit_once('.').map_or(0, |(_, f)| f.len());
        if fraction_digits <= 3 {
            return Some(parsed.format(EFFECTIVE_FORMAT).to_string());
        }
        let len = self.0.chars().count();
        Some(self.0.chars().take(len - 3).collect())
    }
}

/// Start of the window used when nothing usable is stored.
pub fn fallback_since(now: DateTime<Utc>) -> String {
    (now - Duration::days(FALLBACK_DAYS))
        .format(EFFECTIVE_FORMAT)
        .to_string()
}

/// An explicit start date, as midnight UTC.
pub fn since_date(date: NaiveDate) -> String {
    date.and_time(chrono::NaiveTime::MIN)
        .format(EFFECTIVE_FORMAT)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_stored_cursor_drops_sub_millisecond_digits() {
        let time = Utc.with_ymd_and_hms(2024, 7, 2, 12, 28, 54).unwrap()
            + Duration::microseconds(123_456);
        let cursor = Cursor::at(time);
        assert_eq!(cursor.as_str(), "2024-07-02T12:28:54.123456");
        assert_eq!(cursor.since().as_deref(), Some("2024-07-02T12:28:54.123"));
    }

    #[test]
    fn test_from_stored_trims_whitespace() {
        let cursor = Cursor::from_stored("2024-07-02T12:28:54.123456\n").unwrap();
        assert_eq!(cursor.since().as_deref(), Some("2024-07-02T12:28:54.123"));
        assert!(Cursor::from_stored("  \n").is_none());
    }

    #[test]
    fn test_malformed_cursor_has_no_since() {
        assert!(Cursor::from_stored("yesterday").unwrap().since().is_none());
        assert!(Cursor::from_stored("abc").unwrap().since().is_none());
    }

    #[test]
    fn test_coarser_cursor_is_not_trimmed() {
        let millis = Cursor::from_stored("2024-07-20T08:00:00.000").unwrap();
        assert_eq!(millis.since().as_deref(), Some("2024-07-20T08:00:00.000"));

        let seconds = Cursor::from_stored("2024-07-20T08:00:00").unwrap();
        assert_eq!(seconds.since().as_deref(), Some("2024-07-20T08:00:00.000"));

        let tenths = Cursor::from_stored("2024-07-20T08:00:00.5").unwrap();
        assert_eq!(tenths.since().as_deref(), Some("2024-07-20T08:00:00.500"));
    }

    #[test]
    fn test_fallback_is_31_days_back() {
        let now = Utc.with_ymd_and_hms(2024, 8, 1, 10, 0, 0).unwrap() + Duration::milliseconds(42);
        assert_eq!(fallback_since(now), "2024-07-01T10:00:00.042");
    }

    #[test]
    fn test_since_date_is_midnight() {
        let date = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        assert_eq!(since_date(date), "2024-07-01T00:00:00.000");
    }
}

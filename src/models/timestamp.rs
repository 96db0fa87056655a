//! Fixed textual timestamp codec.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Storage format for timestamps: `yyyy-MM-dd HH:mm:ss`.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Formats and parses the fixed `yyyy-MM-dd HH:mm:ss` timestamp text.
///
/// Text is UTC-anchored in both directions. Sub-second precision is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateCodec;

impl DateCodec {
    /// Formats an instant as storage text.
    #[must_use]
    pub fn format(instant: &DateTime<Utc>) -> String {
        instant.format(DATE_FORMAT).to_string()
    }

    /// Parses storage text back into an instant.
    ///
    /// Returns `None` if the text does not match [`DATE_FORMAT`].
    #[must_use]
    pub fn parse(text: &str) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(text.trim(), DATE_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }

    /// Returns true when the text has the shape of a stored timestamp.
    ///
    /// Both a date separator (`-`) and a time separator (`:`) must appear.
    #[must_use]
    pub fn looks_like_timestamp(text: &str) -> bool {
        text.contains('-') && text.contains(':')
    }

    /// Returns the current time as storage text.
    #[must_use]
    pub fn now_string() -> String {
        Self::format(&Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_format_and_parse() {
        let instant = Utc.with_ymd_and_hms(2020, 7, 27, 23, 59, 1).unwrap();
        let text = DateCodec::format(&instant);
        assert_eq!(text, "2020-07-27 23:59:01");
        assert_eq!(DateCodec::parse(&text), Some(instant));
    }

    #[test]
    fn test_parse_drops_nothing_but_subseconds() {
        let now = Utc::now();
        let parsed = DateCodec::parse(&DateCodec::format(&now)).unwrap();
        assert_eq!(parsed, now.with_nanosecond(0).unwrap());
    }

    #[test]
    fn test_parse_rejects_other_shapes() {
        assert!(DateCodec::parse("2020-07-27").is_none());
        assert!(DateCodec::parse("27/07/2020 10:00:00").is_none());
        assert!(DateCodec::parse("").is_none());
    }

    #[test]
    fn test_looks_like_timestamp() {
        assert!(DateCodec::looks_like_timestamp("2020-01-01 00:00:00"));
        assert!(!DateCodec::looks_like_timestamp("2020-01-01"));
        assert!(!DateCodec::looks_like_timestamp("12:00"));
    }

    #[test]
    fn test_now_string_parses() {
        assert!(DateCodec::parse(&DateCodec::now_string()).is_some());
    }
}

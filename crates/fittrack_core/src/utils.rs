//! Day normalization helpers.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};

/// Normalize user-supplied date text to a calendar day.
///
/// Accepts:
/// - YYYY-MM-DD
/// - RFC3339 datetime (date part in its own offset)
/// - Naive datetime YYYY-MM-DDTHH:MM:SS
pub fn parse_day(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(ndt.date());
    }
    None
}

/// Today in the host's local timezone.
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_day_accepts_date_only() {
        assert_eq!(parse_day("2025-12-15"), NaiveDate::from_ymd_opt(2025, 12, 15));
    }

    #[test]
    fn parse_day_drops_time() {
        assert_eq!(
            parse_day("2025-12-15T23:30:00"),
            NaiveDate::from_ymd_opt(2025, 12, 15)
        );
    }

    #[test]
    fn parse_day_keeps_rfc3339_offset_date() {
        assert_eq!(
            parse_day("2025-12-15T23:30:00-05:00"),
            NaiveDate::from_ymd_opt(2025, 12, 15)
        );
    }

    #[test]
    fn parse_day_rejects_invalid() {
        assert!(parse_day("not-a-date").is_none());
        assert!(parse_day("2025-02-30").is_none());
    }
}

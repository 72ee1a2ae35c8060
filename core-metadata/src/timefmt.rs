//! Capture-time parsing and display formatting
//!
//! Capture times arrive in several shapes: RFC 3339 from our own records,
//! `YYYY:MM:DD HH:MM:SS` from EXIF and Drive, and ISO-like variants from
//! exiftool. Values without an offset are taken as UTC.

use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat};

const NAIVE_FORMATS: &[&str] = &["%Y:%m:%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Parse a capture time, keeping the wall-clock offset it was written with.
pub fn parse_time_string(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt);
    }

    NAIVE_FORMATS.iter().find_map(|format| {
        NaiveDateTime::parse_from_str(value, format)
            .ok()
            .map(|naive| naive.and_utc().fixed_offset())
    })
}

/// Render for display, e.g. `Wednesday, 15 January 2025, 14:30`.
pub fn format_display(dt: &DateTime<FixedOffset>) -> String {
    dt.format("%A, %-d %B %Y, %H:%M").to_string()
}

/// Parse then render. Empty or unparseable input gives an empty string.
pub fn format_timestamp(value: &str) -> String {
    parse_time_string(value)
        .map(|dt| format_display(&dt))
        .unwrap_or_default()
}

/// Normalize any accepted capture-time shape to RFC 3339.
pub fn to_rfc3339(value: &str) -> Option<String> {
    parse_time_string(value).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_accepted_formats() {
        for input in [
            "2025-01-15T14:30:00Z",
            "2025:01:15 14:30:00",
            "2025-01-15T14:30:00",
            "2025-01-15 14:30:00",
        ] {
            let dt = parse_time_string(input).unwrap_or_else(|| panic!("failed on {}", input));
            assert_eq!((dt.year(), dt.month(), dt.day()), (2025, 1, 15));
            assert_eq!((dt.hour(), dt.minute()), (14, 30));
        }
    }

    #[test]
    fn test_parse_keeps_offset_wall_clock() {
        let dt = parse_time_string("2025-01-15T14:30:00+02:00").unwrap();
        assert_eq!(format_display(&dt), "Wednesday, 15 January 2025, 14:30");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_time_string("").is_none());
        assert!(parse_time_string("yesterday").is_none());
        assert!(parse_time_string("2025/01/15").is_none());
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(
            format_timestamp("2025:01:05 09:07:00"),
            "Sunday, 5 January 2025, 09:07"
        );
        assert_eq!(format_timestamp(""), "");
        assert_eq!(format_timestamp("not a date"), "");
    }

    #[test]
    fn test_to_rfc3339() {
        assert_eq!(
            to_rfc3339("2025:01:15 14:30:00").as_deref(),
            Some("2025-01-15T14:30:00Z")
        );
        assert_eq!(
            to_rfc3339("2025-01-15T14:30:00+02:00").as_deref(),
            Some("2025-01-15T14:30:00+02:00")
        );
        assert_eq!(to_rfc3339("bad"), None);
    }
}

//! Envelope timestamp formatting.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC instant as ISO-8601 with millisecond precision and a `Z` suffix.
///
/// `2024-05-01T12:00:00.123Z`
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_millisecond_precision() {
        let at = Utc.timestamp_millis_opt(1_714_564_800_123).unwrap();
        assert_eq!(format_timestamp(at), "2024-05-01T12:00:00.123Z");
    }

    #[test]
    fn test_format_truncates_sub_millisecond() {
        let at = Utc.timestamp_opt(1_714_564_800, 999_999).unwrap();
        assert_eq!(format_timestamp(at), "2024-05-01T12:00:00.000Z");
    }
}

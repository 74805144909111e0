//! Time utilities for label encoding
//!
//! Timestamps are persisted in labels as decimal unix seconds. Negative values
//! are valid and encode instants before the epoch.

use chrono::{DateTime, Utc};

/// Encode an instant as a label value (unix seconds)
#[must_use]
pub fn to_unix_label(time: DateTime<Utc>) -> String {
    time.timestamp().to_string()
}

/// Decode a label value written by [`to_unix_label`]
///
/// Returns `None` for empty or malformed values.
#[must_use]
pub fn from_unix_label(value: &str) -> Option<DateTime<Utc>> {
    value
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_encode_decode() {
        let t = Utc.with_ymd_and_hms(2022, 2, 28, 14, 57, 8).unwrap();
        assert_eq!(to_unix_label(t), "1646060228");
        assert_eq!(from_unix_label("1646060228"), Some(t));
    }

    #[test]
    fn test_pre_epoch() {
        let t = Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(to_unix_label(t), "-62135596800");
    }

    #[test]
    fn test_malformed() {
        assert_eq!(from_unix_label(""), None);
        assert_eq!(from_unix_label("tomorrow"), None);
    }
}

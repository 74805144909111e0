//! Built-in secret generators

pub mod basic_auth;
pub mod certificate;
pub mod token;

pub use basic_auth::BasicAuthGenerator;
pub use certificate::CertificateGenerator;
pub use token::StaticTokenGenerator;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::time::Duration;

use crate::core::{SecretConfig, SecretsError, SecretsResult};

/// Issue and expiry instants for material valid for `validity` from `now`
///
/// Labels carry whole seconds, so the window starts at `now` truncated to the
/// second. A validity past the representable date range is a config error.
pub(crate) fn validity_window(
    config: &SecretConfig,
    validity: Duration,
    now: DateTime<Utc>,
) -> SecretsResult<(DateTime<Utc>, DateTime<Utc>)> {
    let issued_at = DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now);
    let valid_until = ChronoDuration::from_std(validity)
        .ok()
        .and_then(|validity| issued_at.checked_add_signed(validity))
        .ok_or_else(|| {
            SecretsError::config(
                &config.name,
                format!("validity {validity:?} exceeds the supported date range"),
            )
        })?;
    Ok((issued_at, valid_until))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const YEAR: u64 = 365 * 24 * 3600;

    #[test]
    fn test_window_truncates_to_seconds() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
            + ChronoDuration::milliseconds(750);
        let config = SecretConfig::certificate_authority("ca");

        let (issued_at, valid_until) =
            validity_window(&config, Duration::from_secs(60), now).unwrap();

        assert_eq!(issued_at.timestamp_subsec_millis(), 0);
        assert_eq!(valid_until - issued_at, ChronoDuration::seconds(60));
    }

    #[test]
    fn test_window_past_date_range_is_config_error() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let config = SecretConfig::certificate_authority("ca");

        let err = validity_window(&config, Duration::from_secs(300_000 * YEAR), now).unwrap_err();

        assert!(matches!(err, SecretsError::Config { .. }));
        assert!(err.to_string().contains("date range"), "{err}");
    }
}

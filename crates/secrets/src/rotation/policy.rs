//! Auto-renewal policy
//!
//! Decides from a generation's validity window whether its logical name is
//! due for rotation. The decision is a pure function of the two timestamps
//! and the current time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::{SecretsError, SecretsResult};

/// Share of the validity window after which material is renewed
pub const DEFAULT_VALIDITY_FRACTION: f64 = 0.80;

/// Remaining validity below which material is renewed
pub const DEFAULT_MINIMUM_REMAINING: Duration = Duration::from_secs(10 * 24 * 3600);

/// When to renew expiring material
///
/// Renewal is due when either threshold is crossed:
/// - `validity_fraction` of the window `[issued_at, valid_until]` has elapsed
/// - at most `minimum_remaining` is left before `valid_until`
///
/// # Example
///
/// ```
/// use chrono::{Duration, Utc};
/// use nebula_secrets::rotation::RenewalPolicy;
///
/// let policy = RenewalPolicy::default();
/// let now = Utc::now();
///
/// assert!(policy.should_rotate(Some(now - Duration::hours(24)), Some(now + Duration::hours(1)), now));
/// assert!(!policy.should_rotate(Some(now - Duration::hours(24)), Some(now + Duration::days(365)), now));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenewalPolicy {
    /// Elapsed share of the validity window that triggers renewal, in (0, 1]
    #[serde(default = "default_validity_fraction")]
    pub validity_fraction: f64,

    /// Remaining validity that triggers renewal
    #[serde(default = "default_minimum_remaining", with = "humantime_serde")]
    pub minimum_remaining: Duration,
}

fn default_validity_fraction() -> f64 {
    DEFAULT_VALIDITY_FRACTION
}

fn default_minimum_remaining() -> Duration {
    DEFAULT_MINIMUM_REMAINING
}

impl Default for RenewalPolicy {
    fn default() -> Self {
        Self {
            validity_fraction: DEFAULT_VALIDITY_FRACTION,
            minimum_remaining: DEFAULT_MINIMUM_REMAINING,
        }
    }
}

impl RenewalPolicy {
    /// Reject thresholds outside their domain
    pub fn validate(&self) -> SecretsResult<()> {
        if !(self.validity_fraction > 0.0 && self.validity_fraction <= 1.0) {
            return Err(SecretsError::config(
                "renewal",
                format!(
                    "validity_fraction must be in (0, 1], got {}",
                    self.validity_fraction
                ),
            ));
        }
        Ok(())
    }

    /// Whether material valid in `[issued_at, valid_until]` is due for renewal
    ///
    /// Returns `false` when either timestamp is unknown: material without a
    /// validity window never expires.
    pub fn should_rotate(
        &self,
        issued_at: Option<DateTime<Utc>>,
        valid_until: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> bool {
        let (Some(issued_at), Some(valid_until)) = (issued_at, valid_until) else {
            return false;
        };

        let remaining = valid_until - now;
        let minimum = chrono::Duration::from_std(self.minimum_remaining)
            .unwrap_or(chrono::Duration::MAX);
        if remaining <= minimum {
            return true;
        }

        let total = (valid_until - issued_at).num_milliseconds();
        if total <= 0 {
            return true;
        }
        let elapsed = (now - issued_at).num_milliseconds();
        elapsed as f64 / total as f64 >= self.validity_fraction
    }
}

/// [`RenewalPolicy::should_rotate`] with the default thresholds
pub fn should_rotate(
    issued_at: Option<DateTime<Utc>>,
    valid_until: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    RenewalPolicy::default().should_rotate(issued_at, valid_until, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use rstest::rstest;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[rstest]
    #[case::almost_expired(ChronoDuration::hours(-24), ChronoDuration::hours(1), true)]
    #[case::inside_minimum_remaining(ChronoDuration::hours(-24), ChronoDuration::hours(24), true)]
    #[case::long_lived(ChronoDuration::hours(-24), ChronoDuration::days(15 * 365), false)]
    #[case::exactly_at_fraction(ChronoDuration::days(-800), ChronoDuration::days(200), true)]
    #[case::just_before_fraction(ChronoDuration::days(-799), ChronoDuration::days(201), false)]
    #[case::exactly_minimum_remaining(ChronoDuration::days(-1), ChronoDuration::days(10), true)]
    #[case::already_expired(ChronoDuration::days(-30), ChronoDuration::days(-1), true)]
    fn test_should_rotate(
        #[case] issued_offset: ChronoDuration,
        #[case] valid_offset: ChronoDuration,
        #[case] expected: bool,
    ) {
        let now = now();
        assert_eq!(
            should_rotate(Some(now + issued_offset), Some(now + valid_offset), now),
            expected
        );
    }

    #[test]
    fn test_absent_timestamps_never_rotate() {
        let now = now();
        assert!(!should_rotate(None, Some(now), now));
        assert!(!should_rotate(Some(now), None, now));
        assert!(!should_rotate(None, None, now));
    }

    #[test]
    fn test_custom_policy() {
        let policy = RenewalPolicy {
            validity_fraction: 0.5,
            minimum_remaining: Duration::from_secs(3600),
        };
        let now = now();
        // Half of a 100 day window elapsed.
        assert!(policy.should_rotate(
            Some(now - ChronoDuration::days(50)),
            Some(now + ChronoDuration::days(50)),
            now
        ));
        assert!(!RenewalPolicy::default().should_rotate(
            Some(now - ChronoDuration::days(50)),
            Some(now + ChronoDuration::days(50)),
            now
        ));
    }

    #[test]
    fn test_validate() {
        assert!(RenewalPolicy::default().validate().is_ok());

        for fraction in [0.0, -0.5, 1.5, f64::NAN] {
            let policy = RenewalPolicy {
                validity_fraction: fraction,
                ..Default::default()
            };
            assert!(
                policy.validate().is_err(),
                "fraction {fraction} should be rejected"
            );
        }
    }

    #[test]
    fn test_deserialize_humantime() {
        let policy: RenewalPolicy =
            serde_json::from_str(r#"{ "minimum_remaining": "2days" }"#).unwrap();
        assert_eq!(policy.minimum_remaining, Duration::from_secs(2 * 24 * 3600));
        assert_eq!(policy.validity_fraction, DEFAULT_VALIDITY_FRACTION);
    }
}

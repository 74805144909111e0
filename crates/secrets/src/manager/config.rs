//! Manager configuration

use serde::{Deserialize, Serialize};

use crate::core::{SecretsError, SecretsResult};
use crate::naming::{MAX_LABEL_VALUE_LENGTH, validate_logical_name};
use crate::rotation::RenewalPolicy;

/// Configuration of a [`SecretsManager`](super::SecretsManager)
///
/// # Example
///
/// ```
/// use nebula_secrets::manager::ManagerConfig;
/// use std::time::Duration;
///
/// let config: ManagerConfig = serde_json::from_str(r#"{
///     "namespace": "shoot--foo--bar",
///     "identity": "gardenlet",
///     "renewal": { "validity_fraction": 0.7, "minimum_remaining": "7days" }
/// }"#)?;
///
/// config.validate()?;
/// assert_eq!(config.renewal.minimum_remaining, Duration::from_secs(7 * 24 * 3600));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Namespace every generation is persisted in
    pub namespace: String,

    /// Identity stamped on, and used to select, owned generations
    pub identity: String,

    /// When expiring material is renewed
    #[serde(default)]
    pub renewal: RenewalPolicy,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            identity: "secrets-manager".to_string(),
            renewal: RenewalPolicy::default(),
        }
    }
}

impl ManagerConfig {
    /// Config for `identity` in `namespace` with the default renewal policy
    pub fn new(namespace: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            identity: identity.into(),
            renewal: RenewalPolicy::default(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> SecretsResult<()> {
        validate_logical_name(&self.namespace).map_err(|_| {
            SecretsError::config(
                "manager",
                format!("namespace '{}' is not a valid DNS label", self.namespace),
            )
        })?;

        let identity_valid = !self.identity.is_empty()
            && self.identity.len() <= MAX_LABEL_VALUE_LENGTH
            && self
                .identity
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && self.identity.starts_with(|c: char| c.is_ascii_alphanumeric())
            && self.identity.ends_with(|c: char| c.is_ascii_alphanumeric());
        if !identity_valid {
            return Err(SecretsError::config(
                "manager",
                format!("identity '{}' is not a valid label value", self.identity),
            ));
        }

        self.renewal.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_default_is_valid() {
        assert!(ManagerConfig::default().validate().is_ok());
    }

    #[rstest]
    #[case("", "gardenlet")]
    #[case("Shoot", "gardenlet")]
    #[case("shoot", "")]
    #[case("shoot", "-gardenlet")]
    #[case("shoot", "garden let")]
    fn test_invalid(#[case] namespace: &str, #[case] identity: &str) {
        let err = ManagerConfig::new(namespace, identity).validate().unwrap_err();
        assert!(matches!(err, SecretsError::Config { .. }));
    }

    #[test]
    fn test_invalid_renewal() {
        let mut config = ManagerConfig::new("shoot", "gardenlet");
        config.renewal.validity_fraction = 2.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_renewal_defaults_when_omitted() {
        let config: ManagerConfig =
            serde_json::from_str(r#"{ "namespace": "shoot", "identity": "gardenlet" }"#).unwrap();
        assert_eq!(config.renewal, RenewalPolicy::default());
    }
}

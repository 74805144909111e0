//! Basic auth credentials

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;

use crate::core::{Payload, SecretConfig, SecretParameters, SecretsError, SecretsResult, keys};
use super::validity_window;
use crate::traits::{IssuingMaterial, SecretGenerator, SecretMaterial};

/// Shortest password the generator will produce
pub const MIN_PASSWORD_LENGTH: usize = 12;

/// Generator for [`SecretKind::BasicAuth`](crate::core::SecretKind::BasicAuth)
///
/// Emits the username, a random alphanumeric password and an `auth` line in
/// the `password,user,uid` CSV format of a basic auth file.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicAuthGenerator;

impl SecretGenerator for BasicAuthGenerator {
    fn validate(&self, config: &SecretConfig) -> SecretsResult<()> {
        let SecretParameters::BasicAuth(parameters) = &config.parameters else {
            return Err(SecretsError::config(
                &config.name,
                "basic auth parameters are required",
            ));
        };
        if parameters.username.is_empty() || parameters.username.contains([',', '\n']) {
            return Err(SecretsError::config(
                &config.name,
                "username must be non-empty and free of commas and newlines",
            ));
        }
        if parameters.password_length < MIN_PASSWORD_LENGTH {
            return Err(SecretsError::config(
                &config.name,
                format!(
                    "password_length must be at least {MIN_PASSWORD_LENGTH}, got {}",
                    parameters.password_length
                ),
            ));
        }
        Ok(())
    }

    fn generate(
        &self,
        config: &SecretConfig,
        _issuer: Option<&IssuingMaterial>,
        now: DateTime<Utc>,
    ) -> SecretsResult<SecretMaterial> {
        let SecretParameters::BasicAuth(parameters) = &config.parameters else {
            return Err(SecretsError::config(
                &config.name,
                "basic auth parameters are required",
            ));
        };

        let password: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(parameters.password_length)
            .map(char::from)
            .collect();
        let auth = format!(
            "{password},{user},{user}",
            user = parameters.username
        );

        let mut data = Payload::new();
        data.insert(
            keys::USERNAME.to_string(),
            parameters.username.clone().into_bytes(),
        );
        data.insert(keys::PASSWORD.to_string(), password.into_bytes());
        data.insert(keys::AUTH.to_string(), auth.into_bytes());

        let material = SecretMaterial::new(data);
        match config.validity {
            Some(validity) => {
                let (issued_at, valid_until) = validity_window(config, validity, now)?;
                Ok(material.with_validity(issued_at, valid_until))
            }
            None => Ok(material),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BasicAuthParameters;
    use chrono::{Duration as ChronoDuration, TimeZone};

    #[test]
    fn test_generate_basic_auth() {
        let config = SecretConfig::basic_auth("observability", BasicAuthParameters::default());
        BasicAuthGenerator.validate(&config).unwrap();

        let material = BasicAuthGenerator
            .generate(&config, None, Utc::now())
            .unwrap();

        let password = String::from_utf8(material.data[keys::PASSWORD].clone()).unwrap();
        assert_eq!(password.len(), 32);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(material.data[keys::USERNAME], b"admin".to_vec());
        assert_eq!(
            material.data[keys::AUTH],
            format!("{password},admin,admin").into_bytes()
        );
    }

    #[test]
    fn test_validity_is_applied() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let config = SecretConfig::basic_auth("observability", BasicAuthParameters::default())
            .with_validity(std::time::Duration::from_secs(3600));

        let material = BasicAuthGenerator.generate(&config, None, now).unwrap();

        assert_eq!(material.issued_at, Some(now));
        assert_eq!(material.valid_until, Some(now + ChronoDuration::hours(1)));
    }

    #[test]
    fn test_no_validity_never_expires() {
        let config = SecretConfig::basic_auth("observability", BasicAuthParameters::default());
        let material = BasicAuthGenerator
            .generate(&config, None, Utc::now())
            .unwrap();
        assert_eq!(material.issued_at, None);
        assert_eq!(material.valid_until, None);
    }

    #[test]
    fn test_validity_past_date_range_is_rejected() {
        let config = SecretConfig::basic_auth("observability", BasicAuthParameters::default())
            .with_validity(std::time::Duration::from_secs(300_000 * 365 * 24 * 3600));

        let err = BasicAuthGenerator
            .generate(&config, None, Utc::now())
            .unwrap_err();

        assert!(matches!(err, SecretsError::Config { .. }));
    }

    #[test]
    fn test_validate_password_length() {
        let config = SecretConfig::basic_auth(
            "observability",
            BasicAuthParameters {
                username: "admin".into(),
                password_length: 4,
            },
        );
        let err = BasicAuthGenerator.validate(&config).unwrap_err();
        assert!(err.to_string().contains("password_length"));
    }
}

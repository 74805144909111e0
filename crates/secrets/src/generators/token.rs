//! Static bearer tokens

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use rand::Rng;

use crate::core::{Payload, SecretConfig, SecretParameters, SecretsError, SecretsResult, keys};
use super::validity_window;
use crate::traits::{IssuingMaterial, SecretGenerator, SecretMaterial};

/// Random bytes per token
pub const TOKEN_BYTES: usize = 32;

/// Generator for [`SecretKind::StaticToken`](crate::core::SecretKind::StaticToken)
///
/// Besides the raw token, the payload carries a one-line token file in the
/// kube-apiserver `token,user,uid,"group1,group2"` format.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticTokenGenerator;

impl SecretGenerator for StaticTokenGenerator {
    fn validate(&self, config: &SecretConfig) -> SecretsResult<()> {
        let SecretParameters::StaticToken(parameters) = &config.parameters else {
            return Err(SecretsError::config(
                &config.name,
                "static token parameters are required",
            ));
        };
        if parameters.username.is_empty() {
            return Err(SecretsError::config(&config.name, "username cannot be empty"));
        }
        let fields = std::iter::once(&parameters.username)
            .chain(std::iter::once(&parameters.user_id))
            .chain(parameters.groups.iter());
        for field in fields {
            if field.contains(['"', ',', '\n']) {
                return Err(SecretsError::config(
                    &config.name,
                    format!("'{field}' cannot contain quotes, commas or newlines"),
                ));
            }
        }
        Ok(())
    }

    fn generate(
        &self,
        config: &SecretConfig,
        _issuer: Option<&IssuingMaterial>,
        now: DateTime<Utc>,
    ) -> SecretsResult<SecretMaterial> {
        let SecretParameters::StaticToken(parameters) = &config.parameters else {
            return Err(SecretsError::config(
                &config.name,
                "static token parameters are required",
            ));
        };

        let mut bytes = [0u8; TOKEN_BYTES];
        rand::rng().fill(&mut bytes);
        let token = URL_SAFE_NO_PAD.encode(bytes);

        let user_id = if parameters.user_id.is_empty() {
            &parameters.username
        } else {
            &parameters.user_id
        };
        let mut csv = format!("{token},{},{user_id}", parameters.username);
        if !parameters.groups.is_empty() {
            csv.push_str(&format!(",\"{}\"", parameters.groups.join(",")));
        }

        let mut data = Payload::new();
        data.insert(keys::TOKEN.to_string(), token.into_bytes());
        data.insert(keys::STATIC_TOKENS_CSV.to_string(), csv.into_bytes());

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
    use crate::core::TokenParameters;
    use chrono::{Duration as ChronoDuration, TimeZone};

    fn config(groups: Vec<String>) -> SecretConfig {
        SecretConfig::static_token(
            "admin-token",
            TokenParameters {
                username: "admin".into(),
                user_id: String::new(),
                groups,
            },
        )
    }

    #[test]
    fn test_token_file_line() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let config = config(vec!["system:masters".into(), "ops".into()]);
        StaticTokenGenerator.validate(&config).unwrap();

        let material = StaticTokenGenerator.generate(&config, None, now).unwrap();

        let token = String::from_utf8(material.data[keys::TOKEN].clone()).unwrap();
        let csv = String::from_utf8(material.data[keys::STATIC_TOKENS_CSV].clone()).unwrap();
        assert_eq!(token.len(), 43, "32 bytes in unpadded base64");
        assert_eq!(csv, format!("{token},admin,admin,\"system:masters,ops\""));
        assert_eq!(material.valid_until, None);
    }

    #[test]
    fn test_tokens_are_random() {
        let now = Utc::now();
        let config = config(Vec::new());
        let a = StaticTokenGenerator.generate(&config, None, now).unwrap();
        let b = StaticTokenGenerator.generate(&config, None, now).unwrap();
        assert_ne!(a.data[keys::TOKEN], b.data[keys::TOKEN]);
    }

    #[test]
    fn test_validity_is_applied() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let config = config(Vec::new()).with_validity(std::time::Duration::from_secs(3600));
        let material = StaticTokenGenerator.generate(&config, None, now).unwrap();
        assert_eq!(material.issued_at, Some(now));
        assert_eq!(material.valid_until, Some(now + ChronoDuration::hours(1)));
    }

    #[test]
    fn test_validity_past_date_range_is_rejected() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let config = config(Vec::new())
            .with_validity(std::time::Duration::from_secs(300_000 * 365 * 24 * 3600));

        let err = StaticTokenGenerator.generate(&config, None, now).unwrap_err();

        assert!(matches!(err, SecretsError::Config { .. }));
    }

    #[test]
    fn test_validate_rejects_csv_breaking_fields() {
        assert!(StaticTokenGenerator
            .validate(&config(vec!["a,b".into()]))
            .is_err());

        let mut empty_user = config(Vec::new());
        empty_user.parameters = SecretParameters::StaticToken(TokenParameters::default());
        assert!(StaticTokenGenerator.validate(&empty_user).is_err());
    }
}

//! CA and leaf certificate generation
//!
//! Keys are ECDSA P-256. A CA without a signing CA is self-signed; with one
//! it becomes an intermediate. Leaf certificates always need an issuer.

use chrono::{DateTime, Utc};
use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose,
    IsCa, KeyPair, KeyUsagePurpose, SanType,
};
use std::time::Duration;

use crate::core::{
    CertificateParameters, CertificateUsage, Payload, SecretConfig, SecretKind, SecretsError,
    SecretsResult, keys,
};
use super::validity_window;
use crate::traits::{IssuingMaterial, SecretGenerator, SecretMaterial};

/// Default validity of CA certificates
pub const DEFAULT_CA_VALIDITY: Duration = Duration::from_secs(10 * 365 * 24 * 3600);

/// Default validity of leaf certificates
pub const DEFAULT_CERTIFICATE_VALIDITY: Duration = Duration::from_secs(365 * 24 * 3600);

/// Generator for [`SecretKind::CertificateAuthority`] and [`SecretKind::Certificate`]
#[derive(Debug, Clone, Copy, Default)]
pub struct CertificateGenerator;

impl CertificateGenerator {
    fn parameters<'a>(config: &'a SecretConfig) -> SecretsResult<&'a CertificateParameters> {
        config.certificate_parameters().ok_or_else(|| {
            SecretsError::config(&config.name, "certificate parameters are required")
        })
    }

    fn validity(config: &SecretConfig) -> Duration {
        config.validity.unwrap_or(match config.kind {
            SecretKind::CertificateAuthority => DEFAULT_CA_VALIDITY,
            _ => DEFAULT_CERTIFICATE_VALIDITY,
        })
    }

    fn build_params(
        config: &SecretConfig,
        parameters: &CertificateParameters,
        issued_at: DateTime<Utc>,
        valid_until: DateTime<Utc>,
    ) -> SecretsResult<CertificateParams> {
        let rcgen_err = |e: rcgen::Error| SecretsError::config(&config.name, e.to_string());

        let mut params = CertificateParams::new(parameters.dns_names.clone()).map_err(rcgen_err)?;
        params
            .subject_alt_names
            .extend(parameters.ip_addresses.iter().copied().map(SanType::IpAddress));

        let mut distinguished_name = DistinguishedName::new();
        distinguished_name.push(DnType::CommonName, parameters.common_name.as_str());
        for organization in &parameters.organization {
            distinguished_name.push(DnType::OrganizationName, organization.as_str());
        }
        params.distinguished_name = distinguished_name;

        params.not_before = to_offset(config, issued_at)?;
        params.not_after = to_offset(config, valid_until)?;

        if config.kind.is_certificate_authority() {
            params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
            params.key_usages = vec![
                KeyUsagePurpose::DigitalSignature,
                KeyUsagePurpose::KeyCertSign,
                KeyUsagePurpose::CrlSign,
            ];
        } else {
            params.is_ca = IsCa::NoCa;
            params.key_usages = vec![
                KeyUsagePurpose::DigitalSignature,
                KeyUsagePurpose::KeyEncipherment,
            ];
            params.extended_key_usages = match parameters.usage {
                CertificateUsage::Client => vec![ExtendedKeyUsagePurpose::ClientAuth],
                CertificateUsage::Server => vec![ExtendedKeyUsagePurpose::ServerAuth],
                CertificateUsage::Both => vec![
                    ExtendedKeyUsagePurpose::ClientAuth,
                    ExtendedKeyUsagePurpose::ServerAuth,
                ],
            };
        }

        Ok(params)
    }
}

impl SecretGenerator for CertificateGenerator {
    fn validate(&self, config: &SecretConfig) -> SecretsResult<()> {
        let parameters = Self::parameters(config)?;
        if parameters.common_name.is_empty() {
            return Err(SecretsError::config(
                &config.name,
                "common_name cannot be empty",
            ));
        }
        if Self::validity(config).is_zero() {
            return Err(SecretsError::config(&config.name, "validity cannot be zero"));
        }
        if config.kind == SecretKind::Certificate && config.signing_ca.is_none() {
            return Err(SecretsError::config(
                &config.name,
                "certificates require a signing CA",
            ));
        }
        Ok(())
    }

    fn generate(
        &self,
        config: &SecretConfig,
        issuer: Option<&IssuingMaterial>,
        now: DateTime<Utc>,
    ) -> SecretsResult<SecretMaterial> {
        let rcgen_err = |e: rcgen::Error| SecretsError::config(&config.name, e.to_string());
        let parameters = Self::parameters(config)?;

        // Labels carry whole seconds; keep the certificate window identical.
        let (issued_at, valid_until) = validity_window(config, Self::validity(config), now)?;

        let params = Self::build_params(config, parameters, issued_at, valid_until)?;
        let key_pair = KeyPair::generate().map_err(rcgen_err)?;

        let certificate = match issuer {
            Some(issuer) => {
                let (issuer_cert, issuer_key) = load_issuer(config, issuer)?;
                params
                    .signed_by(&key_pair, &issuer_cert, &issuer_key)
                    .map_err(rcgen_err)?
            }
            None if config.kind.is_certificate_authority() => {
                params.self_signed(&key_pair).map_err(rcgen_err)?
            }
            None => {
                return Err(SecretsError::config(
                    &config.name,
                    "no issuing CA material resolved",
                ))
            }
        };

        let mut data = Payload::new();
        match config.kind {
            SecretKind::CertificateAuthority => {
                data.insert(
                    keys::CA_CERTIFICATE.to_string(),
                    certificate.pem().into_bytes(),
                );
                data.insert(
                    keys::CA_PRIVATE_KEY.to_string(),
                    key_pair.serialize_pem().into_bytes(),
                );
            }
            _ => {
                data.insert(
                    keys::TLS_CERTIFICATE.to_string(),
                    certificate.pem().into_bytes(),
                );
                data.insert(
                    keys::TLS_PRIVATE_KEY.to_string(),
                    key_pair.serialize_pem().into_bytes(),
                );
                if let Some(issuer) = issuer {
                    data.insert(
                        keys::CA_CERTIFICATE.to_string(),
                        issuer.certificate_pem.clone(),
                    );
                }
            }
        }

        Ok(SecretMaterial::new(data).with_validity(issued_at, valid_until))
    }
}

/// Reconstruct the issuer certificate and key from their PEM encoding
///
/// rcgen signs with a certificate object; re-deriving it from the persisted
/// parameters and key yields the same subject and key identifier.
fn load_issuer(
    config: &SecretConfig,
    issuer: &IssuingMaterial,
) -> SecretsResult<(rcgen::Certificate, KeyPair)> {
    let invalid = |what: &str, reason: String| {
        SecretsError::config(
            &config.name,
            format!("signing CA '{}' has invalid {what}: {reason}", issuer.name),
        )
    };

    let certificate_pem = std::str::from_utf8(&issuer.certificate_pem)
        .map_err(|e| invalid("certificate encoding", e.to_string()))?;
    let key_pem = std::str::from_utf8(&issuer.private_key_pem)
        .map_err(|e| invalid("private key encoding", e.to_string()))?;

    let key_pair = KeyPair::from_pem(key_pem).map_err(|e| invalid("private key", e.to_string()))?;
    let params = CertificateParams::from_ca_cert_pem(certificate_pem)
        .map_err(|e| invalid("certificate", e.to_string()))?;
    let certificate = params
        .self_signed(&key_pair)
        .map_err(|e| invalid("certificate", e.to_string()))?;

    Ok((certificate, key_pair))
}

fn to_offset(config: &SecretConfig, instant: DateTime<Utc>) -> SecretsResult<time::OffsetDateTime> {
    time::OffsetDateTime::from_unix_timestamp(instant.timestamp()).map_err(|e| {
        SecretsError::config(&config.name, format!("timestamp out of range: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn issue_ca() -> IssuingMaterial {
        let config = SecretConfig::certificate_authority("ca");
        let material = CertificateGenerator.generate(&config, None, now()).unwrap();
        IssuingMaterial {
            name: "ca".into(),
            certificate_pem: material.data[keys::CA_CERTIFICATE].clone(),
            private_key_pem: material.data[keys::CA_PRIVATE_KEY].clone(),
        }
    }

    #[test]
    fn test_self_signed_ca() {
        let config = SecretConfig::certificate_authority("ca");
        CertificateGenerator.validate(&config).unwrap();

        let material = CertificateGenerator.generate(&config, None, now()).unwrap();

        let cert = String::from_utf8(material.data[keys::CA_CERTIFICATE].clone()).unwrap();
        let key = String::from_utf8(material.data[keys::CA_PRIVATE_KEY].clone()).unwrap();
        assert!(cert.starts_with("-----BEGIN CERTIFICATE-----"));
        assert!(key.contains("PRIVATE KEY"));
        assert_eq!(material.issued_at, Some(now()));
        assert_eq!(
            material.valid_until,
            Some(now() + ChronoDuration::from_std(DEFAULT_CA_VALIDITY).unwrap())
        );
    }

    #[test]
    fn test_leaf_signed_by_ca() {
        let ca = issue_ca();
        let config = SecretConfig::certificate(
            "kube-apiserver",
            CertificateParameters {
                common_name: "kube-apiserver".into(),
                dns_names: vec!["kubernetes.default.svc".into()],
                ip_addresses: vec!["10.0.0.1".parse().unwrap()],
                usage: CertificateUsage::Both,
                ..Default::default()
            },
        )
        .signed_by("ca")
        .with_validity(Duration::from_secs(24 * 3600));
        CertificateGenerator.validate(&config).unwrap();

        let material = CertificateGenerator
            .generate(&config, Some(&ca), now())
            .unwrap();

        assert!(material.data.contains_key(keys::TLS_CERTIFICATE));
        assert!(material.data.contains_key(keys::TLS_PRIVATE_KEY));
        assert_eq!(material.data[keys::CA_CERTIFICATE], ca.certificate_pem);
        assert_eq!(material.valid_until, Some(now() + ChronoDuration::days(1)));
    }

    #[test]
    fn test_validity_past_date_range_is_rejected() {
        let config = SecretConfig::certificate_authority("ca")
            .with_validity(Duration::from_secs(300_000 * 365 * 24 * 3600));

        let err = CertificateGenerator.generate(&config, None, now()).unwrap_err();

        assert!(matches!(err, SecretsError::Config { .. }));
        assert!(err.to_string().contains("date range"), "{err}");
    }

    #[test]
    fn test_leaf_without_issuer_fails() {
        let config = SecretConfig::certificate(
            "client",
            CertificateParameters {
                common_name: "client".into(),
                ..Default::default()
            },
        )
        .signed_by("ca");

        let err = CertificateGenerator.generate(&config, None, now()).unwrap_err();
        assert!(matches!(err, SecretsError::Config { .. }));
    }

    #[test]
    fn test_validate_rejects_empty_common_name() {
        let config = SecretConfig::certificate("client", CertificateParameters::default())
            .signed_by("ca");
        assert!(CertificateGenerator.validate(&config).is_err());
    }

    #[test]
    fn test_invalid_issuer_material() {
        let config = SecretConfig::certificate(
            "client",
            CertificateParameters {
                common_name: "client".into(),
                ..Default::default()
            },
        )
        .signed_by("ca");
        let issuer = IssuingMaterial {
            name: "ca".into(),
            certificate_pem: b"garbage".to_vec(),
            private_key_pem: b"garbage".to_vec(),
        };

        let err = CertificateGenerator
            .generate(&config, Some(&issuer), now())
            .unwrap_err();
        assert!(err.to_string().contains("signing CA 'ca'"));
    }
}

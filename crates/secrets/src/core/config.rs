//! Secret configuration value objects
//!
//! A [`SecretConfig`] describes *what* credential to produce. It is an
//! immutable value: the manager never mutates it, and its canonical
//! serialization is the input to the content-addressed object name.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

/// Kind of credential a config produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecretKind {
    /// Self-signed (or intermediate) certificate authority
    CertificateAuthority,
    /// Leaf certificate signed by a managed CA
    Certificate,
    /// Static bearer token
    StaticToken,
    /// Username/password pair
    BasicAuth,
}

impl SecretKind {
    /// Stable string form, also used in log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretKind::CertificateAuthority => "certificate-authority",
            SecretKind::Certificate => "certificate",
            SecretKind::StaticToken => "static-token",
            SecretKind::BasicAuth => "basic-auth",
        }
    }

    /// Whether material of this kind can sign other certificates
    pub fn is_certificate_authority(&self) -> bool {
        matches!(self, SecretKind::CertificateAuthority)
    }
}

impl std::fmt::Display for SecretKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which generation of a CA to use when signing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaSelection {
    /// The newest generation
    #[default]
    Current,
    /// The newest generation of the previous rotation epoch
    Old,
}

/// Reference to the issued material of another config, by logical name
///
/// The reference is weak: it is resolved against the object store at
/// generation time, not held as a pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningCaRef {
    /// Logical name of the CA secret
    pub name: String,
    /// Which CA generation signs
    #[serde(default)]
    pub selection: CaSelection,
}

/// Intended usage of a leaf certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateUsage {
    /// TLS client authentication
    Client,
    /// TLS server authentication
    #[default]
    Server,
    /// Both client and server authentication
    Both,
}

/// Parameters for CA and leaf certificates
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CertificateParameters {
    /// Subject common name
    pub common_name: String,
    /// Subject organizations
    #[serde(default)]
    pub organization: Vec<String>,
    /// DNS subject alternative names
    #[serde(default)]
    pub dns_names: Vec<String>,
    /// IP subject alternative names
    #[serde(default)]
    pub ip_addresses: Vec<IpAddr>,
    /// Extended key usage of leaf certificates (ignored for CAs)
    #[serde(default)]
    pub usage: CertificateUsage,
}

/// Parameters for a static token
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenParameters {
    /// User the token authenticates as
    pub username: String,
    /// User ID, defaults to the username when empty
    #[serde(default)]
    pub user_id: String,
    /// Groups the user belongs to
    #[serde(default)]
    pub groups: Vec<String>,
}

/// Parameters for basic auth credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicAuthParameters {
    /// Username
    pub username: String,
    /// Length of the generated password
    pub password_length: usize,
}

impl Default for BasicAuthParameters {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password_length: 32,
        }
    }
}

/// Kind-specific parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SecretParameters {
    /// CA or leaf certificate
    Certificate(CertificateParameters),
    /// Static token
    StaticToken(TokenParameters),
    /// Basic auth
    BasicAuth(BasicAuthParameters),
}

/// Description of a credential to produce
///
/// # Example
///
/// ```
/// use nebula_secrets::core::{CertificateParameters, SecretConfig};
/// use std::time::Duration;
///
/// let ca = SecretConfig::certificate_authority("ca");
/// let server = SecretConfig::certificate(
///     "kube-apiserver",
///     CertificateParameters {
///         common_name: "kube-apiserver".into(),
///         dns_names: vec!["kubernetes.default.svc".into()],
///         ..Default::default()
///     },
/// )
/// .signed_by("ca")
/// .with_validity(Duration::from_secs(90 * 24 * 3600));
///
/// assert_eq!(server.signing_ca.as_ref().map(|ca| ca.name.as_str()), Some("ca"));
/// # let _ = ca;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretConfig {
    /// Logical name consumers use to request the current credential
    pub name: String,
    /// Credential kind
    pub kind: SecretKind,
    /// CA whose material signs this credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_ca: Option<SigningCaRef>,
    /// Validity of the issued material
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub validity: Option<Duration>,
    /// Kind-specific parameters
    pub parameters: SecretParameters,
}

impl SecretConfig {
    /// Self-signed CA whose common name is the logical name
    pub fn certificate_authority(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            parameters: SecretParameters::Certificate(CertificateParameters {
                common_name: name.clone(),
                ..Default::default()
            }),
            name,
            kind: SecretKind::CertificateAuthority,
            signing_ca: None,
            validity: None,
        }
    }

    /// Leaf certificate; needs [`SecretConfig::signed_by`] before generation
    pub fn certificate(name: impl Into<String>, parameters: CertificateParameters) -> Self {
        Self {
            name: name.into(),
            kind: SecretKind::Certificate,
            signing_ca: None,
            validity: None,
            parameters: SecretParameters::Certificate(parameters),
        }
    }

    /// Static bearer token
    pub fn static_token(name: impl Into<String>, parameters: TokenParameters) -> Self {
        Self {
            name: name.into(),
            kind: SecretKind::StaticToken,
            signing_ca: None,
            validity: None,
            parameters: SecretParameters::StaticToken(parameters),
        }
    }

    /// Basic auth credentials
    pub fn basic_auth(name: impl Into<String>, parameters: BasicAuthParameters) -> Self {
        Self {
            name: name.into(),
            kind: SecretKind::BasicAuth,
            signing_ca: None,
            validity: None,
            parameters: SecretParameters::BasicAuth(parameters),
        }
    }

    /// Sign with the current generation of the given CA
    pub fn signed_by(mut self, ca_name: impl Into<String>) -> Self {
        self.signing_ca = Some(SigningCaRef {
            name: ca_name.into(),
            selection: CaSelection::Current,
        });
        self
    }

    /// Sign with the previous generation of the given CA
    pub fn signed_by_old(mut self, ca_name: impl Into<String>) -> Self {
        self.signing_ca = Some(SigningCaRef {
            name: ca_name.into(),
            selection: CaSelection::Old,
        });
        self
    }

    /// Set the validity of the issued material
    pub fn with_validity(mut self, validity: Duration) -> Self {
        self.validity = Some(validity);
        self
    }

    /// Certificate parameters, if this is a certificate kind
    pub fn certificate_parameters(&self) -> Option<&CertificateParameters> {
        match &self.parameters {
            SecretParameters::Certificate(params) => Some(params),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders_set_kind_and_parameters() {
        let ca = SecretConfig::certificate_authority("ca");
        assert_eq!(ca.kind, SecretKind::CertificateAuthority);
        assert_eq!(ca.certificate_parameters().unwrap().common_name, "ca");

        let token = SecretConfig::static_token("admin-token", TokenParameters::default());
        assert_eq!(token.kind, SecretKind::StaticToken);
        assert!(token.certificate_parameters().is_none());
    }

    #[test]
    fn test_signed_by_old() {
        let cert = SecretConfig::certificate("etcd-client", CertificateParameters::default())
            .signed_by_old("ca-etcd");
        let signing = cert.signing_ca.unwrap();
        assert_eq!(signing.name, "ca-etcd");
        assert_eq!(signing.selection, CaSelection::Old);
    }

    #[test]
    fn test_deserialize_with_humantime_validity() {
        let json = r#"{
            "name": "kubelet",
            "kind": "certificate",
            "signing_ca": { "name": "ca-kubelet" },
            "validity": "30days",
            "parameters": { "type": "certificate", "common_name": "kubelet" }
        }"#;

        let config: SecretConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.validity, Some(Duration::from_secs(30 * 24 * 3600)));
        assert_eq!(
            config.signing_ca.unwrap().selection,
            CaSelection::Current,
            "selection defaults to the current CA"
        );
    }
}

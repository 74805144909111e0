//! Secret material generation
//!
//! A [`SecretGenerator`] turns a config (plus the signing CA's material, when
//! the config references one) into raw payload bytes. The manager treats it as
//! opaque; it decides nothing about naming or persistence.

use chrono::{DateTime, Utc};

use crate::core::{Payload, SecretConfig, SecretsResult};

/// Signing material resolved from a CA generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuingMaterial {
    /// Logical name of the CA
    pub name: String,
    /// PEM-encoded CA certificate
    pub certificate_pem: Vec<u8>,
    /// PEM-encoded CA private key
    pub private_key_pem: Vec<u8>,
}

/// Output of a generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretMaterial {
    /// Payload to persist
    pub data: Payload,
    /// When the material was issued, if it expires
    pub issued_at: Option<DateTime<Utc>>,
    /// When the material stops being valid
    pub valid_until: Option<DateTime<Utc>>,
}

impl SecretMaterial {
    /// Material that never expires
    pub fn new(data: Payload) -> Self {
        Self {
            data,
            issued_at: None,
            valid_until: None,
        }
    }

    /// Attach a validity window
    pub fn with_validity(mut self, issued_at: DateTime<Utc>, valid_until: DateTime<Utc>) -> Self {
        self.issued_at = Some(issued_at);
        self.valid_until = Some(valid_until);
        self
    }
}

/// Produces secret material for one [`SecretKind`](crate::core::SecretKind)
pub trait SecretGenerator: Send + Sync {
    /// Reject configs this generator cannot satisfy
    ///
    /// Called before naming, so it must not depend on resolved material.
    fn validate(&self, config: &SecretConfig) -> SecretsResult<()>;

    /// Produce fresh material
    ///
    /// `issuer` is `Some` exactly when the config references a signing CA.
    fn generate(
        &self,
        config: &SecretConfig,
        issuer: Option<&IssuingMaterial>,
        now: DateTime<Utc>,
    ) -> SecretsResult<SecretMaterial>;
}

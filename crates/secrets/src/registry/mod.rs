//! Kind registry
//!
//! Maps every [`SecretKind`] to the generator that validates and produces its
//! material. The registry is assembled once through [`KindRegistryBuilder`]
//! and is immutable afterwards; managers share it through an `Arc`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::core::{SecretConfig, SecretKind, SecretsError, SecretsResult};
use crate::generators::{BasicAuthGenerator, CertificateGenerator, StaticTokenGenerator};
use crate::traits::SecretGenerator;

/// Immutable map from kind to generator
#[derive(Clone)]
pub struct KindRegistry {
    generators: HashMap<SecretKind, Arc<dyn SecretGenerator>>,
}

impl KindRegistry {
    /// Start an empty registry
    pub fn builder() -> KindRegistryBuilder {
        KindRegistryBuilder::default()
    }

    /// Registry with the built-in generator for every kind
    pub fn builtin() -> Self {
        KindRegistryBuilder::with_builtin().build()
    }

    /// Generator for `kind`, if registered
    pub fn get(&self, kind: SecretKind) -> Option<Arc<dyn SecretGenerator>> {
        self.generators.get(&kind).cloned()
    }

    /// Generator for the kind of `config`, or a config error
    pub fn resolve(&self, config: &SecretConfig) -> SecretsResult<Arc<dyn SecretGenerator>> {
        self.get(config.kind).ok_or_else(|| {
            SecretsError::config(
                &config.name,
                format!("no generator registered for kind {}", config.kind),
            )
        })
    }

    /// Whether a generator is registered for `kind`
    pub fn contains(&self, kind: SecretKind) -> bool {
        self.generators.contains_key(&kind)
    }

    /// Registered kinds in declaration order
    pub fn kinds(&self) -> Vec<SecretKind> {
        let mut kinds: Vec<_> = self.generators.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

impl Default for KindRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for KindRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KindRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

/// Builder for [`KindRegistry`]
#[derive(Default)]
pub struct KindRegistryBuilder {
    generators: HashMap<SecretKind, Arc<dyn SecretGenerator>>,
}

impl KindRegistryBuilder {
    /// Builder pre-populated with the built-in generators
    pub fn with_builtin() -> Self {
        let certificates: Arc<dyn SecretGenerator> = Arc::new(CertificateGenerator);
        Self::default()
            .register(SecretKind::CertificateAuthority, Arc::clone(&certificates))
            .register(SecretKind::Certificate, certificates)
            .register(SecretKind::StaticToken, Arc::new(StaticTokenGenerator))
            .register(SecretKind::BasicAuth, Arc::new(BasicAuthGenerator))
    }

    /// Register or replace the generator for `kind`
    pub fn register(mut self, kind: SecretKind, generator: Arc<dyn SecretGenerator>) -> Self {
        self.generators.insert(kind, generator);
        self
    }

    /// Freeze the registry
    pub fn build(self) -> KindRegistry {
        KindRegistry {
            generators: self.generators,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Payload, TokenParameters};
    use crate::traits::{IssuingMaterial, SecretMaterial};
    use chrono::{DateTime, Utc};

    struct FixedToken;

    impl SecretGenerator for FixedToken {
        fn validate(&self, _config: &SecretConfig) -> SecretsResult<()> {
            Ok(())
        }

        fn generate(
            &self,
            _config: &SecretConfig,
            _issuer: Option<&IssuingMaterial>,
            _now: DateTime<Utc>,
        ) -> SecretsResult<SecretMaterial> {
            let mut data = Payload::new();
            data.insert("token".into(), b"fixed".to_vec());
            Ok(SecretMaterial::new(data))
        }
    }

    #[test]
    fn test_builtin_covers_every_kind() {
        let registry = KindRegistry::builtin();
        assert_eq!(
            registry.kinds(),
            vec![
                SecretKind::CertificateAuthority,
                SecretKind::Certificate,
                SecretKind::StaticToken,
                SecretKind::BasicAuth,
            ]
        );
    }

    #[test]
    fn test_override_generator() {
        let registry = KindRegistryBuilder::with_builtin()
            .register(SecretKind::StaticToken, Arc::new(FixedToken))
            .build();

        let config = SecretConfig::static_token("token", TokenParameters::default());
        let generator = registry.resolve(&config).unwrap();
        let material = generator.generate(&config, None, Utc::now()).unwrap();
        assert_eq!(material.data["token"], b"fixed".to_vec());
    }

    #[test]
    fn test_missing_kind_is_config_error() {
        let registry = KindRegistry::builder().build();
        let config = SecretConfig::certificate_authority("ca");
        let err = registry.resolve(&config).err().unwrap();
        assert!(matches!(err, SecretsError::Config { .. }));
        assert!(!registry.contains(SecretKind::CertificateAuthority));
    }
}

//! Nebula Secrets - rotation-safe credential lifecycle management
//!
//! Generates, names, persists, rotates and retires the credentials of a
//! cluster control plane: CA and leaf certificates, static tokens and basic
//! auth pairs.
//!
//! # Features
//!
//! - **Content-addressed names** - same config and rotation epoch, same object name
//! - **Stateless restarts** - rotation state is rebuilt from object labels
//! - **Auto-renewal** - rotation starts at 80% of validity or 10 days before expiry
//! - **Overlapping rotation** - old and new generations coexist until cleanup
//! - **CA bundles** - current and previous CA certificates in one object
//! - **Pluggable stores** - in-memory, or Kubernetes Secrets behind `kubernetes`
#![warn(missing_docs)]
#![deny(unsafe_code)]
#![forbid(unsafe_code)]

/// Core types, errors, and label keys
pub mod core;
/// Built-in secret generators
pub mod generators;
/// Secrets manager - high-level lifecycle API
pub mod manager;
/// Naming engine for content-addressed object names
pub mod naming;
/// Object store implementations
pub mod providers;
/// Kind to generator registry
pub mod registry;
/// Rotation state, renewal policy and generation selection
pub mod rotation;
/// Core traits for stores, clocks and generators
pub mod traits;
/// Hashing and time encoding helpers
pub mod utils;

// ── Root re-exports ─────────────────────────────────────────────────────────

pub use crate::core::{
    Generation, ObjectMeta, SecretConfig, SecretKind, SecretsError, SecretsResult, StoreError,
};
pub use crate::manager::{GenerateOptions, ManagerConfig, SecretsManager, Selection};
pub use crate::traits::{Clock, ObjectStore, SecretGenerator};

/// Commonly used types and traits
pub mod prelude {
    // Core types
    pub use crate::core::{
        BasicAuthParameters, CaSelection, CertificateParameters, CertificateUsage, Generation,
        ObjectMeta, Payload, SecretConfig, SecretKind, SecretsError, SecretsResult, StoreError,
        TokenParameters,
    };

    // Manager
    pub use crate::manager::{
        GenerateOptions, GenerationState, LifecycleState, ManagerConfig, SecretStatus,
        SecretsManager, SecretsManagerBuilder, Selection,
    };

    // Rotation
    pub use crate::rotation::{RenewalPolicy, RotationState};

    // Registry
    pub use crate::registry::{KindRegistry, KindRegistryBuilder};

    // Traits
    pub use crate::traits::{
        Clock, IssuingMaterial, LabelSelector, ManualClock, ObjectStore, SecretGenerator,
        SecretMaterial, SystemClock,
    };

    // Stores
    pub use crate::providers::{MemoryObjectStore, StoreOperation};

    #[cfg(feature = "kubernetes")]
    pub use crate::providers::KubernetesObjectStore;
}

//! Secrets Manager - lifecycle orchestration
//!
//! [`SecretsManager`] is the entry point of the crate. It ties the naming
//! engine, rotation state, renewal policy and generation selector to an
//! [`ObjectStore`](crate::traits::ObjectStore):
//!
//! ```text
//! generate(config) ──► renewal policy + rotation state ──► rotation epoch
//!                                                            │
//!                      naming engine ◄───────────────────────┘
//!                            │
//!            get ──► exists? ──yes──► reuse (identity checked)
//!                            │
//!                            no ──► generator ──► create (adopt on conflict)
//! ```
//!
//! # Lifecycle
//!
//! A logical name is `Absent` until its first `generate`, then `Current`.
//! A forced or due rotation creates a second generation next to the first:
//! the name is `Rotating` until [`SecretsManager::cleanup`] runs without the
//! name in its keep-set and removes the stale generation.

pub mod config;
#[allow(clippy::module_inception)]
pub mod manager;
pub mod options;
pub mod status;

pub use config::ManagerConfig;
pub use manager::{SecretsManager, SecretsManagerBuilder};
pub use options::{GenerateOptions, Selection};
pub use status::{GenerationState, GenerationStatus, LifecycleState, SecretStatus};

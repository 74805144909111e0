//! Core types for secret lifecycle management

mod config;
mod error;
mod generation;
pub mod keys;
pub mod labels;

pub use config::{
    BasicAuthParameters, CaSelection, CertificateParameters, CertificateUsage, SecretConfig,
    SecretKind, SecretParameters, SigningCaRef, TokenParameters,
};
pub use error::{SecretsError, SecretsResult, StoreError};
pub use generation::{Generation, Labels, ObjectMeta, Payload};

//! Error types for secret lifecycle operations
//!
//! Two tiers, mirroring the layering of the crate:
//! - [`StoreError`]: what an [`ObjectStore`](crate::traits::ObjectStore) reports
//! - [`SecretsError`]: what every public manager operation returns
//!
//! # Error Conversion
//!
//! Store errors convert into [`SecretsError::Store`] through `From`, so the
//! `?` operator can be used directly on object store calls:
//!
//! ```
//! use nebula_secrets::core::{SecretsError, StoreError};
//!
//! let store_err = StoreError::backend("list", "connection refused");
//! let err: SecretsError = store_err.into();
//! assert!(err.to_string().contains("connection refused"));
//! assert!(err.is_retryable());
//! ```

use thiserror::Error;

/// Errors reported by an object store implementation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// An object with the same name already exists in the namespace
    #[error("Object '{name}' already exists")]
    AlreadyExists {
        /// Object name
        name: String,
    },

    /// The requested object does not exist
    #[error("Object '{name}' not found")]
    NotFound {
        /// Object name
        name: String,
    },

    /// Transport or availability failure
    #[error("Object store {operation} failed: {message}")]
    Backend {
        /// Store operation (`create`, `get`, `list`, `delete`)
        operation: String,
        /// Backend-specific failure description
        message: String,
    },
}

impl StoreError {
    /// Build a [`StoreError::Backend`] error
    pub fn backend(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Whether the store reported that the object does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the store reported a name collision on create
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}

/// Top-level error for the secrets manager
///
/// Every public operation returns either a value or exactly one of these
/// variants. None of them is retried inside the manager; the reconciliation
/// loop that drives the manager owns retry policy.
#[derive(Debug, Error)]
pub enum SecretsError {
    /// Malformed or unsatisfiable secret configuration. Retrying will not help.
    #[error("Invalid configuration for secret '{name}': {reason}")]
    Config {
        /// Logical secret name
        name: String,
        /// What is wrong with the configuration
        reason: String,
    },

    /// No generation exists for the requested logical name
    #[error("No generation found for secret '{name}'")]
    NotFound {
        /// Logical secret name
        name: String,
    },

    /// An object name is already taken by a generation with different identity
    #[error("Integrity violation on object '{object_name}': {reason}")]
    Integrity {
        /// Colliding object name
        object_name: String,
        /// Which identity labels diverged
        reason: String,
    },

    /// The object store failed; propagated verbatim
    #[error("Object store error: {source}")]
    Store {
        /// Underlying store error
        #[from]
        source: StoreError,
    },
}

impl SecretsError {
    /// Build a [`SecretsError::Config`] error
    pub fn config(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Build a [`SecretsError::NotFound`] error
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Build a [`SecretsError::Integrity`] error
    pub fn integrity(object_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Integrity {
            object_name: object_name.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error means "nothing there" rather than a failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether a later attempt by the control loop may succeed
    ///
    /// Only transport failures qualify. Configuration and integrity errors
    /// need a human or a changed input.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Store {
                source: StoreError::Backend { .. }
            }
        )
    }
}

/// Result type alias for secrets manager operations
pub type SecretsResult<T> = std::result::Result<T, SecretsError>;

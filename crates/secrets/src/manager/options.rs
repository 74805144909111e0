//! Per-call options of manager operations

/// Options for [`SecretsManager::generate`](super::SecretsManager::generate)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Exempt the generation from garbage collection
    pub persist: bool,
    /// Start a new rotation epoch even if renewal is not due
    pub force_rotation: bool,
}

impl GenerateOptions {
    /// Default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the generation through every cleanup
    pub fn persist(mut self) -> Self {
        self.persist = true;
        self
    }

    /// Rotate now
    pub fn force_rotation(mut self) -> Self {
        self.force_rotation = true;
        self
    }
}

/// Which generation [`SecretsManager::get_with`](super::SecretsManager::get_with) returns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Selection {
    /// The newest generation
    #[default]
    Current,
    /// The newest generation of the previous rotation epoch
    Old,
    /// The CA bundle maintained for a certificate authority
    Bundle,
}

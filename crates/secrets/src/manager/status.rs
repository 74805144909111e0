//! Lifecycle inspection

use chrono::{DateTime, Utc};

/// Lifecycle state of a logical name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No generation exists
    Absent,
    /// Exactly one live generation
    Current,
    /// A newer generation coexists with stale ones awaiting cleanup
    Rotating,
}

/// Role of one generation within its logical name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
    /// Selected as newest
    Current,
    /// Superseded; deleted by the next cleanup that does not keep the name
    Stale,
    /// Superseded but exempt from cleanup
    Persisted,
}

/// One generation as seen by [`SecretsManager::describe`](super::SecretsManager::describe)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationStatus {
    /// Object name
    pub object_name: String,
    /// Store creation time
    pub created_at: DateTime<Utc>,
    /// Rotation epoch the generation belongs to
    pub rotation_initiation_time: String,
    /// Role within the logical name
    pub state: GenerationState,
}

/// Lifecycle snapshot of a logical name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretStatus {
    /// Logical name
    pub name: String,
    /// Overall state
    pub state: LifecycleState,
    /// In-memory rotation time, `None` if the manager never saw the name
    pub rotation_initiation_time: Option<String>,
    /// Generations, newest first
    pub generations: Vec<GenerationStatus>,
}

impl SecretStatus {
    /// Object names of stale generations
    pub fn stale(&self) -> impl Iterator<Item = &str> {
        self.generations
            .iter()
            .filter(|g| g.state == GenerationState::Stale)
            .map(|g| g.object_name.as_str())
    }
}

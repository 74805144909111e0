//! Object store abstraction
//!
//! The manager persists generations through an [`ObjectStore`]: a namespaced,
//! linearizable create/get/list/delete interface over labeled key-value
//! records. In production this is the Kubernetes API server.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;

use crate::core::{Generation, ObjectMeta, Payload, StoreError};

/// Equality-based label selector
///
/// Matches objects carrying every listed `key=value` pair. An empty selector
/// matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    requirements: BTreeMap<String, String>,
}

impl LabelSelector {
    /// Empty selector
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `key=value`
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.requirements.insert(key.into(), value.into());
        self
    }

    /// Whether `labels` satisfy every requirement
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements
            .iter()
            .all(|(key, value)| labels.get(key) == Some(value))
    }

    /// Requirements in key order
    pub fn requirements(&self) -> impl Iterator<Item = (&str, &str)> {
        self.requirements
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .requirements
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        f.write_str(&rendered.join(","))
    }
}

/// Namespaced store of labeled, immutable records
///
/// Implementations must be linearizable per object name. `create` must fail
/// with [`StoreError::AlreadyExists`] rather than overwrite, and `list`
/// results carry no ordering guarantee.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Persist a new object; the store assigns the creation timestamp
    async fn create(&self, meta: &ObjectMeta, data: &Payload) -> Result<Generation, StoreError>;

    /// Fetch an object by name
    async fn get(&self, namespace: &str, name: &str) -> Result<Generation, StoreError>;

    /// List objects in the namespace matching the selector
    async fn list(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<Generation>, StoreError>;

    /// Delete an object by name
    async fn delete(&self, namespace: &str, name: &str) -> Result<(), StoreError>;
}

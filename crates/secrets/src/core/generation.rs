//! Persisted generations
//!
//! A [`Generation`] is one immutable instance of issued credential material
//! under a content-addressed object name. The logical name, manager identity
//! and rotation metadata all live in its labels.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use super::labels;
use crate::utils::time::from_unix_label;

/// Raw secret payload: key to bytes
pub type Payload = BTreeMap<String, Vec<u8>>;

/// Label map attached to every generation
pub type Labels = BTreeMap<String, String>;

/// Identity of an object before it is persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Content-addressed object name
    pub name: String,
    /// Namespace the object lives in
    pub namespace: String,
    /// Labels to persist with the object
    pub labels: Labels,
}

/// A persisted credential generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    /// Content-addressed object name
    pub object_name: String,
    /// Namespace the object lives in
    pub namespace: String,
    /// Creation timestamp assigned by the object store
    pub created_at: DateTime<Utc>,
    /// Persisted labels
    pub labels: Labels,
    /// Secret payload
    pub data: Payload,
}

impl Generation {
    /// Value of a label, if present
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Logical name from the `name` label
    pub fn logical_name(&self) -> Option<&str> {
        self.label(labels::NAME)
    }

    /// Manager identity from the `manager-identity` label
    pub fn manager_identity(&self) -> Option<&str> {
        self.label(labels::MANAGER_IDENTITY)
    }

    /// Rotation initiation time; empty when the name was never rotated
    pub fn last_rotation_initiation_time(&self) -> &str {
        self.label(labels::LAST_ROTATION_INITIATION_TIME)
            .unwrap_or_default()
    }

    /// Checksum of the config that produced this generation
    pub fn config_checksum(&self) -> Option<&str> {
        self.label(labels::CHECKSUM_OF_CONFIG)
    }

    /// When the material was issued, from the `issued-at-time` label
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.label(labels::ISSUED_AT_TIME).and_then(from_unix_label)
    }

    /// When the material expires, from the `valid-until-time` label
    pub fn valid_until(&self) -> Option<DateTime<Utc>> {
        self.label(labels::VALID_UNTIL_TIME).and_then(from_unix_label)
    }

    /// Whether the generation is exempt from garbage collection
    pub fn is_persistent(&self) -> bool {
        self.label(labels::PERSIST) == Some("true")
    }

    /// Logical name this generation bundles CA material for
    pub fn bundle_for(&self) -> Option<&str> {
        self.label(labels::BUNDLE_FOR)
    }

    /// Compare the identity labels of this generation with `expected`
    ///
    /// Returns a description of every diverging key, or `None` when the
    /// identities agree.
    pub fn identity_mismatch(&self, expected: &Labels) -> Option<String> {
        let diverging: Vec<String> = labels::IDENTITY_LABELS
            .iter()
            .filter_map(|key| {
                let actual = self.labels.get(*key);
                let wanted = expected.get(*key);
                (actual != wanted).then(|| {
                    format!(
                        "{key}: persisted={:?} desired={:?}",
                        actual.map(String::as_str).unwrap_or_default(),
                        wanted.map(String::as_str).unwrap_or_default()
                    )
                })
            })
            .collect();

        if diverging.is_empty() {
            None
        } else {
            Some(diverging.join(", "))
        }
    }
}

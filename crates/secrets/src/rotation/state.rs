//! Rotation state
//!
//! In-memory map from logical name to the unix-seconds timestamp of the last
//! initiated rotation (`""` when never rotated). It is never persisted on its
//! own: [`RotationState::load`] rebuilds it from the labels of the newest
//! generation of every name.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::{BTreeMap, HashMap};

use super::selector;
use crate::core::{Generation, SecretsResult, labels};
use crate::traits::{LabelSelector, ObjectStore};
use crate::utils::to_unix_label;

/// Selector for every generation owned by `manager_identity`
pub fn managed_by_selector(manager_identity: &str) -> LabelSelector {
    LabelSelector::new()
        .with(labels::MANAGED_BY, labels::MANAGED_BY_VALUE)
        .with(labels::MANAGER_IDENTITY, manager_identity)
}

/// Rotation initiation time per logical name
#[derive(Debug, Default)]
pub struct RotationState {
    times: DashMap<String, String>,
}

impl RotationState {
    /// Empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the state from the object store
    ///
    /// Seed entries fill in names the store knows nothing about; for names
    /// present in both, the persisted value wins. Bundle generations carry no
    /// rotation state of their own and are skipped.
    pub async fn load(
        store: &dyn ObjectStore,
        namespace: &str,
        manager_identity: &str,
        seed: &HashMap<String, DateTime<Utc>>,
    ) -> SecretsResult<Self> {
        let generations = store
            .list(namespace, &managed_by_selector(manager_identity))
            .await?;

        let state = Self::from_generations(&generations, seed);
        tracing::debug!(
            namespace = %namespace,
            manager_identity = %manager_identity,
            generations = generations.len(),
            names = state.len(),
            "Loaded rotation state"
        );
        Ok(state)
    }

    /// Build the state from already listed generations
    pub fn from_generations(
        generations: &[Generation],
        seed: &HashMap<String, DateTime<Utc>>,
    ) -> Self {
        let state = Self::new();

        for (name, group) in group_by_name(generations) {
            if let Ok(newest) = selector::newest(&name, &group) {
                state.set(&name, newest.last_rotation_initiation_time());
            }
        }

        for (name, time) in seed {
            state
                .times
                .entry(name.clone())
                .or_insert_with(|| to_unix_label(*time));
        }

        state
    }

    /// Rotation time of `name`, if the name is known
    pub fn get(&self, name: &str) -> Option<String> {
        self.times.get(name).map(|entry| entry.value().clone())
    }

    /// Record a rotation initiation time for `name`
    pub fn set(&self, name: &str, time: impl Into<String>) {
        self.times.insert(name.to_string(), time.into());
    }

    /// Move `name` to the `persisted` epoch when it is later than the known one
    ///
    /// Returns the effective rotation time. A later known epoch, such as a
    /// renewal scheduled at startup, is kept.
    pub fn observe(&self, name: &str, persisted: &str) -> String {
        let mut entry = self
            .times
            .entry(name.to_string())
            .or_insert_with(|| persisted.to_string());
        if is_later(persisted, entry.value()) {
            *entry.value_mut() = persisted.to_string();
        }
        entry.value().clone()
    }

    /// Whether `name` has an entry
    pub fn contains(&self, name: &str) -> bool {
        self.times.contains_key(name)
    }

    /// Number of known names
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Whether no name is known
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Point-in-time copy in name order
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.times
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

/// Compare two unix-seconds labels; `""` (never rotated) precedes every time
fn is_later(candidate: &str, known: &str) -> bool {
    let parse = |time: &str| time.parse::<i64>().ok();
    match (parse(candidate), parse(known)) {
        (Some(candidate), Some(known)) => candidate > known,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

/// Group non-bundle generations by their `name` label
pub(crate) fn group_by_name(generations: &[Generation]) -> BTreeMap<String, Vec<Generation>> {
    let mut groups: BTreeMap<String, Vec<Generation>> = BTreeMap::new();
    for generation in generations {
        if generation.bundle_for().is_some() {
            continue;
        }
        if let Some(name) = generation.logical_name() {
            groups
                .entry(name.to_string())
                .or_default()
                .push(generation.clone());
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Labels, Payload};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn generation(object_name: &str, name: &str, day: u32, rotation: &str) -> Generation {
        let mut meta_labels = Labels::new();
        meta_labels.insert(labels::NAME.into(), name.into());
        meta_labels.insert(
            labels::LAST_ROTATION_INITIATION_TIME.into(),
            rotation.into(),
        );
        Generation {
            object_name: object_name.into(),
            namespace: "default".into(),
            created_at: Utc.with_ymd_and_hms(2022, 1, day, 0, 0, 0).unwrap(),
            labels: meta_labels,
            data: Payload::new(),
        }
    }

    #[test]
    fn test_newest_generation_wins() {
        let generations = vec![
            generation("ca-2", "ca", 2, "200"),
            generation("ca-3", "ca", 3, "300"),
            generation("ca", "ca", 1, ""),
            generation("token-x", "token", 1, ""),
        ];

        let state = RotationState::from_generations(&generations, &HashMap::new());

        assert_eq!(state.get("ca").as_deref(), Some("300"));
        assert_eq!(state.get("token").as_deref(), Some(""));
        assert_eq!(state.get("unknown"), None);
    }

    #[test]
    fn test_seed_fills_gaps_but_store_wins() {
        let generations = vec![generation("ca-1", "ca", 1, "100")];
        let mut seed = HashMap::new();
        seed.insert(
            "ca".to_string(),
            Utc.with_ymd_and_hms(2022, 2, 28, 14, 57, 8).unwrap(),
        );
        seed.insert(
            "ca-etcd".to_string(),
            Utc.with_ymd_and_hms(2022, 2, 28, 14, 57, 8).unwrap(),
        );
        seed.insert(
            "ca-front-proxy".to_string(),
            Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0).unwrap(),
        );

        let state = RotationState::from_generations(&generations, &seed);

        let expected: BTreeMap<String, String> = [
            ("ca", "100"),
            ("ca-etcd", "1646060228"),
            ("ca-front-proxy", "-62135596800"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        assert_eq!(state.snapshot(), expected);
    }

    #[test]
    fn test_bundles_are_skipped() {
        let mut bundle = generation("ca-bundle-1234", "ca-bundle", 1, "");
        bundle
            .labels
            .insert(labels::BUNDLE_FOR.into(), "ca".into());

        let state = RotationState::from_generations(&[bundle], &HashMap::new());
        assert!(state.is_empty());
    }

    #[test]
    fn test_observe_only_moves_forward() {
        let state = RotationState::new();
        state.set("ca", "");

        assert_eq!(state.observe("ca", "1646060228"), "1646060228");
        assert_eq!(state.observe("ca", ""), "1646060228");
        assert_eq!(state.observe("ca", "1000"), "1646060228");

        state.set("token", "2000");
        assert_eq!(state.observe("token", "1500"), "2000", "pending renewal is kept");

        assert_eq!(state.observe("fresh", "-100"), "-100");
        assert_eq!(state.len(), 3);
    }

    #[test]
    fn test_set_overrides() {
        let state = RotationState::new();
        state.set("ca", "");
        state.set("ca", "1646060228");
        assert_eq!(state.get("ca").as_deref(), Some("1646060228"));
        assert!(state.contains("ca"));
        assert_eq!(state.len(), 1);
    }
}

//! Secrets Manager - lifecycle orchestration of credential generations
//!
//! Decides per `generate` call whether the current generation is reused or a
//! new one is issued, persists it under its content-addressed name and keeps
//! the rotation state in step with the store.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::core::{
    CaSelection, Generation, ObjectMeta, Payload, SecretConfig, SecretsError, SecretsResult,
    StoreError, keys, labels,
};
use crate::manager::{
    GenerateOptions, GenerationState, GenerationStatus, LifecycleState, ManagerConfig,
    SecretStatus, Selection,
};
use crate::naming::{self, CONFIG_CHECKSUM_LENGTH, LabelOptions};
use crate::registry::KindRegistry;
use crate::rotation::state::{group_by_name, managed_by_selector};
use crate::rotation::{RenewalPolicy, RotationState, selector};
use crate::traits::{Clock, IssuingMaterial, LabelSelector, ObjectStore, SystemClock};
use crate::utils::{sha256_prefix, to_unix_label};

/// Lifecycle orchestrator for one (namespace, identity) pair
///
/// Independent instances sharing a store converge: names are derived from
/// content, so concurrent calls race to create the same object and the loser
/// adopts the winner's generation.
#[derive(Clone)]
pub struct SecretsManager {
    store: Arc<dyn ObjectStore>,
    registry: Arc<KindRegistry>,
    clock: Arc<dyn Clock>,
    config: ManagerConfig,
    state: Arc<RotationState>,
}

impl std::fmt::Debug for SecretsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretsManager")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("state", &self.state.snapshot())
            .finish_non_exhaustive()
    }
}

impl SecretsManager {
    /// Create builder for constructing a manager
    ///
    /// # Examples
    ///
    /// ```
    /// use nebula_secrets::prelude::*;
    /// use std::sync::Arc;
    ///
    /// # async fn example() -> SecretsResult<()> {
    /// let manager = SecretsManager::builder()
    ///     .store(Arc::new(MemoryObjectStore::new()))
    ///     .namespace("shoot--foo--bar")
    ///     .identity("gardenlet")
    ///     .build()
    ///     .await?;
    ///
    /// let ca = manager
    ///     .generate(&SecretConfig::certificate_authority("ca"), GenerateOptions::new())
    ///     .await?;
    /// assert_eq!(ca.object_name, "ca");
    /// # Ok(())
    /// # }
    /// ```
    pub fn builder() -> SecretsManagerBuilder<No> {
        SecretsManagerBuilder::new()
    }

    /// Manager configuration
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Snapshot of the rotation state, name to unix-seconds string
    pub fn rotation_state(&self) -> std::collections::BTreeMap<String, String> {
        self.state.snapshot()
    }

    /// Ensure a generation exists for `config` and return it
    ///
    /// Reuses the generation of the current rotation epoch when one exists.
    /// A new epoch starts when `options.force_rotation` is set or the renewal
    /// policy finds the newest generation due. Generating a CA also refreshes
    /// its bundle; a failed refresh is logged and retried on the next call,
    /// so the result reflects the CA generation alone.
    ///
    /// # Errors
    ///
    /// - [`SecretsError::Config`] for invalid configs or an unresolvable signing CA
    /// - [`SecretsError::Integrity`] when the name is taken by foreign content
    /// - [`SecretsError::Store`] when the object store fails
    pub async fn generate(
        &self,
        config: &SecretConfig,
        options: GenerateOptions,
    ) -> SecretsResult<Generation> {
        naming::validate_config(config)?;
        let generator = self.registry.resolve(config)?;
        generator.validate(config)?;

        let now = self.clock.now();
        let issuer = match &config.signing_ca {
            Some(ca) => Some(self.issuing_material(config, &ca.name, ca.selection).await?),
            None => None,
        };

        let existing = self.generations(&config.name).await?;
        let rotation_time = self.rotation_time(config, &existing, options, now);

        let mut label_options = LabelOptions {
            signing_ca_checksum: issuer
                .as_ref()
                .map(|ca| sha256_prefix(&ca.certificate_pem, CONFIG_CHECKSUM_LENGTH)),
            persist: options.persist,
            ..Default::default()
        };
        let meta = naming::object_meta(
            &self.config.namespace,
            &self.config.identity,
            config,
            &rotation_time,
            &label_options,
        )?;

        let generation = match self.find(&meta).await? {
            Some(generation) => {
                debug!(
                    secret = %config.name,
                    object_name = %generation.object_name,
                    "Reusing existing generation"
                );
                generation
            }
            None => {
                let material = generator.generate(config, issuer.as_ref(), now)?;
                label_options.issued_at = material.issued_at;
                label_options.valid_until = material.valid_until;
                let meta = naming::object_meta(
                    &self.config.namespace,
                    &self.config.identity,
                    config,
                    &rotation_time,
                    &label_options,
                )?;
                self.create_or_adopt(&meta, &material.data).await?
            }
        };

        self.state.set(&config.name, rotation_time);

        if config.kind.is_certificate_authority() {
            self.refresh_bundle(&config.name).await;
        }

        Ok(generation)
    }

    /// Current generation of `name`
    pub async fn get(&self, name: &str) -> SecretsResult<Generation> {
        self.get_with(name, Selection::Current).await
    }

    /// Generation of `name` chosen by `selection`
    ///
    /// # Errors
    ///
    /// [`SecretsError::NotFound`] when no generation matches.
    pub async fn get_with(&self, name: &str, selection: Selection) -> SecretsResult<Generation> {
        match selection {
            Selection::Current => {
                let generations = self.generations(name).await?;
                selector::newest(name, &generations).cloned()
            }
            Selection::Old => {
                let generations = self.generations(name).await?;
                selector::previous_epoch(&generations)
                    .cloned()
                    .ok_or_else(|| SecretsError::not_found(name))
            }
            Selection::Bundle => {
                let bundles = self
                    .store
                    .list(
                        &self.config.namespace,
                        &managed_by_selector(&self.config.identity)
                            .with(labels::BUNDLE_FOR, name),
                    )
                    .await?;
                selector::newest(name, &bundles).cloned()
            }
        }
    }

    /// Delete stale generations of every name not in `keep`
    ///
    /// Per name, the newest generation and every `persist=true` generation
    /// survive. Bundles are kept while their CA is kept. Returns the names of
    /// deleted objects.
    pub async fn cleanup(&self, keep: &HashSet<String>) -> SecretsResult<Vec<String>> {
        let generations = self
            .store
            .list(
                &self.config.namespace,
                &managed_by_selector(&self.config.identity),
            )
            .await?;

        let mut groups: HashMap<&str, Vec<&Generation>> = HashMap::new();
        for generation in &generations {
            if let Some(name) = generation.logical_name() {
                groups.entry(name).or_default().push(generation);
            }
        }

        let mut deleted = Vec::new();
        for (name, mut group) in groups {
            let kept = keep.contains(name)
                || group
                    .iter()
                    .filter_map(|g| g.bundle_for())
                    .any(|ca| keep.contains(ca));
            if kept {
                debug!(secret = %name, "Keeping all generations");
                continue;
            }

            group.sort_by(|a, b| selector::newest_first(a, b));
            for stale in group.iter().skip(1).filter(|g| !g.is_persistent()) {
                match self
                    .store
                    .delete(&self.config.namespace, &stale.object_name)
                    .await
                {
                    Ok(()) => {
                        info!(
                            secret = %name,
                            object_name = %stale.object_name,
                            namespace = %self.config.namespace,
                            "Deleted stale generation"
                        );
                        deleted.push(stale.object_name.clone());
                    }
                    Err(e) if e.is_not_found() => {
                        debug!(
                            object_name = %stale.object_name,
                            "Stale generation already deleted"
                        );
                    }
                    Err(e) => {
                        error!(
                            object_name = %stale.object_name,
                            error = %e,
                            "Failed to delete stale generation"
                        );
                        return Err(e.into());
                    }
                }
            }
        }

        deleted.sort();
        Ok(deleted)
    }

    /// Lifecycle state of `name` and each of its generations
    pub async fn describe(&self, name: &str) -> SecretsResult<SecretStatus> {
        let generations = self.generations(name).await?;

        let statuses: Vec<GenerationStatus> = generations
            .iter()
            .enumerate()
            .map(|(index, generation)| GenerationStatus {
                object_name: generation.object_name.clone(),
                created_at: generation.created_at,
                rotation_initiation_time: generation.last_rotation_initiation_time().to_string(),
                state: match (index, generation.is_persistent()) {
                    (0, _) => GenerationState::Current,
                    (_, true) => GenerationState::Persisted,
                    (_, false) => GenerationState::Stale,
                },
            })
            .collect();

        let state = if statuses.is_empty() {
            LifecycleState::Absent
        } else if statuses.iter().any(|s| s.state == GenerationState::Stale) {
            LifecycleState::Rotating
        } else {
            LifecycleState::Current
        };

        Ok(SecretStatus {
            name: name.to_string(),
            state,
            rotation_initiation_time: self.state.get(name),
            generations: statuses,
        })
    }

    /// Non-bundle generations of `name`, newest first
    async fn generations(&self, name: &str) -> SecretsResult<Vec<Generation>> {
        let by_name: LabelSelector =
            managed_by_selector(&self.config.identity).with(labels::NAME, name);
        let mut generations: Vec<Generation> = self
            .store
            .list(&self.config.namespace, &by_name)
            .await?
            .into_iter()
            .filter(|g| g.bundle_for().is_none())
            .collect();
        selector::sort_newest_first(&mut generations);
        Ok(generations)
    }

    /// Rotation epoch the generation for `config` belongs to
    fn rotation_time(
        &self,
        config: &SecretConfig,
        existing: &[Generation],
        options: GenerateOptions,
        now: DateTime<Utc>,
    ) -> String {
        // Another manager may have started a later epoch since this one loaded.
        let current = match existing.first() {
            Some(newest) => self
                .state
                .observe(&config.name, newest.last_rotation_initiation_time()),
            None => self.state.get(&config.name).unwrap_or_default(),
        };

        if options.force_rotation {
            info!(secret = %config.name, "Rotation forced");
            return to_unix_label(now);
        }

        // Only renew material of the epoch in effect; a pending bootstrap
        // renewal already moved the state past it.
        if let Some(newest) = existing.first()
            && newest.last_rotation_initiation_time() == current
            && self
                .config
                .renewal
                .should_rotate(newest.issued_at(), newest.valid_until(), now)
        {
            warn!(
                secret = %config.name,
                object_name = %newest.object_name,
                valid_until = ?newest.valid_until(),
                "Renewal due, initiating rotation"
            );
            return to_unix_label(now);
        }

        current
    }

    /// Resolve the material of the CA that signs `config`
    async fn issuing_material(
        &self,
        config: &SecretConfig,
        ca_name: &str,
        selection: CaSelection,
    ) -> SecretsResult<IssuingMaterial> {
        let selection = match selection {
            CaSelection::Current => Selection::Current,
            CaSelection::Old => Selection::Old,
        };
        let ca = self.get_with(ca_name, selection).await.map_err(|e| {
            if e.is_not_found() {
                SecretsError::config(
                    &config.name,
                    format!("signing CA '{ca_name}' has no {selection:?} generation"),
                )
            } else {
                e
            }
        })?;

        let field = |key: &str| {
            ca.data.get(key).cloned().ok_or_else(|| {
                SecretsError::config(
                    &config.name,
                    format!(
                        "signing CA generation '{}' carries no {key}",
                        ca.object_name
                    ),
                )
            })
        };

        Ok(IssuingMaterial {
            name: ca_name.to_string(),
            certificate_pem: field(keys::CA_CERTIFICATE)?,
            private_key_pem: field(keys::CA_PRIVATE_KEY)?,
        })
    }

    /// Refresh the bundle of `ca_name` without failing the CA's `generate`
    ///
    /// The CA generation is already persisted at this point; a failed refresh
    /// is repaired by the next `generate` of the CA.
    async fn refresh_bundle(&self, ca_name: &str) {
        match self.ensure_bundle(ca_name).await {
            Ok(_) => {}
            Err(e) if e.is_retryable() => {
                warn!(secret = %ca_name, error = %e, "Failed to refresh CA bundle");
            }
            Err(e) => {
                error!(secret = %ca_name, error = %e, "Failed to refresh CA bundle");
            }
        }
    }

    /// Maintain `<ca>-bundle` with the current and previous CA certificates
    async fn ensure_bundle(&self, ca_name: &str) -> SecretsResult<Generation> {
        let generations = self.generations(ca_name).await?;
        let current = selector::newest(ca_name, &generations)?;
        let bundle = selector::bundle(
            ca_name,
            current,
            selector::previous_epoch(&generations),
        )?;

        let bundled = bundle
            .data
            .get(keys::BUNDLE_CERTIFICATE)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let meta = naming::bundle_meta(
            &self.config.namespace,
            &self.config.identity,
            ca_name,
            bundled,
        )?;

        match self.find(&meta).await? {
            Some(existing) => Ok(existing),
            None => self.create_or_adopt(&meta, &bundle.data).await,
        }
    }

    /// Fetch the object `meta` names, verifying it has the expected identity
    async fn find(&self, meta: &ObjectMeta) -> SecretsResult<Option<Generation>> {
        match self.store.get(&meta.namespace, &meta.name).await {
            Ok(existing) => {
                self.verify_identity(&existing, meta)?;
                Ok(Some(existing))
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => {
                error!(object_name = %meta.name, error = %e, "Failed to read generation");
                Err(e.into())
            }
        }
    }

    /// Create the object; adopt it if a concurrent writer created it first
    async fn create_or_adopt(
        &self,
        meta: &ObjectMeta,
        data: &Payload,
    ) -> SecretsResult<Generation> {
        match self.store.create(meta, data).await {
            Ok(generation) => {
                info!(
                    secret = %generation.logical_name().unwrap_or_default(),
                    object_name = %generation.object_name,
                    namespace = %generation.namespace,
                    rotation_initiation_time = %generation.last_rotation_initiation_time(),
                    "Created generation"
                );
                Ok(generation)
            }
            Err(StoreError::AlreadyExists { .. }) => {
                let existing = self.store.get(&meta.namespace, &meta.name).await?;
                self.verify_identity(&existing, meta)?;
                debug!(
                    object_name = %meta.name,
                    "Adopted generation created concurrently"
                );
                Ok(existing)
            }
            Err(e) => {
                error!(
                    object_name = %meta.name,
                    namespace = %meta.namespace,
                    error = %e,
                    "Failed to persist generation"
                );
                Err(e.into())
            }
        }
    }

    fn verify_identity(&self, existing: &Generation, meta: &ObjectMeta) -> SecretsResult<()> {
        match existing.identity_mismatch(&meta.labels) {
            None => Ok(()),
            Some(reason) => {
                error!(
                    object_name = %meta.name,
                    namespace = %meta.namespace,
                    reason = %reason,
                    "Object name claimed by a generation with different identity"
                );
                Err(SecretsError::integrity(&meta.name, reason))
            }
        }
    }
}

/// Evaluate the renewal policy on the newest generation of every name
///
/// Names found due get the rotation state `now`, so their next `generate`
/// issues a new generation.
fn schedule_renewals(
    state: &RotationState,
    generations: &[Generation],
    policy: &RenewalPolicy,
    now: DateTime<Utc>,
) {
    for (name, group) in group_by_name(generations) {
        let Ok(newest) = selector::newest(&name, &group) else {
            continue;
        };
        if policy.should_rotate(newest.issued_at(), newest.valid_until(), now) {
            warn!(
                secret = %name,
                object_name = %newest.object_name,
                valid_until = ?newest.valid_until(),
                "Renewal due at startup, scheduling rotation"
            );
            state.set(&name, to_unix_label(now));
        }
    }
}

// Type-level markers for builder typestate pattern
#[doc(hidden)]
pub struct Yes;
#[doc(hidden)]
pub struct No;

/// Builder for [`SecretsManager`] with typestate pattern
///
/// The object store is required at compile time; everything else has a
/// default: [`ManagerConfig::default`], the system clock, the built-in kind
/// registry and an empty seed.
pub struct SecretsManagerBuilder<HasStore> {
    store: Option<Arc<dyn ObjectStore>>,
    config: ManagerConfig,
    clock: Arc<dyn Clock>,
    registry: Option<Arc<KindRegistry>>,
    seed: HashMap<String, DateTime<Utc>>,
    _marker: PhantomData<HasStore>,
}

impl SecretsManagerBuilder<No> {
    /// Create new builder instance
    pub fn new() -> Self {
        Self {
            store: None,
            config: ManagerConfig::default(),
            clock: Arc::new(SystemClock),
            registry: None,
            seed: HashMap::new(),
            _marker: PhantomData,
        }
    }

    /// Set the object store (required)
    pub fn store(self, store: Arc<dyn ObjectStore>) -> SecretsManagerBuilder<Yes> {
        SecretsManagerBuilder {
            store: Some(store),
            config: self.config,
            clock: self.clock,
            registry: self.registry,
            seed: self.seed,
            _marker: PhantomData,
        }
    }
}

impl<S> SecretsManagerBuilder<S> {
    /// Replace the whole configuration
    pub fn config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Namespace generations live in
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = namespace.into();
        self
    }

    /// Identity of this manager
    pub fn identity(mut self, identity: impl Into<String>) -> Self {
        self.config.identity = identity.into();
        self
    }

    /// Renewal thresholds
    pub fn renewal(mut self, renewal: RenewalPolicy) -> Self {
        self.config.renewal = renewal;
        self
    }

    /// Time source
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Kind registry, shared between managers
    pub fn registry(mut self, registry: Arc<KindRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Seed the rotation time of `name` for when the store has none
    pub fn seed_rotation_time(mut self, name: impl Into<String>, time: DateTime<Utc>) -> Self {
        self.seed.insert(name.into(), time);
        self
    }

    /// Seed many rotation times at once
    pub fn seed(mut self, seed: HashMap<String, DateTime<Utc>>) -> Self {
        self.seed.extend(seed);
        self
    }
}

impl SecretsManagerBuilder<Yes> {
    /// Validate the configuration, load rotation state and schedule renewals
    ///
    /// # Errors
    ///
    /// [`SecretsError::Config`] for an invalid configuration and
    /// [`SecretsError::Store`] when listing existing generations fails.
    pub async fn build(self) -> SecretsResult<SecretsManager> {
        self.config.validate()?;
        let store = self
            .store
            .ok_or_else(|| SecretsError::config("manager", "object store is required"))?;

        let generations = store
            .list(
                &self.config.namespace,
                &managed_by_selector(&self.config.identity),
            )
            .await
            .inspect_err(|e| error!(error = %e, "Failed to list generations at startup"))?;

        let state = RotationState::from_generations(&generations, &self.seed);
        schedule_renewals(&state, &generations, &self.config.renewal, self.clock.now());

        info!(
            namespace = %self.config.namespace,
            identity = %self.config.identity,
            generations = generations.len(),
            names = state.len(),
            "Secrets manager initialized"
        );

        Ok(SecretsManager {
            store,
            registry: self
                .registry
                .unwrap_or_else(|| Arc::new(KindRegistry::builtin())),
            clock: self.clock,
            config: self.config,
            state: Arc::new(state),
        })
    }
}

impl Default for SecretsManagerBuilder<No> {
    fn default() -> Self {
        Self::new()
    }
}

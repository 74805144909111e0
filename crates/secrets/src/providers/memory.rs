//! In-memory object store for tests and local runs

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::core::{Generation, ObjectMeta, Payload, StoreError};
use crate::traits::{Clock, LabelSelector, ObjectStore, SystemClock};

/// Object store operation, used to target injected failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// [`ObjectStore::create`]
    Create,
    /// [`ObjectStore::get`]
    Get,
    /// [`ObjectStore::list`]
    List,
    /// [`ObjectStore::delete`]
    Delete,
}

impl StoreOperation {
    const ALL: [StoreOperation; 4] = [
        StoreOperation::Create,
        StoreOperation::Get,
        StoreOperation::List,
        StoreOperation::Delete,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// [`ObjectStore`] kept in a [`DashMap`]
///
/// Creation timestamps come from the injected [`Clock`], so tests control
/// which generation is newest. Failures can be injected per operation and
/// fire once, optionally after a number of successful calls.
pub struct MemoryObjectStore {
    objects: DashMap<(String, String), Generation>,
    clock: Arc<dyn Clock>,
    failures: Mutex<HashMap<StoreOperation, (usize, StoreError)>>,
    calls: [AtomicUsize; 4],
}

impl MemoryObjectStore {
    /// Empty store stamping objects with the system time
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Empty store stamping objects with `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            objects: DashMap::new(),
            clock,
            failures: Mutex::new(HashMap::new()),
            calls: Default::default(),
        }
    }

    /// Make the next call of `operation` fail with `error`
    pub fn fail_next(&self, operation: StoreOperation, error: StoreError) {
        self.fail_after(operation, 0, error);
    }

    /// Let `successes` calls of `operation` pass, then fail the next one
    pub fn fail_after(&self, operation: StoreOperation, successes: usize, error: StoreError) {
        self.failures.lock().insert(operation, (successes, error));
    }

    /// Number of calls of `operation` so far, failed ones included
    pub fn calls(&self, operation: StoreOperation) -> usize {
        self.calls[operation.index()].load(Ordering::SeqCst)
    }

    /// Store a generation as is, bypassing `create` semantics
    ///
    /// Useful to stage objects with chosen timestamps or foreign labels.
    pub fn insert(&self, generation: Generation) {
        self.objects.insert(
            (generation.namespace.clone(), generation.object_name.clone()),
            generation,
        );
    }

    /// Every object in `namespace`, ordered by name
    pub fn objects(&self, namespace: &str) -> Vec<Generation> {
        let mut objects: Vec<Generation> = self
            .objects
            .iter()
            .filter(|entry| entry.key().0 == namespace)
            .map(|entry| entry.value().clone())
            .collect();
        objects.sort_by(|a, b| a.object_name.cmp(&b.object_name));
        objects
    }

    /// Names of every object in `namespace`, sorted
    pub fn object_names(&self, namespace: &str) -> Vec<String> {
        self.objects(namespace)
            .into_iter()
            .map(|generation| generation.object_name)
            .collect()
    }

    /// Total number of objects across namespaces
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the store holds no objects
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Remove every object
    pub fn clear(&self) {
        self.objects.clear();
    }

    fn enter(&self, operation: StoreOperation) -> Result<(), StoreError> {
        self.calls[operation.index()].fetch_add(1, Ordering::SeqCst);
        let mut failures = self.failures.lock();
        let Some((successes, _)) = failures.get_mut(&operation) else {
            return Ok(());
        };
        if *successes > 0 {
            *successes -= 1;
            return Ok(());
        }
        match failures.remove(&operation) {
            Some((_, error)) => Err(error),
            None => Ok(()),
        }
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryObjectStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let calls: Vec<_> = StoreOperation::ALL
            .iter()
            .map(|op| (op, self.calls(*op)))
            .collect();
        f.debug_struct("MemoryObjectStore")
            .field("objects", &self.objects.len())
            .field("clock", &self.clock)
            .field("calls", &calls)
            .finish()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn create(&self, meta: &ObjectMeta, data: &Payload) -> Result<Generation, StoreError> {
        self.enter(StoreOperation::Create)?;

        match self
            .objects
            .entry((meta.namespace.clone(), meta.name.clone()))
        {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists {
                name: meta.name.clone(),
            }),
            Entry::Vacant(entry) => {
                let generation = Generation {
                    object_name: meta.name.clone(),
                    namespace: meta.namespace.clone(),
                    created_at: self.clock.now(),
                    labels: meta.labels.clone(),
                    data: data.clone(),
                };
                entry.insert(generation.clone());
                Ok(generation)
            }
        }
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<Generation, StoreError> {
        self.enter(StoreOperation::Get)?;

        self.objects
            .get(&(namespace.to_string(), name.to_string()))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound {
                name: name.to_string(),
            })
    }

    async fn list(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<Generation>, StoreError> {
        self.enter(StoreOperation::List)?;

        Ok(self
            .objects
            .iter()
            .filter(|entry| entry.key().0 == namespace && selector.matches(&entry.value().labels))
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        self.enter(StoreOperation::Delete)?;

        self.objects
            .remove(&(namespace.to_string(), name.to_string()))
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                name: name.to_string(),
            })
    }
}

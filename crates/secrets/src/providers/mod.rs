//! Object store implementations

pub mod memory;

#[cfg(feature = "kubernetes")]
pub mod kubernetes;

pub use memory::{MemoryObjectStore, StoreOperation};

#[cfg(feature = "kubernetes")]
pub use kubernetes::KubernetesObjectStore;

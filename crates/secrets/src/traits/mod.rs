//! Core traits: object store, clock, secret generation

pub mod clock;
pub mod generator;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use generator::{IssuingMaterial, SecretGenerator, SecretMaterial};
pub use store::{LabelSelector, ObjectStore};

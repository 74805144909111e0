//! Rotation bookkeeping
//!
//! - [`policy`]: when expiring material is due for renewal
//! - [`state`]: last rotation time per logical name, rebuilt from the store
//! - [`selector`]: which generation is current, and CA bundling

pub mod policy;
pub mod selector;
pub mod state;

pub use policy::{RenewalPolicy, should_rotate};
pub use selector::{Bundle, bundle, newest, previous_epoch, sort_newest_first};
pub use state::RotationState;

//! Utility modules

pub mod hash;
pub mod time;

pub use hash::{sha256_hex, sha256_prefix};
pub use time::{from_unix_label, to_unix_label};

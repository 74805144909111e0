//! Label keys stamped on every persisted generation
//!
//! Labels are the only durable index the manager has. The key strings are a
//! stable contract with already-persisted objects and must not change.

/// Logical secret name
pub const NAME: &str = "name";
/// Fixed marker for objects owned by a secrets manager
pub const MANAGED_BY: &str = "managed-by";
/// Identity of the manager instance that created the object
pub const MANAGER_IDENTITY: &str = "manager-identity";
/// Checksum over the canonical config
pub const CHECKSUM_OF_CONFIG: &str = "checksum-of-config";
/// Unix seconds of the rotation that produced the object, empty if never rotated
pub const LAST_ROTATION_INITIATION_TIME: &str = "last-rotation-initiation-time";
/// Unix seconds at which the issued material was created
pub const ISSUED_AT_TIME: &str = "issued-at-time";
/// Unix seconds after which the issued material is invalid
pub const VALID_UNTIL_TIME: &str = "valid-until-time";
/// Checksum of the CA certificate that signed the object's material
pub const CHECKSUM_OF_SIGNING_CA: &str = "checksum-of-signing-ca";
/// `"true"` when the object is exempt from garbage collection
pub const PERSIST: &str = "persist";
/// Logical name whose CA material the object bundles
pub const BUNDLE_FOR: &str = "bundle-for";

/// Value of [`MANAGED_BY`]
pub const MANAGED_BY_VALUE: &str = "secrets-manager";

/// Labels that define the identity of a generation.
///
/// Two objects with the same name must agree on all of these, otherwise the
/// name was claimed by different content.
pub const IDENTITY_LABELS: &[&str] = &[
    NAME,
    MANAGED_BY,
    MANAGER_IDENTITY,
    CHECKSUM_OF_CONFIG,
    LAST_ROTATION_INITIATION_TIME,
    CHECKSUM_OF_SIGNING_CA,
    PERSIST,
    BUNDLE_FOR,
];

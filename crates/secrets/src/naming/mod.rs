//! Naming engine
//!
//! Derives the deterministic, content-addressed object name and label set of
//! a generation. Everything here is a pure function of its inputs, so two
//! manager replicas computing the identity of the same (config, rotation
//! epoch) independently arrive at the same object name.
//!
//! # Object name grammar
//!
//! ```text
//! <logical-name>[-<rotation-token>][-<checksum>]
//! ```
//!
//! - `checksum` is the first 8 hex digits of `checksum-of-config`. A CA that
//!   was never rotated keeps its bare logical name.
//! - `rotation-token` is the first 5 hex digits of
//!   `sha256("<logical-name>/<rotation-initiation-time>")`, present only once
//!   a rotation was initiated.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::{
    Labels, ObjectMeta, SecretConfig, SecretKind, SecretParameters, SecretsError, SecretsResult,
    labels,
};
use crate::utils::{sha256_prefix, to_unix_label};

/// Hex digits of the `checksum-of-config` label
pub const CONFIG_CHECKSUM_LENGTH: usize = 16;
/// Hex digits of the checksum suffix in object names
pub const NAME_CHECKSUM_LENGTH: usize = 8;
/// Hex digits of the rotation token in object names
pub const ROTATION_TOKEN_LENGTH: usize = 5;
/// Maximum length of a label value, and therefore of a logical name
pub const MAX_LABEL_VALUE_LENGTH: usize = 63;
/// Suffix appended to a CA's logical name for its bundle
pub const BUNDLE_SUFFIX: &str = "-bundle";

/// Optional labels of a generation
///
/// Fields that are unset produce no label. `signing_ca_checksum`, `persist`
/// and `bundle_for` also feed `checksum-of-config`; the timestamps do not,
/// because they describe issued material rather than the desired config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelOptions {
    /// Checksum of the CA certificate that signs the material
    pub signing_ca_checksum: Option<String>,
    /// Issuance time of the material
    pub issued_at: Option<DateTime<Utc>>,
    /// Expiry of the material
    pub valid_until: Option<DateTime<Utc>>,
    /// Exempt the generation from garbage collection
    pub persist: bool,
    /// Logical name whose CA material is bundled
    pub bundle_for: Option<String>,
}

#[derive(Serialize)]
struct ChecksumInput<'a> {
    config: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    signing_ca_checksum: Option<&'a str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    persist: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    bundle_for: Option<&'a str>,
}

/// Check that a config is structurally sound before it is named
///
/// Kind-specific checks of generated material live with the generators; this
/// only covers what naming itself relies on.
pub fn validate_config(config: &SecretConfig) -> SecretsResult<()> {
    validate_logical_name(&config.name)?;

    // Bundle generations share the `name` label namespace with configs.
    if config.name.ends_with(BUNDLE_SUFFIX) {
        return Err(SecretsError::config(
            &config.name,
            format!("names ending in '{BUNDLE_SUFFIX}' are reserved for CA bundles"),
        ));
    }

    if config.kind.is_certificate_authority()
        && config.name.len() + BUNDLE_SUFFIX.len() > MAX_LABEL_VALUE_LENGTH
    {
        return Err(SecretsError::config(
            &config.name,
            format!(
                "CA names are limited to {} characters to leave room for the bundle",
                MAX_LABEL_VALUE_LENGTH - BUNDLE_SUFFIX.len()
            ),
        ));
    }

    let parameters_match = matches!(
        (config.kind, &config.parameters),
        (
            SecretKind::CertificateAuthority | SecretKind::Certificate,
            SecretParameters::Certificate(_)
        ) | (SecretKind::StaticToken, SecretParameters::StaticToken(_))
            | (SecretKind::BasicAuth, SecretParameters::BasicAuth(_))
    );
    if !parameters_match {
        return Err(SecretsError::config(
            &config.name,
            format!("parameters do not match kind {}", config.kind),
        ));
    }

    match (config.kind, &config.signing_ca) {
        (SecretKind::Certificate, None) => Err(SecretsError::config(
            &config.name,
            "certificates require a signing CA",
        )),
        (SecretKind::StaticToken | SecretKind::BasicAuth, Some(_)) => Err(SecretsError::config(
            &config.name,
            format!("kind {} cannot be signed by a CA", config.kind),
        )),
        (_, Some(ca)) if ca.name == config.name => Err(SecretsError::config(
            &config.name,
            "a secret cannot be signed by itself",
        )),
        _ => Ok(()),
    }
}

/// Validate a logical name: a non-empty DNS-1123 label usable as label value
pub fn validate_logical_name(name: &str) -> SecretsResult<()> {
    if name.is_empty() {
        return Err(SecretsError::config(name, "name cannot be empty"));
    }
    if name.len() > MAX_LABEL_VALUE_LENGTH {
        return Err(SecretsError::config(
            name,
            format!(
                "name exceeds {MAX_LABEL_VALUE_LENGTH} characters ({})",
                name.len()
            ),
        ));
    }
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    let valid_edges = name.starts_with(|c: char| c.is_ascii_alphanumeric())
        && name.ends_with(|c: char| c.is_ascii_alphanumeric());
    if !valid_chars || !valid_edges {
        return Err(SecretsError::config(
            name,
            "name must consist of lowercase alphanumerics and '-', starting and ending alphanumeric",
        ));
    }
    Ok(())
}

/// Checksum over the canonical form of a config plus its identity options
///
/// The config is first converted to a JSON value, whose object keys are kept
/// sorted, so the digest does not depend on field declaration order.
pub fn config_checksum(config: &SecretConfig, options: &LabelOptions) -> SecretsResult<String> {
    let canonical = serde_json::to_value(config).map_err(|e| {
        SecretsError::config(&config.name, format!("config is not serializable: {e}"))
    })?;
    let input = ChecksumInput {
        config: canonical,
        signing_ca_checksum: options.signing_ca_checksum.as_deref(),
        persist: options.persist,
        bundle_for: options.bundle_for.as_deref(),
    };
    let bytes = serde_json::to_vec(&input).map_err(|e| {
        SecretsError::config(&config.name, format!("config is not serializable: {e}"))
    })?;
    Ok(sha256_prefix(bytes, CONFIG_CHECKSUM_LENGTH))
}

/// Short token identifying one rotation epoch of a logical name
pub fn rotation_token(logical_name: &str, rotation_initiation_time: &str) -> String {
    sha256_prefix(
        format!("{logical_name}/{rotation_initiation_time}"),
        ROTATION_TOKEN_LENGTH,
    )
}

/// Assemble an object name from its parts
pub fn object_name(
    logical_name: &str,
    kind: SecretKind,
    config_checksum: &str,
    rotation_initiation_time: &str,
) -> String {
    let mut name = logical_name.to_string();
    let rotated = !rotation_initiation_time.is_empty();

    if rotated {
        name.push('-');
        name.push_str(&rotation_token(logical_name, rotation_initiation_time));
    }
    // Never-rotated CAs keep their static name.
    if rotated || !kind.is_certificate_authority() {
        name.push('-');
        name.push_str(&config_checksum[..NAME_CHECKSUM_LENGTH.min(config_checksum.len())]);
    }
    name
}

/// Compute object name, namespace and labels for a generation of `config`
///
/// # Example
///
/// ```
/// use nebula_secrets::core::SecretConfig;
/// use nebula_secrets::naming::{object_meta, LabelOptions};
///
/// let config = SecretConfig::certificate_authority("ca");
/// let meta = object_meta("kube-system", "gardenlet", &config, "", &LabelOptions::default())?;
/// assert_eq!(meta.name, "ca");
/// assert_eq!(meta.labels["last-rotation-initiation-time"], "");
///
/// let rotated = object_meta("kube-system", "gardenlet", &config, "1646060228", &LabelOptions::default())?;
/// assert!(rotated.name.starts_with("ca-"));
/// # Ok::<(), nebula_secrets::core::SecretsError>(())
/// ```
pub fn object_meta(
    namespace: &str,
    manager_identity: &str,
    config: &SecretConfig,
    last_rotation_initiation_time: &str,
    options: &LabelOptions,
) -> SecretsResult<ObjectMeta> {
    validate_config(config)?;

    let checksum = config_checksum(config, options)?;
    let name = object_name(
        &config.name,
        config.kind,
        &checksum,
        last_rotation_initiation_time,
    );

    let mut meta_labels =
        base_labels(&config.name, manager_identity, last_rotation_initiation_time);
    meta_labels.insert(labels::CHECKSUM_OF_CONFIG.to_string(), checksum);
    apply_options(&mut meta_labels, options);

    Ok(ObjectMeta {
        name,
        namespace: namespace.to_string(),
        labels: meta_labels,
    })
}

/// Identity of the bundle generation for a CA
///
/// Bundles are addressed by their content: the checksum covers the bundled
/// certificates, so every change to the set of trusted CAs yields a new name.
pub fn bundle_meta(
    namespace: &str,
    manager_identity: &str,
    bundle_for: &str,
    bundle: &[u8],
) -> SecretsResult<ObjectMeta> {
    let logical_name = format!("{bundle_for}{BUNDLE_SUFFIX}");
    validate_logical_name(&logical_name)?;

    let mut input = bundle_for.as_bytes().to_vec();
    input.push(b'/');
    input.extend_from_slice(bundle);
    let checksum = sha256_prefix(input, CONFIG_CHECKSUM_LENGTH);

    let name = format!("{logical_name}-{}", &checksum[..NAME_CHECKSUM_LENGTH]);
    let mut meta_labels = base_labels(&logical_name, manager_identity, "");
    meta_labels.insert(labels::CHECKSUM_OF_CONFIG.to_string(), checksum);
    meta_labels.insert(labels::BUNDLE_FOR.to_string(), bundle_for.to_string());

    Ok(ObjectMeta {
        name,
        namespace: namespace.to_string(),
        labels: meta_labels,
    })
}

fn base_labels(logical_name: &str, manager_identity: &str, rotation_time: &str) -> Labels {
    let mut out = Labels::new();
    out.insert(labels::NAME.to_string(), logical_name.to_string());
    out.insert(
        labels::MANAGED_BY.to_string(),
        labels::MANAGED_BY_VALUE.to_string(),
    );
    out.insert(
        labels::MANAGER_IDENTITY.to_string(),
        manager_identity.to_string(),
    );
    out.insert(
        labels::LAST_ROTATION_INITIATION_TIME.to_string(),
        rotation_time.to_string(),
    );
    out
}

fn apply_options(out: &mut Labels, options: &LabelOptions) {
    if let Some(checksum) = &options.signing_ca_checksum {
        out.insert(labels::CHECKSUM_OF_SIGNING_CA.to_string(), checksum.clone());
    }
    if let Some(issued_at) = options.issued_at {
        out.insert(labels::ISSUED_AT_TIME.to_string(), to_unix_label(issued_at));
    }
    if let Some(valid_until) = options.valid_until {
        out.insert(
            labels::VALID_UNTIL_TIME.to_string(),
            to_unix_label(valid_until),
        );
    }
    if options.persist {
        out.insert(labels::PERSIST.to_string(), "true".to_string());
    }
    if let Some(bundle_for) = &options.bundle_for {
        out.insert(labels::BUNDLE_FOR.to_string(), bundle_for.clone());
    }
}

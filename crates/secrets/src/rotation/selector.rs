//! Generation selection and bundling
//!
//! Label queries carry no ordering, so "newest" is defined here once:
//! `created_at` descending, ties broken by object name ascending. Every
//! component that needs the current generation goes through [`newest`].

use std::cmp::Ordering;

use crate::core::{Generation, Payload, SecretsError, SecretsResult, keys};

/// Total order placing the newest generation first
pub fn newest_first(a: &Generation, b: &Generation) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.object_name.cmp(&b.object_name))
}

/// Sort generations newest first
pub fn sort_newest_first(generations: &mut [Generation]) {
    generations.sort_by(newest_first);
}

/// The newest of `generations`
///
/// `name` only labels the error when the slice is empty.
pub fn newest<'a>(name: &str, generations: &'a [Generation]) -> SecretsResult<&'a Generation> {
    generations
        .iter()
        .min_by(|a, b| newest_first(a, b))
        .ok_or_else(|| SecretsError::not_found(name))
}

/// The newest generation from a rotation epoch older than the current one
///
/// Generations of the current epoch share its `last-rotation-initiation-time`
/// (they differ only by config checksum) and are skipped.
pub fn previous_epoch(generations: &[Generation]) -> Option<&Generation> {
    let current = generations.iter().min_by(|a, b| newest_first(a, b))?;
    let epoch = current.last_rotation_initiation_time();
    generations
        .iter()
        .filter(|g| g.last_rotation_initiation_time() != epoch)
        .min_by(|a, b| newest_first(a, b))
}

/// Payload bundling the public CA material of two generations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    /// Logical name whose CA material is bundled
    pub bundle_for: String,
    /// Payload with the concatenated certificates under `bundle.crt`
    pub data: Payload,
}

/// Concatenate the CA certificates of `current` and, if given, `previous`
///
/// Both generations must carry `ca.crt`. Private keys are never bundled.
pub fn bundle(
    bundle_for: &str,
    current: &Generation,
    previous: Option<&Generation>,
) -> SecretsResult<Bundle> {
    let mut bundled = ca_certificate(bundle_for, current)?.to_vec();
    if let Some(previous) = previous {
        if !bundled.is_empty() && !bundled.ends_with(b"\n") {
            bundled.push(b'\n');
        }
        bundled.extend_from_slice(ca_certificate(bundle_for, previous)?);
    }

    let mut data = Payload::new();
    data.insert(keys::BUNDLE_CERTIFICATE.to_string(), bundled);
    Ok(Bundle {
        bundle_for: bundle_for.to_string(),
        data,
    })
}

fn ca_certificate<'a>(bundle_for: &str, generation: &'a Generation) -> SecretsResult<&'a [u8]> {
    generation
        .data
        .get(keys::CA_CERTIFICATE)
        .map(Vec::as_slice)
        .ok_or_else(|| {
            SecretsError::config(
                bundle_for,
                format!(
                    "generation '{}' carries no {} to bundle",
                    generation.object_name,
                    keys::CA_CERTIFICATE
                ),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Labels, labels};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn generation(name: &str, day: u32, ca: Option<&str>) -> Generation {
        let mut data = Payload::new();
        if let Some(ca) = ca {
            data.insert(keys::CA_CERTIFICATE.to_string(), ca.as_bytes().to_vec());
            data.insert(keys::CA_PRIVATE_KEY.to_string(), b"secret-key".to_vec());
        }
        Generation {
            object_name: name.to_string(),
            namespace: "default".to_string(),
            created_at: Utc.with_ymd_and_hms(2022, 2, day, 0, 0, 0).unwrap(),
            labels: Labels::new(),
            data,
        }
    }

    #[test]
    fn test_newest_regardless_of_order() {
        let day1 = generation("ca-1", 1, None);
        let day2 = generation("ca-2", 2, None);
        let day3 = generation("ca-3", 3, None);

        for order in [
            vec![day1.clone(), day2.clone(), day3.clone()],
            vec![day3.clone(), day1.clone(), day2.clone()],
            vec![day2.clone(), day3.clone(), day1.clone()],
        ] {
            assert_eq!(newest("ca", &order).unwrap().object_name, "ca-3");
        }
    }

    #[test]
    fn test_newest_tie_breaks_by_name() {
        let b = generation("ca-b", 1, None);
        let a = generation("ca-a", 1, None);
        let generations = vec![b, a];
        assert_eq!(newest("ca", &generations).unwrap().object_name, "ca-a");
    }

    #[test]
    fn test_newest_empty() {
        let err = newest("ca", &[]).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_sort_newest_first() {
        let mut generations = vec![
            generation("ca-1", 1, None),
            generation("ca-3", 3, None),
            generation("ca-2", 2, None),
        ];
        sort_newest_first(&mut generations);
        let names: Vec<_> = generations.iter().map(|g| g.object_name.as_str()).collect();
        assert_eq!(names, ["ca-3", "ca-2", "ca-1"]);
    }

    fn with_epoch(mut generation: Generation, epoch: &str) -> Generation {
        generation.labels.insert(
            labels::LAST_ROTATION_INITIATION_TIME.to_string(),
            epoch.to_string(),
        );
        generation
    }

    #[test]
    fn test_previous_epoch() {
        let generations = vec![
            with_epoch(generation("ca", 1, None), ""),
            with_epoch(generation("ca-a-1", 2, None), "100"),
            with_epoch(generation("ca-b-2", 3, None), "200"),
            with_epoch(generation("ca-b-3", 4, None), "200"),
        ];

        let previous = previous_epoch(&generations).unwrap();
        assert_eq!(previous.object_name, "ca-a-1");

        assert!(previous_epoch(&generations[..1]).is_none());
        assert!(previous_epoch(&[]).is_none());
    }

    #[test]
    fn test_bundle_concatenates_public_material() {
        let new = generation("ca-2", 2, Some("cert-new"));
        let old = generation("ca-1", 1, Some("cert-old\n"));

        let bundle = bundle("ca", &new, Some(&old)).unwrap();

        assert_eq!(bundle.bundle_for, "ca");
        assert_eq!(
            bundle.data.keys().collect::<Vec<_>>(),
            [keys::BUNDLE_CERTIFICATE],
            "private keys are not bundled"
        );
        assert_eq!(
            bundle.data[keys::BUNDLE_CERTIFICATE],
            b"cert-new\ncert-old\n".to_vec()
        );
    }

    #[test]
    fn test_bundle_single_generation() {
        let new = generation("ca", 1, Some("cert"));
        let bundle = bundle("ca", &new, None).unwrap();
        assert_eq!(bundle.data[keys::BUNDLE_CERTIFICATE], b"cert".to_vec());
    }

    #[test]
    fn test_bundle_requires_ca_certificate() {
        let new = generation("ca", 1, None);
        let err = bundle("ca", &new, None).unwrap_err();
        assert!(matches!(err, SecretsError::Config { .. }));
    }
}

//! Spec Fingerprints
//!
//! Admission decisions carry a SHA-256 of the admitted spec so callers can
//! tell whether two stored specs are the same without diffing them.
//!
//! The serialized spec is already canonical: struct fields serialize in
//! declaration order, every map in the model is a `BTreeMap`, and empty
//! optional sections are skipped. Two equal specs give the same bytes no
//! matter what order the input document listed its keys in.

use sha2::{Digest, Sha256};

use crate::build::BuildSpec;

/// Lowercase hex SHA-256 of the serialized spec
pub fn spec_fingerprint(spec: &BuildSpec) -> Result<String, serde_json::Error> {
    let bytes = serde_json::to_vec(spec)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec_with_selector(pairs: &[(&str, &str)]) -> BuildSpec {
        let mut spec = BuildSpec {
            tags: vec!["gcr.io/app".to_string()],
            ..Default::default()
        };
        for (k, v) in pairs {
            spec.node_selector.insert(k.to_string(), v.to_string());
        }
        spec
    }

    #[test]
    fn test_fingerprint_is_hex_sha256() {
        let h = spec_fingerprint(&spec_with_selector(&[])).unwrap();
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_fingerprint_ignores_insertion_order() {
        let forward = spec_with_selector(&[("zone", "a"), ("disktype", "ssd"), ("pool", "build")]);
        let reverse = spec_with_selector(&[("pool", "build"), ("disktype", "ssd"), ("zone", "a")]);
        assert_eq!(spec_fingerprint(&forward).unwrap(), spec_fingerprint(&reverse).unwrap());
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let spec = spec_with_selector(&[("zone", "a")]);
        let h1 = spec_fingerprint(&spec).unwrap();

        let mut changed = spec.clone();
        changed.tags.push("gcr.io/app:v2".to_string());
        assert_ne!(h1, spec_fingerprint(&changed).unwrap());

        let moved = spec_with_selector(&[("zone", "b")]);
        assert_ne!(h1, spec_fingerprint(&moved).unwrap());
    }
}

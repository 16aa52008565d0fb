// crates/stackscope-dap/src/correlation.rs
// ============================================================================
// Module: Source Correlation
// Description: Session-independent deduplication keys for DAP sources.
// Purpose: Map every incoming DAP source to one debugger-wide identity.
// Dependencies: sha2, stackscope-wire
// ============================================================================

//! ## Overview
//! Adapters describe the same file differently across sessions. The
//! correlation key gives every source one debugger-wide identity:
//!
//! - Path-backed sources key on the lexically normalised absolute path.
//! - Pathless sources with a positive `sourceReference` key on an 8-byte
//!   stability hash over the session-independent attributes (name, origin,
//!   checksums, related source names and paths). The session-scoped
//!   reference number itself never enters the hash.
//! - Sources with neither are rejected.
//!
//! Invariants:
//! - Equal keys imply the same logical source; two sessions presenting the
//!   same file share one Source entity.
//! - Keys are stable across sessions and adapter restarts.

use sha2::Digest;
use sha2::Sha256;
use stackscope_wire::Source;

use crate::error::DapError;

/// Prefix for path-backed correlation keys.
const PATH_KEY_PREFIX: &str = "path:";
/// Prefix for stability-hash correlation keys.
const HASH_KEY_PREFIX: &str = "ref:";

/// Computes the correlation key of a DAP source.
///
/// # Errors
///
/// Returns [`DapError::UnidentifiableSource`] when the source has neither a
/// path nor a positive `sourceReference`.
pub fn correlation_key(source: &Source) -> Result<String, DapError> {
    if let Some(path) = source.path.as_deref() {
        if !path.is_empty() {
            return Ok(format!("{PATH_KEY_PREFIX}{}", normalize_path(path)));
        }
    }
    if source.source_reference.unwrap_or(0) > 0 {
        return Ok(format!("{HASH_KEY_PREFIX}{}", stability_hash(source)));
    }
    Err(DapError::UnidentifiableSource)
}

/// Lexically normalises a path: separators unified, `.` dropped, `..`
/// resolved against preceding components.
///
/// Purely textual so the key is stable even when the file does not exist on
/// this machine.
fn normalize_path(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let absolute = unified.starts_with('/');
    let mut components: Vec<&str> = Vec::new();
    for component in unified.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                if components.pop().is_none() && !absolute {
                    components.push("..");
                }
            }
            other => components.push(other),
        }
    }
    let joined = components.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Computes the 8-byte stability hash of a pathless source, hex encoded.
///
/// Every attribute is written with a tag and a length so distinct attribute
/// combinations cannot collide by concatenation.
fn stability_hash(source: &Source) -> String {
    let mut hasher = Sha256::new();
    write_attribute(&mut hasher, b"name", source.name.as_deref());
    write_attribute(&mut hasher, b"origin", source.origin.as_deref());
    for checksum in &source.checksums {
        write_attribute(&mut hasher, b"checksum-alg", Some(&checksum.algorithm));
        write_attribute(&mut hasher, b"checksum", Some(&checksum.checksum));
    }
    for related in &source.sources {
        write_attribute(&mut hasher, b"related-name", related.name.as_deref());
        write_attribute(&mut hasher, b"related-path", related.path.as_deref());
    }
    let digest = hasher.finalize();
    let mut key = String::with_capacity(16);
    for byte in digest.iter().take(8) {
        key.push_str(&format!("{byte:02x}"));
    }
    key
}

/// Writes one tagged, length-prefixed attribute into the hasher.
fn write_attribute(hasher: &mut Sha256, tag: &[u8], value: Option<&str>) {
    let Some(value) = value else {
        return;
    };
    hasher.update(tag);
    hasher.update([0u8]);
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions and helpers are permitted."
    )]

    use stackscope_wire::Checksum;

    use super::*;

    #[test]
    fn path_sources_key_on_the_normalised_path() {
        let a = Source {
            path: Some("/work/./src/../src/app.py".to_owned()),
            ..Source::default()
        };
        let b = Source {
            path: Some("/work/src/app.py".to_owned()),
            name: Some("different display name".to_owned()),
            ..Source::default()
        };
        assert_eq!(correlation_key(&a).unwrap(), "path:/work/src/app.py");
        assert_eq!(correlation_key(&a).unwrap(), correlation_key(&b).unwrap());
    }

    #[test]
    fn windows_separators_normalise() {
        let source = Source {
            path: Some("C:\\work\\app.py".to_owned()),
            ..Source::default()
        };
        assert_eq!(correlation_key(&source).unwrap(), "path:C:/work/app.py");
    }

    #[test]
    fn reference_sources_hash_session_independent_attributes() {
        let template = Source {
            name: Some("<eval>".to_owned()),
            origin: Some("internal module".to_owned()),
            source_reference: Some(7),
            checksums: vec![Checksum {
                algorithm: "SHA256".to_owned(),
                checksum: "abc123".to_owned(),
            }],
            ..Source::default()
        };
        let mut other_session = template.clone();
        // A different session-scoped reference number must not change the key.
        other_session.source_reference = Some(42);
        let key = correlation_key(&template).unwrap();
        assert_eq!(key, correlation_key(&other_session).unwrap());
        assert!(key.starts_with("ref:"));
        assert_eq!(key.len(), "ref:".len() + 16);
    }

    #[test]
    fn different_attributes_produce_different_hashes() {
        let a = Source {
            name: Some("one".to_owned()),
            source_reference: Some(1),
            ..Source::default()
        };
        let b = Source {
            name: Some("two".to_owned()),
            source_reference: Some(1),
            ..Source::default()
        };
        assert_ne!(correlation_key(&a).unwrap(), correlation_key(&b).unwrap());
    }

    #[test]
    fn sources_without_identity_are_rejected() {
        let source = Source::default();
        assert!(matches!(
            correlation_key(&source),
            Err(DapError::UnidentifiableSource)
        ));
        let zero_reference = Source {
            source_reference: Some(0),
            ..Source::default()
        };
        assert!(matches!(
            correlation_key(&zero_reference),
            Err(DapError::UnidentifiableSource)
        ));
    }
}

//! Canonical serialization for deterministic fingerprints.
//!
//! Timeline fingerprints back the idempotence guarantee: reconciling an
//! already-consistent timeline must yield the same fingerprint.
//!
//! ## Determinism Guarantees
//!
//! - Struct fields serialize in declaration order
//! - Segments serialize in timeline order
//! - Derived segment ids are content-derived, never random

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Serialize a value to canonical JSON bytes.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).expect("timeline types serialize infallibly")
}

/// Compute the xxh64 hash of a value's canonical bytes.
pub fn canonical_hash<T: Serialize>(value: &T) -> u64 {
    xxh64(&to_canonical_bytes(value), 0)
}

/// Compute canonical hash and return as hex string.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}

//! Manifest content hashing.
//!
//! A resolved manifest's hash must be a pure function of its content:
//! identical resolved content hashes identically regardless of when or
//! where it was resolved. Hashes are SHA-256 over the canonical JSON
//! serialization (struct field order is fixed, all sequences are ordered),
//! hex-encoded.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Compute the hex-encoded SHA-256 digest of a value's canonical JSON form.
pub fn content_hash<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_vec(value)?;
    Ok(hex_digest(&json))
}

/// Compute the hex-encoded SHA-256 digest of raw bytes.
pub fn hex_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

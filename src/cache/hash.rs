//! Content hashing for cache and scope keys.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::model::Measure;

/// Compute SHA256 hash of a serializable value.
///
/// The value is serialized to JSON before hashing, ensuring deterministic output.
/// Returns a 64-character lowercase hexadecimal string.
///
/// # Errors
/// Returns an error if the value cannot be serialized to JSON.
pub fn compute_hash<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(value)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Cache identity of a measure: its alias and full definition.
pub fn measure_key(measure: &Measure) -> Result<String, serde_json::Error> {
    compute_hash(measure)
}

//! Stable fingerprints for planned work.
//!
//! A plan's fingerprint changes whenever anything that affects its result
//! changes: command line, environment, staged inputs or output path. Callers
//! use it as a cache key to skip plans that already ran.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::consts::OBJ_HASH_PREFIX_LEN;

pub type HashError = serde_json::Error;

/// Truncated SHA-256 of a value's JSON form, as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectHash(pub String);

impl std::fmt::Display for ObjectHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Values that can be fingerprinted.
///
/// Implementors must serialize deterministically; use ordered maps.
pub trait Hashable: Serialize {
  fn compute_hash(&self) -> Result<ObjectHash, HashError> {
    let serialized = serde_json::to_string(self)?;
    let digest = Sha256::digest(serialized.as_bytes());
    let full = format!("{:x}", digest);
    Ok(ObjectHash(full[..OBJ_HASH_PREFIX_LEN].to_string()))
  }
}

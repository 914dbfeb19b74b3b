//! Deterministic request fingerprints.
//!
//! Each part is length-prefixed before hashing so that ("ab", "c") and
//! ("a", "bc") never collide.

use sha2::{Digest, Sha256};

/// Builder for a cache key over a request's semantic inputs.
#[derive(Clone)]
pub struct Fingerprint {
    hasher: Sha256,
}

impl Fingerprint {
    /// Start a fingerprint in `namespace` (typically the service key).
    pub fn new(namespace: &str) -> Self {
        Self { hasher: Sha256::new() }.part(namespace)
    }

    pub fn part(mut self, value: &str) -> Self {
        self.hasher.update((value.len() as u64).to_be_bytes());
        self.hasher.update(value.as_bytes());
        self
    }

    /// Absent optional inputs hash differently from empty strings.
    pub fn optional(self, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.part("some").part(v),
            None => self.part("none"),
        }
    }

    /// Lowercase hex digest.
    pub fn finish(self) -> String {
        format!("{:x}", self.hasher.finalize())
    }
}

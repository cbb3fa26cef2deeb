//! Content-derived media fingerprints.
//!
//! A fingerprint is the SHA-256 digest of the raw asset bytes. Identical
//! bytes always produce the same fingerprint, which keys the analysis
//! cache so each distinct asset is analyzed at most once.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Content-derived identity of a media asset.
///
/// Immutable once computed; the hex digest doubles as the cache key suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaFingerprint(String);

impl MediaFingerprint {
    /// Compute the fingerprint of raw asset bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        Self(format!("{:x}", digest))
    }

    /// The hex digest.
    pub fn as_hex(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines.
    pub fn short(&self) -> &str {
        &self.0[..8.min(self.0.len())]
    }

    /// Cache key for a stored analysis result.
    ///
    /// Format: `analysis:<hex-digest>`
    pub fn cache_key(&self) -> String {
        format!("analysis:{}", self.0)
    }
}

impl fmt::Display for MediaFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

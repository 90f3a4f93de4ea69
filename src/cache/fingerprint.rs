//! Content-addressed identifiers
//!
//! Configuration fingerprints key the manifest and the cache directory
//! layout. Same build configuration = same fingerprint.

use crate::config::BuildConfig;
use crate::error::VendorLinkResult;
use sha2::{Digest, Sha256};

/// Length of fingerprints and version tags in hex characters
pub const DIGEST_LEN: usize = 10;

/// SHA256 of `bytes`, truncated to the first `DIGEST_LEN` hex chars
pub(crate) fn short_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let result = hasher.finalize();

    // 5 bytes = 10 hex characters
    hex::encode(&result[..DIGEST_LEN / 2])
}

/// Fingerprint a build configuration
///
/// Hashes the JSON serialization, so every field (entries, output
/// targets, descriptor directive) contributes.
pub fn config_fingerprint(config: &BuildConfig) -> VendorLinkResult<String> {
    let serialized = serde_json::to_vec(config)?;
    Ok(short_digest(&serialized))
}

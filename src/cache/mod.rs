//! Vendor bundle cache
//!
//! Records are keyed by a fingerprint of the build configuration and hold
//! the artifact names of the last successful build plus the dependency
//! tree seen at the last check. A record is stale when the tree moved.
//!
//! # Layout
//!
//! ```text
//! <cache_dir>/
//!   manifest.json
//!   <fingerprint>/js/    code artifacts
//!   <fingerprint>/json/  descriptors
//! ```

pub mod fingerprint;
pub mod invalidate;
pub mod manifest;
pub mod store;

pub use fingerprint::{config_fingerprint, DIGEST_LEN};
pub use invalidate::{decide, rebuild_reason, trees_equal, RebuildReason};
pub use manifest::{CacheRecord, Manifest, MANIFEST_FILE};
pub use store::CacheStore;

use std::path::{Path, PathBuf};

/// Private directories of one fingerprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePaths {
    /// Directory of this fingerprint
    pub root: PathBuf,
    /// Code artifacts
    pub js: PathBuf,
    /// Descriptors
    pub json: PathBuf,
}

impl CachePaths {
    pub fn new(cache_dir: &Path, fingerprint: &str) -> Self {
        let root = cache_dir.join(fingerprint);
        Self {
            js: root.join("js"),
            json: root.join("json"),
            root,
        }
    }
}

/// Manifest location within a cache directory
pub fn manifest_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(MANIFEST_FILE)
}

//! Manifest persistence
//!
//! The manifest is the only durable state: one record per configuration
//! fingerprint, stored as `manifest.json` in the cache directory.
//!
//! ```json
//! { "configFiles": { "<fingerprint>": { "outputJSNames": [...], "entryVersion": {...} } } }
//! ```
//!
//! There is no cross-process locking. Two processes sharing one manifest
//! can overwrite each other's records.

use crate::deps::DependencyTree;
use crate::error::{VendorLinkError, VendorLinkResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

/// Name of the manifest file within the cache directory
pub const MANIFEST_FILE: &str = "manifest.json";

/// Cached state for one configuration fingerprint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Artifact names reported by the last successful build
    #[serde(rename = "outputJSNames", default)]
    pub output_js_names: Vec<String>,

    /// Dependency tree as of the last check (not the last build)
    #[serde(rename = "entryVersion", default)]
    pub entry_version: Option<DependencyTree>,

    /// When the last check ran
    #[serde(rename = "checkedAt", default, skip_serializing_if = "Option::is_none")]
    pub checked_at: Option<DateTime<Utc>>,
}

impl CacheRecord {
    /// Whether a build has ever succeeded for this fingerprint
    pub fn has_artifacts(&self) -> bool {
        !self.output_js_names.is_empty()
    }
}

/// All cache records, keyed by configuration fingerprint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "configFiles", default)]
    pub config_files: BTreeMap<String, CacheRecord>,
}

impl Manifest {
    /// Load the manifest, starting fresh if it is missing or unreadable
    ///
    /// A lost manifest only costs a rebuild, so this never fails.
    pub fn load_or_default(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                debug!("No manifest at {} ({}), starting fresh", path.display(), e);
                return Self::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!("Ignoring corrupt manifest {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Overwrite the manifest file with the full in-memory state
    pub async fn save(&self, path: &Path) -> VendorLinkResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| VendorLinkError::io("creating cache directory", e))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await.map_err(|e| {
            VendorLinkError::io(format!("writing manifest {}", path.display()), e)
        })?;

        debug!("Wrote manifest {}", path.display());
        Ok(())
    }
}

//! Cache record store
//!
//! Owns the manifest for one run and the record of the current
//! configuration fingerprint. The rebuild decision is taken once at
//! construction, before the fresh dependency tree replaces the stored one.

use super::invalidate::{rebuild_reason, RebuildReason};
use super::manifest::{CacheRecord, Manifest};
use crate::config::{EntrySpec, PackageSourceKind};
use crate::deps::{resolve_entry, DependencyTree};
use crate::error::VendorLinkResult;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Manifest state for one configuration fingerprint
#[derive(Debug)]
pub struct CacheStore {
    fingerprint: String,
    manifest_path: PathBuf,
    manifest: Manifest,
    record: Arc<CacheRecord>,
    rebuild_reason: Option<RebuildReason>,
}

impl CacheStore {
    /// Load the manifest and resolve the entry's current dependency tree
    pub fn open(
        fingerprint: impl Into<String>,
        entry: &EntrySpec,
        manifest_path: impl Into<PathBuf>,
        packages: PackageSourceKind,
        project_dir: &Path,
    ) -> Self {
        let fresh = resolve_entry(entry, packages, project_dir);
        Self::with_tree(fingerprint, manifest_path, fresh)
    }

    /// Load the manifest and compare against an already resolved tree
    pub fn with_tree(
        fingerprint: impl Into<String>,
        manifest_path: impl Into<PathBuf>,
        fresh: Option<DependencyTree>,
    ) -> Self {
        let fingerprint = fingerprint.into();
        let manifest_path = manifest_path.into();
        let manifest = Manifest::load_or_default(&manifest_path);

        let mut record = match manifest.config_files.get(&fingerprint) {
            Some(record) => record.clone(),
            None => {
                debug!("No cache record for {}, creating one", fingerprint);
                CacheRecord::default()
            }
        };

        let reason = rebuild_reason(&record, fresh.as_ref());
        match reason {
            Some(reason) => info!("Vendor bundle {} needs a rebuild: {}", fingerprint, reason),
            None => debug!("Vendor bundle {} is up to date", fingerprint),
        }

        record.entry_version = fresh;
        record.checked_at = Some(Utc::now());

        let mut store = Self {
            fingerprint,
            manifest_path,
            manifest,
            record: Arc::new(CacheRecord::default()),
            rebuild_reason: reason,
        };
        store.replace_record(record);
        store
    }

    /// Whether the cached artifacts must be rebuilt
    pub fn should_update(&self) -> bool {
        self.rebuild_reason.is_some()
    }

    pub fn rebuild_reason(&self) -> Option<RebuildReason> {
        self.rebuild_reason
    }

    /// Force a rebuild regardless of the decision taken at load
    ///
    /// An earlier reason is kept; it is the more specific one.
    pub fn force_rebuild(&mut self, reason: RebuildReason) {
        if self.rebuild_reason.is_none() {
            info!("Vendor bundle {} needs a rebuild: {}", self.fingerprint, reason);
            self.rebuild_reason = Some(reason);
        }
    }

    /// Snapshot of the current record
    pub fn record(&self) -> Arc<CacheRecord> {
        Arc::clone(&self.record)
    }

    /// Artifact names from the last successful build
    pub fn cached_artifact_names(&self) -> &[String] {
        &self.record.output_js_names
    }

    /// Record the artifact names of a successful build
    ///
    /// Produces a new record; snapshots handed out earlier are unchanged.
    pub fn set_artifact_names(&mut self, names: Vec<String>) {
        let mut record = CacheRecord::clone(&self.record);
        record.output_js_names = names;
        self.replace_record(record);
    }

    /// Write the whole manifest, all fingerprints included
    pub async fn persist(&self) -> VendorLinkResult<()> {
        self.manifest.save(&self.manifest_path).await
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    fn replace_record(&mut self, record: CacheRecord) {
        self.manifest
            .config_files
            .insert(self.fingerprint.clone(), record.clone());
        self.record = Arc::new(record);
    }
}

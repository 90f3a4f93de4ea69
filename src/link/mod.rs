//! Vendor bundle check lifecycle
//!
//! `DllLink` ties the cache record store and the build orchestrator
//! together. A host calls `check` once before its own build; the result
//! then feeds HTML generation, asset injection or chunk renaming.

mod html;

pub use html::{join_url, HtmlAssets};

use crate::bundle::{version_tag, BuildEngine, BundleController, Emission, ReferenceManifest};
use crate::cache::{
    config_fingerprint, manifest_path, CachePaths, CacheRecord, CacheStore, RebuildReason,
};
use crate::config::{Config, LinkMode, LinkOptions};
use crate::deps::DependencyTree;
use crate::error::{VendorLinkError, VendorLinkResult};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where a `DllLink` is in its single check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Uninitialized,
    Running,
    Completed,
}

/// Result of a check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The engine ran and reported these artifacts
    Rebuilt {
        reason: RebuildReason,
        assets: Vec<String>,
    },
    /// Cached artifacts were reused
    Cached,
    /// This link already checked; nothing was done
    AlreadyChecked,
}

impl CheckOutcome {
    pub fn rebuilt(&self) -> bool {
        matches!(self, Self::Rebuilt { .. })
    }
}

/// The vendor bundle cache for one configuration
#[derive(Debug)]
pub struct DllLink {
    options: LinkOptions,
    public_path: String,
    cache_paths: CachePaths,
    store: CacheStore,
    controller: BundleController,
    state: LinkState,
    force: bool,
}

impl DllLink {
    /// Open the cache for `config`, resolving dependencies in `project_dir`
    pub fn new(config: &Config, project_dir: &Path) -> VendorLinkResult<Self> {
        let fingerprint = config_fingerprint(&config.build)?;
        let store = CacheStore::open(
            &fingerprint,
            &config.build.entry,
            manifest_path(&config.link.cache_dir),
            config.link.packages,
            project_dir,
        );
        Self::assemble(config, store)
    }

    /// Open the cache for `config` against an already resolved tree
    pub fn with_tree(config: &Config, fresh: Option<DependencyTree>) -> VendorLinkResult<Self> {
        let fingerprint = config_fingerprint(&config.build)?;
        let store =
            CacheStore::with_tree(fingerprint, manifest_path(&config.link.cache_dir), fresh);
        Self::assemble(config, store)
    }

    fn assemble(config: &Config, store: CacheStore) -> VendorLinkResult<Self> {
        let cache_paths = CachePaths::new(&config.link.cache_dir, store.fingerprint());
        let controller = BundleController::new(
            config.build.clone(),
            &cache_paths,
            config.link.manifest_names.clone(),
            store.cached_artifact_names(),
        )?;

        debug!("Vendor bundle fingerprint {}", store.fingerprint());
        Ok(Self {
            options: config.link.clone(),
            public_path: config.build.output.public_path.clone(),
            cache_paths,
            store,
            controller,
            state: LinkState::Uninitialized,
            force: false,
        })
    }

    /// Rebuild on check even when the cache is current
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Decide, rebuild if needed, place artifacts and persist the manifest
    ///
    /// Runs at most once per `DllLink`. A failed check leaves the link in
    /// `Running`, so it is not retried.
    pub async fn check(&mut self, engine: &dyn BuildEngine) -> VendorLinkResult<CheckOutcome> {
        match self.state {
            LinkState::Completed => return Ok(CheckOutcome::AlreadyChecked),
            LinkState::Running => return Err(VendorLinkError::CheckInProgress),
            LinkState::Uninitialized => {}
        }
        self.state = LinkState::Running;

        if self.force {
            self.store.force_rebuild(RebuildReason::Forced);
        }
        if !self.store.should_update() {
            let missing = self.controller.missing_artifacts(self.store.cached_artifact_names());
            if !missing.is_empty() {
                warn!("{} cached artifacts missing, e.g. {}", missing.len(), missing[0].display());
                self.store.force_rebuild(RebuildReason::ArtifactsMissing);
            }
        }

        let outcome = match self.store.rebuild_reason() {
            Some(reason) => {
                info!("Rebuilding vendor bundle ({})", reason);
                let assets = self.controller.build(engine).await?;
                self.store.set_artifact_names(assets.clone());
                CheckOutcome::Rebuilt { reason, assets }
            }
            None => {
                info!("Vendor bundle {} is cached", self.store.fingerprint());
                CheckOutcome::Cached
            }
        };

        if self.options.mode == LinkMode::Copy {
            self.controller.copy_all().await?;
        }

        self.store.persist().await?;
        self.state = LinkState::Completed;
        Ok(outcome)
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn fingerprint(&self) -> &str {
        self.store.fingerprint()
    }

    pub fn mode(&self) -> LinkMode {
        self.options.mode
    }

    pub fn cache_paths(&self) -> &CachePaths {
        &self.cache_paths
    }

    /// Whether a check would rebuild, before `force` and artifact presence
    pub fn rebuild_reason(&self) -> Option<RebuildReason> {
        self.store.rebuild_reason()
    }

    /// Why a check would rebuild right now, without building anything
    pub fn planned_rebuild(&self) -> Option<RebuildReason> {
        if self.force {
            return self.rebuild_reason().or(Some(RebuildReason::Forced));
        }
        self.rebuild_reason().or_else(|| {
            (!self.controller.missing_artifacts(self.cached_names()).is_empty())
                .then_some(RebuildReason::ArtifactsMissing)
        })
    }

    /// Current cache record
    pub fn record(&self) -> Arc<CacheRecord> {
        self.store.record()
    }

    /// Artifacts the last build produced
    pub fn cached_names(&self) -> &[String] {
        self.store.cached_artifact_names()
    }

    /// Artifacts selected by the tracked-name hints
    pub fn tracked_names(&self) -> &[String] {
        self.controller.tracked_names()
    }

    /// Content version of the tracked artifacts, when versioning is on
    pub fn version_tag(&self) -> Option<String> {
        self.options
            .append_version
            .then(|| version_tag(self.controller.tracked_names()))
    }

    pub fn reference_manifests(&self) -> Vec<ReferenceManifest> {
        self.controller.reference_manifests()
    }

    /// Cached artifact URLs ahead of the page's own assets
    pub fn html_assets(&self, existing: HtmlAssets) -> HtmlAssets {
        HtmlAssets::prepend_artifacts(self.cached_names(), &self.public_path, existing)
    }

    /// Inject the cached artifacts into a host's output
    pub async fn add_assets(&self, emission: &mut Emission) -> VendorLinkResult<()> {
        for name in self.cached_names() {
            let source = self.controller.read_artifact(name).await?;
            emission.insert_asset(name.clone(), source);
        }
        debug!("Injected {} cached artifacts", self.cached_names().len());
        Ok(())
    }

    /// Version the host's initial chunk files, when versioning is on
    pub fn update_names(&self, emission: &mut Emission) {
        if let Some(tag) = self.version_tag() {
            emission.apply_version(&tag);
        }
    }
}

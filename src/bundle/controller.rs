//! Build orchestration
//!
//! Points the build configuration at the private cache, runs the engine,
//! picks the tracked artifacts and places them at their public locations.

use super::engine::BuildEngine;
use crate::cache::CachePaths;
use crate::config::BuildConfig;
use crate::error::{VendorLinkError, VendorLinkResult};
use chrono::{DateTime, TimeDelta, Utc};
use filetime::FileTime;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// How far back normalized modification times are set, in seconds.
///
/// File watchers treat files newer than their own start (minus their
/// timestamp accuracy) as changed; backdating keeps cached artifacts out
/// of that window.
const FS_ACCURACY_SECS: i64 = 10;

/// Where one kind of artifact lives
#[derive(Debug, Clone, PartialEq, Eq)]
struct Placement {
    /// Private cache directory the engine writes to
    cache: PathBuf,
    /// Public directory consumers read from
    public: PathBuf,
}

/// A descriptor a consuming build links against
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceManifest {
    pub manifest: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<PathBuf>,
}

/// Runs and places one vendor bundle build
#[derive(Debug)]
pub struct BundleController {
    config: BuildConfig,
    hints: Vec<String>,
    js: Placement,
    json: Placement,
    descriptor_names: Vec<String>,
    descriptor_context: Option<PathBuf>,
    tracked_names: Vec<String>,
    start_time: DateTime<Utc>,
}

impl BundleController {
    /// Take ownership of `config` and redirect its outputs into the cache
    pub fn new(
        mut config: BuildConfig,
        cache_paths: &CachePaths,
        hints: Vec<String>,
        cached_names: &[String],
    ) -> VendorLinkResult<Self> {
        let descriptor = config
            .descriptor
            .as_mut()
            .ok_or(VendorLinkError::MissingDescriptor)?;

        let template = descriptor
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| VendorLinkError::DescriptorPathInvalid {
                path: descriptor.path.clone(),
                reason: "no file name".to_string(),
            })?;
        let descriptor_dir = descriptor
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let descriptor_context = descriptor.context.clone();
        descriptor.path = cache_paths.json.join(&template);

        let descriptor_names = config
            .entry
            .chunk_names()
            .iter()
            .map(|chunk| template.replace("[name]", chunk))
            .collect();

        let js = Placement {
            cache: cache_paths.js.clone(),
            public: std::mem::replace(&mut config.output.path, cache_paths.js.clone()),
        };
        let json = Placement {
            cache: cache_paths.json.clone(),
            public: descriptor_dir,
        };

        let tracked_names = select_tracked_names(cached_names, &hints);
        debug!(
            "Bundle output redirected to {} (public {})",
            js.cache.display(),
            js.public.display()
        );

        Ok(Self {
            config,
            hints,
            js,
            json,
            descriptor_names,
            descriptor_context,
            tracked_names,
            start_time: Utc::now(),
        })
    }

    /// The configuration handed to the engine, outputs pointing into the cache
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Code artifacts that are copied and timestamped
    pub fn tracked_names(&self) -> &[String] {
        &self.tracked_names
    }

    /// Descriptor file names, one per chunk
    pub fn descriptor_names(&self) -> &[String] {
        &self.descriptor_names
    }

    pub fn cache_js_dir(&self) -> &Path {
        &self.js.cache
    }

    /// Descriptors a consuming build should reference
    pub fn reference_manifests(&self) -> Vec<ReferenceManifest> {
        select_tracked_names(&self.descriptor_names, &self.hints)
            .into_iter()
            .map(|name| ReferenceManifest {
                manifest: self.json.public.join(name),
                context: self.descriptor_context.clone(),
            })
            .collect()
    }

    /// Run the engine once and normalize timestamps of what it produced
    ///
    /// Returns every artifact name the engine reported.
    pub async fn build(&mut self, engine: &dyn BuildEngine) -> VendorLinkResult<Vec<String>> {
        for dir in [&self.js.cache, &self.json.cache] {
            fs::create_dir_all(dir).await.map_err(|e| {
                VendorLinkError::io(format!("creating cache directory {}", dir.display()), e)
            })?;
        }

        info!("Building vendor bundle with {}", engine.name());
        let stats = engine.build(&self.config).await?;

        self.tracked_names = select_tracked_names(&stats.assets, &self.hints);
        debug!("Tracking {:?}", self.tracked_names);

        self.normalize_times()?;
        Ok(stats.assets)
    }

    /// Backdate tracked artifacts and descriptors to before this run started
    fn normalize_times(&self) -> VendorLinkResult<()> {
        let seconds = (self.start_time - TimeDelta::seconds(FS_ACCURACY_SECS)).timestamp();
        let time = FileTime::from_unix_time(seconds, 0);

        for path in self.cached_files() {
            filetime::set_file_times(&path, time, time).map_err(|e| {
                VendorLinkError::io(format!("setting times of {}", path.display()), e)
            })?;
        }
        Ok(())
    }

    /// Copy tracked artifacts and descriptors to their public locations
    ///
    /// Modification and access times are carried over, so repeated copies
    /// of unchanged artifacts look unchanged to watchers.
    pub async fn copy_all(&self) -> VendorLinkResult<()> {
        let js = self.tracked_names.iter().map(|name| (&self.js, name));
        let json = self.descriptor_names.iter().map(|name| (&self.json, name));

        for (placement, name) in js.chain(json) {
            let src = placement.cache.join(name);
            let dest = placement.public.join(name);
            copy_preserving_times(&src, &dest).await?;
        }

        info!(
            "Copied {} artifacts and {} descriptors",
            self.tracked_names.len(),
            self.descriptor_names.len()
        );
        Ok(())
    }

    /// Artifacts in `cached_names` and descriptors that are not in the cache
    ///
    /// Every cached name is checked, not only tracked ones, since HTML
    /// lists and asset injection read all of them.
    pub fn missing_artifacts(&self, cached_names: &[String]) -> Vec<PathBuf> {
        let js = cached_names.iter().map(|name| self.js.cache.join(name));
        let json = self
            .descriptor_names
            .iter()
            .map(|name| self.json.cache.join(name));
        js.chain(json).filter(|path| !path.is_file()).collect()
    }

    /// Contents of a cached code artifact
    pub async fn read_artifact(&self, name: &str) -> VendorLinkResult<Vec<u8>> {
        let path = self.js.cache.join(name);
        fs::read(&path)
            .await
            .map_err(|e| VendorLinkError::io(format!("reading {}", path.display()), e))
    }

    fn cached_files(&self) -> Vec<PathBuf> {
        let js = self.tracked_names.iter().map(|name| self.js.cache.join(name));
        let json = self
            .descriptor_names
            .iter()
            .map(|name| self.json.cache.join(name));
        js.chain(json).collect()
    }
}

/// Names in `all` containing at least one hint, in the order of `all`
///
/// Falls back to every name when there are no hints or nothing matches.
pub fn select_tracked_names(all: &[String], hints: &[String]) -> Vec<String> {
    let selected: Vec<String> = all
        .iter()
        .filter(|name| hints.iter().any(|hint| name.contains(hint.as_str())))
        .cloned()
        .collect();

    if selected.is_empty() {
        all.to_vec()
    } else {
        selected
    }
}

async fn copy_preserving_times(src: &Path, dest: &Path) -> VendorLinkResult<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| VendorLinkError::io(format!("creating {}", parent.display()), e))?;
    }

    let metadata = fs::metadata(src)
        .await
        .map_err(|e| VendorLinkError::io(format!("reading {}", src.display()), e))?;
    fs::copy(src, dest).await.map_err(|e| {
        VendorLinkError::io(
            format!("copying {} to {}", src.display(), dest.display()),
            e,
        )
    })?;

    let mtime = FileTime::from_last_modification_time(&metadata);
    let atime = FileTime::from_last_access_time(&metadata);
    filetime::set_file_times(dest, atime, mtime)
        .map_err(|e| VendorLinkError::io(format!("setting times of {}", dest.display()), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::BuildStats;
    use crate::config::{DescriptorConfig, EntryGroup, EntryGroups, EntrySpec, OutputConfig};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn build_config(root: &Path) -> BuildConfig {
        let mut groups = EntryGroups::new();
        groups.insert("polyfill", EntryGroup::One("core-js".into()));
        groups.insert("vendor", EntryGroup::Many(names(&["react"])));

        BuildConfig {
            entry: EntrySpec::Groups(groups),
            output: OutputConfig {
                path: root.join("public"),
                filename: "[name].js".to_string(),
                library: None,
                public_path: "/static/".to_string(),
            },
            descriptor: Some(DescriptorConfig {
                path: root.join("manifests").join("[name]-manifest.json"),
                name: None,
                context: Some(root.to_path_buf()),
            }),
        }
    }

    /// Writes every reported asset and one descriptor per chunk
    struct FakeEngine {
        assets: Vec<String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl BuildEngine for FakeEngine {
        async fn build(&self, config: &BuildConfig) -> VendorLinkResult<BuildStats> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::fs::create_dir_all(&config.output.path).unwrap();
            for asset in &self.assets {
                std::fs::write(config.output.path.join(asset), asset.as_bytes()).unwrap();
            }
            let template = config.descriptor.as_ref().unwrap().path.display().to_string();
            for chunk in config.entry.chunk_names() {
                let path = PathBuf::from(template.replace("[name]", &chunk));
                std::fs::create_dir_all(path.parent().unwrap()).unwrap();
                std::fs::write(path, "{}").unwrap();
            }
            Ok(BuildStats {
                assets: self.assets.clone(),
            })
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    fn fake_engine(assets: &[&str]) -> FakeEngine {
        FakeEngine {
            assets: names(assets),
            calls: AtomicUsize::new(0),
        }
    }

    #[test]
    fn select_tracked_names_filters_in_emission_order() {
        let all = names(&["polyfill.js", "vendor.js", "vendor.js.map"]);
        assert_eq!(
            select_tracked_names(&all, &names(&["vendor", "polyfill"])),
            all
        );
        assert_eq!(
            select_tracked_names(&all, &names(&["vendor"])),
            names(&["vendor.js", "vendor.js.map"])
        );
    }

    #[test]
    fn select_tracked_names_never_empty() {
        let all = names(&["a.js", "b.js"]);
        assert_eq!(select_tracked_names(&all, &[]), all);
        assert_eq!(select_tracked_names(&all, &names(&["zzz"])), all);
        assert!(select_tracked_names(&[], &names(&["a"])).is_empty());
    }

    #[test]
    fn new_rewrites_outputs_into_cache() {
        let temp = TempDir::new().unwrap();
        let paths = CachePaths::new(&temp.path().join("cache"), "abc123");
        let controller =
            BundleController::new(build_config(temp.path()), &paths, vec![], &[]).unwrap();

        assert_eq!(controller.config().output.path, paths.js);
        assert_eq!(
            controller.config().descriptor.as_ref().unwrap().path,
            paths.json.join("[name]-manifest.json")
        );
        assert_eq!(
            controller.descriptor_names(),
            names(&["polyfill-manifest.json", "vendor-manifest.json"])
        );
    }

    #[test]
    fn new_requires_descriptor() {
        let temp = TempDir::new().unwrap();
        let mut config = build_config(temp.path());
        config.descriptor = None;

        let result =
            BundleController::new(config, &CachePaths::new(temp.path(), "abc123"), vec![], &[]);
        assert!(matches!(result, Err(VendorLinkError::MissingDescriptor)));
    }

    #[test]
    fn new_rejects_descriptor_without_file_name() {
        let temp = TempDir::new().unwrap();
        let mut config = build_config(temp.path());
        config.descriptor.as_mut().unwrap().path = PathBuf::from("/");

        let result =
            BundleController::new(config, &CachePaths::new(temp.path(), "abc123"), vec![], &[]);
        assert!(matches!(
            result,
            Err(VendorLinkError::DescriptorPathInvalid { .. })
        ));
    }

    #[test]
    fn reference_manifests_follow_hints() {
        let temp = TempDir::new().unwrap();
        let paths = CachePaths::new(&temp.path().join("cache"), "abc123");

        let all = BundleController::new(build_config(temp.path()), &paths, vec![], &[]).unwrap();
        assert_eq!(all.reference_manifests().len(), 2);

        let hinted =
            BundleController::new(build_config(temp.path()), &paths, names(&["vendor"]), &[])
                .unwrap();
        let refs = hinted.reference_manifests();
        assert_eq!(refs.len(), 1);
        assert_eq!(
            refs[0].manifest,
            temp.path().join("manifests").join("vendor-manifest.json")
        );
        assert_eq!(refs[0].context.as_deref(), Some(temp.path()));
    }

    #[tokio::test]
    async fn build_tracks_and_backdates_outputs() {
        let temp = TempDir::new().unwrap();
        let paths = CachePaths::new(&temp.path().join("cache"), "abc123");
        let mut controller =
            BundleController::new(build_config(temp.path()), &paths, names(&["vendor"]), &[])
                .unwrap();
        let engine = fake_engine(&["polyfill.js", "vendor.js"]);

        let all = controller.build(&engine).await.unwrap();
        assert_eq!(all, names(&["polyfill.js", "vendor.js"]));
        assert_eq!(controller.tracked_names(), names(&["vendor.js"]));
        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);

        let expected = (controller.start_time() - TimeDelta::seconds(10)).timestamp();
        for path in [
            paths.js.join("vendor.js"),
            paths.json.join("vendor-manifest.json"),
            paths.json.join("polyfill-manifest.json"),
        ] {
            let meta = std::fs::metadata(&path).unwrap();
            let mtime = FileTime::from_last_modification_time(&meta);
            assert_eq!(mtime.unix_seconds(), expected, "{}", path.display());
            assert_eq!(mtime.nanoseconds(), 0);
        }

        // Untracked artifacts keep the time the engine gave them
        let untracked = std::fs::metadata(paths.js.join("polyfill.js")).unwrap();
        assert!(FileTime::from_last_modification_time(&untracked).unix_seconds() > expected);
    }

    #[tokio::test]
    async fn build_fails_when_reported_artifact_is_absent() {
        struct LyingEngine;

        #[async_trait]
        impl BuildEngine for LyingEngine {
            async fn build(&self, _config: &BuildConfig) -> VendorLinkResult<BuildStats> {
                Ok(BuildStats {
                    assets: vec!["ghost.js".to_string()],
                })
            }

            fn name(&self) -> &str {
                "lying"
            }
        }

        let temp = TempDir::new().unwrap();
        let paths = CachePaths::new(&temp.path().join("cache"), "abc123");
        let mut controller =
            BundleController::new(build_config(temp.path()), &paths, vec![], &[]).unwrap();

        let result = controller.build(&LyingEngine).await;
        assert!(matches!(result, Err(VendorLinkError::Io { .. })));
    }

    #[tokio::test]
    async fn copy_all_preserves_times_and_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let paths = CachePaths::new(&temp.path().join("cache"), "abc123");
        let mut controller =
            BundleController::new(build_config(temp.path()), &paths, vec![], &[]).unwrap();
        controller
            .build(&fake_engine(&["vendor.js", "polyfill.js"]))
            .await
            .unwrap();

        controller.copy_all().await.unwrap();
        controller.copy_all().await.unwrap();

        let public = temp.path().join("public").join("vendor.js");
        let cached = paths.js.join("vendor.js");
        assert_eq!(std::fs::read(&public).unwrap(), b"vendor.js");
        let public_mtime =
            FileTime::from_last_modification_time(&std::fs::metadata(&public).unwrap());
        let cached_mtime =
            FileTime::from_last_modification_time(&std::fs::metadata(&cached).unwrap());
        assert_eq!(public_mtime, cached_mtime);

        assert!(temp
            .path()
            .join("manifests")
            .join("polyfill-manifest.json")
            .is_file());
    }

    #[tokio::test]
    async fn missing_artifacts_reports_cache_gaps() {
        let temp = TempDir::new().unwrap();
        let paths = CachePaths::new(&temp.path().join("cache"), "abc123");
        let controller = BundleController::new(
            build_config(temp.path()),
            &paths,
            vec![],
            &names(&["vendor.js"]),
        )
        .unwrap();

        let cached = names(&["vendor.js"]);
        assert_eq!(controller.tracked_names(), cached);
        assert_eq!(controller.missing_artifacts(&cached).len(), 3);

        std::fs::create_dir_all(&paths.js).unwrap();
        std::fs::write(paths.js.join("vendor.js"), "x").unwrap();
        assert_eq!(controller.missing_artifacts(&cached).len(), 2);
        assert_eq!(controller.read_artifact("vendor.js").await.unwrap(), b"x");
    }

    #[test]
    fn missing_artifacts_covers_untracked_names() {
        let temp = TempDir::new().unwrap();
        let paths = CachePaths::new(&temp.path().join("cache"), "abc123");
        let cached = names(&["vendor.js", "lib2.js"]);
        let controller = BundleController::new(
            build_config(temp.path()),
            &paths,
            vec!["vendor".into()],
            &cached,
        )
        .unwrap();
        assert_eq!(controller.tracked_names(), names(&["vendor.js"]));

        std::fs::create_dir_all(&paths.js).unwrap();
        std::fs::write(paths.js.join("vendor.js"), "x").unwrap();
        let missing = controller.missing_artifacts(&cached);
        assert!(missing.contains(&paths.js.join("lib2.js")));
        assert!(!missing.contains(&paths.js.join("vendor.js")));
    }
}

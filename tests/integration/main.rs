//! Integration tests for vendorlink

use std::path::Path;

/// Write a project with `pkgX` installed at `version`
fn write_project(root: &Path, version: &str) {
    std::fs::write(
        root.join("package.json"),
        r#"{"name": "app", "dependencies": {"pkgX": "^1.0.0", "lib2": "^2.0.0"}}"#,
    )
    .unwrap();
    let pkg = root.join("node_modules").join("pkgX");
    std::fs::create_dir_all(&pkg).unwrap();
    std::fs::write(
        pkg.join("package.json"),
        format!(r#"{{"name": "pkgX", "version": "{}"}}"#, version),
    )
    .unwrap();
}

mod lifecycle_tests {
    use super::write_project;
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use vendorlink::bundle::{BuildEngine, BuildStats};
    use vendorlink::cache::{manifest_path, Manifest, RebuildReason};
    use vendorlink::config::{BuildConfig, Config, ConfigManager};
    use vendorlink::{CheckOutcome, DllLink, VendorLinkResult};

    /// Writes reported assets and descriptors the way webpack would
    struct RecordingEngine {
        assets: Vec<String>,
        calls: AtomicUsize,
    }

    impl RecordingEngine {
        fn new(assets: &[&str]) -> Self {
            Self {
                assets: assets.iter().map(|s| s.to_string()).collect(),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BuildEngine for RecordingEngine {
        async fn build(&self, config: &BuildConfig) -> VendorLinkResult<BuildStats> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            for asset in &self.assets {
                std::fs::write(config.output.path.join(asset), asset).unwrap();
            }
            let template = config
                .descriptor
                .as_ref()
                .unwrap()
                .path
                .display()
                .to_string();
            for chunk in config.entry.chunk_names() {
                std::fs::write(template.replace("[name]", &chunk), "{}").unwrap();
            }
            Ok(BuildStats {
                assets: self.assets.clone(),
            })
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    const CONFIG: &str = r#"
[build]
entry = ["pkgX"]

[build.output]
path = "build"

[build.descriptor]
path = "build/[name]-manifest.json"
"#;

    fn load_config(root: &Path, extra: &str) -> Config {
        let path = root.join("vendorlink.toml");
        std::fs::write(&path, format!("{}{}", CONFIG, extra)).unwrap();
        let mut config = ConfigManager::parse(&std::fs::read_to_string(&path).unwrap(), &path)
            .unwrap();
        config.resolve_paths(root);
        config
    }

    fn manifest(config: &Config) -> Manifest {
        Manifest::load_or_default(&manifest_path(&config.link.cache_dir))
    }

    #[tokio::test]
    async fn first_run_builds_and_second_run_reuses_cache() {
        let temp = TempDir::new().unwrap();
        write_project(temp.path(), "1.0.0");
        let config = load_config(temp.path(), "");
        let engine = RecordingEngine::new(&["vendor.js"]);

        let mut link = DllLink::new(&config, temp.path()).unwrap();
        let outcome = link.check(&engine).await.unwrap();
        assert!(outcome.rebuilt());

        let saved = manifest(&config);
        let record = &saved.config_files[link.fingerprint()];
        assert_eq!(record.output_js_names, vec!["vendor.js"]);
        let tree = record.entry_version.as_ref().unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree["pkgX@^1.0.0"].version, "1.0.0");
        assert!(tree["pkgX@^1.0.0"].dependencies.is_none());
        assert!(temp.path().join("build").join("vendor.js").is_file());
        assert!(temp.path().join("build").join("main-manifest.json").is_file());

        let mut again = DllLink::new(&config, temp.path()).unwrap();
        assert!(again.rebuild_reason().is_none());
        assert_eq!(again.check(&engine).await.unwrap(), CheckOutcome::Cached);
        assert_eq!(engine.calls(), 1);
    }

    #[tokio::test]
    async fn version_bump_triggers_rebuild() {
        let temp = TempDir::new().unwrap();
        write_project(temp.path(), "1.0.0");
        let config = load_config(temp.path(), "");
        let engine = RecordingEngine::new(&["vendor.js"]);

        DllLink::new(&config, temp.path())
            .unwrap()
            .check(&engine)
            .await
            .unwrap();

        write_project(temp.path(), "1.0.1");
        let mut link = DllLink::new(&config, temp.path()).unwrap();
        assert_eq!(
            link.rebuild_reason(),
            Some(RebuildReason::DependenciesChanged)
        );
        assert!(link.check(&engine).await.unwrap().rebuilt());
        assert_eq!(engine.calls(), 2);

        let saved = manifest(&config);
        let tree = saved.config_files[link.fingerprint()]
            .entry_version
            .clone()
            .unwrap();
        assert_eq!(tree["pkgX@^1.0.0"].version, "1.0.1");
    }

    #[tokio::test]
    async fn hints_select_tracked_artifacts() {
        let temp = TempDir::new().unwrap();
        write_project(temp.path(), "1.0.0");
        let config = load_config(
            temp.path(),
            "\n[link]\nmanifest_names = [\"vendor\"]\n",
        );
        let engine = RecordingEngine::new(&["vendor.js", "lib2.js"]);

        let mut link = DllLink::new(&config, temp.path()).unwrap();
        link.check(&engine).await.unwrap();

        assert_eq!(link.tracked_names(), ["vendor.js".to_string()]);
        assert_eq!(link.cached_names(), ["vendor.js".to_string(), "lib2.js".to_string()]);
        assert!(temp.path().join("build").join("vendor.js").is_file());
        assert!(!temp.path().join("build").join("lib2.js").exists());
    }

    #[tokio::test]
    async fn changed_configuration_gets_its_own_record() {
        let temp = TempDir::new().unwrap();
        write_project(temp.path(), "1.0.0");
        let engine = RecordingEngine::new(&["vendor.js"]);

        let first = load_config(temp.path(), "");
        let mut link = DllLink::new(&first, temp.path()).unwrap();
        link.check(&engine).await.unwrap();
        let first_fp = link.fingerprint().to_string();

        let mut second = first.clone();
        second.build.output.library = Some("vendor_lib".to_string());
        let mut link = DllLink::new(&second, temp.path()).unwrap();
        assert_ne!(link.fingerprint(), first_fp);
        assert!(link.check(&engine).await.unwrap().rebuilt());

        let saved = manifest(&first);
        assert_eq!(saved.config_files.len(), 2);
        assert!(saved.config_files.contains_key(&first_fp));
    }

    #[tokio::test]
    async fn corrupt_manifest_is_replaced() {
        let temp = TempDir::new().unwrap();
        write_project(temp.path(), "1.0.0");
        let config = load_config(temp.path(), "");
        let path: PathBuf = manifest_path(&config.link.cache_dir);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        let engine = RecordingEngine::new(&["vendor.js"]);
        let mut link = DllLink::new(&config, temp.path()).unwrap();
        assert!(link.check(&engine).await.unwrap().rebuilt());
        assert_eq!(manifest(&config).config_files.len(), 1);
    }
}

mod cli_tests {
    use super::write_project;
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    fn vendorlink() -> Command {
        let mut cmd = cargo_bin_cmd!("vendorlink");
        cmd.env_remove("VENDORLINK_CONFIG");
        cmd
    }

    /// Engine script: writes the bundle and descriptor, counts its runs
    const SH_ENGINE: &str = r#"
[engine]
command = "sh"
args = ["-c", '''
echo run >> engine-runs.log
echo "var vendor;" > "$VENDORLINK_OUTPUT_PATH/vendor.js"
echo "{}" > "$VENDORLINK_OUTPUT_PATH/../json/main-manifest.json"
echo '{"assets":[{"name":"vendor.js"}],"errors":[]}'
''']
"#;

    fn write_config(root: &std::path::Path, engine: &str) {
        let config = format!(
            r#"
[build]
entry = ["pkgX"]

[build.output]
path = "build"

[build.descriptor]
path = "build/[name]-manifest.json"
{}"#,
            engine
        );
        std::fs::write(root.join("vendorlink.toml"), config).unwrap();
    }

    #[test]
    fn help_displays() {
        vendorlink()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "Cache vendor bundle builds and rebuild only when dependency versions change",
            ));
    }

    #[test]
    fn version_displays() {
        vendorlink()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("vendorlink"));
    }

    #[test]
    fn missing_config_fails_with_hint() {
        let temp = TempDir::new().unwrap();
        vendorlink()
            .current_dir(temp.path())
            .arg("status")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Configuration file not found"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn invalid_entry_shape_is_config_error() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("vendorlink.toml"),
            "[build]\nentry = 42\n\n[build.output]\npath = \"build\"\n",
        )
        .unwrap();

        vendorlink()
            .current_dir(temp.path())
            .arg("status")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn missing_descriptor_is_fatal() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("vendorlink.toml"),
            "[build]\nentry = \"pkgX\"\n\n[build.output]\npath = \"build\"\n",
        )
        .unwrap();

        vendorlink()
            .current_dir(temp.path())
            .args(["check", "--json"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("descriptor"));
    }

    #[test]
    fn status_lists_current_fingerprint() {
        let temp = TempDir::new().unwrap();
        write_project(temp.path(), "1.0.0");
        write_config(temp.path(), "");

        vendorlink()
            .current_dir(temp.path())
            .args(["status", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"current\": true"))
            .stdout(predicate::str::contains("never built"));

        assert!(!temp.path().join(".vendorlink").exists());
    }

    #[test]
    fn config_flag_points_at_project() {
        let temp = TempDir::new().unwrap();
        write_project(temp.path(), "1.0.0");
        write_config(temp.path(), "");
        let elsewhere = TempDir::new().unwrap();

        vendorlink()
            .current_dir(elsewhere.path())
            .args(["status", "--format", "plain", "--config"])
            .arg(temp.path().join("vendorlink.toml"))
            .assert()
            .success()
            .stdout(predicate::str::is_match("^[0-9a-f]{10}\n$").unwrap());
    }

    #[test]
    fn clean_without_yes_keeps_cache() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "");
        std::fs::create_dir_all(temp.path().join(".vendorlink")).unwrap();

        vendorlink()
            .current_dir(temp.path())
            .arg("clean")
            .assert()
            .success();
        assert!(temp.path().join(".vendorlink").exists());

        vendorlink()
            .current_dir(temp.path())
            .args(["clean", "--yes"])
            .assert()
            .success();
        assert!(!temp.path().join(".vendorlink").exists());
    }

    #[cfg(unix)]
    #[test]
    fn check_builds_once_then_reuses_cache() {
        let temp = TempDir::new().unwrap();
        write_project(temp.path(), "1.0.0");
        write_config(temp.path(), SH_ENGINE);

        vendorlink()
            .current_dir(temp.path())
            .args(["check", "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"rebuilt\": true"))
            .stdout(predicate::str::contains("\"vendor.js\""));

        assert!(temp.path().join("build").join("vendor.js").is_file());
        assert!(temp.path().join("build").join("main-manifest.json").is_file());
        let manifest =
            std::fs::read_to_string(temp.path().join(".vendorlink").join("manifest.json")).unwrap();
        assert!(manifest.contains("\"outputJSNames\""));
        assert!(manifest.contains("\"pkgX@^1.0.0\""));

        vendorlink()
            .current_dir(temp.path())
            .args(["check", "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"rebuilt\": false"));

        let runs = std::fs::read_to_string(temp.path().join("engine-runs.log")).unwrap();
        assert_eq!(runs.lines().count(), 1);

        vendorlink()
            .current_dir(temp.path())
            .args(["check", "--json", "--force"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"reason\": \"forced\""));
    }

    #[cfg(unix)]
    #[test]
    fn failing_engine_exits_nonzero() {
        let temp = TempDir::new().unwrap();
        write_project(temp.path(), "1.0.0");
        write_config(
            temp.path(),
            "\n[engine]\ncommand = \"sh\"\nargs = [\"-c\", \"echo 'Module not found' >&2; exit 1\"]\n",
        );

        vendorlink()
            .current_dir(temp.path())
            .arg("check")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Build engine sh failed"))
            .stderr(predicate::str::contains("Module not found"));
        assert!(!temp.path().join(".vendorlink").join("manifest.json").exists());
    }
}

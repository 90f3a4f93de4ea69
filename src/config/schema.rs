//! Configuration schema for vendorlink
//!
//! Configuration is stored in `vendorlink.toml` at the project root.
//! Only the `[build]` table is part of the configuration fingerprint;
//! `[link]` and `[engine]` tune how the cache layer behaves.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Vendor bundle build configuration
    pub build: BuildConfig,

    /// Cache layer behaviour
    #[serde(default)]
    pub link: LinkOptions,

    /// External build engine invocation
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Config {
    /// Resolve every relative path against `base` (the config file's directory)
    pub fn resolve_paths(&mut self, base: &Path) {
        let absolute = |p: &Path| {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                base.join(p)
            }
        };

        self.build.output.path = absolute(&self.build.output.path);
        if let Some(descriptor) = self.build.descriptor.as_mut() {
            descriptor.path = absolute(&descriptor.path);
            descriptor.context = descriptor.context.as_deref().map(absolute);
        }
        self.link.cache_dir = absolute(&self.link.cache_dir);
    }
}

/// The build configuration handed to the build engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Modules to bundle
    pub entry: EntrySpec,

    /// Where and how code artifacts are written
    pub output: OutputConfig,

    /// Descriptor emission directive (the DLL manifest the consuming build links against)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<DescriptorConfig>,
}

/// Output section of the build configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory code artifacts are written to
    pub path: PathBuf,

    /// Output filename template (`[name]` is the chunk name)
    #[serde(default = "default_filename")]
    pub filename: String,

    /// Global library name exposed by the bundle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library: Option<String>,

    /// URL prefix used when artifacts are referenced from HTML
    #[serde(default)]
    pub public_path: String,
}

fn default_filename() -> String {
    "[name].js".to_string()
}

/// Descriptor emission directive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorConfig {
    /// Full path template of the emitted descriptor (`[name]` is the chunk name)
    pub path: PathBuf,

    /// Library name recorded in the descriptor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Context directory module ids are relative to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<PathBuf>,
}

/// Modules referenced by the build: one, a list, or named groups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntrySpec {
    /// A single module reference
    Single(String),
    /// An ordered list of module references
    List(Vec<String>),
    /// Named groups, each producing its own chunk
    Groups(EntryGroups),
}

/// Named entry groups, in the order they were written
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryGroups(Vec<(String, EntryGroup)>);

impl EntryGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a group; an existing name keeps its position and takes the new value
    pub fn insert(&mut self, name: impl Into<String>, group: EntryGroup) {
        let name = name.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = group,
            None => self.0.push((name, group)),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.0.iter().map(|(name, _)| name)
    }

    pub fn groups(&self) -> impl Iterator<Item = &EntryGroup> {
        self.0.iter().map(|(_, group)| group)
    }
}

impl Serialize for EntryGroups {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, group) in &self.0 {
            map.serialize_entry(name, group)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for EntryGroups {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct GroupsVisitor;

        impl<'de> Visitor<'de> for GroupsVisitor {
            type Value = EntryGroups;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a table of entry groups")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut groups = EntryGroups::new();
                while let Some((name, group)) = access.next_entry::<String, EntryGroup>()? {
                    groups.insert(name, group);
                }
                Ok(groups)
            }
        }

        deserializer.deserialize_map(GroupsVisitor)
    }
}

/// Value of a named entry group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryGroup {
    One(String),
    Many(Vec<String>),
}

impl EntryGroup {
    fn as_slice(&self) -> &[String] {
        match self {
            Self::One(module) => std::slice::from_ref(module),
            Self::Many(modules) => modules,
        }
    }
}

/// Chunk name used for single and list entries
pub const DEFAULT_CHUNK: &str = "main";

impl EntrySpec {
    /// Flatten into distinct module references, keeping first-seen order
    pub fn modules(&self) -> Vec<String> {
        let all: Vec<&String> = match self {
            Self::Single(module) => vec![module],
            Self::List(modules) => modules.iter().collect(),
            Self::Groups(groups) => groups.groups().flat_map(|g| g.as_slice()).collect(),
        };

        let mut modules: Vec<String> = Vec::with_capacity(all.len());
        for module in all {
            if !modules.contains(module) {
                modules.push(module.clone());
            }
        }
        modules
    }

    /// Names of the chunks the engine emits for this entry
    pub fn chunk_names(&self) -> Vec<String> {
        match self {
            Self::Groups(groups) => groups.names().cloned().collect(),
            _ => vec![DEFAULT_CHUNK.to_string()],
        }
    }
}

/// What to do with cached artifacts after a check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkMode {
    /// Copy artifacts to their public locations
    #[default]
    Copy,
    /// Leave artifacts in the cache; expose them as HTML asset URLs
    Html,
    /// Leave artifacts in the cache; inject them into the host output
    Assets,
}

/// Where installed package versions are read from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageSourceKind {
    /// `package.json` files under `node_modules`
    #[default]
    Installed,
    /// `yarn.lock` at the project root
    Yarn,
}

/// Cache layer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkOptions {
    /// Substrings selecting which emitted artifacts are tracked
    pub manifest_names: Vec<String>,

    /// Post-check handling of artifacts
    pub mode: LinkMode,

    /// Stamp a content version onto initial chunk filenames
    pub append_version: bool,

    /// Private cache directory
    pub cache_dir: PathBuf,

    /// Package metadata source for dependency resolution
    pub packages: PackageSourceKind,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            manifest_names: vec![],
            mode: LinkMode::Copy,
            append_version: false,
            cache_dir: PathBuf::from(".vendorlink"),
            packages: PackageSourceKind::Installed,
        }
    }
}

/// External build engine settings
///
/// The engine gets vendorlink's own build configuration as JSON, not a
/// webpack configuration. The default runs webpack with
/// `webpack.vendor.js`, a project-side config that reads the JSON from
/// `VENDORLINK_BUILD_CONFIG` and maps `descriptor` onto `DllPlugin`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Program to run
    pub command: String,

    /// Arguments; `{config}` and `{output}` are substituted
    pub args: Vec<String>,
}

/// Project-side webpack config the default engine runs
pub const DEFAULT_ENGINE_CONFIG: &str = "webpack.vendor.js";

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: "webpack".to_string(),
            args: vec![
                "--config".to_string(),
                DEFAULT_ENGINE_CONFIG.to_string(),
                "--json".to_string(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GROUPS_CONFIG: &str = r#"
[build]
entry = { vendor = ["react", "react-dom"], polyfill = "core-js" }

[build.output]
path = "build"
filename = "[name].bundle.js"
public_path = "/static/"

[build.descriptor]
path = "build/[name]-manifest.json"
name = "vendor_lib"

[link]
manifest_names = ["vendor"]
mode = "html"
"#;

    #[test]
    fn parse_groups_entry() {
        let config: Config = toml::from_str(GROUPS_CONFIG).unwrap();

        assert_eq!(config.build.entry.chunk_names(), vec!["vendor", "polyfill"]);
        assert_eq!(
            config.build.entry.modules(),
            vec!["react", "react-dom", "core-js"]
        );
        assert_eq!(config.link.mode, LinkMode::Html);
        assert_eq!(config.link.manifest_names, vec!["vendor"]);
        assert_eq!(config.engine.command, "webpack");
        assert_eq!(
            config.engine.args,
            vec!["--config", DEFAULT_ENGINE_CONFIG, "--json"]
        );
    }

    #[test]
    fn parse_single_and_list_entries() {
        let single: EntrySpec = serde_json::from_str(r#""lodash""#).unwrap();
        assert_eq!(single.modules(), vec!["lodash"]);
        assert_eq!(single.chunk_names(), vec![DEFAULT_CHUNK]);

        let list: EntrySpec = serde_json::from_str(r#"["a", "b", "a"]"#).unwrap();
        assert_eq!(list.modules(), vec!["a", "b"]);
    }

    #[test]
    fn groups_keep_written_order() {
        let groups: EntrySpec =
            serde_json::from_str(r#"{"zeta": "z", "alpha": ["a", "z"], "mid": "m"}"#).unwrap();
        assert_eq!(groups.chunk_names(), vec!["zeta", "alpha", "mid"]);
        assert_eq!(groups.modules(), vec!["z", "a", "m"]);

        let json = serde_json::to_string(&groups).unwrap();
        assert_eq!(json, r#"{"zeta":"z","alpha":["a","z"],"mid":"m"}"#);

        let table = "[build]\nentry = { zeta = \"z\", alpha = \"a\" }\n\n[build.output]\npath = \"b\"\n";
        let config: Config = toml::from_str(table).unwrap();
        assert_eq!(config.build.entry.chunk_names(), vec!["zeta", "alpha"]);
    }

    #[test]
    fn unrecognized_entry_shape_fails() {
        let result: Result<EntrySpec, _> = serde_json::from_str("42");
        assert!(result.is_err());

        let result: Result<EntrySpec, _> = serde_json::from_str(r#"{"vendor": 1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn defaults_when_optional_tables_missing() {
        let minimal = r#"
[build]
entry = "lodash"

[build.output]
path = "dist"
"#;
        let config: Config = toml::from_str(minimal).unwrap();
        assert!(config.build.descriptor.is_none());
        assert_eq!(config.build.output.filename, "[name].js");
        assert_eq!(config.link.mode, LinkMode::Copy);
        assert_eq!(config.link.packages, PackageSourceKind::Installed);
        assert_eq!(config.link.cache_dir, PathBuf::from(".vendorlink"));
    }

    #[test]
    fn resolve_paths_against_base() {
        let mut config: Config = toml::from_str(GROUPS_CONFIG).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(config.build.output.path, PathBuf::from("/project/build"));
        assert_eq!(
            config.build.descriptor.as_ref().unwrap().path,
            PathBuf::from("/project/build/[name]-manifest.json")
        );
        assert_eq!(config.link.cache_dir, PathBuf::from("/project/.vendorlink"));
    }
}

//! Dependency resolution for vendor entries
//!
//! Turns an entry specification into the transitive version tree of the
//! packages it references. The tree is the input to cache invalidation:
//! same tree, same bundle.
//!
//! Package metadata comes from a [`PackageSource`]:
//!
//! | Source | Reads |
//! |--------|-------|
//! | [`InstalledPackages`] | `package.json` files under `node_modules` |
//! | [`YarnLockfile`] | `yarn.lock` at the project root |

mod installed;
mod resolve;
mod yarn;

pub use installed::InstalledPackages;
pub use resolve::{package_key, resolve, resolve_entry, DependencyNode, DependencyTree};
pub use yarn::YarnLockfile;

use crate::config::PackageSourceKind;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A package as found in a metadata source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPackage {
    /// Installed or locked version
    pub version: String,
    /// Declared dependency ranges, `None` when the package declares none
    pub dependencies: Option<BTreeMap<String, String>>,
    /// Install directory, when the source knows it
    pub location: Option<PathBuf>,
}

/// Read-only view over installed package metadata
pub trait PackageSource {
    /// Declared ranges of the project's direct dependencies
    fn root_dependencies(&self) -> &BTreeMap<String, String>;

    /// Find the package satisfying `name@range` as seen from `parent`
    fn lookup(
        &self,
        name: &str,
        range: &str,
        parent: Option<&ResolvedPackage>,
    ) -> Option<ResolvedPackage>;
}

/// Open the configured source, `None` when its metadata cannot be read
pub fn open_source(kind: PackageSourceKind, project_dir: &Path) -> Option<Box<dyn PackageSource>> {
    match kind {
        PackageSourceKind::Installed => {
            InstalledPackages::open(project_dir).map(|s| Box::new(s) as Box<dyn PackageSource>)
        }
        PackageSourceKind::Yarn => {
            YarnLockfile::open(project_dir).map(|s| Box::new(s) as Box<dyn PackageSource>)
        }
    }
}

/// Reduce a module reference to the package that provides it
///
/// `lodash/fp` is provided by `lodash`, `@scope/pkg/sub` by `@scope/pkg`.
/// File paths are not packages.
pub fn package_name(reference: &str) -> Option<&str> {
    if reference.is_empty()
        || reference.starts_with('.')
        || reference.starts_with('/')
        || reference.contains('\\')
        || Path::new(reference).is_absolute()
    {
        return None;
    }

    let end = if reference.starts_with('@') {
        let scope_end = reference.find('/')?;
        reference[scope_end + 1..]
            .find('/')
            .map(|i| scope_end + 1 + i)
            .unwrap_or(reference.len())
    } else {
        reference.find('/').unwrap_or(reference.len())
    };

    let name = &reference[..end];
    if name.ends_with('/') {
        None
    } else {
        Some(name)
    }
}

/// The subset of `package.json` vendorlink reads
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PackageDescriptor {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub dependencies: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub dev_dependencies: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub optional_dependencies: Option<BTreeMap<String, String>>,
}

impl PackageDescriptor {
    /// Parse a `package.json`, `None` if missing or malformed
    pub fn read(path: &Path) -> Option<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                debug!("Cannot read {}: {}", path.display(), e);
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(descriptor) => Some(descriptor),
            Err(e) => {
                debug!("Cannot parse {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Direct dependency ranges of a project: runtime, then dev, then optional
    pub fn declared_ranges(&self) -> BTreeMap<String, String> {
        let mut ranges = BTreeMap::new();
        for deps in [
            &self.optional_dependencies,
            &self.dev_dependencies,
            &self.dependencies,
        ]
        .into_iter()
        .flatten()
        {
            // Later tables win, so runtime dependencies take precedence
            ranges.extend(deps.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        ranges
    }
}

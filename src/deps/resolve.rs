//! Transitive dependency version tree

use super::{open_source, package_name, PackageSource, ResolvedPackage};
use crate::config::{EntrySpec, PackageSourceKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Version tree keyed by `name@range`
pub type DependencyTree = BTreeMap<String, DependencyNode>;

/// One package in the version tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyNode {
    /// Resolved version
    pub version: String,

    /// Subtree of declared dependencies, absent when the package declares none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<DependencyTree>,
}

impl DependencyNode {
    /// Leaf node with no declared dependencies
    pub fn leaf(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            dependencies: None,
        }
    }
}

/// Key identifying a declared dependency
pub fn package_key(name: &str, range: &str) -> String {
    format!("{}@{}", name, range)
}

/// Resolve an entry using the configured package source
///
/// Returns `None` when the source cannot be opened: the tree is unknown,
/// which is not the same as empty.
pub fn resolve_entry(
    entry: &EntrySpec,
    kind: PackageSourceKind,
    project_dir: &Path,
) -> Option<DependencyTree> {
    match open_source(kind, project_dir) {
        Some(source) => Some(resolve(entry, source.as_ref())),
        None => {
            warn!(
                "Package metadata unavailable in {}, dependency tree unknown",
                project_dir.display()
            );
            None
        }
    }
}

/// Resolve the version tree of every package an entry references
///
/// References without a declared range in the project are dropped.
pub fn resolve(entry: &EntrySpec, source: &dyn PackageSource) -> DependencyTree {
    let roots = source.root_dependencies();

    let mut top_level: Vec<(String, String)> = Vec::new();
    for module in entry.modules() {
        let Some(name) = package_name(&module) else {
            debug!("Entry {} is not a package reference", module);
            continue;
        };
        match roots.get(name) {
            Some(range) => {
                if !top_level.iter().any(|(n, _)| n == name) {
                    top_level.push((name.to_string(), range.clone()));
                }
            }
            None => debug!("No declared version for {}, skipping", name),
        }
    }

    let mut chain = Vec::new();
    walk(source, &top_level, None, &mut chain)
}

/// Build the subtree for `packages`; `chain` holds the keys on the current path
fn walk(
    source: &dyn PackageSource,
    packages: &[(String, String)],
    parent: Option<&ResolvedPackage>,
    chain: &mut Vec<String>,
) -> DependencyTree {
    let mut tree = DependencyTree::new();

    for (name, range) in packages {
        let key = package_key(name, range);
        if chain.contains(&key) {
            debug!("Skipping circular dependency {}", key);
            continue;
        }

        let Some(package) = source.lookup(name, range, parent) else {
            debug!("Package {} not found", key);
            continue;
        };

        let dependencies = package.dependencies.as_ref().map(|declared| {
            let children: Vec<(String, String)> = declared
                .iter()
                .map(|(n, r)| (n.clone(), r.clone()))
                .collect();
            chain.push(key.clone());
            let subtree = walk(source, &children, Some(&package), chain);
            chain.pop();
            subtree
        });

        tree.insert(
            key,
            DependencyNode {
                version: package.version.clone(),
                dependencies,
            },
        );
    }

    tree
}

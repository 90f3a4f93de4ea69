//! Package metadata from installed `node_modules` descriptors

use super::{PackageDescriptor, PackageSource, ResolvedPackage};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Installed packages below a project root
///
/// Lookups follow Node's rule: the nearest `node_modules` walking up from
/// the dependent package, ending at the project root.
#[derive(Debug)]
pub struct InstalledPackages {
    root: PathBuf,
    roots: BTreeMap<String, String>,
}

impl InstalledPackages {
    /// Open a project, `None` when its `package.json` is missing or malformed
    pub fn open(project_dir: &Path) -> Option<Self> {
        let descriptor = PackageDescriptor::read(&project_dir.join("package.json"))?;
        Some(Self {
            root: project_dir.to_path_buf(),
            roots: descriptor.declared_ranges(),
        })
    }

    fn read_installed(&self, dir: &Path) -> Option<ResolvedPackage> {
        let descriptor = PackageDescriptor::read(&dir.join("package.json"))?;
        let Some(version) = descriptor.version else {
            debug!("{} has no version", dir.display());
            return None;
        };
        Some(ResolvedPackage {
            version,
            dependencies: descriptor.dependencies,
            location: Some(dir.to_path_buf()),
        })
    }
}

impl PackageSource for InstalledPackages {
    fn root_dependencies(&self) -> &BTreeMap<String, String> {
        &self.roots
    }

    fn lookup(
        &self,
        name: &str,
        _range: &str,
        parent: Option<&ResolvedPackage>,
    ) -> Option<ResolvedPackage> {
        let start = parent
            .and_then(|p| p.location.as_deref())
            .filter(|location| location.starts_with(&self.root))
            .unwrap_or(&self.root);

        for dir in start.ancestors() {
            let candidate = dir.join("node_modules").join(name);
            if candidate.join("package.json").is_file() {
                return self.read_installed(&candidate);
            }
            if dir == self.root {
                break;
            }
        }
        None
    }
}

//! Package metadata from `yarn.lock`
//!
//! Understands the classic v1 syntax (`version "1.2.3"`) and the
//! `key: value` syntax of newer lockfiles, where ranges carry an `npm:`
//! protocol prefix.

use super::{package_key, PackageDescriptor, PackageSource, ResolvedPackage};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

const LOCKFILE: &str = "yarn.lock";

/// A parsed `yarn.lock` plus the project's declared ranges
#[derive(Debug, Default)]
pub struct YarnLockfile {
    roots: BTreeMap<String, String>,
    entries: Vec<LockEntry>,
    /// `name@range` -> index into `entries`
    keys: BTreeMap<String, usize>,
}

#[derive(Debug, Default)]
struct LockEntry {
    version: Option<String>,
    dependencies: Option<BTreeMap<String, String>>,
}

/// Which block of an entry the parser is in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Fields,
    Dependencies,
    Other,
}

impl YarnLockfile {
    /// Open a project, `None` when `package.json` or `yarn.lock` is unreadable
    pub fn open(project_dir: &Path) -> Option<Self> {
        let descriptor = PackageDescriptor::read(&project_dir.join("package.json"))?;
        let path = project_dir.join(LOCKFILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                debug!("Cannot read {}: {}", path.display(), e);
                return None;
            }
        };

        let mut lockfile = Self::parse(&content);
        lockfile.roots = descriptor.declared_ranges();
        debug!(
            "Parsed {} with {} entries",
            path.display(),
            lockfile.entries.len()
        );
        Some(lockfile)
    }

    /// Parse lockfile text (root ranges left empty)
    pub fn parse(content: &str) -> Self {
        let mut lockfile = Self::default();
        let mut current: Option<(Vec<String>, LockEntry)> = None;
        let mut section = Section::Other;

        for raw in content.lines() {
            let line = raw.trim_end();
            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let indent = line.len() - trimmed.len();
            if indent == 0 {
                if let Some((keys, entry)) = current.take() {
                    lockfile.insert(keys, entry);
                }
                let header = trimmed.trim_end_matches(':');
                let keys: Vec<String> = header
                    .split(',')
                    .map(|key| key.trim().trim_matches('"').to_string())
                    .filter(|key| !key.is_empty() && key != "__metadata")
                    .collect();
                if !keys.is_empty() {
                    current = Some((keys, LockEntry::default()));
                }
                section = Section::Fields;
                continue;
            }

            let Some((_, entry)) = current.as_mut() else {
                continue;
            };

            if indent <= 2 {
                let Some((key, value)) = split_entry(trimmed) else {
                    continue;
                };
                section = match (key.as_str(), value.is_empty()) {
                    ("dependencies", true) => {
                        entry.dependencies.get_or_insert_with(BTreeMap::new);
                        Section::Dependencies
                    }
                    ("version", false) => {
                        entry.version = Some(value);
                        Section::Fields
                    }
                    (_, true) => Section::Other,
                    _ => Section::Fields,
                };
            } else if section == Section::Dependencies {
                if let Some((name, range)) = split_entry(trimmed) {
                    entry
                        .dependencies
                        .get_or_insert_with(BTreeMap::new)
                        .insert(name, range);
                }
            }
        }

        if let Some((keys, entry)) = current.take() {
            lockfile.insert(keys, entry);
        }
        lockfile
    }

    fn insert(&mut self, keys: Vec<String>, entry: LockEntry) {
        if entry.version.is_none() {
            return;
        }
        let index = self.entries.len();
        self.entries.push(entry);
        for key in keys {
            self.keys.insert(key, index);
        }
    }
}

impl PackageSource for YarnLockfile {
    fn root_dependencies(&self) -> &BTreeMap<String, String> {
        &self.roots
    }

    fn lookup(
        &self,
        name: &str,
        range: &str,
        _parent: Option<&ResolvedPackage>,
    ) -> Option<ResolvedPackage> {
        let index = self
            .keys
            .get(&package_key(name, range))
            .or_else(|| self.keys.get(&package_key(name, &format!("npm:{}", range))))?;
        let entry = &self.entries[*index];

        Some(ResolvedPackage {
            version: entry.version.clone()?,
            dependencies: entry.dependencies.clone(),
            location: None,
        })
    }
}

/// Split `key value`, `key: value` or `"key" "value"` into its parts
fn split_entry(s: &str) -> Option<(String, String)> {
    let (key, rest) = if let Some(quoted) = s.strip_prefix('"') {
        let end = quoted.find('"')?;
        (&quoted[..end], &quoted[end + 1..])
    } else {
        let end = s
            .find(|c: char| c == ':' || c.is_whitespace())
            .unwrap_or(s.len());
        (&s[..end], &s[end..])
    };

    let value = rest.trim_start().strip_prefix(':').unwrap_or(rest).trim();
    Some((key.to_string(), unquote(value).to_string()))
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(s)
}

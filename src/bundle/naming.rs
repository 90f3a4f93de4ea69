//! Versioned artifact names
//!
//! A version tag is a short digest of the tracked artifact names. Stamping
//! it onto initial chunk filenames lets consumers cache-bust by name alone.

use crate::cache::fingerprint::short_digest;
use std::collections::BTreeSet;

/// Extension of code artifacts
const CODE_EXT: &str = "js";

/// Content version of an ordered artifact name list
///
/// Each name is followed by a NUL so that `["ab", "c"]` and `["a", "bc"]`
/// differ.
pub fn version_tag(names: &[String]) -> String {
    let mut bytes = Vec::new();
    for name in names {
        bytes.extend_from_slice(name.as_bytes());
        bytes.push(0);
    }
    short_digest(&bytes)
}

/// Stamp `tag` onto a code artifact filename
///
/// `vendor.js` becomes `vendor.<tag>.js` and a qualifier in front of the
/// extension is replaced: `app.bundle.js` becomes `app.<tag>.js`. Names
/// that are not code artifacts (`.js.map`, `.css`) come back unchanged.
pub fn apply_version(filename: &str, tag: &str) -> String {
    let Some(stem) = filename
        .strip_suffix(CODE_EXT)
        .and_then(|rest| rest.strip_suffix('.'))
    else {
        return filename.to_string();
    };

    // Only the final path component carries qualifiers
    let base_start = stem.rfind('/').map_or(0, |i| i + 1);
    let base = match stem[base_start..].rfind('.') {
        Some(dot) if dot > 0 => &stem[..base_start + dot],
        _ => stem,
    };
    if base.is_empty() || base.ends_with('/') {
        return filename.to_string();
    }
    format!("{}.{}.{}", base, tag, CODE_EXT)
}

/// One chunk of a host build's output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub name: String,
    /// Loaded at page start (entry chunks), as opposed to on demand
    pub initial: bool,
    pub files: Vec<String>,
}

/// One emitted file of a host build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub name: String,
    pub source: Vec<u8>,
}

/// The output a host build is about to write
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Emission {
    pub chunks: Vec<Chunk>,
    /// Emitted files in emission order, names unique
    pub assets: Vec<Asset>,
}

impl Emission {
    /// Add an asset, replacing any existing one of the same name
    pub fn insert_asset(&mut self, name: impl Into<String>, source: Vec<u8>) {
        let name = name.into();
        match self.assets.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.source = source,
            None => self.assets.push(Asset { name, source }),
        }
    }

    pub fn asset(&self, name: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.name == name)
    }

    /// Version the files of initial chunks and the matching asset names
    ///
    /// Both are renamed with the same transform so chunk file lists and
    /// asset names keep agreeing.
    pub fn apply_version(&mut self, tag: &str) {
        let mut renamed: BTreeSet<String> = BTreeSet::new();

        for chunk in self.chunks.iter_mut().filter(|c| c.initial) {
            for file in chunk.files.iter_mut() {
                renamed.insert(file.clone());
                *file = apply_version(file, tag);
            }
        }

        for asset in self.assets.iter_mut() {
            if renamed.contains(&asset.name) {
                asset.name = apply_version(&asset.name, tag);
            }
        }
    }
}

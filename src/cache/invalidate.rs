//! Rebuild decision
//!
//! Compares the stored dependency tree against a freshly resolved one.
//!
//! The comparison only walks keys of the *stored* tree: a package key that
//! appears only in the fresh tree does not by itself count as a change.
//! Existing manifests depend on this, so it is kept as is, but it may hide
//! a newly added top-level dependency until some tracked version moves.

use super::manifest::CacheRecord;
use crate::deps::DependencyTree;
use std::fmt;

/// Why a rebuild is needed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildReason {
    /// Package metadata could not be read
    UnknownDependencies,
    /// No build has succeeded for this configuration
    NeverBuilt,
    /// A tracked package resolved to a different version
    DependenciesChanged,
    /// Cached artifacts are gone from the cache directory
    ArtifactsMissing,
    /// Requested explicitly
    Forced,
}

impl fmt::Display for RebuildReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::UnknownDependencies => "dependency versions unknown",
            Self::NeverBuilt => "never built",
            Self::DependenciesChanged => "dependency versions changed",
            Self::ArtifactsMissing => "cached artifacts missing",
            Self::Forced => "forced",
        };
        write!(f, "{}", reason)
    }
}

/// Structural equality over the keys of `stored`
pub fn trees_equal(stored: Option<&DependencyTree>, fresh: Option<&DependencyTree>) -> bool {
    match (stored, fresh) {
        (None, None) => true,
        (Some(stored), Some(fresh)) => stored.iter().all(|(key, node)| match fresh.get(key) {
            Some(other) => {
                node.version == other.version
                    && trees_equal(node.dependencies.as_ref(), other.dependencies.as_ref())
            }
            None => false,
        }),
        _ => false,
    }
}

/// Reason to rebuild, or `None` when the cached record is still valid
pub fn rebuild_reason(record: &CacheRecord, fresh: Option<&DependencyTree>) -> Option<RebuildReason> {
    if fresh.is_none() {
        Some(RebuildReason::UnknownDependencies)
    } else if !record.has_artifacts() {
        Some(RebuildReason::NeverBuilt)
    } else if !trees_equal(record.entry_version.as_ref(), fresh) {
        Some(RebuildReason::DependenciesChanged)
    } else {
        None
    }
}

/// Whether the record must be rebuilt
pub fn decide(record: &CacheRecord, fresh: Option<&DependencyTree>) -> bool {
    rebuild_reason(record, fresh).is_some()
}

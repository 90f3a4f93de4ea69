//! Build engine abstraction
//!
//! The engine is the one external collaborator of the cache: it turns a
//! build configuration into code artifacts and descriptors on disk.

use crate::config::BuildConfig;
use crate::error::VendorLinkResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What the engine reported after a successful build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    /// Emitted artifact names, in emission order
    pub assets: Vec<String>,
}

/// Abstract build engine interface
///
/// Implementations write code artifacts to `config.output.path` and one
/// descriptor per chunk to the `config.descriptor` path. Failures are
/// returned as is; callers do not retry.
#[async_trait]
pub trait BuildEngine: Send + Sync {
    /// Run one build of `config`
    async fn build(&self, config: &BuildConfig) -> VendorLinkResult<BuildStats>;

    /// Human-readable engine name for display
    fn name(&self) -> &str;
}

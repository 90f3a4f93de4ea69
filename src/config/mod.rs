//! Configuration management for vendorlink

pub mod schema;

pub use schema::{
    BuildConfig, Config, DescriptorConfig, EngineConfig, EntryGroup, EntryGroups, EntrySpec,
    LinkMode, LinkOptions, OutputConfig, PackageSourceKind, DEFAULT_ENGINE_CONFIG,
};

use crate::error::{VendorLinkError, VendorLinkResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Name of the project configuration file
pub const CONFIG_FILE: &str = "vendorlink.toml";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a config manager for an explicit path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Create a config manager by searching `start` and its ancestors
    ///
    /// Falls back to `start/vendorlink.toml` so the not-found error names
    /// the expected location.
    pub fn discover(start: &Path) -> Self {
        let config_path =
            Self::find_config(start).unwrap_or_else(|| start.join(CONFIG_FILE));
        Self { config_path }
    }

    /// Walk up from `start` looking for `vendorlink.toml`
    pub fn find_config(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    /// Load configuration and resolve relative paths against its directory
    pub async fn load(&self) -> VendorLinkResult<Config> {
        if !self.config_path.exists() {
            return Err(VendorLinkError::ConfigNotFound(self.config_path.clone()));
        }

        let content = fs::read_to_string(&self.config_path).await.map_err(|e| {
            VendorLinkError::io(
                format!("reading config from {}", self.config_path.display()),
                e,
            )
        })?;

        let mut config = Self::parse(&content, &self.config_path)?;
        config.resolve_paths(&self.project_dir());
        debug!("Loaded configuration from {}", self.config_path.display());
        Ok(config)
    }

    /// Parse configuration text; `path` is only used for error reporting
    pub fn parse(content: &str, path: &Path) -> VendorLinkResult<Config> {
        toml::from_str(content).map_err(|e| VendorLinkError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Directory relative paths are resolved against
    pub fn project_dir(&self) -> PathBuf {
        match self.config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

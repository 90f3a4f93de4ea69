//! Error types for vendorlink
//!
//! All modules use `VendorLinkResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for vendorlink operations
pub type VendorLinkResult<T> = Result<T, VendorLinkError>;

/// All errors that can occur in vendorlink
#[derive(Error, Debug)]
pub enum VendorLinkError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Build configuration has no descriptor directive ([build.descriptor])")]
    MissingDescriptor,

    #[error("Invalid descriptor path {path}: {reason}")]
    DescriptorPathInvalid { path: PathBuf, reason: String },

    // Build engine errors
    #[error("Build engine {engine} failed:\n{output}")]
    EngineFailed { engine: String, output: String },

    #[error("Could not read build engine output: {reason}")]
    EngineOutput { reason: String },

    #[error("Check already in progress")]
    CheckInProgress,

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl VendorLinkError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Configuration errors abort the host build before anything runs
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigInvalid { .. }
                | Self::ConfigNotFound(_)
                | Self::MissingDescriptor
                | Self::DescriptorPathInvalid { .. }
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ConfigNotFound(_) => {
                Some("Create vendorlink.toml or pass --config <path>")
            }
            Self::MissingDescriptor => Some(
                "Add a [build.descriptor] table with a `path` such as \"build/[name]-manifest.json\"",
            ),
            Self::EngineFailed { .. } | Self::CommandFailed { .. } => Some(
                "The engine reads vendorlink's build config from $VENDORLINK_BUILD_CONFIG; \
                 with webpack, point --config at a webpack.vendor.js that maps it onto DllPlugin",
            ),
            Self::EngineOutput { .. } => {
                Some("The engine must print its stats as JSON on stdout (e.g. webpack --json)")
            }
            _ => None,
        }
    }
}

//! Vendor bundle builds
//!
//! - `engine`: the build engine seam
//! - `command`: an engine running an external program
//! - `controller`: cache redirection, timestamps and placement
//! - `naming`: version tags and versioned filenames

mod command;
mod controller;
mod engine;
pub mod naming;

pub use command::{CommandEngine, OutputCallback, BUILD_CONFIG_FILE, ENV_BUILD_CONFIG, ENV_OUTPUT_PATH};
pub use controller::{select_tracked_names, BundleController, ReferenceManifest};
pub use engine::{BuildEngine, BuildStats};
pub use naming::{apply_version, version_tag, Asset, Chunk, Emission};

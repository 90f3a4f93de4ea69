//! vendorlink - cached vendor bundle builds
//!
//! Caches the output of a vendor (DLL) bundle build and only re-runs the
//! build engine when the resolved versions of the bundle's transitive
//! dependencies change.

pub mod bundle;
pub mod cache;
pub mod cli;
pub mod config;
pub mod deps;
pub mod error;
pub mod link;
pub mod ui;

pub use error::{VendorLinkError, VendorLinkResult};
pub use link::{CheckOutcome, DllLink, LinkState};

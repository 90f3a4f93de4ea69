//! CLI command implementations

pub mod check;
pub mod clean;
pub mod status;

pub use check::execute as check;
pub use clean::execute as clean;
pub use status::execute as status;

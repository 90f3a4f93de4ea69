//! UI module for consistent CLI output
//!
//! Uses `cliclack` for interactive output with automatic fallback to plain
//! output in CI/non-interactive environments. Commands that print JSON mark
//! the context as machine output, which silences everything here.
//!
//! # Example
//!
//! ```rust,ignore
//! use vendorlink::ui::{self, UiContext, TaskSpinner};
//!
//! let ctx = UiContext::detect().with_auto_yes(args.yes);
//!
//! ui::intro(&ctx, "vendorlink clean");
//! if ui::confirm(&ctx, "Remove .vendorlink?", false).await? {
//!     let mut spinner = TaskSpinner::new(&ctx);
//!     spinner.start("Removing cache...");
//!     // ... do work ...
//!     spinner.stop("Cache removed");
//! }
//! ```

mod context;
mod output;
mod progress;
mod prompts;
mod theme;

pub use context::UiContext;
pub use output::{
    intro, key_value, outro_success, remark, step_info, step_ok, step_ok_detail, step_warn,
};
pub use progress::{BuildProgress, TaskSpinner};
pub use prompts::confirm;
pub use theme::{init_theme, VendorLinkTheme};

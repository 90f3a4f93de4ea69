//! Clean command - remove the private cache directory

use crate::cli::args::CleanArgs;
use crate::config::Config;
use crate::error::{VendorLinkError, VendorLinkResult};
use crate::ui::{self, TaskSpinner, UiContext};
use tokio::fs;

/// Execute the clean command
pub async fn execute(args: CleanArgs, config: &Config) -> VendorLinkResult<()> {
    let ctx = UiContext::detect().with_auto_yes(args.yes);
    let cache_dir = &config.link.cache_dir;

    if !cache_dir.exists() {
        ui::step_info(&ctx, &format!("Nothing to clean at {}", cache_dir.display()));
        return Ok(());
    }

    let prompt = format!("Remove {} and every cached vendor bundle?", cache_dir.display());
    if !ui::confirm(&ctx, &prompt, false).await? {
        ui::step_warn(&ctx, "Cancelled (pass --yes to skip the prompt)");
        return Ok(());
    }

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start("Removing vendor bundle cache...");
    match fs::remove_dir_all(cache_dir).await {
        Ok(()) => {
            spinner.stop(&format!("Removed {}", cache_dir.display()));
            Ok(())
        }
        Err(e) => {
            spinner.stop_error("Could not remove cache");
            Err(VendorLinkError::io(
                format!("removing {}", cache_dir.display()),
                e,
            ))
        }
    }
}

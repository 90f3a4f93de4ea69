//! vendorlink - cached vendor bundle builds
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use vendorlink::cli::{Cli, Commands, LogFormat};
use vendorlink::config::ConfigManager;
use vendorlink::error::{VendorLinkError, VendorLinkResult};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> VendorLinkResult<()> {
    let cli = Cli::parse();

    // 0 = warn (spinners only), 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("vendorlink=warn"),
        1 => EnvFilter::new("vendorlink=info"),
        _ => EnvFilter::new("vendorlink=debug"),
    };

    // Logs go to stderr; stdout may carry JSON reports
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .without_time();
    match cli.log_format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }

    vendorlink::ui::init_theme();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => {
            let cwd = std::env::current_dir()
                .map_err(|e| VendorLinkError::io("getting current directory", e))?;
            ConfigManager::discover(&cwd)
        }
    };
    let config = config_manager.load().await?;
    let project_dir = config_manager.project_dir();

    match cli.command {
        Commands::Check(args) => {
            vendorlink::cli::commands::check(args, &config, &project_dir).await
        }
        Commands::Status(args) => {
            vendorlink::cli::commands::status(args, &config, &project_dir).await
        }
        Commands::Clean(args) => vendorlink::cli::commands::clean(args, &config).await,
    }
}

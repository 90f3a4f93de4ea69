//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// vendorlink - cached vendor bundle builds
///
/// Rebuilds the vendor (DLL) bundle only when the resolved versions of its
/// dependencies change, and places the cached artifacts for the host build.
#[derive(Parser, Debug)]
#[command(name = "vendorlink")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "VENDORLINK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub log_format: LogFormat,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rebuild the vendor bundle if needed and place its artifacts
    Check(CheckArgs),

    /// Show cache records without building anything
    Status(StatusArgs),

    /// Remove the private cache directory
    Clean(CleanArgs),
}

/// Arguments for the check command
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Rebuild even when the cache is current
    #[arg(short, long)]
    pub force: bool,

    /// Print a JSON report instead of a summary
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the status command
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the clean command
#[derive(Parser, Debug)]
pub struct CleanArgs {
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Output format for the status command
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Format of diagnostic log lines on stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

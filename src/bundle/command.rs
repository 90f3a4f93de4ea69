//! External command build engine
//!
//! Runs the configured program (webpack by default) against a rewritten
//! build configuration and reads its JSON stats from stdout.

use super::engine::{BuildEngine, BuildStats};
use crate::config::{BuildConfig, EngineConfig};
use crate::error::{VendorLinkError, VendorLinkResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::fs;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info};

/// Max number of output lines to include in engine error messages.
const ERROR_TAIL_LINES: usize = 50;

/// File the rewritten build configuration is written to
pub const BUILD_CONFIG_FILE: &str = "build-config.json";

/// Environment variable carrying the build configuration path
pub const ENV_BUILD_CONFIG: &str = "VENDORLINK_BUILD_CONFIG";

/// Environment variable carrying the output directory
pub const ENV_OUTPUT_PATH: &str = "VENDORLINK_OUTPUT_PATH";

/// Callback receiving engine diagnostics line by line
pub type OutputCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Build engine backed by an external process
pub struct CommandEngine {
    command: String,
    args: Vec<String>,
    working_dir: PathBuf,
    state_dir: PathBuf,
    on_output: Option<OutputCallback>,
}

impl CommandEngine {
    /// Create an engine running in `working_dir`, keeping its files in `state_dir`
    pub fn new(config: &EngineConfig, working_dir: &Path, state_dir: &Path) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            working_dir: working_dir.to_path_buf(),
            state_dir: state_dir.to_path_buf(),
            on_output: None,
        }
    }

    /// Forward stderr lines to `callback` while the engine runs
    pub fn with_progress(mut self, callback: OutputCallback) -> Self {
        self.on_output = Some(callback);
        self
    }

    fn expand_args(&self, config_path: &Path, output_path: &Path) -> Vec<String> {
        let config = config_path.display().to_string();
        let output = output_path.display().to_string();
        self.args
            .iter()
            .map(|arg| arg.replace("{config}", &config).replace("{output}", &output))
            .collect()
    }

    fn display_command(&self, args: &[String]) -> String {
        std::iter::once(self.command.as_str())
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl BuildEngine for CommandEngine {
    async fn build(&self, config: &BuildConfig) -> VendorLinkResult<BuildStats> {
        fs::create_dir_all(&self.state_dir)
            .await
            .map_err(|e| VendorLinkError::io("creating engine state directory", e))?;

        let config_path = self.state_dir.join(BUILD_CONFIG_FILE);
        fs::write(&config_path, serde_json::to_string_pretty(config)?)
            .await
            .map_err(|e| {
                VendorLinkError::io(format!("writing {}", config_path.display()), e)
            })?;

        let args = self.expand_args(&config_path, &config.output.path);
        let command_line = self.display_command(&args);
        info!("Running build engine: {}", command_line);

        let mut child = Command::new(&self.command)
            .args(&args)
            .current_dir(&self.working_dir)
            .env(ENV_BUILD_CONFIG, &config_path)
            .env(ENV_OUTPUT_PATH, &config.output.path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| VendorLinkError::command_failed(&command_line, e))?;

        let noop = |_: String| {};
        let on_output: &(dyn Fn(String) + Send + Sync) = match &self.on_output {
            Some(callback) => callback.as_ref(),
            None => &noop,
        };
        let (stdout, stderr) = stream_child_output(&mut child, on_output).await?;

        let status = child
            .wait()
            .await
            .map_err(|e| VendorLinkError::command_failed(&command_line, e))?;

        if !status.success() {
            return Err(VendorLinkError::EngineFailed {
                engine: self.command.clone(),
                output: build_error_output(&stdout.join("\n"), &stderr.join("\n")),
            });
        }

        let report = parse_report(&stdout.join("\n"))?;
        if !report.errors.is_empty() {
            return Err(VendorLinkError::EngineFailed {
                engine: self.command.clone(),
                output: build_error_output(&report.errors.join("\n"), ""),
            });
        }

        debug!("Engine reported {} assets", report.assets.len());
        Ok(BuildStats {
            assets: report.assets,
        })
    }

    fn name(&self) -> &str {
        &self.command
    }
}

/// Extract the useful tail of engine output for error diagnostics.
///
/// Combines stdout and stderr, then returns the last `ERROR_TAIL_LINES`
/// lines so error messages are actionable without being overwhelming.
pub(crate) fn build_error_output(stdout: &str, stderr: &str) -> String {
    let lines: Vec<&str> = stdout.lines().chain(stderr.lines()).collect();
    let total = lines.len();
    let tail: Vec<&str> = if total > ERROR_TAIL_LINES {
        lines[total - ERROR_TAIL_LINES..].to_vec()
    } else {
        lines
    };
    tail.join("\n")
}

/// Drain stdout and stderr of a child concurrently.
///
/// Each stderr line is passed to `on_output` as it arrives. Returns the
/// collected `(stdout, stderr)` lines.
pub(crate) async fn stream_child_output(
    child: &mut Child,
    on_output: &(dyn Fn(String) + Send + Sync),
) -> VendorLinkResult<(Vec<String>, Vec<String>)> {
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| VendorLinkError::Internal("engine stderr not captured".to_string()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| VendorLinkError::Internal("engine stdout not captured".to_string()))?;

    let mut stderr_reader = BufReader::new(stderr).lines();
    let mut stdout_reader = BufReader::new(stdout).lines();

    let mut out_lines = Vec::new();
    let mut err_lines = Vec::new();
    let mut stderr_done = false;
    let mut stdout_done = false;

    while !stderr_done || !stdout_done {
        tokio::select! {
            line = stderr_reader.next_line(), if !stderr_done => {
                match line {
                    Ok(Some(line)) => {
                        on_output(line.clone());
                        err_lines.push(line);
                    }
                    _ => stderr_done = true,
                }
            }
            line = stdout_reader.next_line(), if !stdout_done => {
                match line {
                    Ok(Some(line)) => out_lines.push(line),
                    _ => stdout_done = true,
                }
            }
        }
    }

    Ok((out_lines, err_lines))
}

/// Parsed engine stats
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct EngineReport {
    pub assets: Vec<String>,
    pub errors: Vec<String>,
}

#[derive(Deserialize)]
struct RawStats {
    #[serde(default)]
    assets: Vec<RawAsset>,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct RawAsset {
    name: String,
}

/// Parse engine stats from stdout
///
/// Lines before the first one opening a JSON object are skipped, as is
/// anything after the object.
pub(crate) fn parse_report(stdout: &str) -> VendorLinkResult<EngineReport> {
    let mut offset = 0;
    for line in stdout.split_inclusive('\n') {
        if line.trim_start().starts_with('{') {
            break;
        }
        offset += line.len();
    }

    let json = &stdout[offset..];
    if json.trim().is_empty() {
        return Err(VendorLinkError::EngineOutput {
            reason: "no JSON stats on stdout".to_string(),
        });
    }

    let raw: RawStats = serde_json::Deserializer::from_str(json)
        .into_iter::<RawStats>()
        .next()
        .ok_or_else(|| VendorLinkError::EngineOutput {
            reason: "no JSON stats on stdout".to_string(),
        })?
        .map_err(|e| VendorLinkError::EngineOutput {
            reason: e.to_string(),
        })?;

    Ok(EngineReport {
        assets: raw.assets.into_iter().map(|a| a.name).collect(),
        errors: raw.errors.iter().map(error_message).collect(),
    })
}

/// Engine errors are plain strings or objects with a `message`
fn error_message(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| other.to_string()),
    }
}

//! Progress indicators with CI fallback

use super::context::UiContext;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// A task spinner with CI fallback
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    interactive: bool,
    quiet: bool,
}

impl TaskSpinner {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.use_fancy_output(),
            quiet: ctx.is_quiet(),
        }
    }

    /// Start the spinner with a message
    pub fn start(&mut self, message: &str) {
        if self.quiet {
            return;
        }
        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        } else {
            println!("{} {}", style("...").dim(), message);
        }
    }

    /// Stop with success message
    pub fn stop(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.stop(message);
        } else if !self.quiet {
            println!("{} {}", style("[OK]").green(), message);
        }
    }

    /// Stop with error message
    pub fn stop_error(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.error(message);
        } else if !self.quiet {
            println!("{} {}", style("[FAIL]").red(), message);
        }
    }
}

/// Progress bar for vendor bundle builds.
///
/// Reads the percentage lines webpack prints with `--progress` and shows
/// an indicatif bar in interactive mode. In CI, other diagnostic lines
/// are echoed as they arrive.
#[derive(Clone)]
pub struct BuildProgress {
    bar: Option<ProgressBar>,
    echo: bool,
}

impl BuildProgress {
    pub fn new(ctx: &UiContext, label: &str) -> Self {
        let bar = if ctx.use_fancy_output() {
            let bar = ProgressBar::new(100);
            let template = ProgressStyle::default_bar()
                .template("  {spinner:.blue} Building {prefix}  {bar:20.blue/dim} {pos:>3}% {msg:.dim}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            bar.set_style(template.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ").progress_chars("━╸─"));
            bar.set_prefix(label.to_string());
            bar.enable_steady_tick(std::time::Duration::from_millis(120));
            Some(bar)
        } else {
            if !ctx.is_quiet() {
                println!("Building {}...", label);
            }
            None
        };
        Self {
            bar,
            echo: !ctx.is_quiet(),
        }
    }

    /// Process one line of engine diagnostics
    pub fn on_line(&self, line: String) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }

        match (&self.bar, parse_percent_line(trimmed)) {
            (Some(bar), Some((percent, stage))) => {
                bar.set_position(percent);
                bar.set_message(truncate(stage, 50));
            }
            (Some(bar), None) => bar.set_message(truncate(trimmed, 50)),
            (None, Some(_)) => {}
            (None, None) => {
                if self.echo {
                    println!("  {}", style(trimmed).dim());
                }
            }
        }
    }

    /// Finish and clear the progress bar.
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let cut: String = s.chars().take(max - 3).collect();
        format!("{}...", cut)
    } else {
        s.to_string()
    }
}

/// Parse a progress line such as `45% building 12/30 modules`, possibly
/// behind a `<s> [webpack.Progress]` prefix
fn parse_percent_line(line: &str) -> Option<(u64, &str)> {
    let rest = match line.find("] ") {
        Some(i) if line.starts_with('<') || line.starts_with('[') => &line[i + 2..],
        _ => line,
    };
    let (number, stage) = rest.split_once('%')?;
    let percent: u64 = number.trim().parse().ok()?;
    if percent > 100 {
        return None;
    }
    Some((percent, stage.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spinner_non_interactive() {
        let ctx = UiContext::non_interactive();
        let mut spinner = TaskSpinner::new(&ctx);
        spinner.start("Testing...");
        spinner.stop("Done");
    }

    #[test]
    fn parse_percent_line_plain() {
        let (percent, stage) = parse_percent_line("45% building 12/30 modules").unwrap();
        assert_eq!(percent, 45);
        assert_eq!(stage, "building 12/30 modules");
    }

    #[test]
    fn parse_percent_line_prefixed() {
        let (percent, stage) =
            parse_percent_line("<s> [webpack.Progress] 100% emitting").unwrap();
        assert_eq!(percent, 100);
        assert_eq!(stage, "emitting");
    }

    #[test]
    fn parse_percent_line_rejects_other_output() {
        assert!(parse_percent_line("Hash: 4f2a1c").is_none());
        assert!(parse_percent_line("asset vendor.js 120 KiB [emitted]").is_none());
        assert!(parse_percent_line("150% nonsense").is_none());
        assert!(parse_percent_line("").is_none());
    }

    #[test]
    fn truncate_long_messages() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 10), "abcdefg...");
    }

    #[test]
    fn build_progress_non_interactive() {
        let ctx = UiContext::non_interactive();
        let progress = BuildProgress::new(&ctx, "vendor");
        progress.on_line("10% building".to_string());
        progress.on_line("Browserslist: caniuse-lite is outdated".to_string());
        progress.finish();
    }
}

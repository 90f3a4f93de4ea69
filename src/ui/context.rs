//! UI context for detecting interactive vs CI environments

use std::io::IsTerminal;

/// Environment variables set by common CI providers
const CI_VARS: [&str; 9] = [
    "CI",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "TRAVIS",
    "JENKINS_URL",
    "BUILDKITE",
    "TEAMCITY_VERSION",
    "TF_BUILD",
];

/// UI context that determines output behavior
#[derive(Debug, Clone)]
pub struct UiContext {
    /// Whether running in an interactive terminal
    interactive: bool,
    /// Whether --yes was passed (auto-approve prompts)
    auto_yes: bool,
    /// Whether stdout carries machine-readable output only
    machine: bool,
}

impl UiContext {
    /// Detect the current environment
    pub fn detect() -> Self {
        Self {
            interactive: Self::detect_interactive(),
            auto_yes: false,
            machine: false,
        }
    }

    /// Create a non-interactive context (for testing or explicit CI mode)
    pub fn non_interactive() -> Self {
        Self {
            interactive: false,
            auto_yes: false,
            machine: false,
        }
    }

    /// Set auto-yes mode (bypass prompts with defaults)
    pub fn with_auto_yes(mut self, yes: bool) -> Self {
        self.auto_yes = yes;
        self
    }

    /// Reserve stdout for JSON; human output is suppressed
    pub fn with_machine_output(mut self, machine: bool) -> Self {
        self.machine = machine;
        self
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive && !self.machine
    }

    pub fn auto_yes(&self) -> bool {
        self.auto_yes
    }

    /// Whether human-readable progress and summaries are printed
    pub fn is_quiet(&self) -> bool {
        self.machine
    }

    /// Check if we should use fancy output (spinners, progress bars, colors)
    pub fn use_fancy_output(&self) -> bool {
        self.is_interactive()
    }

    fn detect_interactive() -> bool {
        if !std::io::stdout().is_terminal() || !std::io::stdin().is_terminal() {
            return false;
        }
        !CI_VARS.iter().any(|var| std::env::var_os(var).is_some())
    }
}

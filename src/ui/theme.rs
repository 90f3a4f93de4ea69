//! Custom theme for cliclack prompts

use cliclack::ThemeState;
use console::Style;

/// Blue-branded theme used by vendorlink's prompts and spinners
#[derive(Debug, Clone, Default)]
pub struct VendorLinkTheme;

impl cliclack::Theme for VendorLinkTheme {
    fn bar_color(&self, state: &ThemeState) -> Style {
        match state {
            ThemeState::Active => Style::new().blue(),
            ThemeState::Error(_) => Style::new().red(),
            ThemeState::Cancel => Style::new().dim(),
            ThemeState::Submit => Style::new().blue().dim(),
        }
    }

    fn state_symbol_color(&self, state: &ThemeState) -> Style {
        match state {
            ThemeState::Active => Style::new().blue(),
            ThemeState::Error(_) => Style::new().red(),
            ThemeState::Cancel => Style::new().dim(),
            ThemeState::Submit => Style::new().green(),
        }
    }
}

/// Install the theme for all cliclack output
pub fn init_theme() {
    cliclack::set_theme(VendorLinkTheme);
}

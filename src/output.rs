//! # Output Configuration
//!
//! Controls how command summaries look on the terminal. Library code reports
//! through `log`; this module only decorates what the commands print
//! themselves, such as the verification summary.
//!
//! ## Respecting User Preferences
//!
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pip_compile_multi::output::{status, OutputConfig};
//!
//! let config = OutputConfig::from_env_and_flag("auto");
//! println!("{} requirements/base.txt", status(&config, true));
//! ```

use std::env;

use console::style;

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// `--color=always` overrides `NO_COLOR`, `--color=never` forces colors
    /// off and anything else detects support from the environment.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };
        Self { use_color }
    }

    fn detect_color_support() -> bool {
        // Presence alone disables colors, even when empty.
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }
        console::Term::stdout().features().colors_supported()
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Returns the emoji when colors are enabled and the plain text otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// Marker for a verification line: green `OK` or red `ERROR`.
pub fn status(config: &OutputConfig, ok: bool) -> String {
    let (marker, text) = if ok {
        (emoji(config, "✅", "[OK]"), "OK")
    } else {
        (emoji(config, "❌", "[ERROR]"), "ERROR")
    };
    if !config.use_color {
        return marker.to_string();
    }
    let text = if ok {
        style(text).green().bold()
    } else {
        style(text).red().bold()
    };
    format!("{} {}", marker, text.force_styling(true))
}

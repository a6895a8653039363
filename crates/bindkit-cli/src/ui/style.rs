//! Message styling for CLI output.
//!
//! ## Message Types
//!
//! | Prefix | Meaning | Color |
//! |--------|---------|-------|
//! | `[ok]` | Success | Green |
//! | `[err]` | Error | Red |
//! | `[warn]` | Warning | Yellow |
//! | `[info]` | Information | Blue |
//! | `[hint]` | Suggestion | Cyan |

use owo_colors::OwoColorize;

use super::color::ColorMode;

/// Message severity/type for CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Success - operation completed successfully
    Ok,
    /// Error - operation failed, cannot continue
    Err,
    /// Warning - operation succeeded with caveats
    Warn,
    /// Information - neutral status update
    Info,
    /// Hint - actionable next step or tip
    Hint,
}

impl MessageType {
    /// Returns the prefix text for this message type.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Ok => "[ok]",
            Self::Err => "[err]",
            Self::Warn => "[warn]",
            Self::Info => "[info]",
            Self::Hint => "[hint]",
        }
    }
}

/// Main styling interface for CLI output.
///
/// # Example
///
/// ```
/// use bindkit_cli::ui::{Style, MessageType, ColorMode};
///
/// let style = Style::new(ColorMode::Never);
/// println!("{}", style.message(MessageType::Ok, "Bound 3 parameters"));
/// ```
#[derive(Debug, Clone)]
pub struct Style {
    color_mode: ColorMode,
}

impl Default for Style {
    fn default() -> Self {
        Self::new(ColorMode::Auto)
    }
}

impl Style {
    /// Create a Style instance with an explicit color mode.
    pub fn new(color_mode: ColorMode) -> Self {
        Self { color_mode }
    }

    /// Check if colors are enabled.
    pub fn colors_enabled(&self) -> bool {
        self.color_mode.is_enabled()
    }

    /// Get the current color mode.
    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    /// Format a simple message with a type prefix.
    ///
    /// ```
    /// use bindkit_cli::ui::{Style, MessageType, ColorMode};
    ///
    /// let style = Style::new(ColorMode::Never);
    /// assert_eq!(style.message(MessageType::Ok, "Done"), "[ok] Done");
    /// ```
    pub fn message(&self, msg_type: MessageType, text: &str) -> String {
        let prefix = msg_type.prefix();
        if self.colors_enabled() {
            let colored_prefix = match msg_type {
                MessageType::Ok => prefix.green().to_string(),
                MessageType::Err => prefix.red().to_string(),
                MessageType::Warn => prefix.yellow().to_string(),
                MessageType::Info => prefix.blue().to_string(),
                MessageType::Hint => prefix.cyan().to_string(),
            };
            format!("{} {}", colored_prefix, text)
        } else {
            format!("{} {}", prefix, text)
        }
    }

    /// Format a detail line with 5-space indentation.
    pub fn message_detail(&self, label: &str, value: &str) -> String {
        format!("     {}: {}", label, value)
    }

    /// Format a section header.
    pub fn section(&self, title: &str) -> String {
        if self.colors_enabled() {
            title.bold().to_string()
        } else {
            title.to_string()
        }
    }

    /// Format an error with optional cause and hint lines.
    pub fn error_with_context(&self, msg: &str, cause: Option<&str>, hint: Option<&str>) -> String {
        let mut output = self.message(MessageType::Err, msg);

        if let Some(cause_text) = cause {
            output.push('\n');
            output.push_str(&format!("      Cause: {}", cause_text));
        }

        if let Some(hint_text) = hint {
            output.push('\n');
            output.push_str(&format!("      Hint: {}", hint_text));
        }

        output
    }

    /// Format a key-value pair with the key dimmed.
    pub fn key_value(&self, key: &str, value: &str) -> String {
        if self.colors_enabled() {
            format!("{}: {}", key.dimmed(), value)
        } else {
            format!("{}: {}", key, value)
        }
    }

    /// Color an argument source: `bound` green, `default` yellow, `missing` red.
    pub fn source(&self, source: &str) -> String {
        if !self.colors_enabled() {
            return source.to_string();
        }
        match source {
            "bound" => source.green().to_string(),
            "default" => source.yellow().to_string(),
            "missing" => source.red().to_string(),
            _ => source.to_string(),
        }
    }
}

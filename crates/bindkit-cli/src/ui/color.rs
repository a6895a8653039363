//! When to emit ANSI colors.
//!
//! `--color auto` colors only an interactive stdout and honors `NO_COLOR`
//! (https://no-color.org/).

use std::io::IsTerminal;

use clap::ValueEnum;

/// Value of the `--color` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorMode {
    Always,
    Never,
    /// Color when stdout is a terminal and `NO_COLOR` is unset.
    #[default]
    Auto,
}

impl ColorMode {
    pub fn is_enabled(&self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_values() {
        assert_eq!(ColorMode::from_str("always", true), Ok(ColorMode::Always));
        assert_eq!(ColorMode::from_str("NEVER", true), Ok(ColorMode::Never));
        assert_eq!(ColorMode::from_str("auto", false), Ok(ColorMode::Auto));
        assert!(ColorMode::from_str("sometimes", true).is_err());
    }

    #[test]
    fn test_explicit_modes() {
        assert!(ColorMode::Always.is_enabled());
        assert!(!ColorMode::Never.is_enabled());
    }
}

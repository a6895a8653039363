//! # CLI UI Module
//!
//! Styling and formatting layer for bindkit output.
//!
//! Output stays readable without colors (`NO_COLOR` and non-TTY stdout are
//! respected) and every command that prints data has a `--json` form for
//! scripting.
//!
//! ## Module Structure
//!
//! - `color`: The `--color` mode and when it enables ANSI output
//! - `style`: Message types, prefixes, and styling functions
//! - `format`: Value summaries and truncation
//! - `table`: Table rendering with comfy-table

pub mod color;
pub mod format;
pub mod style;
pub mod table;

// Re-export main types for convenient access
pub use color::ColorMode;
pub use style::{MessageType, Style};

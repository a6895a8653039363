//! # bindkit CLI
//!
//! Command-line front end for `bindkit-core`: binds request parameters to the
//! actions described in an application manifest and shows how each one was
//! resolved. Run `bindkit --help` for usage information.

mod cli;
pub mod ui;

use std::process::ExitCode;

fn main() -> ExitCode {
    cli::run()
}

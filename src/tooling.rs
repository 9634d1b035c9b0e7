//! Tooling & Integration Layer
//!
//! Command-line parsing, command execution and report rendering for the `cairn`
//! binary.

pub mod cli;
pub mod format;

pub use cli::{Cli, CliContext, Commands};

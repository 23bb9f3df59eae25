//! CLI module for the convergence tool.
//!
//! This module provides the command-line interface for converging
//! manifests and running lookups.

mod commands;
mod output;

pub use commands::{Cli, Commands, LogFormat, OutputFormat};
pub use output::OutputFormatter;

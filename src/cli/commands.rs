//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::cloud::STANDARD_IMAGES_FOLDER;
use crate::config::{ENV_IAM_TOKEN, ENV_OAUTH_TOKEN, ENV_SERVICE_ACCOUNT_KEY_FILE};

/// Converge - idempotent convergence of compute disks and instances.
#[derive(Parser, Debug)]
#[command(name = "converge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the manifest (searched upward from the current directory by default).
    #[arg(short, long, global = true, env = "CONVERGE_MANIFEST")]
    pub manifest: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Log format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,

    /// IAM token.
    #[arg(long, global = true, env = ENV_IAM_TOKEN, hide_env_values = true)]
    pub iam_token: Option<String>,

    /// OAuth token, exchanged for an IAM token.
    #[arg(long, global = true, env = ENV_OAUTH_TOKEN, hide_env_values = true)]
    pub oauth_token: Option<String>,

    /// Path to a service account authorized key.
    #[arg(long, global = true, env = ENV_SERVICE_ACCOUNT_KEY_FILE)]
    pub service_account_key: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Converge every resource of the manifest.
    Apply {
        /// Skip the confirmation prompt for deletions.
        #[arg(short, long)]
        yes: bool,
    },

    /// Validate the manifest without calling the API.
    Validate {
        /// Show warnings, not just errors.
        #[arg(short, long)]
        warnings: bool,
    },

    /// Show the latest image of a family.
    Image {
        /// Image family.
        family: String,

        /// Folder the family belongs to.
        #[arg(long, default_value = STANDARD_IMAGES_FOLDER)]
        folder_id: String,
    },

    /// List the subnets of a folder.
    Subnets {
        /// Folder to list.
        folder_id: String,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// Log format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable log lines.
    #[default]
    Text,
    /// One JSON object per log line.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_image_defaults() {
        let cli = Cli::try_parse_from(["converge", "--output", "json", "image", "ubuntu-2204-lts"])
            .expect("valid args");
        assert_eq!(cli.output, OutputFormat::Json);
        match cli.command {
            Commands::Image { family, folder_id } => {
                assert_eq!(family, "ubuntu-2204-lts");
                assert_eq!(folder_id, STANDARD_IMAGES_FOLDER);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_apply() {
        let cli = Cli::try_parse_from(["converge", "-m", "infra.yaml", "apply", "--yes"])
            .expect("valid args");
        assert_eq!(cli.manifest, Some(PathBuf::from("infra.yaml")));
        assert!(matches!(cli.command, Commands::Apply { yes: true }));
    }
}

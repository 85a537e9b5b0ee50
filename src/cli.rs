// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::types::Platform;

/// Command-line arguments for `checkpoint`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "checkpoint",
    version,
    about = "Run system diagnostic and cleanup features and stream their output.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Checkpoint.toml` in the current working directory, if present.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CHECKPOINT_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    /// Resolve features for another platform family (windows, macos, linux).
    #[arg(long, value_name = "PLATFORM", value_parser = parse_platform, global = true)]
    pub platform: Option<Platform>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List the feature catalog, grouped by category.
    List,

    /// Run one or more features concurrently and stream their logs.
    Run {
        /// Feature ids, e.g. "Netstat" or "Run Full Cleanup".
        #[arg(required = true, value_name = "FEATURE")]
        features: Vec<String>,

        /// Save the log when all features are done.
        ///
        /// Without a value, writes a timestamped file into `[export].directory`
        /// (or the current directory).
        #[arg(long, value_name = "PATH", num_args = 0..=1)]
        export: Option<Option<PathBuf>>,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn parse_platform(s: &str) -> Result<Platform, String> {
    s.parse()
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_flag_without_value_means_default_path() {
        let args = CliArgs::try_parse_from(["checkpoint", "run", "Netstat", "--export"]).unwrap();
        match args.command {
            Command::Run { features, export } => {
                assert_eq!(features, vec!["Netstat"]);
                assert_eq!(export, Some(None));
            }
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn platform_override_is_parsed() {
        let args =
            CliArgs::try_parse_from(["checkpoint", "--platform", "macos", "list"]).unwrap();
        assert_eq!(args.platform, Some(Platform::Macos));
    }

    #[test]
    fn run_requires_a_feature() {
        assert!(CliArgs::try_parse_from(["checkpoint", "run"]).is_err());
    }
}

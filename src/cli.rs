//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI parser for `taskmirror`.
#[derive(Debug, Parser)]
#[command(name = "taskmirror", version, about = "Mirror tracker issues into scheduled tasks")]
pub struct Cli {
    /// Path to the YAML config file (falls back to `TASKMIRROR_CONFIG`,
    /// then `config.yaml`).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run reconciliation cycles forever, polling on a fixed interval.
    Run,
    /// Run a single reconciliation cycle and exit.
    Once,
    /// Load and validate the configuration, then print a summary.
    CheckConfig,
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::Parser;

    #[test]
    fn parses_run_subcommand() {
        let cli = Cli::parse_from(["taskmirror", "run"]);
        assert!(matches!(cli.command, Command::Run));
        assert!(cli.config.is_none());
    }

    #[test]
    fn parses_once_with_config_path() {
        let cli = Cli::parse_from(["taskmirror", "once", "--config", "/etc/tm.yaml"]);
        assert!(matches!(cli.command, Command::Once));
        assert_eq!(cli.config.unwrap().to_str(), Some("/etc/tm.yaml"));
    }

    #[test]
    fn parses_check_config_subcommand() {
        let cli = Cli::parse_from(["taskmirror", "check-config"]);
        assert!(matches!(cli.command, Command::CheckConfig));
    }
}

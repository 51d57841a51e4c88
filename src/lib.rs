//! Core library for the `taskmirror` reconciliation daemon.
//!
//! Mirrors open tracker issues into a scheduling service (creation is
//! one-way) and reconciles status and assignees back and forth. The
//! engine in [`engine`] is the core; everything external (time, the two
//! services, alerting) sits behind the port traits in [`ports`].

pub mod adapters;
pub mod cli;
pub mod commands;
pub mod config;
pub mod engine;
pub mod limit;
pub mod matcher;
pub mod ports;
pub mod runner;

use clap::Parser;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command
/// execution fails.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match cli::Cli::try_parse_from(args) {
        Ok(cli) => cli,
        // Help and version are not failures.
        Err(err)
            if matches!(
                err.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ) =>
        {
            print!("{err}");
            return Ok(());
        }
        Err(err) => return Err(err.to_string()),
    };
    commands::dispatch(&cli.command, cli.config.as_deref())
}

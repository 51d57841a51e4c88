//! Command dispatch and handlers.

use std::path::Path;
use std::sync::Arc;

use crate::adapters::live::{HttpAlertSink, SystemClock};
use crate::cli::Command;
use crate::config::{self, Config};
use crate::ports::{AlertSink, NoopAlerts};
use crate::runner::Runner;

/// Dispatch a parsed command to its handler.
///
/// # Errors
///
/// Returns an error string when configuration cannot be loaded or the
/// selected command fails.
pub fn dispatch(command: &Command, config_path: Option<&Path>) -> Result<(), String> {
    let path = config::resolve_path(config_path);
    let config = Config::load(&path).map_err(|err| err.to_string())?;

    match command {
        Command::CheckConfig => {
            check_config(&config, &path);
            Ok(())
        }
        Command::Once => {
            let report = build_runner(config).run_once().map_err(|err| err.to_string())?;
            println!(
                "cycle complete: created {}, closed {}, reassigned {}, skipped {}",
                report.created, report.closed, report.reassigned, report.skipped
            );
            Ok(())
        }
        Command::Run => {
            build_runner(config).run_loop();
            Ok(())
        }
    }
}

/// Wires the live clock and alert sink into a runner.
fn build_runner(config: Config) -> Runner {
    let clock = Arc::new(SystemClock);
    let alerts: Arc<dyn AlertSink> = match &config.alerts {
        Some(alert_config) => Arc::new(HttpAlertSink::new(&alert_config.url)),
        None => Arc::new(NoopAlerts),
    };
    Runner::new(config, clock, alerts)
}

/// Print a redacted summary of the loaded configuration.
fn check_config(config: &Config, path: &Path) {
    println!("config ok: {}", path.display());
    println!("  tracker api:  {}", config.jira.api);
    println!("  scheduler:    {} (workspace {})", config.motion.url, config.motion.workspace_id);
    println!(
        "  alerts:       {}",
        config.alerts.as_ref().map_or("disabled", |alerts| alerts.url.as_str())
    );
    println!("  lock file:    {}", config.lock_file.display());
    println!("  poll every:   {}s", config.poll_interval_secs);
    println!("  tracked assignees ({}):", config.assignees.len());
    for (id, name) in &config.assignees {
        println!("    {id} -> {name}");
    }
}

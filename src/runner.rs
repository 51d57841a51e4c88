//! Scheduler/runner: single-instance lock and the polling loop.
//!
//! Exactly one cycle runs at a time, enforced by a lock file checked at
//! cycle start and removed when the guard drops. A hard kill between
//! acquire and release leaves a stale lock that blocks all future cycles
//! until removed by hand; this is a known operational risk, not
//! auto-healed.

use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::adapters::live::{JiraSource, MotionService};
use crate::config::Config;
use crate::engine::{CycleReport, Engine};
use crate::ports::{AlertSink, Clock};

/// Pause before the next cycle after an aborted one.
const ABORT_DELAY: Duration = Duration::from_secs(15);

/// Errors raised by the runner.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Another cycle holds the lock.
    #[error("another instance is running (lock file {0} exists)")]
    LockContention(PathBuf),
    /// Lock file I/O failed.
    #[error("lock file error: {0}")]
    Io(#[from] std::io::Error),
    /// The cycle panicked and was caught by the runner's catch-all.
    #[error("cycle aborted: {0}")]
    CycleAborted(String),
}

/// Held while a cycle runs; removes the lock file on drop.
#[derive(Debug)]
pub struct CycleLock {
    path: PathBuf,
}

impl CycleLock {
    /// Acquires the lock, writing this process's pid into the file.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::LockContention`] when the file already
    /// exists, or [`RunnerError::Io`] on other filesystem failures.
    pub fn acquire(path: &Path) -> Result<Self, RunnerError> {
        match std::fs::OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                write!(file, "{}", std::process::id())?;
                Ok(Self { path: path.to_path_buf() })
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(RunnerError::LockContention(path.to_path_buf()))
            }
            Err(err) => Err(RunnerError::Io(err)),
        }
    }
}

impl Drop for CycleLock {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            tracing::warn!(%err, path = %self.path.display(), "failed to remove lock file");
        }
    }
}

/// Owns the polling loop and builds fresh adapters for every cycle.
pub struct Runner {
    config: Config,
    clock: Arc<dyn Clock>,
    alerts: Arc<dyn AlertSink>,
}

impl Runner {
    /// Creates a runner over loaded configuration.
    #[must_use]
    pub fn new(config: Config, clock: Arc<dyn Clock>, alerts: Arc<dyn AlertSink>) -> Self {
        Self { config, clock, alerts }
    }

    /// Runs a single reconciliation cycle under the lock.
    ///
    /// Adapters (and with them the per-cycle user cache) are rebuilt
    /// here, so nothing leaks between cycles.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::LockContention`] when another cycle is
    /// active, [`RunnerError::Io`] on lock trouble, or
    /// [`RunnerError::CycleAborted`] when the cycle panicked.
    pub fn run_once(&self) -> Result<CycleReport, RunnerError> {
        let lock = CycleLock::acquire(&self.config.lock_file)?;

        let source = JiraSource::new(&self.config.jira, self.alerts.clone());
        let target = MotionService::new(
            &self.config.motion,
            &self.config.jira.url,
            self.clock.clone(),
            self.alerts.clone(),
        );
        let engine = Engine::new(
            Arc::new(source),
            Arc::new(target),
            self.clock.clone(),
            self.alerts.clone(),
            self.config.assignees.clone(),
        );

        // Cycle-level catch-all: a panic anywhere in a cycle must not
        // take the process down.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| engine.run_cycle()));
        drop(lock);

        outcome.map_err(|payload| {
            let message = panic_message(payload.as_ref());
            self.alerts.report("run_once", &format!("cycle aborted: {message}"));
            RunnerError::CycleAborted(message)
        })
    }

    /// Runs cycles forever, sleeping between them.
    ///
    /// Transient failures never exit the loop: an aborted cycle waits a
    /// short fixed delay, lock contention just waits for the next poll.
    pub fn run_loop(&self) {
        loop {
            match self.run_once() {
                Ok(report) => {
                    tracing::info!(?report, "cycle finished");
                }
                Err(RunnerError::LockContention(path)) => {
                    tracing::warn!(path = %path.display(), "cycle already running, waiting");
                }
                Err(error) => {
                    tracing::error!(%error, "cycle failed");
                    self.clock.pause(ABORT_DELAY);
                }
            }
            tracing::info!(
                seconds = self.config.poll_interval_secs,
                "sleeping until next cycle"
            );
            self.clock.pause(Duration::from_secs(self.config.poll_interval_secs));
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

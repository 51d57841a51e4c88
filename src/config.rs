//! Configuration loading and validation.
//!
//! One YAML file, loaded once at startup. A `.env` file (if present) is
//! loaded into the environment first, which is how `TASKMIRROR_CONFIG`
//! and the log filter are usually set in deployments.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Environment variable overriding the config file path.
pub const CONFIG_PATH_ENV: &str = "TASKMIRROR_CONFIG";

/// Default config file path when neither the CLI nor the environment
/// names one.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

fn default_lock_file() -> PathBuf {
    PathBuf::from("/tmp/taskmirror.lock")
}

fn default_poll_interval() -> u64 {
    15 * 60
}

/// Issue tracker connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct JiraConfig {
    /// Base URL, used for issue deep links.
    pub url: String,
    /// Search API endpoint.
    pub api: String,
    /// Basic-auth user.
    pub user: String,
    /// Basic-auth API token.
    pub api_key: String,
}

/// Scheduling service connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct MotionConfig {
    /// API base URL.
    pub url: String,
    /// Static API key sent on every request.
    pub api_key: String,
    /// Workspace all tasks and users belong to.
    pub workspace_id: String,
}

/// Alert sink settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertConfig {
    /// Logging endpoint receiving fire-and-forget GET reports.
    pub url: String,
}

/// Full application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Issue tracker settings.
    pub jira: JiraConfig,
    /// Scheduling service settings.
    pub motion: MotionConfig,
    /// Optional alert sink; alerts are disabled when absent.
    #[serde(default)]
    pub alerts: Option<AlertConfig>,
    /// Tracked assignees: tracker account id to display name.
    pub assignees: BTreeMap<String, String>,
    /// Single-instance lock file path.
    #[serde(default = "default_lock_file")]
    pub lock_file: PathBuf,
    /// Seconds to sleep between reconciliation cycles.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The config file is not valid YAML for [`Config`].
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying YAML error.
        source: serde_yaml::Error,
    },
    /// The config parsed but fails a semantic check.
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl Config {
    /// Loads and validates configuration from `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the file cannot be read or parsed,
    /// or when validation fails.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let config: Self = serde_yaml::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks semantic constraints that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when no assignees are tracked.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.assignees.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one tracked assignee is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Resolves the config path: CLI flag, then `TASKMIRROR_CONFIG`, then the
/// default.
#[must_use]
pub fn resolve_path(cli_path: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_path {
        return path.to_path_buf();
    }
    std::env::var(CONFIG_PATH_ENV)
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

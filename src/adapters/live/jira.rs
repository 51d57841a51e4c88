//! Live adapter for the `IssueSource` port against the Jira search API.

use std::sync::Arc;

use reqwest::blocking::Client;
use serde::Deserialize;

use crate::config::JiraConfig;
use crate::ports::{AlertSink, Issue, IssueSource, Priority, SourceError};

/// Live issue source calling the Jira search endpoint.
pub struct JiraSource {
    client: Client,
    api_url: String,
    user: String,
    api_key: String,
    alerts: Arc<dyn AlertSink>,
}

impl JiraSource {
    /// Creates a source from connection settings.
    #[must_use]
    pub fn new(config: &JiraConfig, alerts: Arc<dyn AlertSink>) -> Self {
        Self {
            client: Client::new(),
            api_url: config.api.clone(),
            user: config.user.clone(),
            api_key: config.api_key.clone(),
            alerts,
        }
    }
}

/// Top-level search response.
#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<RawIssue>,
}

/// One issue as returned by the search endpoint.
#[derive(Deserialize)]
struct RawIssue {
    key: String,
    fields: RawFields,
}

/// The subset of issue fields reconciliation reads.
#[derive(Deserialize)]
struct RawFields {
    summary: String,
    assignee: Option<RawPerson>,
    priority: Option<RawNamed>,
    status: RawNamed,
}

/// A person reference in the tracker's namespace.
#[derive(Deserialize)]
struct RawPerson {
    #[serde(rename = "displayName")]
    display_name: String,
}

/// Any `{ "name": ... }` object (priority, status).
#[derive(Deserialize)]
struct RawNamed {
    name: String,
}

impl From<RawIssue> for Issue {
    fn from(raw: RawIssue) -> Self {
        Self {
            key: raw.key,
            summary: raw.fields.summary,
            assignee: raw.fields.assignee.map(|person| person.display_name),
            priority: raw.fields.priority.and_then(|p| Priority::from_name(&p.name)),
            status: raw.fields.status.name,
        }
    }
}

impl IssueSource for JiraSource {
    fn fetch_issues(&self, filter: &str) -> Result<Vec<Issue>, SourceError> {
        let response = self
            .client
            .get(&self.api_url)
            .header("Accept", "application/json")
            .basic_auth(&self.user, Some(&self.api_key))
            .query(&[("jql", filter)])
            .send()
            .map_err(|err| {
                let error = SourceError::Transport(err.to_string());
                tracing::warn!(%error, "issue fetch failed");
                self.alerts.report("fetch_issues", &error.to_string());
                error
            })?;

        let status = response.status();
        if !status.is_success() {
            let error = SourceError::Http(status.as_u16());
            tracing::warn!(%error, "issue fetch failed");
            self.alerts.report("fetch_issues", &error.to_string());
            return Err(error);
        }

        let parsed: SearchResponse = response.json().map_err(|err| {
            let error = SourceError::Transport(format!("malformed search response: {err}"));
            self.alerts.report("fetch_issues", &error.to_string());
            error
        })?;

        Ok(parsed.issues.into_iter().map(Issue::from).collect())
    }
}

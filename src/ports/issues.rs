//! Issue tracker port: the read-only source side of reconciliation.

use thiserror::Error;

/// Issue priority as reported by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    /// Most urgent.
    Highest,
    /// Above normal.
    High,
    /// Normal.
    Medium,
    /// Below normal.
    Low,
    /// Least urgent.
    Lowest,
}

impl Priority {
    /// Parses a tracker priority name, returning `None` for unknown names.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Highest" => Some(Self::Highest),
            "High" => Some(Self::High),
            "Medium" => Some(Self::Medium),
            "Low" => Some(Self::Low),
            "Lowest" => Some(Self::Lowest),
            _ => None,
        }
    }
}

/// An open issue snapshot from the tracker.
///
/// Snapshots are fetched fresh each cycle and never persisted; closed
/// issues are excluded by the query filter before they reach this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// Stable unique key, e.g. `OPS-12`.
    pub key: String,
    /// One-line summary text.
    pub summary: String,
    /// Display name of the current assignee, if any.
    pub assignee: Option<String>,
    /// Priority, if one is set on the issue.
    pub priority: Option<Priority>,
    /// Status name; always an open-class status.
    pub status: String,
}

/// Errors from the issue source.
///
/// Callers treat any of these as "empty result this cycle, retry next
/// cycle"; they never abort a reconciliation pass.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network, DNS, or timeout failure before an HTTP status was seen.
    #[error("issue source transport error: {0}")]
    Transport(String),
    /// Non-2xx HTTP response.
    #[error("issue source returned HTTP {0}")]
    Http(u16),
}

/// Read-only access to the issue tracker.
pub trait IssueSource: Send + Sync {
    /// Fetches issues matching a filter string.
    ///
    /// The filter is passed verbatim to the tracker's query endpoint.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] on non-2xx responses or transport
    /// failures. Callers degrade to an empty result set.
    fn fetch_issues(&self, filter: &str) -> Result<Vec<Issue>, SourceError>;
}

/// Statuses considered terminal; issues in these states are excluded at
/// the query level and never enter a cycle.
const EXCLUDED_STATUSES: &str =
    "(Done, \"On Hold\", Complete, Closed, Resolved, Backlog, Withdrawn, Denied, \"To Do\")";

/// Builds the tracker filter string selecting one assignee's open issues,
/// excluding terminal statuses and Epics, oldest-updated first.
#[must_use]
pub fn open_issues_filter(assignee_id: &str) -> String {
    format!(
        "status not in {EXCLUDED_STATUSES} AND type != Epic AND assignee = {assignee_id} order by updated asc"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_parses_known_names() {
        assert_eq!(Priority::from_name("Highest"), Some(Priority::Highest));
        assert_eq!(Priority::from_name("Lowest"), Some(Priority::Lowest));
        assert_eq!(Priority::from_name("Urgent"), None);
    }

    #[test]
    fn filter_targets_one_assignee() {
        let filter = open_issues_filter("5b1234abc");
        assert!(filter.contains("assignee = 5b1234abc"));
        assert!(filter.contains("type != Epic"));
        assert!(filter.contains("order by updated asc"));
        assert!(filter.contains("\"On Hold\""));
    }
}

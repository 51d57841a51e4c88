//! Scheduling service port: the mutable target side of reconciliation.

use thiserror::Error;

use crate::ports::issues::Issue;

/// A user known to the scheduling service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Service-assigned user identifier.
    pub id: String,
    /// Display name, matched exactly against tracker assignee names.
    pub name: String,
}

/// A person attached to a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskAssignee {
    /// Service-assigned user identifier.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// A task in the scheduling service.
///
/// Tasks are owned by the service and never cached across cycles. The
/// engine only ever reads the first assignee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Service-assigned task identifier.
    pub id: String,
    /// Task name; tasks created by this system carry the match key here.
    pub name: String,
    /// Status name, e.g. "In Progress" or "Completed".
    pub status: String,
    /// Assignees in service order.
    pub assignees: Vec<TaskAssignee>,
}

/// Selects which tasks to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskFilter {
    /// Every task in the workspace.
    All,
    /// Tasks assigned to one user.
    Assignee(String),
}

/// Errors from the scheduling service.
#[derive(Debug, Error)]
pub enum TargetError {
    /// Network, DNS, or timeout failure before an HTTP status was seen.
    #[error("scheduling service transport error: {0}")]
    Transport(String),
    /// Non-2xx HTTP response other than the cases below.
    #[error("scheduling service returned HTTP {0}")]
    Http(u16),
    /// 429 that persisted after the backoff policy was applied.
    #[error("scheduling service rate limit exceeded")]
    RateLimited,
    /// 404 on an assignee update: the task no longer exists upstream.
    /// Logged and skipped, never retried.
    #[error("task no longer exists upstream")]
    NotFoundUpstream,
}

/// Read/write access to the scheduling service.
///
/// Implementations own the service's rate-limit and 429-backoff policy;
/// callers see only the final outcome of each call.
pub trait TaskService: Send + Sync {
    /// Fetches tasks matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns a [`TargetError`]; callers degrade to an empty result set.
    fn fetch_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, TargetError>;

    /// Fetches the workspace user directory.
    ///
    /// Implementations cache the directory for their own lifetime, which
    /// is one reconciliation cycle.
    ///
    /// # Errors
    ///
    /// Returns a [`TargetError`] when no cached directory exists and the
    /// fetch fails.
    fn fetch_users(&self) -> Result<Vec<User>, TargetError>;

    /// Creates the task mirroring `issue`, assigned to `assignee_id`.
    ///
    /// # Errors
    ///
    /// Returns a [`TargetError`]; the caller skips the issue this cycle.
    fn create_task(&self, issue: &Issue, assignee_id: &str) -> Result<Task, TargetError>;

    /// Sets only the status of an existing task.
    ///
    /// # Errors
    ///
    /// Returns a [`TargetError`]; the caller skips the task this cycle.
    fn update_status(&self, task_id: &str, status: &str) -> Result<Task, TargetError>;

    /// Sets only the assignee of an existing task.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::NotFoundUpstream`] when the task id is gone
    /// upstream, or another [`TargetError`]; the caller skips the task.
    fn update_assignee(&self, task_id: &str, assignee_id: &str) -> Result<Task, TargetError>;
}

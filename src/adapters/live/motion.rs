//! Live adapter for the `TaskService` port against the Motion REST API.
//!
//! All calls run through a 10-per-60s rolling limiter. A 429 response
//! triggers a fixed 60s backoff; reads then retry once, mutations give
//! up. A 404 on an assignee update means the task vanished upstream and
//! is surfaced as `NotFoundUpstream` for the caller to skip.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::config::MotionConfig;
use crate::limit::RollingWindow;
use crate::matcher;
use crate::ports::{
    AlertSink, Clock, Issue, Priority, Task, TaskAssignee, TaskFilter, TaskService, TargetError,
    User,
};

/// Calls admitted per rolling window.
const RATE_LIMIT_CALLS: usize = 10;

/// Rolling window length in seconds.
const RATE_LIMIT_WINDOW_SECS: i64 = 60;

/// Fixed backoff after a 429 response.
const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(60);

/// Pause after every creation call so the new task is visible to the
/// fetches in later passes.
const CREATE_PROPAGATION_PAUSE: Duration = Duration::from_secs(5);

/// Default task duration in minutes.
const DEFAULT_DURATION_MINUTES: u32 = 60;

/// Status given to newly created tasks.
const CREATED_STATUS: &str = "In Progress";

/// Label marking tasks created by this system.
const ORIGIN_LABEL: &str = "JIRA";

/// Whether a call may be retried after a 429 backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallKind {
    /// Safe to repeat; retried once after the backoff.
    Read,
    /// Not retried; a 429 yields [`TargetError::RateLimited`].
    Mutation,
}

/// Maps a tracker priority onto Motion's priority scale.
///
/// Total over every tracker priority plus the unset case.
#[must_use]
pub fn motion_priority(priority: Option<Priority>) -> &'static str {
    match priority {
        Some(Priority::Highest) => "ASAP",
        Some(Priority::High) => "High",
        Some(Priority::Low | Priority::Lowest) => "Low",
        Some(Priority::Medium) | None => "Medium",
    }
}

/// Auto-scheduling block sent on task creation.
#[derive(Debug, Serialize)]
struct AutoSchedule {
    #[serde(rename = "startDate")]
    start_date: String,
    #[serde(rename = "deadlineType")]
    deadline_type: &'static str,
    schedule: &'static str,
}

/// Creation payload for `POST /v1/tasks`.
#[derive(Debug, Serialize)]
struct CreateTaskBody {
    #[serde(rename = "dueDate")]
    due_date: String,
    duration: u32,
    status: &'static str,
    #[serde(rename = "autoScheduled")]
    auto_scheduled: AutoSchedule,
    name: String,
    #[serde(rename = "workspaceId")]
    workspace_id: String,
    description: String,
    priority: &'static str,
    labels: [&'static str; 1],
    #[serde(rename = "assigneeId")]
    assignee_id: String,
}

/// Builds the creation payload for an issue.
///
/// The task is named with the match key, links back to the issue, and is
/// due one day from `now` at second precision.
fn creation_body(
    issue: &Issue,
    assignee_id: &str,
    workspace_id: &str,
    browse_base: &str,
    now: DateTime<Utc>,
) -> CreateTaskBody {
    let due = (now + TimeDelta::days(1)).trunc_subsecs(0);
    let due_date = due.format("%Y-%m-%dT%H:%M:%S").to_string();
    CreateTaskBody {
        due_date: due_date.clone(),
        duration: DEFAULT_DURATION_MINUTES,
        status: CREATED_STATUS,
        auto_scheduled: AutoSchedule {
            start_date: due_date,
            deadline_type: "NONE",
            schedule: "Work Hours",
        },
        name: matcher::match_key(issue),
        workspace_id: workspace_id.to_string(),
        description: format!("{browse_base}/browse/{}", issue.key),
        priority: motion_priority(issue.priority),
        labels: [ORIGIN_LABEL],
        assignee_id: assignee_id.to_string(),
    }
}

/// Runs one limited call, applying the 429 backoff-and-retry policy.
///
/// Every attempt, including the read retry, re-enters the limiter so the
/// rolling-window bound holds across retries.
fn throttled<T>(
    limiter: &RollingWindow,
    clock: &dyn Clock,
    kind: CallKind,
    mut call: impl FnMut() -> Result<(u16, T), TargetError>,
) -> Result<(u16, T), TargetError> {
    limiter.admit();
    let (status, body) = call()?;
    if status != 429 {
        return Ok((status, body));
    }

    tracing::warn!("rate limit exceeded upstream, backing off");
    clock.pause(RATE_LIMIT_BACKOFF);
    match kind {
        CallKind::Mutation => Err(TargetError::RateLimited),
        CallKind::Read => {
            limiter.admit();
            let (status, body) = call()?;
            if status == 429 {
                Err(TargetError::RateLimited)
            } else {
                Ok((status, body))
            }
        }
    }
}

/// Top-level task list response.
#[derive(Deserialize)]
struct TasksResponse {
    #[serde(default)]
    tasks: Vec<RawTask>,
}

/// Top-level user list response.
#[derive(Deserialize)]
struct UsersResponse {
    #[serde(default)]
    users: Vec<RawUser>,
}

/// A user record from the service.
#[derive(Deserialize)]
struct RawUser {
    id: String,
    name: String,
}

/// A status that may arrive as a bare string or a `{ "name": ... }`
/// object depending on the endpoint.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawStatus {
    Name(String),
    Object {
        name: String,
    },
}

impl RawStatus {
    fn into_name(self) -> String {
        match self {
            Self::Name(name) | Self::Object { name } => name,
        }
    }
}

/// A task record from the service.
#[derive(Deserialize)]
struct RawTask {
    id: String,
    name: String,
    #[serde(default)]
    assignees: Vec<RawUser>,
    status: Option<RawStatus>,
}

impl From<RawTask> for Task {
    fn from(raw: RawTask) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            status: raw.status.map(RawStatus::into_name).unwrap_or_default(),
            assignees: raw
                .assignees
                .into_iter()
                .map(|user| TaskAssignee { id: user.id, name: user.name })
                .collect(),
        }
    }
}

/// Live task service for one workspace.
///
/// The user directory is cached after the first successful fetch for the
/// adapter's lifetime; adapters are rebuilt each cycle, so the cache is
/// effectively per-cycle.
pub struct MotionService {
    client: Client,
    api_url: String,
    api_key: String,
    workspace_id: String,
    browse_base: String,
    clock: Arc<dyn Clock>,
    alerts: Arc<dyn AlertSink>,
    limiter: RollingWindow,
    users: Mutex<Option<Vec<User>>>,
}

impl MotionService {
    /// Creates a service from connection settings.
    ///
    /// `browse_base` is the tracker's base URL, used for issue deep links
    /// in task descriptions.
    #[must_use]
    pub fn new(
        config: &MotionConfig,
        browse_base: &str,
        clock: Arc<dyn Clock>,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        let limiter = RollingWindow::new(
            RATE_LIMIT_CALLS,
            TimeDelta::seconds(RATE_LIMIT_WINDOW_SECS),
            clock.clone(),
        );
        Self {
            client: Client::new(),
            api_url: config.url.clone(),
            api_key: config.api_key.clone(),
            workspace_id: config.workspace_id.clone(),
            browse_base: browse_base.to_string(),
            clock,
            alerts,
            limiter,
            users: Mutex::new(None),
        }
    }

    fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<(u16, String), TargetError> {
        let response = self
            .client
            .get(format!("{}{path}", self.api_url))
            .header("Accept", "application/json")
            .header("X-API-Key", &self.api_key)
            .query(params)
            .send()
            .map_err(|err| TargetError::Transport(err.to_string()))?;
        read_response(response)
    }

    fn post(&self, path: &str, body: &serde_json::Value) -> Result<(u16, String), TargetError> {
        let response = self
            .client
            .post(format!("{}{path}", self.api_url))
            .header("Accept", "application/json")
            .header("X-API-Key", &self.api_key)
            .json(body)
            .send()
            .map_err(|err| TargetError::Transport(err.to_string()))?;
        read_response(response)
    }

    fn patch(&self, path: &str, body: &serde_json::Value) -> Result<(u16, String), TargetError> {
        let response = self
            .client
            .patch(format!("{}{path}", self.api_url))
            .header("Accept", "application/json")
            .header("X-API-Key", &self.api_key)
            .json(body)
            .send()
            .map_err(|err| TargetError::Transport(err.to_string()))?;
        read_response(response)
    }

    /// Logs and reports a failed call, passing the error through.
    fn fail(&self, function: &str, error: TargetError) -> TargetError {
        tracing::warn!(%error, function, "scheduling service call failed");
        self.alerts.report(function, &error.to_string());
        error
    }

    fn parse_task(&self, function: &str, body: &str) -> Result<Task, TargetError> {
        let raw: RawTask = serde_json::from_str(body).map_err(|err| {
            self.fail(function, TargetError::Transport(format!("malformed task response: {err}")))
        })?;
        Ok(Task::from(raw))
    }
}

fn read_response(response: reqwest::blocking::Response) -> Result<(u16, String), TargetError> {
    let status = response.status().as_u16();
    let body = response.text().map_err(|err| TargetError::Transport(err.to_string()))?;
    Ok((status, body))
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

impl TaskService for MotionService {
    fn fetch_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, TargetError> {
        let mut params = vec![("workspaceId", self.workspace_id.as_str())];
        if let TaskFilter::Assignee(id) = filter {
            params.push(("assigneeId", id.as_str()));
        }

        let (status, body) =
            throttled(&self.limiter, &*self.clock, CallKind::Read, || {
                self.get("/v1/tasks", &params)
            })
            .map_err(|err| self.fail("fetch_tasks", err))?;
        if !is_success(status) {
            return Err(self.fail("fetch_tasks", TargetError::Http(status)));
        }

        let parsed: TasksResponse = serde_json::from_str(&body).map_err(|err| {
            self.fail(
                "fetch_tasks",
                TargetError::Transport(format!("malformed tasks response: {err}")),
            )
        })?;
        Ok(parsed.tasks.into_iter().map(Task::from).collect())
    }

    fn fetch_users(&self) -> Result<Vec<User>, TargetError> {
        if let Some(cached) =
            self.users.lock().unwrap_or_else(PoisonError::into_inner).as_ref()
        {
            return Ok(cached.clone());
        }

        let params = [("workspaceId", self.workspace_id.as_str())];
        let (status, body) =
            throttled(&self.limiter, &*self.clock, CallKind::Read, || {
                self.get("/v1/users", &params)
            })
            .map_err(|err| self.fail("fetch_users", err))?;
        if !is_success(status) {
            return Err(self.fail("fetch_users", TargetError::Http(status)));
        }

        let parsed: UsersResponse = serde_json::from_str(&body).map_err(|err| {
            self.fail(
                "fetch_users",
                TargetError::Transport(format!("malformed users response: {err}")),
            )
        })?;
        let users: Vec<User> = parsed
            .users
            .into_iter()
            .map(|user| User { id: user.id, name: user.name })
            .collect();
        *self.users.lock().unwrap_or_else(PoisonError::into_inner) = Some(users.clone());
        Ok(users)
    }

    fn create_task(&self, issue: &Issue, assignee_id: &str) -> Result<Task, TargetError> {
        let payload = creation_body(
            issue,
            assignee_id,
            &self.workspace_id,
            &self.browse_base,
            self.clock.now(),
        );
        let body = serde_json::to_value(&payload).map_err(|err| {
            self.fail("create_task", TargetError::Transport(format!("payload encoding: {err}")))
        })?;

        let result = throttled(&self.limiter, &*self.clock, CallKind::Mutation, || {
            self.post("/v1/tasks", &body)
        });
        // Fixed propagation pause after every creation attempt, so the
        // task is visible to the fetches in later passes.
        self.clock.pause(CREATE_PROPAGATION_PAUSE);

        let (status, text) = result.map_err(|err| self.fail("create_task", err))?;
        if !is_success(status) {
            return Err(self.fail("create_task", TargetError::Http(status)));
        }
        self.parse_task("create_task", &text)
    }

    fn update_status(&self, task_id: &str, status: &str) -> Result<Task, TargetError> {
        let body = serde_json::json!({ "status": status });
        let (code, text) =
            throttled(&self.limiter, &*self.clock, CallKind::Mutation, || {
                self.patch(&format!("/v1/tasks/{task_id}"), &body)
            })
            .map_err(|err| self.fail("update_status", err))?;
        if !is_success(code) {
            return Err(self.fail("update_status", TargetError::Http(code)));
        }
        self.parse_task("update_status", &text)
    }

    fn update_assignee(&self, task_id: &str, assignee_id: &str) -> Result<Task, TargetError> {
        let body = serde_json::json!({ "assigneeId": assignee_id });
        let (code, text) =
            throttled(&self.limiter, &*self.clock, CallKind::Mutation, || {
                self.patch(&format!("/v1/tasks/{task_id}"), &body)
            })
            .map_err(|err| self.fail("update_assignee", err))?;
        if code == 404 {
            // The task vanished between the fetch and this update. Skip
            // it; next cycle simply won't see it.
            tracing::info!(task_id, "task gone upstream, skipping assignee update");
            return Err(TargetError::NotFoundUpstream);
        }
        if !is_success(code) {
            return Err(self.fail("update_assignee", TargetError::Http(code)));
        }
        self.parse_task("update_assignee", &text)
    }
}

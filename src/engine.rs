//! Reconciliation engine: the three passes of one cycle.
//!
//! A cycle runs strictly in order (create missing tasks, close orphaned
//! tasks, re-sync assignees) with a settle barrier after each pass so
//! the scheduling service's eventual consistency window (assumed under
//! 60s) has closed before the next pass reads. Item-level failures are
//! logged, reported, and skipped; fetch-level failures degrade to empty
//! result sets. Nothing here aborts a cycle.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::matcher;
use crate::ports::{
    AlertSink, Clock, Issue, IssueSource, Task, TaskFilter, TaskService, User,
};

/// Status applied to tasks whose issue is gone.
const CLOSED_STATUS: &str = "Completed";

/// Barriers separating the passes of a cycle.
///
/// Each barrier is a fixed pause letting upstream state settle. This is
/// a best-effort heuristic, not a transactional guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlePoint {
    /// After the create pass, before closing orphans.
    AfterCreate,
    /// After the close pass, before re-syncing assignees.
    AfterClose,
    /// After the assignee pass, before the cycle ends.
    AfterSync,
}

impl SettlePoint {
    /// How long this barrier pauses.
    #[must_use]
    pub fn delay(self) -> Duration {
        Duration::from_secs(60)
    }

    fn label(self) -> &'static str {
        match self {
            Self::AfterCreate => "after-create",
            Self::AfterClose => "after-close",
            Self::AfterSync => "after-sync",
        }
    }
}

/// State threaded explicitly through the passes of one cycle.
///
/// Nothing here outlives the cycle; the next cycle starts from scratch.
pub struct CycleState {
    /// Correlation id attached to every log line of this cycle.
    pub cycle_id: Uuid,
    /// User directory fetched once at cycle start; empty on fetch
    /// failure, which makes every resolution fail (and skip) this cycle.
    pub users: Vec<User>,
    /// Open issues accumulated across all tracked assignees during the
    /// create pass; the close and assignee passes read from here.
    pub open_issues: Vec<Issue>,
}

impl CycleState {
    /// Resolves a display name to a service user id by exact match.
    ///
    /// `None` is a legitimate outcome meaning "do not act on this item
    /// this cycle."
    #[must_use]
    pub fn resolve_user_id(&self, display_name: &str) -> Option<&str> {
        self.users.iter().find(|user| user.name == display_name).map(|user| user.id.as_str())
    }
}

/// What one cycle did, for logging and tests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Tasks created for issues with no mirror.
    pub created: usize,
    /// Tasks closed because their issue is gone.
    pub closed: usize,
    /// Tasks whose assignee was corrected.
    pub reassigned: usize,
    /// Items skipped because of resolution or call failures.
    pub skipped: usize,
}

/// Drives one reconciliation cycle over the injected ports.
///
/// The engine is rebuilt per cycle together with its adapters; it holds
/// no state across cycles.
pub struct Engine {
    source: Arc<dyn IssueSource>,
    target: Arc<dyn TaskService>,
    clock: Arc<dyn Clock>,
    alerts: Arc<dyn AlertSink>,
    /// Tracked assignees: tracker account id to display name.
    assignees: BTreeMap<String, String>,
}

impl Engine {
    /// Creates an engine over the given ports and tracked assignees.
    #[must_use]
    pub fn new(
        source: Arc<dyn IssueSource>,
        target: Arc<dyn TaskService>,
        clock: Arc<dyn Clock>,
        alerts: Arc<dyn AlertSink>,
        assignees: BTreeMap<String, String>,
    ) -> Self {
        Self { source, target, clock, alerts, assignees }
    }

    /// Runs one full cycle and reports what it did.
    pub fn run_cycle(&self) -> CycleReport {
        let cycle_id = Uuid::new_v4();
        let span = tracing::info_span!("cycle", id = %cycle_id);
        let _guard = span.enter();

        let users = self.target.fetch_users().unwrap_or_else(|error| {
            tracing::warn!(%error, "user directory unavailable, resolutions will skip");
            Vec::new()
        });
        let mut state = CycleState { cycle_id, users, open_issues: Vec::new() };
        let mut report = CycleReport::default();

        self.create_pass(&mut state, &mut report);
        self.settle(SettlePoint::AfterCreate);

        let tasks = self.target.fetch_tasks(&TaskFilter::All).unwrap_or_else(|error| {
            tracing::warn!(%error, "global task list unavailable, close and sync passes skip");
            Vec::new()
        });

        self.close_pass(&state, &tasks, &mut report);
        self.settle(SettlePoint::AfterClose);

        self.sync_assignees_pass(&state, &tasks, &mut report);
        self.settle(SettlePoint::AfterSync);

        tracing::info!(
            created = report.created,
            closed = report.closed,
            reassigned = report.reassigned,
            skipped = report.skipped,
            "cycle complete"
        );
        report
    }

    /// Pass 1: mirror issues that have no task yet.
    ///
    /// Also accumulates every fetched open issue into the cycle state;
    /// the later passes decide against that union, not against any one
    /// assignee's query.
    fn create_pass(&self, state: &mut CycleState, report: &mut CycleReport) {
        let mut to_create: Vec<Issue> = Vec::new();

        for (tracker_id, display_name) in &self.assignees {
            let issues = self
                .source
                .fetch_issues(&crate::ports::issues::open_issues_filter(tracker_id))
                .unwrap_or_else(|error| {
                    tracing::warn!(%error, assignee = %display_name, "issue fetch degraded to empty");
                    Vec::new()
                });

            // Diff against this assignee's tasks when their id resolves,
            // against the whole workspace otherwise.
            let filter = state.resolve_user_id(display_name).map_or(TaskFilter::All, |id| {
                TaskFilter::Assignee(id.to_string())
            });
            let tasks = self.target.fetch_tasks(&filter).unwrap_or_else(|error| {
                tracing::warn!(%error, assignee = %display_name, "task fetch degraded to empty");
                Vec::new()
            });

            to_create.extend(matcher::missing_issues(&issues, &tasks).into_iter().cloned());
            state.open_issues.extend(issues);
        }

        for issue in &to_create {
            let Some(assignee_id) =
                issue.assignee.as_deref().and_then(|name| state.resolve_user_id(name))
            else {
                let who = issue.assignee.as_deref().unwrap_or("Not Assigned");
                tracing::warn!(issue = %issue.key, assignee = who, "no user id for assignee, skipping creation");
                self.alerts.report(
                    "create_pass",
                    &format!("[cycle {}] no user id for '{who}' on {}", state.cycle_id, issue.key),
                );
                report.skipped += 1;
                continue;
            };
            match self.target.create_task(issue, assignee_id) {
                Ok(task) => {
                    tracing::info!(issue = %issue.key, task = %task.id, "created task");
                    report.created += 1;
                }
                Err(error) => {
                    tracing::warn!(issue = %issue.key, %error, "task creation failed, skipping");
                    report.skipped += 1;
                }
            }
        }
    }

    /// Pass 2: close tasks whose match key has no open issue anywhere.
    fn close_pass(&self, state: &CycleState, tasks: &[Task], report: &mut CycleReport) {
        let open_keys: HashSet<String> = matcher::key_set(&state.open_issues);

        for task in tasks {
            if open_keys.contains(&task.name) {
                continue;
            }
            match self.target.update_status(&task.id, CLOSED_STATUS) {
                Ok(_) => {
                    tracing::info!(task = %task.id, name = %task.name, "closed orphaned task");
                    report.closed += 1;
                }
                Err(error) => {
                    tracing::warn!(task = %task.id, %error, "close failed, skipping");
                    report.skipped += 1;
                }
            }
        }
    }

    /// Pass 3: point each task at its issue's current assignee.
    fn sync_assignees_pass(&self, state: &CycleState, tasks: &[Task], report: &mut CycleReport) {
        for task in tasks {
            let Some(issue) =
                state.open_issues.iter().find(|issue| matcher::match_key(issue) == task.name)
            else {
                continue;
            };
            if matcher::assignees_in_sync(task, issue) {
                continue;
            }

            let who = issue.assignee.as_deref().unwrap_or("Not Assigned");
            let Some(assignee_id) = issue.assignee.as_deref().and_then(|n| state.resolve_user_id(n))
            else {
                tracing::warn!(task = %task.id, assignee = who, "assignee mismatch but no user id, leaving as is");
                self.alerts.report(
                    "sync_assignees",
                    &format!("[cycle {}] no user id for '{who}' on {}", state.cycle_id, task.name),
                );
                report.skipped += 1;
                continue;
            };
            match self.target.update_assignee(&task.id, assignee_id) {
                Ok(_) => {
                    tracing::info!(task = %task.id, assignee = who, "re-assigned task");
                    report.reassigned += 1;
                }
                Err(error) => {
                    tracing::warn!(task = %task.id, %error, "re-assign failed, skipping");
                    report.skipped += 1;
                }
            }
        }
    }

    /// Pauses at a named barrier between passes.
    fn settle(&self, point: SettlePoint) {
        tracing::debug!(barrier = point.label(), "settling");
        self.clock.pause(point.delay());
    }
}

//! Identity matching between tracker issues and scheduled tasks.
//!
//! The sole join key is the string `"{summary} ({key})"`. A task created
//! by this system always carries exactly that string as its name, so key
//! equality is both the create-set predicate and the orphan predicate.

use std::collections::HashSet;

use crate::ports::{Issue, Task};

/// Builds the match key for an issue.
///
/// Stable for a given issue snapshot; the issue key makes it unique in
/// practice even when two issues share a summary.
#[must_use]
pub fn match_key(issue: &Issue) -> String {
    format!("{} ({})", issue.summary, issue.key)
}

/// Returns the issues that have no corresponding task.
///
/// An issue corresponds to a task when the task's name equals the
/// issue's match key.
#[must_use]
pub fn missing_issues<'a>(issues: &'a [Issue], tasks: &[Task]) -> Vec<&'a Issue> {
    let task_names: HashSet<&str> = tasks.iter().map(|t| t.name.as_str()).collect();
    issues.iter().filter(|issue| !task_names.contains(match_key(issue).as_str())).collect()
}

/// Builds the set of match keys for a slice of issues.
#[must_use]
pub fn key_set(issues: &[Issue]) -> HashSet<String> {
    issues.iter().map(match_key).collect()
}

/// Whether a task's assignee agrees with its issue's assignee.
///
/// Compares the task's first assignee display name against the issue's
/// assignee display name. Any mismatch, including one side being absent,
/// counts as out of sync; extra assignees beyond the first are ignored.
#[must_use]
pub fn assignees_in_sync(task: &Task, issue: &Issue) -> bool {
    let task_name = task.assignees.first().map(|a| a.name.as_str());
    task_name == issue.assignee.as_deref()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::TaskAssignee;

    fn issue(key: &str, summary: &str, assignee: Option<&str>) -> Issue {
        Issue {
            key: key.to_string(),
            summary: summary.to_string(),
            assignee: assignee.map(String::from),
            priority: None,
            status: "In Progress".to_string(),
        }
    }

    fn task(name: &str, assignee: Option<&str>) -> Task {
        Task {
            id: "t1".to_string(),
            name: name.to_string(),
            status: "In Progress".to_string(),
            assignees: assignee
                .map(|n| vec![TaskAssignee { id: "u1".to_string(), name: n.to_string() }])
                .unwrap_or_default(),
        }
    }

    #[test]
    fn match_key_combines_summary_and_key() {
        let key = match_key(&issue("OPS-12", "Fix bolt", None));
        assert_eq!(key, "Fix bolt (OPS-12)");
    }

    #[test]
    fn match_key_is_stable() {
        let i = issue("OPS-12", "Fix bolt", Some("Jane Doe"));
        assert_eq!(match_key(&i), match_key(&i));
    }

    #[test]
    fn missing_issues_ignores_mirrored_ones() {
        let issues = vec![issue("OPS-12", "Fix bolt", None), issue("OPS-13", "Oil hinge", None)];
        let tasks = vec![task("Fix bolt (OPS-12)", None)];

        let missing = missing_issues(&issues, &tasks);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].key, "OPS-13");
    }

    #[test]
    fn missing_issues_empty_when_all_mirrored() {
        let issues = vec![issue("OPS-12", "Fix bolt", None)];
        let tasks = vec![task("Fix bolt (OPS-12)", None)];
        assert!(missing_issues(&issues, &tasks).is_empty());
    }

    #[test]
    fn same_summary_different_keys_do_not_collide() {
        let issues = vec![issue("OPS-12", "Fix bolt", None), issue("OPS-99", "Fix bolt", None)];
        let tasks = vec![task("Fix bolt (OPS-12)", None)];

        let missing = missing_issues(&issues, &tasks);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].key, "OPS-99");
    }

    #[test]
    fn assignees_in_sync_on_equal_names() {
        let t = task("Fix bolt (OPS-12)", Some("Jane Doe"));
        let i = issue("OPS-12", "Fix bolt", Some("Jane Doe"));
        assert!(assignees_in_sync(&t, &i));
    }

    #[test]
    fn assignees_out_of_sync_on_differing_names() {
        let t = task("Fix bolt (OPS-12)", Some("Jane Doe"));
        let i = issue("OPS-12", "Fix bolt", Some("John Smith"));
        assert!(!assignees_in_sync(&t, &i));
    }

    #[test]
    fn absent_side_counts_as_out_of_sync() {
        let unassigned_task = task("Fix bolt (OPS-12)", None);
        let assigned_issue = issue("OPS-12", "Fix bolt", Some("Jane Doe"));
        assert!(!assignees_in_sync(&unassigned_task, &assigned_issue));

        let assigned_task = task("Fix bolt (OPS-12)", Some("Jane Doe"));
        let unassigned_issue = issue("OPS-12", "Fix bolt", None);
        assert!(!assignees_in_sync(&assigned_task, &unassigned_issue));

        assert!(assignees_in_sync(&unassigned_task, &unassigned_issue));
    }
}

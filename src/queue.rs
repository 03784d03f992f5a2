//! C3: Task Queue Policy — fair selection of the next runnable task and the
//! retry-vs-terminal-block decision (§4.3).

use crate::models::{Task, TaskStatus};

/// Returns the index of the next task to run, or `None` if the queue is
/// quiescent.
///
/// Selection order (P3): the lowest-index `todo` task; if none, the
/// lowest-index `failed` task whose `attempts < max_attempts`; otherwise
/// `None`. `priority` is informational only and never reorders the scan.
pub fn next_runnable(tasks: &[Task], max_attempts: u32) -> Option<usize> {
    if let Some(idx) = tasks.iter().position(|t| t.status == TaskStatus::Todo) {
        return Some(idx);
    }
    tasks
        .iter()
        .position(|t| t.status == TaskStatus::Failed && t.attempts < max_attempts)
}

/// The status a task transitions to after a failed agent execution, given
/// its attempt count *after* this attempt is counted (§4.3, I2).
pub fn status_after_failure(attempts_after: u32, max_attempts: u32) -> TaskStatus {
    if attempts_after >= max_attempts {
        TaskStatus::Blocked
    } else {
        TaskStatus::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;

    fn task(id: &str, status: TaskStatus, attempts: u32) -> Task {
        Task {
            id: id.to_string(),
            title: "t".to_string(),
            spec: "s".to_string(),
            verify: vec!["echo ok".to_string()],
            status,
            model_hint: "sonnet".to_string(),
            priority: String::new(),
            attempts,
            last_error: None,
            source: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            extra: HashMap::new(),
        }
    }

    #[test]
    fn prefers_lowest_index_todo() {
        let tasks = vec![
            task("a", TaskStatus::Done, 0),
            task("b", TaskStatus::Todo, 0),
            task("c", TaskStatus::Todo, 0),
        ];
        assert_eq!(next_runnable(&tasks, 3), Some(1));
    }

    #[test]
    fn falls_back_to_failed_under_cap() {
        let tasks = vec![
            task("a", TaskStatus::Done, 0),
            task("b", TaskStatus::Failed, 2),
            task("c", TaskStatus::Failed, 0),
        ];
        assert_eq!(next_runnable(&tasks, 3), Some(1));
    }

    #[test]
    fn excludes_failed_at_or_over_cap() {
        let tasks = vec![task("a", TaskStatus::Failed, 3)];
        assert_eq!(next_runnable(&tasks, 3), None);
    }

    #[test]
    fn none_when_nothing_runnable() {
        let tasks = vec![
            task("a", TaskStatus::Done, 0),
            task("b", TaskStatus::Blocked, 3),
            task("c", TaskStatus::InProgress, 0),
        ];
        assert_eq!(next_runnable(&tasks, 3), None);
    }

    #[test]
    fn priority_does_not_reorder() {
        let mut first = task("a", TaskStatus::Todo, 0);
        first.priority = "low".to_string();
        let mut second = task("b", TaskStatus::Todo, 0);
        second.priority = "high".to_string();
        let tasks = vec![first, second];
        assert_eq!(next_runnable(&tasks, 3), Some(0));
    }

    // P6: a task only reaches `blocked` once attempts >= max_attempts.
    #[test]
    fn status_after_failure_blocks_at_cap() {
        assert_eq!(status_after_failure(2, 2), TaskStatus::Blocked);
        assert_eq!(status_after_failure(1, 2), TaskStatus::Failed);
    }
}

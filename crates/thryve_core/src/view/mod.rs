//! Read-only projections over a working set snapshot.
//!
//! All functions are pure: no I/O, no mutation, and safe to call from any
//! thread holding a snapshot.

use crate::model::focus_session::FocusSession;
use crate::model::job_application::{ApplicationStatus, JobApplication};
use crate::model::task::{Category, Task};
use crate::pipeline::WorkingSet;

/// Tasks in one category, in working set order.
pub fn by_category(set: &WorkingSet, category: Category) -> Vec<&Task> {
    set.tasks()
        .iter()
        .filter(|task| task.category == category)
        .collect()
}

/// Incomplete tasks, in working set order.
pub fn pending_tasks(set: &WorkingSet) -> Vec<&Task> {
    set.tasks().iter().filter(|task| !task.is_completed).collect()
}

/// Incomplete sessions by scheduled time ascending; unscheduled sessions
/// sort last.
pub fn upcoming_focus_sessions(set: &WorkingSet) -> Vec<&FocusSession> {
    let mut sessions: Vec<&FocusSession> = set
        .focus_sessions()
        .iter()
        .filter(|session| !session.is_completed)
        .collect();
    sessions.sort_by_key(|session| (session.scheduled_at.is_none(), session.scheduled_at));
    sessions
}

/// Daily agenda: optional category filter, incomplete tasks first, each
/// group by due time ascending.
pub fn my_day(set: &WorkingSet, filter: Option<Category>) -> Vec<&Task> {
    let mut tasks: Vec<&Task> = set
        .tasks()
        .iter()
        .filter(|task| filter.map_or(true, |category| task.category == category))
        .collect();
    tasks.sort_by_key(|task| (task.is_completed, task.due_at));
    tasks
}

/// Job applications by deadline ascending, optionally limited to one status.
pub fn job_applications(
    set: &WorkingSet,
    status: Option<ApplicationStatus>,
) -> Vec<&JobApplication> {
    let mut applications: Vec<&JobApplication> = set
        .job_applications()
        .iter()
        .filter(|application| status.map_or(true, |wanted| application.status == wanted))
        .collect();
    applications.sort_by_key(|application| application.deadline);
    applications
}

/// Completion counters for the progress screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskProgress {
    pub total: usize,
    pub completed: usize,
    /// Incomplete and due at or after `now`.
    pub pending: usize,
    /// Incomplete and due before `now`.
    pub overdue: usize,
}

impl TaskProgress {
    /// Completed share in `0.0..=1.0`; `0.0` for an empty set.
    pub fn completion_ratio(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.completed as f64 / self.total as f64
    }
}

pub fn task_progress(set: &WorkingSet, now_ms: i64) -> TaskProgress {
    set.tasks()
        .iter()
        .fold(TaskProgress::default(), |mut progress, task| {
            progress.total += 1;
            if task.is_completed {
                progress.completed += 1;
            } else if task.due_at < now_ms {
                progress.overdue += 1;
            } else {
                progress.pending += 1;
            }
            progress
        })
}

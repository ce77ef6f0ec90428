use thryve_core::db::open_db_in_memory;
use thryve_core::view::{
    by_category, job_applications, my_day, pending_tasks, task_progress, upcoming_focus_sessions,
};
use thryve_core::{
    ApplicationStatus, Category, FocusSession, JobApplication, Pipeline, PipelineConfig,
    SessionKind, SqliteGateway, Task, TaskSource, WorkingSet,
};
use std::sync::Arc;

const NINE_AM: i64 = 1_700_038_800_000;
const TEN_AM: i64 = 1_700_042_400_000;

fn build_set(tasks: Vec<Task>, sessions: Vec<FocusSession>) -> Arc<WorkingSet> {
    let conn = open_db_in_memory().unwrap();
    let mut pipeline = Pipeline::new(SqliteGateway::try_new(&conn).unwrap(), PipelineConfig::default());
    pipeline.load_initial().unwrap();
    for task in tasks {
        pipeline.upsert_task(task).unwrap();
    }
    for session in sessions {
        pipeline.schedule_focus_session(session).unwrap();
    }
    pipeline.snapshot()
}

fn task(title: &str, due_at: i64, category: Category, done: bool) -> Task {
    let mut task = Task::new(title, due_at, category, TaskSource::Manual);
    task.is_completed = done;
    task
}

#[test]
fn upcoming_sessions_sort_by_time_with_unscheduled_last() {
    let a = FocusSession::new("A", 60, SessionKind::QuickReset).unwrap();
    let b = FocusSession::new("B", 60, SessionKind::FocusSession)
        .unwrap()
        .scheduled_at(TEN_AM);
    let c = FocusSession::new("C", 60, SessionKind::MindfulBreak)
        .unwrap()
        .scheduled_at(NINE_AM);
    let mut done = FocusSession::new("done", 60, SessionKind::MindfulBreak)
        .unwrap()
        .scheduled_at(0);
    done.is_completed = true;

    let set = build_set(vec![], vec![a, b, c, done]);
    let titles: Vec<&str> = upcoming_focus_sessions(&set)
        .iter()
        .map(|session| session.title.as_str())
        .collect();
    assert_eq!(titles, vec!["C", "B", "A"]);
}

#[test]
fn by_category_partitions_tasks() {
    let set = build_set(
        vec![
            task("report", 1, Category::Work, false),
            task("gym", 2, Category::Habits, true),
            task("apply", 3, Category::Jobs, false),
            task("review", 4, Category::Work, true),
        ],
        vec![],
    );

    let work: Vec<&str> = by_category(&set, Category::Work)
        .iter()
        .map(|task| task.title.as_str())
        .collect();
    assert_eq!(work, vec!["report", "review"]);
    assert!(by_category(&set, Category::Personal).is_empty());

    let total: usize = Category::ALL
        .iter()
        .map(|category| by_category(&set, *category).len())
        .sum();
    assert_eq!(total, set.tasks().len());
}

#[test]
fn my_day_lists_incomplete_first_then_by_due() {
    let set = build_set(
        vec![
            task("done early", 1, Category::Work, true),
            task("late", 30, Category::Work, false),
            task("soon", 10, Category::Personal, false),
        ],
        vec![],
    );

    let all: Vec<&str> = my_day(&set, None)
        .iter()
        .map(|task| task.title.as_str())
        .collect();
    assert_eq!(all, vec!["soon", "late", "done early"]);

    let work: Vec<&str> = my_day(&set, Some(Category::Work))
        .iter()
        .map(|task| task.title.as_str())
        .collect();
    assert_eq!(work, vec!["late", "done early"]);
}

#[test]
fn progress_counts_completed_pending_and_overdue() {
    let now = 1_000;
    let set = build_set(
        vec![
            task("done", 10, Category::Work, true),
            task("overdue", 999, Category::Work, false),
            task("due now", 1_000, Category::Work, false),
            task("future", 5_000, Category::Jobs, false),
        ],
        vec![],
    );

    let progress = task_progress(&set, now);
    assert_eq!(progress.total, 4);
    assert_eq!(progress.completed, 1);
    assert_eq!(progress.overdue, 1);
    assert_eq!(progress.pending, 2);
    assert_eq!(progress.completion_ratio(), 0.25);
    assert_eq!(pending_tasks(&set).len(), 3);
}

#[test]
fn job_applications_filter_by_status_and_sort_by_deadline() {
    let conn = open_db_in_memory().unwrap();
    let mut pipeline = Pipeline::new(SqliteGateway::try_new(&conn).unwrap(), PipelineConfig::default());
    pipeline.load_initial().unwrap();
    let entries = [
        ("Backend", "Hooli", 900, ApplicationStatus::Applied),
        ("SRE", "Initech", 300, ApplicationStatus::InterviewScheduled),
        ("Designer", "Globex", 100, ApplicationStatus::Applied),
        ("Intern", "Umbrella", 50, ApplicationStatus::Rejected),
    ];
    for (title, company, deadline, status) in entries {
        let application = JobApplication::new(title, company, deadline)
            .unwrap()
            .with_status(status);
        pipeline.upsert_job_application(application).unwrap();
    }
    let set = pipeline.snapshot();

    let companies = |status| -> Vec<String> {
        job_applications(&set, status)
            .iter()
            .map(|application| application.company.clone())
            .collect()
    };
    assert_eq!(companies(None), vec!["Umbrella", "Globex", "Initech", "Hooli"]);
    assert_eq!(companies(Some(ApplicationStatus::Applied)), vec!["Globex", "Hooli"]);
    assert_eq!(
        companies(Some(ApplicationStatus::InterviewScheduled)),
        vec!["Initech"]
    );
}

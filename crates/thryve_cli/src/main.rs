//! `thryve` command-line entry point.
//!
//! # Responsibility
//! - Wire configuration, storage and the aggregation pipeline together.
//! - Offer a small command surface for local checks of the core.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use log::info;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use thryve_core::db::open_db;
use thryve_core::mindfulness::micro_reset_prompt;
use thryve_core::model::job_application::DEFAULT_DEADLINE_WINDOW_MS;
use thryve_core::view::{
    by_category, job_applications, my_day, task_progress, upcoming_focus_sessions,
};
use thryve_core::{
    init_from_config, ApplicationStatus, Category, CoreConfig, FocusSession, GmailSource,
    IngestReport, JobApplication, Pipeline, PipelineError, Priority, SessionKind, SqliteGateway,
    StaticToken, Task, TaskSource,
};
use uuid::Uuid;

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Debug, Parser)]
#[command(name = "thryve", version, about = "Tasks, habits and focus sessions")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// SQLite database path; overrides `storage.db_path`.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print core linkage info.
    Ping,
    #[command(subcommand)]
    Task(TaskCommand),
    #[command(subcommand)]
    Focus(FocusCommand),
    #[command(subcommand)]
    Job(JobCommand),
    /// Agenda: open tasks first, then by due time.
    MyDay {
        #[arg(long, value_parser = parse_category)]
        category: Option<Category>,
    },
    /// Completed / pending / overdue counters.
    Progress,
    /// Pull recent Gmail messages into work tasks.
    SyncGmail {
        #[arg(long, env = "THRYVE_GMAIL_TOKEN", hide_env_values = true)]
        token: String,
    },
    /// Print a micro-reset prompt.
    Prompt,
}

#[derive(Debug, Subcommand)]
enum TaskCommand {
    Add {
        title: String,
        /// RFC 3339 timestamp or epoch milliseconds.
        #[arg(long, value_parser = parse_when)]
        due: i64,
        #[arg(long, value_parser = parse_category, default_value = "personal")]
        category: Category,
        #[arg(long, value_parser = parse_priority, default_value = "medium")]
        priority: Priority,
        #[arg(long, default_value = "")]
        description: String,
    },
    List {
        #[arg(long, value_parser = parse_category)]
        category: Option<Category>,
    },
    Toggle {
        id: Uuid,
    },
}

#[derive(Debug, Subcommand)]
enum FocusCommand {
    Schedule {
        title: String,
        #[arg(long)]
        secs: u32,
        #[arg(long, value_parser = parse_kind, default_value = "focus_session")]
        kind: SessionKind,
        #[arg(long, value_parser = parse_when)]
        at: Option<i64>,
        #[arg(long)]
        notes: Option<String>,
    },
    Complete {
        id: Uuid,
    },
    Upcoming,
}

#[derive(Debug, Subcommand)]
enum JobCommand {
    Add {
        title: String,
        #[arg(long)]
        company: String,
        /// RFC 3339 timestamp or epoch milliseconds; defaults to one week out.
        #[arg(long, value_parser = parse_when)]
        deadline: Option<i64>,
    },
    /// Applications by deadline, soonest first.
    List {
        #[arg(long, value_parser = parse_status)]
        status: Option<ApplicationStatus>,
    },
    Status {
        id: Uuid,
        #[arg(value_parser = parse_status)]
        status: ApplicationStatus,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    match &cli.command {
        Command::Ping => {
            println!("thryve_core ping={}", thryve_core::ping());
            println!("thryve_core version={}", thryve_core::core_version());
            return Ok(());
        }
        Command::Prompt => {
            let minute = Utc::now().timestamp().unsigned_abs() / 60;
            println!("{}", micro_reset_prompt(minute));
            return Ok(());
        }
        _ => {}
    }

    let mut config = match &cli.config {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::default(),
    };
    if let Some(db) = cli.db {
        config.storage.db_path = db;
    }
    init_from_config(&config.logging)?;

    let conn = open_db(&config.storage.db_path)?;
    let mut pipeline = Pipeline::new(SqliteGateway::try_new(&conn)?, config.pipeline_config());
    pipeline.load_initial()?;
    info!("event=cli_command module=cli status=start");

    match cli.command {
        Command::Ping | Command::Prompt => {}
        Command::Task(TaskCommand::Add {
            title,
            due,
            category,
            priority,
            description,
        }) => {
            let task = Task::new(title, due, category, TaskSource::Manual)
                .with_priority(priority)
                .with_description(description);
            let id = task.id;
            pipeline.upsert_task(task)?;
            println!("Task created: {id}");
        }
        Command::Task(TaskCommand::List { category }) => {
            let snapshot = pipeline.snapshot();
            let tasks = match category {
                Some(category) => by_category(&snapshot, category),
                None => snapshot.tasks().iter().collect(),
            };
            if tasks.is_empty() {
                println!("No tasks.");
            }
            for task in tasks {
                print_task(task);
            }
        }
        Command::Task(TaskCommand::Toggle { id }) => {
            let task = pipeline.toggle_completion(id)?;
            let state = if task.is_completed { "completed" } else { "reopened" };
            println!("Task {state}: {id}");
        }
        Command::Focus(FocusCommand::Schedule {
            title,
            secs,
            kind,
            at,
            notes,
        }) => {
            let mut session = FocusSession::new(title, secs, kind)?;
            session.scheduled_at = at;
            session.notes = notes;
            let id = session.id;
            pipeline.schedule_focus_session(session)?;
            println!("Focus session scheduled: {id}");
        }
        Command::Focus(FocusCommand::Complete { id }) => {
            pipeline.complete_focus_session(id)?;
            println!("Focus session completed: {id}");
        }
        Command::Focus(FocusCommand::Upcoming) => {
            let snapshot = pipeline.snapshot();
            let sessions = upcoming_focus_sessions(&snapshot);
            if sessions.is_empty() {
                println!("No upcoming focus sessions.");
            }
            for session in sessions {
                let when = session
                    .scheduled_at
                    .map_or_else(|| "unscheduled".to_string(), format_time);
                println!(
                    "{}  {:<16} {:>5}s  {}  {}",
                    session.id,
                    when,
                    session.duration_secs,
                    session.kind.label(),
                    session.title
                );
            }
        }
        Command::Job(JobCommand::Add {
            title,
            company,
            deadline,
        }) => {
            let deadline = deadline
                .unwrap_or_else(|| Utc::now().timestamp_millis() + DEFAULT_DEADLINE_WINDOW_MS);
            let application = JobApplication::new(title, company, deadline)?;
            let id = application.id;
            pipeline.upsert_job_application(application)?;
            println!("Job application created: {id}");
        }
        Command::Job(JobCommand::List { status }) => {
            let snapshot = pipeline.snapshot();
            let applications = job_applications(&snapshot, status);
            if applications.is_empty() {
                println!("No job applications.");
            }
            for application in applications {
                println!(
                    "{}  {}  {:<20} {}  @ {}",
                    application.id,
                    format_time(application.deadline),
                    application.status.label(),
                    application.title,
                    application.company
                );
            }
        }
        Command::Job(JobCommand::Status { id, status }) => {
            let application = pipeline.update_application_status(id, status)?;
            println!("Job application {id}: {}", application.status.label());
        }
        Command::MyDay { category } => {
            let snapshot = pipeline.snapshot();
            for task in my_day(&snapshot, category) {
                print_task(task);
            }
        }
        Command::Progress => {
            let progress = task_progress(&pipeline.snapshot(), Utc::now().timestamp_millis());
            println!(
                "total={} completed={} pending={} overdue={} completion={:.0}%",
                progress.total,
                progress.completed,
                progress.pending,
                progress.overdue,
                progress.completion_ratio() * 100.0
            );
        }
        Command::SyncGmail { token } => {
            let mut source = GmailSource::new(
                &config.gmail,
                config.ingest.fetch_timeout(),
                Box::new(StaticToken::new(token)),
            );
            match pipeline.sync_source(&mut source) {
                Ok(report) => println!("{}", format_report(&report)),
                Err(PipelineError::FetchFailed { partial, error }) => {
                    println!("{} (aborted)", format_report(&partial));
                    return Err(error.into());
                }
                Err(PipelineError::IngestPersistFailed { partial, id, source }) => {
                    println!("{} (aborted)", format_report(&partial));
                    return Err(format!("failed to persist task {id}: {source}").into());
                }
                Err(other) => return Err(other.into()),
            }
        }
    }

    Ok(())
}

fn print_task(task: &Task) {
    let mark = if task.is_completed { "x" } else { " " };
    println!(
        "{}  [{mark}] {}  {:<8} {:<6} {}",
        task.id,
        format_time(task.due_at),
        task.category.as_str(),
        task.priority.as_str(),
        task.title
    );
}

fn format_report(report: &IngestReport) -> String {
    format!(
        "ingested={} updated={} unchanged={} skipped={}",
        report.ingested, report.updated, report.unchanged, report.skipped
    )
}

fn format_time(epoch_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(epoch_ms)
        .map(|time| time.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| epoch_ms.to_string())
}

fn parse_when(value: &str) -> Result<i64, String> {
    if let Ok(epoch_ms) = value.parse::<i64>() {
        return Ok(epoch_ms);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|time| time.timestamp_millis())
        .map_err(|err| format!("expected RFC 3339 time or epoch ms: {err}"))
}

fn parse_category(value: &str) -> Result<Category, String> {
    Category::parse(value).ok_or_else(|| {
        let known: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
        format!("unknown category `{value}`; expected {}", known.join("|"))
    })
}

fn parse_priority(value: &str) -> Result<Priority, String> {
    Priority::parse(value)
        .ok_or_else(|| format!("unknown priority `{value}`; expected low|medium|high"))
}

fn parse_kind(value: &str) -> Result<SessionKind, String> {
    SessionKind::parse(value).ok_or_else(|| {
        let known: Vec<&str> = SessionKind::ALL.iter().map(|k| k.as_str()).collect();
        format!("unknown session kind `{value}`; expected {}", known.join("|"))
    })
}

fn parse_status(value: &str) -> Result<ApplicationStatus, String> {
    ApplicationStatus::parse(value).ok_or_else(|| {
        let known: Vec<&str> = ApplicationStatus::ALL.iter().map(|s| s.as_str()).collect();
        format!("unknown application status `{value}`; expected {}", known.join("|"))
    })
}

#[cfg(test)]
mod tests {
    use super::{parse_category, parse_status, parse_when, Cli};
    use clap::CommandFactory;
    use thryve_core::{ApplicationStatus, Category};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_when_accepts_rfc3339_and_epoch_ms() {
        assert_eq!(parse_when("2023-11-14T22:13:20Z"), Ok(1_700_000_000_000));
        assert_eq!(parse_when("42"), Ok(42));
        assert!(parse_when("tomorrow").is_err());
    }

    #[test]
    fn parse_category_lists_known_values_on_error() {
        assert_eq!(parse_category("jobs"), Ok(Category::Jobs));
        assert!(parse_category("errands").unwrap_err().contains("work|personal|habits|jobs"));
    }

    #[test]
    fn parse_status_accepts_stored_names_only() {
        assert_eq!(
            parse_status("interview_scheduled"),
            Ok(ApplicationStatus::InterviewScheduled)
        );
        assert!(parse_status("ghosted")
            .unwrap_err()
            .contains("applied|interview_scheduled|rejected"));
    }
}

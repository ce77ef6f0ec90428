//! SQLite-backed persistence gateway.
//!
//! # Invariants
//! - Write paths call `validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - `created_at` is never rewritten by an overwrite.
//! - A task overwrite whose `source` differs from the stored one matches no
//!   row and is reported as `SourceConflict`.

use crate::db::migrations::latest_version;
use crate::gateway::{GatewayError, GatewayResult, PersistenceGateway};
use crate::model::focus_session::{FocusSession, SessionKind};
use crate::model::job_application::{ApplicationStatus, JobApplication};
use crate::model::task::{Category, Priority, Task, TaskSource};
use log::{debug, warn};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const TASK_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    description,
    due_at,
    priority,
    category,
    is_completed,
    source
FROM tasks
ORDER BY due_at ASC, rowid ASC;";

const FOCUS_SESSION_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    duration_secs,
    kind,
    scheduled_at,
    is_completed,
    notes
FROM focus_sessions
ORDER BY scheduled_at IS NULL ASC, scheduled_at ASC, rowid ASC;";

const JOB_APPLICATION_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    company,
    status,
    deadline
FROM job_applications
ORDER BY deadline ASC, rowid ASC;";

/// Gateway over a migrated SQLite connection.
pub struct SqliteGateway<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGateway<'conn> {
    /// Constructs a gateway from a connection opened through `db::open_db*`.
    ///
    /// Rejects connections whose schema version does not match this binary.
    pub fn try_new(conn: &'conn Connection) -> GatewayResult<Self> {
        let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
        if version != latest_version() {
            return Err(GatewayError::Unavailable(format!(
                "schema version {version} does not match expected {}",
                latest_version()
            )));
        }
        Ok(Self { conn })
    }
}

impl PersistenceGateway for SqliteGateway<'_> {
    fn fetch_all_tasks(&self) -> GatewayResult<Vec<Task>> {
        let mut stmt = self.conn.prepare(TASK_SELECT_SQL)?;
        let mut rows = stmt.query([])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        debug!(
            "event=gateway_fetch module=gateway status=ok kind=task count={}",
            tasks.len()
        );
        Ok(tasks)
    }

    fn fetch_all_focus_sessions(&self) -> GatewayResult<Vec<FocusSession>> {
        let mut stmt = self.conn.prepare(FOCUS_SESSION_SELECT_SQL)?;
        let mut rows = stmt.query([])?;
        let mut sessions = Vec::new();
        while let Some(row) = rows.next()? {
            sessions.push(parse_focus_session_row(row)?);
        }
        debug!(
            "event=gateway_fetch module=gateway status=ok kind=focus_session count={}",
            sessions.len()
        );
        Ok(sessions)
    }

    fn fetch_all_job_applications(&self) -> GatewayResult<Vec<JobApplication>> {
        let mut stmt = self.conn.prepare(JOB_APPLICATION_SELECT_SQL)?;
        let mut rows = stmt.query([])?;
        let mut applications = Vec::new();
        while let Some(row) = rows.next()? {
            applications.push(parse_job_application_row(row)?);
        }
        debug!(
            "event=gateway_fetch module=gateway status=ok kind=job_application count={}",
            applications.len()
        );
        Ok(applications)
    }

    fn save_task(&mut self, task: &Task) -> GatewayResult<()> {
        task.validate()
            .map_err(|err| GatewayError::InvalidData(err.to_string()))?;

        let written = self.conn.execute(
            "INSERT INTO tasks (
                uuid,
                title,
                description,
                due_at,
                priority,
                category,
                is_completed,
                source
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(uuid) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                due_at = excluded.due_at,
                priority = excluded.priority,
                category = excluded.category,
                is_completed = excluded.is_completed,
                updated_at = (strftime('%s', 'now') * 1000)
            WHERE tasks.source = excluded.source;",
            params![
                task.id.to_string(),
                task.title.as_str(),
                task.description.as_str(),
                task.due_at,
                task.priority.as_str(),
                task.category.as_str(),
                bool_to_int(task.is_completed),
                task.source.as_str(),
            ],
        )?;

        if written == 0 {
            let stored = stored_task_source(self.conn, task)?;
            warn!(
                "event=gateway_save module=gateway status=rejected kind=task error_code=source_conflict"
            );
            return Err(GatewayError::SourceConflict {
                id: task.id,
                stored,
                incoming: task.source,
            });
        }
        Ok(())
    }

    fn save_focus_session(&mut self, session: &FocusSession) -> GatewayResult<()> {
        session
            .validate()
            .map_err(|err| GatewayError::InvalidData(err.to_string()))?;

        self.conn.execute(
            "INSERT INTO focus_sessions (
                uuid,
                title,
                duration_secs,
                kind,
                scheduled_at,
                is_completed,
                notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(uuid) DO UPDATE SET
                title = excluded.title,
                duration_secs = excluded.duration_secs,
                kind = excluded.kind,
                scheduled_at = excluded.scheduled_at,
                is_completed = excluded.is_completed,
                notes = excluded.notes,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![
                session.id.to_string(),
                session.title.as_str(),
                session.duration_secs,
                session.kind.as_str(),
                session.scheduled_at,
                bool_to_int(session.is_completed),
                session.notes.as_deref(),
            ],
        )?;
        Ok(())
    }

    fn save_job_application(&mut self, application: &JobApplication) -> GatewayResult<()> {
        application
            .validate()
            .map_err(|err| GatewayError::InvalidData(err.to_string()))?;

        self.conn.execute(
            "INSERT INTO job_applications (uuid, title, company, status, deadline)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(uuid) DO UPDATE SET
                title = excluded.title,
                company = excluded.company,
                status = excluded.status,
                deadline = excluded.deadline,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![
                application.id.to_string(),
                application.title.as_str(),
                application.company.as_str(),
                application.status.as_str(),
                application.deadline,
            ],
        )?;
        Ok(())
    }
}

/// Reads the stored source of a task whose overwrite matched no row.
fn stored_task_source(conn: &Connection, task: &Task) -> GatewayResult<TaskSource> {
    let text: Option<String> = conn
        .query_row(
            "SELECT source FROM tasks WHERE uuid = ?1;",
            [task.id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    let Some(text) = text else {
        return Err(GatewayError::InvalidData(format!(
            "task {} was neither inserted nor updated",
            task.id
        )));
    };
    TaskSource::parse(&text).ok_or_else(|| {
        GatewayError::InvalidData(format!("invalid source `{text}` in tasks.source"))
    })
}

fn parse_task_row(row: &Row<'_>) -> GatewayResult<Task> {
    let priority_text: String = row.get("priority")?;
    let priority = Priority::parse(&priority_text).ok_or_else(|| {
        GatewayError::InvalidData(format!("invalid priority `{priority_text}` in tasks.priority"))
    })?;

    let category_text: String = row.get("category")?;
    let category = Category::parse(&category_text).ok_or_else(|| {
        GatewayError::InvalidData(format!("invalid category `{category_text}` in tasks.category"))
    })?;

    let source_text: String = row.get("source")?;
    let source = TaskSource::parse(&source_text).ok_or_else(|| {
        GatewayError::InvalidData(format!("invalid source `{source_text}` in tasks.source"))
    })?;

    let task = Task {
        id: parse_uuid(row, "tasks")?,
        title: row.get("title")?,
        description: row.get("description")?,
        due_at: row.get("due_at")?,
        priority,
        category,
        is_completed: parse_bool(row, "tasks")?,
        source,
    };
    task.validate()
        .map_err(|err| GatewayError::InvalidData(err.to_string()))?;
    Ok(task)
}

fn parse_focus_session_row(row: &Row<'_>) -> GatewayResult<FocusSession> {
    let kind_text: String = row.get("kind")?;
    let kind = SessionKind::parse(&kind_text).ok_or_else(|| {
        GatewayError::InvalidData(format!("invalid kind `{kind_text}` in focus_sessions.kind"))
    })?;

    let session = FocusSession {
        id: parse_uuid(row, "focus_sessions")?,
        title: row.get("title")?,
        duration_secs: row.get("duration_secs")?,
        kind,
        scheduled_at: row.get("scheduled_at")?,
        is_completed: parse_bool(row, "focus_sessions")?,
        notes: row.get("notes")?,
    };
    session
        .validate()
        .map_err(|err| GatewayError::InvalidData(err.to_string()))?;
    Ok(session)
}

fn parse_job_application_row(row: &Row<'_>) -> GatewayResult<JobApplication> {
    let status_text: String = row.get("status")?;
    let status = ApplicationStatus::parse(&status_text).ok_or_else(|| {
        GatewayError::InvalidData(format!(
            "invalid status `{status_text}` in job_applications.status"
        ))
    })?;

    let application = JobApplication {
        id: parse_uuid(row, "job_applications")?,
        title: row.get("title")?,
        company: row.get("company")?,
        status,
        deadline: row.get("deadline")?,
    };
    application
        .validate()
        .map_err(|err| GatewayError::InvalidData(err.to_string()))?;
    Ok(application)
}

fn parse_uuid(row: &Row<'_>, table: &str) -> GatewayResult<Uuid> {
    let uuid_text: String = row.get("uuid")?;
    Uuid::parse_str(&uuid_text).map_err(|_| {
        GatewayError::InvalidData(format!("invalid uuid value `{uuid_text}` in {table}.uuid"))
    })
}

fn parse_bool(row: &Row<'_>, table: &str) -> GatewayResult<bool> {
    match row.get::<_, i64>("is_completed")? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(GatewayError::InvalidData(format!(
            "invalid is_completed value `{other}` in {table}.is_completed"
        ))),
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

//! Persistence gateway contract and its SQLite implementation.
//!
//! # Responsibility
//! - Define the keyed save/fetch contract the pipeline depends on.
//! - Keep SQL details behind that contract.
//!
//! # Invariants
//! - Saves are whole-record overwrites keyed by id.
//! - Fetches return records ordered by due/scheduled time ascending, ties in
//!   insertion order.
//! - A save only returns `Ok` once the record is durable.
//! - A task save that would change the stored `source` fails with
//!   `SourceConflict` and writes nothing.

use crate::db::DbError;
use crate::model::focus_session::FocusSession;
use crate::model::job_application::JobApplication;
use crate::model::task::{Task, TaskId, TaskSource};
use thiserror::Error;

pub mod sqlite;

pub use sqlite::SqliteGateway;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Storage-level failure reported by a gateway implementation.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("task {id} is stored with source `{stored}`, refusing `{incoming}`")]
    SourceConflict {
        id: TaskId,
        stored: TaskSource,
        incoming: TaskSource,
    },
}

impl From<rusqlite::Error> for GatewayError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable keyed storage for tasks, focus sessions and job applications.
pub trait PersistenceGateway {
    fn fetch_all_tasks(&self) -> GatewayResult<Vec<Task>>;
    fn fetch_all_focus_sessions(&self) -> GatewayResult<Vec<FocusSession>>;
    fn fetch_all_job_applications(&self) -> GatewayResult<Vec<JobApplication>>;
    fn save_task(&mut self, task: &Task) -> GatewayResult<()>;
    fn save_focus_session(&mut self, session: &FocusSession) -> GatewayResult<()>;
    fn save_job_application(&mut self, application: &JobApplication) -> GatewayResult<()>;
}

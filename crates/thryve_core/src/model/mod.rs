//! Canonical records for tasks, focus sessions and job applications.
//!
//! # Responsibility
//! - Define the data structures every other layer exchanges.
//! - Provide closed enumerations with stable storage/wire strings.
//!
//! # Invariants
//! - Every record is identified by a non-nil UUID that never changes.
//! - A task's `source` records provenance and is fixed at creation.

pub mod focus_session;
pub mod job_application;
pub mod task;

use crate::model::task::{TaskId, TaskSource};
use thiserror::Error;

/// Record-level validation failures shared by every record family.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("record id must not be the nil uuid")]
    NilId,
    #[error("focus session duration must be positive")]
    NonPositiveDuration,
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    #[error("task {id} source is immutable: stored `{existing}`, got `{incoming}`")]
    SourceChanged {
        id: TaskId,
        existing: TaskSource,
        incoming: TaskSource,
    },
}

//! Source adapter contract for externally fetched candidate tasks.
//!
//! # Responsibility
//! - Define how the pipeline authenticates against, lists and converts
//!   items from an external source.
//! - Provide natural-key based identity so re-fetching an item yields the
//!   same task id.
//!
//! # Invariants
//! - A payload that cannot be converted is reported as `Conversion::Skipped`,
//!   never as an error.
//! - `SourceError` is reserved for transport-level failures.

use crate::model::task::{Task, TaskId};
use serde_json::Value;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

pub mod email;
pub mod gmail;

/// Namespace for natural-key derived task ids.
const TASK_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a9e_4b7d_5e30_9a41_c8d2_f07b_13e5);

pub type SourceResult<T> = Result<T, SourceError>;

/// Adapter call that produced a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStage {
    Auth,
    List,
    Fetch,
}

impl SourceStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::List => "list",
            Self::Fetch => "fetch",
        }
    }
}

impl Display for SourceStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport-level failure raised by a source adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{source_id} {stage} failed [{code}]: {message}")]
pub struct SourceError {
    pub source_id: String,
    pub stage: SourceStage,
    /// Stable machine-readable code, e.g. `timeout` or `http_503`.
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl SourceError {
    pub fn new(
        source_id: impl Into<String>,
        stage: SourceStage,
        code: impl Into<String>,
        message: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            stage,
            code: code.into(),
            message: message.into(),
            retryable,
        }
    }

    /// Error recorded when a call outlives the configured per-call budget.
    pub fn timeout(source_id: impl Into<String>, stage: SourceStage, elapsed: Duration) -> Self {
        Self::new(
            source_id,
            stage,
            "timeout",
            format!("call took {} ms", elapsed.as_millis()),
            true,
        )
    }
}

/// Raw item reported by `SourceAdapter::fetch_candidates`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCandidate {
    /// Stable key of the external item (e.g. a mail message id).
    pub natural_key: Option<String>,
    pub payload: Value,
}

impl RawCandidate {
    pub fn new(natural_key: Option<String>, payload: Value) -> Self {
        Self {
            natural_key,
            payload,
        }
    }
}

/// Outcome of converting one candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum Conversion {
    Converted(Task),
    /// Payload is missing required fields; carries a short reason.
    Skipped(String),
}

/// External collaborator that supplies candidate tasks.
pub trait SourceAdapter {
    /// Lowercase identifier, also used as the natural-key namespace.
    fn source_id(&self) -> &str;

    fn authenticate(&mut self) -> SourceResult<()>;

    fn fetch_candidates(&mut self) -> SourceResult<Vec<RawCandidate>>;

    /// Converts one candidate, fetching extra detail when the adapter needs to.
    fn convert(&mut self, candidate: &RawCandidate) -> SourceResult<Conversion>;
}

/// Derives a stable task id from a source's natural key.
pub fn stable_task_id(source_id: &str, natural_key: &str) -> TaskId {
    let name = format!("{source_id}:{natural_key}");
    Uuid::new_v5(&TASK_ID_NAMESPACE, name.as_bytes())
}

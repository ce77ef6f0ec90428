//! Core domain logic for Thryve.
//! This crate owns task, focus-session and job-application invariants and
//! the aggregation pipeline that keeps the in-memory working set and durable
//! storage in step.

pub mod config;
pub mod db;
pub mod gateway;
pub mod logging;
pub mod mindfulness;
pub mod model;
pub mod pipeline;
pub mod source;
pub mod view;

pub use config::{ConfigError, CoreConfig};
pub use gateway::{GatewayError, GatewayResult, PersistenceGateway, SqliteGateway};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status, LoggingError};
pub use model::focus_session::{FocusSession, FocusSessionId, SessionKind};
pub use model::job_application::{ApplicationStatus, JobApplication, JobApplicationId};
pub use model::task::{Category, Priority, Task, TaskId, TaskSource};
pub use model::ValidationError;
pub use pipeline::{
    IngestReport, Pipeline, PipelineConfig, PipelineError, PipelineResult, RecordKind, WorkingSet,
};
pub use source::gmail::{GmailSource, StaticToken, TokenProvider};
pub use source::{
    stable_task_id, Conversion, RawCandidate, SourceAdapter, SourceError, SourceResult,
    SourceStage,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

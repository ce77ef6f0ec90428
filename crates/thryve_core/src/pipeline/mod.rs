//! Task aggregation pipeline.
//!
//! # Responsibility
//! - Load the working set from the persistence gateway.
//! - Merge manual edits and externally fetched candidates into it.
//! - Write every mutation through to the gateway before publishing it.
//!
//! # Invariants
//! - Single writer: every mutator takes `&mut self`.
//! - A failed write-through restores the pre-call working set.
//! - Published snapshots are immutable; readers never see a half-applied
//!   mutation.
//! - Ids are unique within the working set; task `source` never changes,
//!   whether or not the stored record is currently loaded.

mod working_set;

pub use working_set::WorkingSet;

use crate::gateway::{GatewayError, GatewayResult, PersistenceGateway};
use crate::model::focus_session::{FocusSession, FocusSessionId};
use crate::model::job_application::{ApplicationStatus, JobApplication, JobApplicationId};
use crate::model::task::{Task, TaskId};
use crate::model::ValidationError;
use working_set::Record;
use crate::source::{
    Conversion, RawCandidate, SourceAdapter, SourceError, SourceResult, SourceStage,
};
use log::{debug, error, info, warn};
use std::fmt::{Display, Formatter};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use uuid::Uuid;

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Record family named in pipeline errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Task,
    FocusSession,
    JobApplication,
}

impl RecordKind {
    /// Log-friendly code.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::FocusSession => "focus_session",
            Self::JobApplication => "job_application",
        }
    }
}

impl Display for RecordKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Task => f.write_str("task"),
            Self::FocusSession => f.write_str("focus session"),
            Self::JobApplication => f.write_str("job application"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Initial load failed; the working set was left empty.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[source] GatewayError),
    /// Write-through failed; the in-memory change was rolled back.
    #[error("failed to persist {kind} {id}: {source}")]
    PersistFailed {
        kind: RecordKind,
        id: Uuid,
        #[source]
        source: GatewayError,
    },
    /// Transport failure mid-batch; `partial` holds what was ingested before.
    #[error("fetch failed after {} ingested item(s): {error}", .partial.ingested)]
    FetchFailed {
        partial: IngestReport,
        #[source]
        error: SourceError,
    },
    /// Write-through failed mid-batch; `partial` holds what was applied
    /// before. The failing candidate was rolled back.
    #[error("ingest aborted after {} ingested item(s): failed to persist task {id}: {source}", .partial.ingested)]
    IngestPersistFailed {
        partial: IngestReport,
        id: TaskId,
        #[source]
        source: GatewayError,
    },
    #[error("{kind} not found: {id}")]
    NotFound { kind: RecordKind, id: Uuid },
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Budget for each adapter call during ingestion.
    pub fetch_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// Summary of one ingestion batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// New tasks added and persisted.
    pub ingested: usize,
    /// Existing tasks replaced by a differing converted record.
    pub updated: usize,
    /// Existing tasks identical to their converted record; not rewritten.
    pub unchanged: usize,
    /// Payloads the adapter could not convert, or records it produced that
    /// failed validation.
    pub skipped: usize,
    pub ingested_ids: Vec<TaskId>,
}

/// Owner of the working set and its write-through path.
pub struct Pipeline<G: PersistenceGateway> {
    gateway: G,
    config: PipelineConfig,
    working_set: Arc<WorkingSet>,
    subscribers: Vec<Sender<Arc<WorkingSet>>>,
}

impl<G: PersistenceGateway> Pipeline<G> {
    /// Creates a pipeline with an empty working set. Call `load_initial`
    /// before serving reads.
    pub fn new(gateway: G, config: PipelineConfig) -> Self {
        Self {
            gateway,
            config,
            working_set: Arc::new(WorkingSet::default()),
            subscribers: Vec::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Returns the current immutable snapshot.
    pub fn snapshot(&self) -> Arc<WorkingSet> {
        Arc::clone(&self.working_set)
    }

    /// Registers an observer. The current snapshot is delivered immediately,
    /// then one snapshot per successful mutation.
    pub fn subscribe(&mut self) -> Receiver<Arc<WorkingSet>> {
        let (tx, rx) = channel();
        if tx.send(self.snapshot()).is_ok() {
            self.subscribers.push(tx);
        }
        rx
    }

    /// Replaces the working set with the gateway's full contents.
    ///
    /// Tasks are ordered by due time, sessions by scheduled time with
    /// unscheduled sessions last, job applications by deadline; ties keep
    /// gateway order. On failure the working set is left empty.
    pub fn load_initial(&mut self) -> PipelineResult<()> {
        let started_at = Instant::now();
        let loaded = self.gateway.fetch_all_tasks().and_then(|tasks| {
            let sessions = self.gateway.fetch_all_focus_sessions()?;
            let applications = self.gateway.fetch_all_job_applications()?;
            Ok((tasks, sessions, applications))
        });

        let (mut tasks, mut sessions, mut applications) = match loaded {
            Ok(parts) => parts,
            Err(err) => {
                error!(
                    "event=pipeline_load module=pipeline status=error duration_ms={} error_code=storage_unavailable error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                self.working_set = Arc::new(WorkingSet::default());
                self.publish();
                return Err(PipelineError::StorageUnavailable(err));
            }
        };

        tasks.sort_by_key(|task| task.due_at);
        sessions.sort_by_key(|session| (session.scheduled_at.is_none(), session.scheduled_at));
        applications.sort_by_key(|application| application.deadline);
        info!(
            "event=pipeline_load module=pipeline status=ok duration_ms={} tasks={} focus_sessions={} job_applications={}",
            started_at.elapsed().as_millis(),
            tasks.len(),
            sessions.len(),
            applications.len()
        );
        self.working_set = Arc::new(WorkingSet::from_parts(tasks, sessions, applications));
        self.publish();
        Ok(())
    }

    /// Inserts a task or replaces the one sharing its id, then writes it
    /// through.
    ///
    /// # Errors
    /// - `Invalid` when the record fails validation or changes the stored
    ///   `source`; nothing is written. The stored source is checked by the
    ///   gateway too, so this holds even before `load_initial` succeeded.
    /// - `PersistFailed` when the write fails; the working set is restored.
    pub fn upsert_task(&mut self, task: Task) -> PipelineResult<()> {
        task.validate()?;
        if let Some(existing) = self.working_set.task(task.id) {
            if existing.source != task.source {
                return Err(ValidationError::SourceChanged {
                    id: task.id,
                    existing: existing.source,
                    incoming: task.source,
                }
                .into());
            }
        }

        match self.write_through(task, G::save_task) {
            Err(PipelineError::PersistFailed {
                source:
                    GatewayError::SourceConflict {
                        id,
                        stored,
                        incoming,
                    },
                ..
            }) => Err(ValidationError::SourceChanged {
                id,
                existing: stored,
                incoming,
            }
            .into()),
            other => other,
        }
    }

    /// Flips a task's completion flag and returns the updated record.
    pub fn toggle_completion(&mut self, id: TaskId) -> PipelineResult<Task> {
        let mut task = self
            .working_set
            .task(id)
            .cloned()
            .ok_or(PipelineError::NotFound {
                kind: RecordKind::Task,
                id,
            })?;
        task.toggle_completion();
        self.upsert_task(task.clone())?;
        Ok(task)
    }

    /// Adds (or reschedules) a focus session.
    pub fn schedule_focus_session(&mut self, session: FocusSession) -> PipelineResult<()> {
        self.upsert_focus_session(session)
    }

    /// Insert-or-replace for focus sessions, with the same rollback rules as
    /// `upsert_task`.
    pub fn upsert_focus_session(&mut self, session: FocusSession) -> PipelineResult<()> {
        session.validate()?;
        self.write_through(session, G::save_focus_session)
    }

    /// Marks a focus session completed and returns the updated record.
    pub fn complete_focus_session(&mut self, id: FocusSessionId) -> PipelineResult<FocusSession> {
        let mut session = self
            .working_set
            .focus_session(id)
            .cloned()
            .ok_or(PipelineError::NotFound {
                kind: RecordKind::FocusSession,
                id,
            })?;
        session.is_completed = true;
        self.upsert_focus_session(session.clone())?;
        Ok(session)
    }

    /// Insert-or-replace for job applications.
    pub fn upsert_job_application(&mut self, application: JobApplication) -> PipelineResult<()> {
        application.validate()?;
        self.write_through(application, G::save_job_application)
    }

    /// Moves an application to `status` and returns the updated record.
    pub fn update_application_status(
        &mut self,
        id: JobApplicationId,
        status: ApplicationStatus,
    ) -> PipelineResult<JobApplication> {
        let mut application = self
            .working_set
            .job_application(id)
            .cloned()
            .ok_or(PipelineError::NotFound {
                kind: RecordKind::JobApplication,
                id,
            })?;
        application.status = status;
        self.upsert_job_application(application.clone())?;
        Ok(application)
    }

    /// Converts and merges a batch of candidates through `upsert_task`.
    ///
    /// Unconvertible payloads are counted as skipped. A converted record
    /// whose id is already present replaces it (last write wins) and is
    /// counted as updated, unless it is identical, in which case nothing is
    /// written. The first transport failure (or overrun of `fetch_timeout`)
    /// aborts the batch with `FetchFailed`; the first write failure aborts it
    /// with `IngestPersistFailed`. Both carry what was applied before.
    pub fn ingest_external(
        &mut self,
        adapter: &mut dyn SourceAdapter,
        candidates: &[RawCandidate],
    ) -> PipelineResult<IngestReport> {
        let started_at = Instant::now();
        let source_id = adapter.source_id().to_string();
        let mut report = IngestReport::default();

        for candidate in candidates {
            let outcome = timed(&source_id, SourceStage::Fetch, self.config.fetch_timeout, || {
                adapter.convert(candidate)
            });

            let task = match outcome {
                Ok(Conversion::Converted(task)) => task,
                Ok(Conversion::Skipped(reason)) => {
                    report.skipped += 1;
                    debug!(
                        "event=ingest_skip module=pipeline source_id={source_id} reason={:?}",
                        reason
                    );
                    continue;
                }
                Err(err) => {
                    warn!(
                        "event=ingest_batch module=pipeline status=aborted source_id={source_id} duration_ms={} ingested={} updated={} skipped={} error_code={} retryable={}",
                        started_at.elapsed().as_millis(),
                        report.ingested,
                        report.updated,
                        report.skipped,
                        err.code,
                        err.retryable
                    );
                    return Err(PipelineError::FetchFailed {
                        partial: report,
                        error: err,
                    });
                }
            };

            let matches_existing = self
                .working_set
                .task(task.id)
                .map(|existing| *existing == task);
            if matches_existing == Some(true) {
                report.unchanged += 1;
                continue;
            }

            let id = task.id;
            match self.upsert_task(task) {
                Ok(()) => {}
                Err(PipelineError::Invalid(err)) => {
                    report.skipped += 1;
                    debug!(
                        "event=ingest_skip module=pipeline source_id={source_id} reason={:?}",
                        err.to_string()
                    );
                    continue;
                }
                Err(PipelineError::PersistFailed { source, .. }) => {
                    warn!(
                        "event=ingest_batch module=pipeline status=aborted source_id={source_id} duration_ms={} ingested={} updated={} skipped={} error_code=persist_failed",
                        started_at.elapsed().as_millis(),
                        report.ingested,
                        report.updated,
                        report.skipped
                    );
                    return Err(PipelineError::IngestPersistFailed {
                        partial: report,
                        id,
                        source,
                    });
                }
                Err(other) => return Err(other),
            }

            if matches_existing.is_some() {
                report.updated += 1;
            } else {
                report.ingested += 1;
                report.ingested_ids.push(id);
            }
        }

        info!(
            "event=ingest_batch module=pipeline status=ok source_id={source_id} duration_ms={} ingested={} updated={} unchanged={} skipped={}",
            started_at.elapsed().as_millis(),
            report.ingested,
            report.updated,
            report.unchanged,
            report.skipped
        );
        Ok(report)
    }

    /// Authenticates, lists candidates and ingests them in one pass.
    pub fn sync_source(&mut self, adapter: &mut dyn SourceAdapter) -> PipelineResult<IngestReport> {
        let source_id = adapter.source_id().to_string();
        let timeout = self.config.fetch_timeout;

        let candidates = timed(&source_id, SourceStage::Auth, timeout, || adapter.authenticate())
            .and_then(|()| {
                timed(&source_id, SourceStage::List, timeout, || {
                    adapter.fetch_candidates()
                })
            })
            .map_err(|err| {
                warn!(
                    "event=source_sync module=pipeline status=error source_id={source_id} stage={} error_code={}",
                    err.stage, err.code
                );
                PipelineError::FetchFailed {
                    partial: IngestReport::default(),
                    error: err,
                }
            })?;

        debug!(
            "event=source_sync module=pipeline status=listed source_id={source_id} candidates={}",
            candidates.len()
        );
        self.ingest_external(adapter, &candidates)
    }

    /// Applies `record` to the working set, then saves it; on save failure
    /// the previous value is restored and nothing is published.
    fn write_through<T: Record>(
        &mut self,
        record: T,
        save: fn(&mut G, &T) -> GatewayResult<()>,
    ) -> PipelineResult<()> {
        let kind = T::KIND;
        let id = record.key();
        let previous = Arc::make_mut(&mut self.working_set).put(record.clone());
        let action = if previous.is_some() { "replace" } else { "insert" };

        if let Err(err) = save(&mut self.gateway, &record) {
            Arc::make_mut(&mut self.working_set).restore(id, previous);
            error!(
                "event=record_upsert module=pipeline status=error kind={} record_id={id} action={action} error_code=persist_failed error={err}",
                kind.as_str()
            );
            return Err(PipelineError::PersistFailed {
                kind,
                id,
                source: err,
            });
        }

        debug!(
            "event=record_upsert module=pipeline status=ok kind={} record_id={id} action={action}",
            kind.as_str()
        );
        self.publish();
        Ok(())
    }

    fn publish(&mut self) {
        let snapshot = self.snapshot();
        self.subscribers
            .retain(|subscriber| subscriber.send(Arc::clone(&snapshot)).is_ok());
    }
}

/// Runs one adapter call and converts a budget overrun into a timeout error.
///
/// The budget is checked after the call returns. It cannot interrupt a hung
/// call; the adapter's own transport timeout bounds that. An overrunning call
/// is reported as a timeout even when it succeeded, and any side effects it
/// had (such as a stored access token) are kept.
fn timed<T>(
    source_id: &str,
    stage: SourceStage,
    budget: Duration,
    call: impl FnOnce() -> SourceResult<T>,
) -> SourceResult<T> {
    let started_at = Instant::now();
    let result = call();
    let elapsed = started_at.elapsed();
    if elapsed > budget {
        return Err(SourceError::timeout(source_id, stage, elapsed));
    }
    result
}

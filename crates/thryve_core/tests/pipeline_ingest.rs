use serde_json::json;
use std::thread;
use std::time::Duration;
use thryve_core::db::open_db_in_memory;
use thryve_core::{
    stable_task_id, Category, Conversion, FocusSession, GatewayError, GatewayResult,
    IngestReport, JobApplication, PersistenceGateway, Pipeline, PipelineConfig, PipelineError,
    RawCandidate, SourceAdapter, SourceError, SourceResult, SourceStage, SqliteGateway, Task,
    TaskSource,
};

const MOCK_SOURCE: &str = "mock_mail";

/// Adapter driven by candidate payloads:
/// - `{"title", "due_at"}` converts,
/// - `{"transport_error": true}` fails the call,
/// - anything else is malformed.
#[derive(Default)]
struct ScriptedAdapter {
    candidates: Vec<RawCandidate>,
    fail_auth: bool,
    convert_delay: Option<Duration>,
    convert_calls: usize,
}

impl SourceAdapter for ScriptedAdapter {
    fn source_id(&self) -> &str {
        MOCK_SOURCE
    }

    fn authenticate(&mut self) -> SourceResult<()> {
        if self.fail_auth {
            return Err(SourceError::new(
                MOCK_SOURCE,
                SourceStage::Auth,
                "denied",
                "user cancelled",
                false,
            ));
        }
        Ok(())
    }

    fn fetch_candidates(&mut self) -> SourceResult<Vec<RawCandidate>> {
        Ok(self.candidates.clone())
    }

    fn convert(&mut self, candidate: &RawCandidate) -> SourceResult<Conversion> {
        self.convert_calls += 1;
        if let Some(delay) = self.convert_delay {
            thread::sleep(delay);
        }
        if candidate.payload["transport_error"] == json!(true) {
            return Err(SourceError::new(
                MOCK_SOURCE,
                SourceStage::Fetch,
                "http_503",
                "unavailable",
                true,
            ));
        }
        let (Some(key), Some(title), Some(due_at)) = (
            candidate.natural_key.as_deref(),
            candidate.payload["title"].as_str(),
            candidate.payload["due_at"].as_i64(),
        ) else {
            return Ok(Conversion::Skipped("missing fields".to_string()));
        };
        let task = Task::with_id(
            stable_task_id(MOCK_SOURCE, key),
            title,
            due_at,
            Category::Work,
            TaskSource::Email,
        )
        .expect("derived ids are never nil");
        Ok(Conversion::Converted(task))
    }
}

fn valid(key: &str, title: &str, due_at: i64) -> RawCandidate {
    RawCandidate::new(Some(key.to_string()), json!({ "title": title, "due_at": due_at }))
}

fn malformed(key: &str) -> RawCandidate {
    RawCandidate::new(Some(key.to_string()), json!({ "subject": "no date" }))
}

fn transport_failure(key: &str) -> RawCandidate {
    RawCandidate::new(Some(key.to_string()), json!({ "transport_error": true }))
}

/// SQLite gateway that accepts a fixed number of task saves, then fails.
struct LimitedGateway<'conn> {
    inner: SqliteGateway<'conn>,
    task_saves_left: usize,
}

impl PersistenceGateway for LimitedGateway<'_> {
    fn fetch_all_tasks(&self) -> GatewayResult<Vec<Task>> {
        self.inner.fetch_all_tasks()
    }

    fn fetch_all_focus_sessions(&self) -> GatewayResult<Vec<FocusSession>> {
        self.inner.fetch_all_focus_sessions()
    }

    fn fetch_all_job_applications(&self) -> GatewayResult<Vec<JobApplication>> {
        self.inner.fetch_all_job_applications()
    }

    fn save_task(&mut self, task: &Task) -> GatewayResult<()> {
        if self.task_saves_left == 0 {
            return Err(GatewayError::Unavailable("disk full".to_string()));
        }
        self.task_saves_left -= 1;
        self.inner.save_task(task)
    }

    fn save_focus_session(&mut self, session: &FocusSession) -> GatewayResult<()> {
        self.inner.save_focus_session(session)
    }

    fn save_job_application(&mut self, application: &JobApplication) -> GatewayResult<()> {
        self.inner.save_job_application(application)
    }
}

fn sqlite_pipeline(conn: &rusqlite::Connection) -> Pipeline<SqliteGateway<'_>> {
    let mut pipeline = Pipeline::new(SqliteGateway::try_new(conn).unwrap(), PipelineConfig::default());
    pipeline.load_initial().unwrap();
    pipeline
}

#[test]
fn malformed_payloads_are_skipped_without_aborting() {
    let conn = open_db_in_memory().unwrap();
    let mut pipeline = sqlite_pipeline(&conn);
    let mut adapter = ScriptedAdapter::default();
    let before = pipeline.snapshot().tasks().len();

    let report = pipeline
        .ingest_external(
            &mut adapter,
            &[valid("a", "Reply to Bo", 100), malformed("b"), valid("c", "Send deck", 200)],
        )
        .unwrap();

    assert_eq!(report.ingested, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(pipeline.snapshot().tasks().len(), before + 2);
    assert_eq!(
        report.ingested_ids,
        vec![stable_task_id(MOCK_SOURCE, "a"), stable_task_id(MOCK_SOURCE, "c")]
    );
}

#[test]
fn transport_failure_aborts_batch_with_partial_report() {
    let conn = open_db_in_memory().unwrap();
    let mut pipeline = sqlite_pipeline(&conn);
    let mut adapter = ScriptedAdapter::default();

    let err = pipeline
        .ingest_external(
            &mut adapter,
            &[valid("a", "first", 100), transport_failure("b"), valid("c", "third", 300)],
        )
        .unwrap_err();

    let PipelineError::FetchFailed { partial, error } = err else {
        panic!("expected FetchFailed");
    };
    assert_eq!(partial.ingested, 1);
    assert_eq!(partial.ingested_ids, vec![stable_task_id(MOCK_SOURCE, "a")]);
    assert_eq!(error.code, "http_503");
    assert_eq!(adapter.convert_calls, 2);

    let snapshot = pipeline.snapshot();
    assert_eq!(snapshot.tasks().len(), 1);
    assert_eq!(snapshot.tasks()[0].title, "first");
}

#[test]
fn partial_results_are_durable() {
    let conn = open_db_in_memory().unwrap();
    {
        let mut pipeline = sqlite_pipeline(&conn);
        let mut adapter = ScriptedAdapter::default();
        pipeline
            .ingest_external(&mut adapter, &[valid("a", "kept", 100), transport_failure("b")])
            .unwrap_err();
    }

    let restarted = sqlite_pipeline(&conn);
    assert!(restarted
        .snapshot()
        .task(stable_task_id(MOCK_SOURCE, "a"))
        .is_some());
}

#[test]
fn repeated_ingestion_deduplicates_and_replaces_changed_records() {
    let conn = open_db_in_memory().unwrap();
    let mut pipeline = sqlite_pipeline(&conn);
    let mut adapter = ScriptedAdapter::default();

    pipeline
        .ingest_external(&mut adapter, &[valid("a", "Invoice", 100), valid("b", "Contract", 200)])
        .unwrap();

    let report = pipeline
        .ingest_external(
            &mut adapter,
            &[valid("a", "Invoice", 100), valid("b", "Contract v2", 250)],
        )
        .unwrap();
    assert_eq!(
        report,
        IngestReport {
            ingested: 0,
            updated: 1,
            unchanged: 1,
            skipped: 0,
            ingested_ids: vec![],
        }
    );

    let contract_id = stable_task_id(MOCK_SOURCE, "b");
    let snapshot = pipeline.snapshot();
    assert_eq!(snapshot.tasks().len(), 2);
    let contract = snapshot.task(contract_id).unwrap();
    assert_eq!(contract.title, "Contract v2");
    assert_eq!(contract.due_at, 250);

    let restarted = sqlite_pipeline(&conn);
    assert_eq!(restarted.snapshot().task(contract_id), Some(contract));
}

#[test]
fn reingesting_a_locally_edited_task_replaces_the_whole_record() {
    let conn = open_db_in_memory().unwrap();
    let mut pipeline = sqlite_pipeline(&conn);
    let mut adapter = ScriptedAdapter::default();
    let batch = [valid("a", "Invoice", 100)];

    pipeline.ingest_external(&mut adapter, &batch).unwrap();
    let invoice_id = stable_task_id(MOCK_SOURCE, "a");
    pipeline.toggle_completion(invoice_id).unwrap();

    let report = pipeline.ingest_external(&mut adapter, &batch).unwrap();
    assert_eq!(report.updated, 1);
    assert!(!pipeline.snapshot().task(invoice_id).unwrap().is_completed);
}

#[test]
fn write_failure_mid_batch_reports_partial_and_keeps_earlier_items() {
    let conn = open_db_in_memory().unwrap();
    let mut pipeline = Pipeline::new(
        LimitedGateway {
            inner: SqliteGateway::try_new(&conn).unwrap(),
            task_saves_left: 1,
        },
        PipelineConfig::default(),
    );
    pipeline.load_initial().unwrap();
    let mut adapter = ScriptedAdapter::default();

    let err = pipeline
        .ingest_external(
            &mut adapter,
            &[
                valid("a", "first", 100),
                malformed("m"),
                valid("b", "second", 200),
                valid("c", "third", 300),
            ],
        )
        .unwrap_err();

    let PipelineError::IngestPersistFailed {
        partial,
        id,
        source,
    } = err
    else {
        panic!("expected IngestPersistFailed");
    };
    assert_eq!(partial.ingested, 1);
    assert_eq!(partial.skipped, 1);
    assert_eq!(partial.ingested_ids, vec![stable_task_id(MOCK_SOURCE, "a")]);
    assert_eq!(id, stable_task_id(MOCK_SOURCE, "b"));
    assert!(matches!(source, GatewayError::Unavailable(_)));
    assert_eq!(adapter.convert_calls, 3);

    let snapshot = pipeline.snapshot();
    assert_eq!(snapshot.tasks().len(), 1);
    assert!(snapshot.task(stable_task_id(MOCK_SOURCE, "b")).is_none());

    let restarted = sqlite_pipeline(&conn);
    let titles: Vec<String> = restarted
        .snapshot()
        .tasks()
        .iter()
        .map(|task| task.title.clone())
        .collect();
    assert_eq!(titles, vec!["first"]);
}

#[test]
fn slow_adapter_call_is_a_timeout_even_when_it_returned_a_task() {
    let conn = open_db_in_memory().unwrap();
    let mut pipeline = Pipeline::new(
        SqliteGateway::try_new(&conn).unwrap(),
        PipelineConfig {
            fetch_timeout: Duration::from_millis(20),
        },
    );
    pipeline.load_initial().unwrap();
    let mut adapter = ScriptedAdapter {
        convert_delay: Some(Duration::from_millis(60)),
        ..ScriptedAdapter::default()
    };

    let err = pipeline
        .ingest_external(&mut adapter, &[valid("a", "late", 100), valid("b", "never", 200)])
        .unwrap_err();

    let PipelineError::FetchFailed { partial, error } = err else {
        panic!("expected FetchFailed");
    };
    assert_eq!(error.code, "timeout");
    assert_eq!(error.stage, SourceStage::Fetch);
    assert_eq!(partial, IngestReport::default());
    // The call ran to completion; its converted task is discarded.
    assert_eq!(adapter.convert_calls, 1);
    assert!(pipeline.snapshot().tasks().is_empty());
    assert!(SqliteGateway::try_new(&conn).unwrap().fetch_all_tasks().unwrap().is_empty());
}

#[test]
fn sync_source_authenticates_lists_and_ingests() {
    let conn = open_db_in_memory().unwrap();
    let mut pipeline = sqlite_pipeline(&conn);
    let mut adapter = ScriptedAdapter {
        candidates: vec![valid("x", "Interview", 100), malformed("y")],
        ..ScriptedAdapter::default()
    };

    let report = pipeline.sync_source(&mut adapter).unwrap();
    assert_eq!(report.ingested, 1);
    assert_eq!(report.skipped, 1);
}

#[test]
fn sync_source_auth_failure_reports_empty_partial() {
    let conn = open_db_in_memory().unwrap();
    let mut pipeline = sqlite_pipeline(&conn);
    let mut adapter = ScriptedAdapter {
        candidates: vec![valid("x", "Interview", 100)],
        fail_auth: true,
        ..ScriptedAdapter::default()
    };

    let err = pipeline.sync_source(&mut adapter).unwrap_err();
    let PipelineError::FetchFailed { partial, error } = err else {
        panic!("expected FetchFailed");
    };
    assert_eq!(error.stage, SourceStage::Auth);
    assert_eq!(partial, IngestReport::default());
    assert_eq!(adapter.convert_calls, 0);
    assert!(pipeline.snapshot().is_empty());
}

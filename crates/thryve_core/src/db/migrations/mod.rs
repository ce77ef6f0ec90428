//! Ordered schema steps for the Thryve store.
//!
//! Each step is one SQL script tagged with the schema version it produces.
//! The version reached is mirrored to `PRAGMA user_version`, so a reopened
//! database only runs the steps it has not seen. All pending steps share
//! one transaction: an upgrade either lands completely or not at all.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::Connection;

/// `(schema version produced, script)` in ascending version order.
const STEPS: &[(u32, &str)] = &[
    (1, include_str!("0001_tasks.sql")),
    (2, include_str!("0002_focus_sessions.sql")),
    (3, include_str!("0003_job_applications.sql")),
];

/// Schema version this binary reads and writes.
pub fn latest_version() -> u32 {
    STEPS.iter().map(|(version, _)| *version).max().unwrap_or(0)
}

/// Brings `conn` up to `latest_version()`.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the file was written by a newer binary.
/// - `Sqlite` when a script fails; the schema is left at its prior version.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let stored = stored_version(conn)?;
    let target = latest_version();
    if stored > target {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: stored,
            latest_supported: target,
        });
    }

    let pending: Vec<_> = STEPS
        .iter()
        .filter(|(version, _)| *version > stored)
        .collect();
    if pending.is_empty() {
        debug!("event=db_migrate module=db status=noop version={stored}");
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (version, script) in &pending {
        tx.execute_batch(script)?;
        tx.pragma_update(None, "user_version", *version)?;
        debug!("event=db_migrate_step module=db status=ok version={version}");
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={stored} to_version={target} steps={}",
        pending.len()
    );
    Ok(())
}

fn stored_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

#[cfg(test)]
mod tests {
    use super::{apply_migrations, latest_version, stored_version, STEPS};
    use rusqlite::Connection;

    #[test]
    fn step_versions_are_strictly_increasing() {
        for pair in STEPS.windows(2) {
            assert!(pair[0].0 < pair[1].0, "step {} out of order", pair[1].0);
        }
        assert_eq!(STEPS.first().map(|step| step.0), Some(1));
    }

    #[test]
    fn fresh_database_reaches_latest_and_reapply_is_noop() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();
        assert_eq!(stored_version(&conn).unwrap(), latest_version());

        apply_migrations(&mut conn).unwrap();
        assert_eq!(stored_version(&conn).unwrap(), latest_version());
    }

    #[test]
    fn partially_migrated_database_runs_only_missing_steps() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(STEPS[0].1).unwrap();
        conn.pragma_update(None, "user_version", 1).unwrap();
        conn.execute(
            "INSERT INTO tasks (uuid, title, due_at, priority, category, source)
             VALUES ('11111111-2222-4333-8444-555555555555', 'kept', 0, 'low', 'work', 'manual');",
            [],
        )
        .unwrap();

        apply_migrations(&mut conn).unwrap();

        assert_eq!(stored_version(&conn).unwrap(), latest_version());
        let kept: i64 = conn
            .query_row("SELECT COUNT(*) FROM tasks;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(kept, 1);
        let jobs: i64 = conn
            .query_row("SELECT COUNT(*) FROM job_applications;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(jobs, 0);
    }

    #[test]
    fn failing_step_leaves_version_untouched() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE focus_sessions (conflict INTEGER);")
            .unwrap();

        apply_migrations(&mut conn).unwrap_err();
        assert_eq!(stored_version(&conn).unwrap(), 0);
    }
}

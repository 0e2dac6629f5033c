//! Optional SQLite run recorder.
//!
//! When no database is configured, or it cannot be opened, the recorder is
//! disabled and every call is a no-op. Write failures are logged and
//! swallowed; they never affect the pipeline.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::types::RunStats;
use crate::io::audit::EventSink;

/// DDL for the recorder database. Idempotent.
const SCHEMA_SQL: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS agent_runs (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    model      TEXT NOT NULL,
    loops      INTEGER NOT NULL DEFAULT 0,
    processed  INTEGER NOT NULL DEFAULT 0,
    failed     INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS events (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id       INTEGER REFERENCES agent_runs(id),
    ts           TEXT NOT NULL,
    event_type   TEXT NOT NULL,
    payload_json TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_events_run_id ON events(run_id);
"#;

pub struct RunRecorder {
    conn: Option<Connection>,
}

impl RunRecorder {
    pub fn disabled() -> Self {
        Self { conn: None }
    }

    /// Open (creating if needed) the database at `path`.
    ///
    /// `None` or an open failure yields a disabled recorder.
    pub fn open(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            debug!("run recorder disabled: no database configured");
            return Self::disabled();
        };
        match open_connection(path) {
            Ok(conn) => Self { conn: Some(conn) },
            Err(err) => {
                warn!(path = %path.display(), error = %err, "run recorder disabled");
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.conn.is_some()
    }

    /// Insert a run record with zero counters. Returns its id.
    pub fn start_run(&self, model: &str, started_at: DateTime<Utc>) -> Option<i64> {
        let conn = self.conn.as_ref()?;
        match insert_run(conn, model, started_at) {
            Ok(id) => Some(id),
            Err(err) => {
                warn!(error = %err, "start_run failed");
                None
            }
        }
    }

    /// Store final counters for a run.
    pub fn finish_run(&self, run_id: i64, stats: &RunStats) -> bool {
        let Some(conn) = self.conn.as_ref() else {
            return false;
        };
        match update_run(conn, run_id, stats) {
            Ok(1) => true,
            Ok(updated) => {
                warn!(run_id, updated, "finish_run matched no single run");
                false
            }
            Err(err) => {
                warn!(run_id, error = %err, "finish_run failed");
                false
            }
        }
    }

    pub fn record(&self, run_id: Option<i64>, event_type: &str, payload: &Value) -> bool {
        let Some(conn) = self.conn.as_ref() else {
            return false;
        };
        match insert_event(conn, run_id, event_type, payload) {
            Ok(()) => true,
            Err(err) => {
                warn!(event_type, error = %err, "record_event failed");
                false
            }
        }
    }

    /// Number of events stored for `run_id`.
    pub fn event_count(&self, run_id: i64) -> Option<u64> {
        let conn = self.conn.as_ref()?;
        conn.query_row(
            "SELECT COUNT(*) FROM events WHERE run_id = ?1",
            params![run_id],
            |row| row.get::<_, i64>(0),
        )
        .map(|count| count.max(0) as u64)
        .map_err(|err| warn!(run_id, error = %err, "event_count failed"))
        .ok()
    }

    /// Stored counters for a run, if present.
    pub fn run_stats(&self, run_id: i64) -> Option<RunStats> {
        let conn = self.conn.as_ref()?;
        conn.query_row(
            "SELECT loops, processed, failed FROM agent_runs WHERE id = ?1",
            params![run_id],
            |row| {
                Ok(RunStats {
                    loops: row.get(0)?,
                    processed: row.get(1)?,
                    failed: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(|err| warn!(run_id, error = %err, "run_stats failed"))
        .ok()
        .flatten()
    }
}

impl EventSink for RunRecorder {
    fn record_event(&self, run_id: Option<i64>, event_type: &str, payload: &Value) {
        self.record(run_id, event_type, payload);
    }
}

fn open_connection(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    apply_schema(&conn)?;
    Ok(conn)
}

fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}

fn insert_run(conn: &Connection, model: &str, started_at: DateTime<Utc>) -> rusqlite::Result<i64> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO agent_runs (started_at, model, loops, processed, failed) \
         VALUES (?1, ?2, 0, 0, 0)",
        params![started_at.to_rfc3339(), model],
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;
    Ok(id)
}

fn update_run(conn: &Connection, run_id: i64, stats: &RunStats) -> rusqlite::Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let updated = tx.execute(
        "UPDATE agent_runs SET loops = ?1, processed = ?2, failed = ?3 WHERE id = ?4",
        params![stats.loops, stats.processed, stats.failed, run_id],
    )?;
    tx.commit()?;
    Ok(updated)
}

fn insert_event(
    conn: &Connection,
    run_id: Option<i64>,
    event_type: &str,
    payload: &Value,
) -> rusqlite::Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO events (run_id, ts, event_type, payload_json) VALUES (?1, ?2, ?3, ?4)",
        params![run_id, Utc::now().to_rfc3339(), event_type, payload.to_string()],
    )?;
    tx.commit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn disabled_recorder_is_noop() {
        let recorder = RunRecorder::open(None);
        assert!(!recorder.is_enabled());
        assert_eq!(recorder.start_run("m", Utc::now()), None);
        assert!(!recorder.finish_run(1, &RunStats::default()));
        assert!(!recorder.record(None, "pipeline.loop_start", &json!({})));
        assert_eq!(recorder.event_count(1), None);
    }

    #[test]
    fn unopenable_path_disables() {
        let temp = tempfile::tempdir().expect("tempdir");
        let recorder = RunRecorder::open(Some(&temp.path().join("missing").join("runs.db")));
        assert!(!recorder.is_enabled());
    }

    #[test]
    fn run_lifecycle_round_trip() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("runs.db");
        let recorder = RunRecorder::open(Some(&path));
        assert!(recorder.is_enabled());

        let run_id = recorder.start_run("gpt-4o-mini", Utc::now()).expect("run id");
        assert_eq!(recorder.run_stats(run_id), Some(RunStats::default()));

        assert!(recorder.record(Some(run_id), "pipeline.loop_start", &json!({"loop": 1})));
        assert!(recorder.record(None, "task_store.read_task", &json!({})));
        assert_eq!(recorder.event_count(run_id), Some(1));

        let stats = RunStats {
            loops: 3,
            processed: 2,
            failed: 1,
        };
        assert!(recorder.finish_run(run_id, &stats));
        assert_eq!(recorder.run_stats(run_id), Some(stats));
        assert!(!recorder.finish_run(run_id + 100, &stats));
    }

    #[test]
    fn schema_is_idempotent() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("runs.db");
        let first = RunRecorder::open(Some(&path));
        let run_id = first.start_run("m", Utc::now()).expect("run id");
        drop(first);

        let second = RunRecorder::open(Some(&path));
        assert!(second.is_enabled());
        assert_eq!(second.run_stats(run_id), Some(RunStats::default()));
    }
}

//! Append-only audit trail: one JSON file per significant action.
//!
//! Writing an entry never fails from the caller's point of view. If the log
//! directory cannot be written, the entry is printed to stderr with an
//! `[AUDIT FALLBACK]` prefix instead.

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

/// Immutable record of one audited action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// 12 lowercase hex characters.
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// Component that performed the action.
    pub server: String,
    pub action: String,
    #[serde(default)]
    pub details: Value,
    pub success: bool,
}

impl AuditEntry {
    pub fn new(server: &str, action: &str, details: Value, success: bool) -> Self {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(12);
        Self {
            id,
            timestamp: Utc::now(),
            server: server.to_string(),
            action: action.to_string(),
            details,
            success,
        }
    }

    /// `<YYYYMMDD_HHMMSS>_<id>.json`
    pub fn file_name(&self) -> String {
        format!("{}_{}.json", self.timestamp.format("%Y%m%d_%H%M%S"), self.id)
    }

    /// Key used for grouping and for relational event types.
    pub fn event_type(&self) -> String {
        format!("{}.{}", self.server, self.action)
    }
}

/// Secondary destination for audit entries (the relational recorder).
///
/// Implementations must swallow their own failures.
pub trait EventSink {
    fn record_event(&self, run_id: Option<i64>, event_type: &str, payload: &Value);
}

/// Writes audit entries into a log directory, optionally forwarding them to
/// an [`EventSink`] tagged with the run they belong to.
///
/// The run id is carried by the sink value itself; use [`AuditSink::for_run`]
/// to derive a run-scoped sink.
#[derive(Clone)]
pub struct AuditSink {
    log_dir: PathBuf,
    events: Option<Rc<dyn EventSink>>,
    run_id: Option<i64>,
}

impl std::fmt::Debug for AuditSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditSink")
            .field("log_dir", &self.log_dir)
            .field("events", &self.events.is_some())
            .field("run_id", &self.run_id)
            .finish()
    }
}

impl AuditSink {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
            events: None,
            run_id: None,
        }
    }

    pub fn with_events(mut self, events: Rc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    /// A copy of this sink whose entries are attributed to `run_id`.
    pub fn for_run(&self, run_id: Option<i64>) -> Self {
        Self {
            run_id,
            ..self.clone()
        }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Record a successful action. Returns the audit file name.
    pub fn log(&self, server: &str, action: &str, details: Value) -> String {
        self.record(server, action, details, true)
    }

    /// Record a failed action. Returns the audit file name.
    pub fn log_failure(&self, server: &str, action: &str, details: Value) -> String {
        self.record(server, action, details, false)
    }

    pub fn record(&self, server: &str, action: &str, details: Value, success: bool) -> String {
        let entry = AuditEntry::new(server, action, details, success);
        self.write(&entry);
        entry.file_name()
    }

    fn write(&self, entry: &AuditEntry) {
        if let Err(err) = write_entry(&self.log_dir, entry) {
            warn!(error = %format!("{err:#}"), "audit write failed, using console fallback");
            eprintln!("[AUDIT FALLBACK] {}", fallback_line(entry));
        }

        if let Some(events) = &self.events {
            match serde_json::to_value(entry) {
                Ok(payload) => events.record_event(self.run_id, &entry.event_type(), &payload),
                Err(err) => warn!(error = %err, "audit entry not forwarded"),
            }
        }
    }
}

fn write_entry(log_dir: &Path, entry: &AuditEntry) -> Result<()> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("create audit dir {}", log_dir.display()))?;
    let path = log_dir.join(entry.file_name());
    let mut buf = serde_json::to_string_pretty(entry).context("serialize audit entry")?;
    buf.push('\n');
    fs::write(&path, buf).with_context(|| format!("write {}", path.display()))
}

fn fallback_line(entry: &AuditEntry) -> String {
    serde_json::to_string(entry).unwrap_or_else(|_| format!("{}: {}", entry.event_type(), entry.id))
}

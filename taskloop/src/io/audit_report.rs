//! Read-side helpers over the audit log directory.
//!
//! Reading never writes audit entries of its own.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::io::audit::AuditEntry;

/// Aggregate counts over a set of audit entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditSummary {
    pub total: usize,
    pub errors: usize,
    /// `server.action` to number of entries.
    pub breakdown: BTreeMap<String, usize>,
}

/// Load every parseable entry at or after `since`, ordered by file name.
///
/// A missing directory yields no entries. Unreadable or malformed files are
/// skipped.
pub fn load_entries(log_dir: &Path, since: DateTime<Utc>) -> Result<Vec<AuditEntry>> {
    if !log_dir.exists() {
        return Ok(Vec::new());
    }
    let mut files: Vec<PathBuf> = fs::read_dir(log_dir)
        .with_context(|| format!("read audit dir {}", log_dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();

    let mut entries = Vec::with_capacity(files.len());
    for path in files {
        match read_entry(&path) {
            Ok(entry) if entry.timestamp >= since => entries.push(entry),
            Ok(_) => {}
            Err(err) => debug!(path = %path.display(), error = %err, "skipping audit file"),
        }
    }
    Ok(entries)
}

fn read_entry(path: &Path) -> Result<AuditEntry> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
}

pub fn error_entries(entries: &[AuditEntry]) -> Vec<&AuditEntry> {
    entries.iter().filter(|entry| !entry.success).collect()
}

pub fn summarize(entries: &[AuditEntry]) -> AuditSummary {
    let mut summary = AuditSummary {
        total: entries.len(),
        ..AuditSummary::default()
    };
    for entry in entries {
        if !entry.success {
            summary.errors += 1;
        }
        *summary.breakdown.entry(entry.event_type()).or_insert(0) += 1;
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn write(dir: &Path, entry: &AuditEntry) {
        let raw = serde_json::to_string(entry).expect("serialize");
        fs::write(dir.join(entry.file_name()), raw).expect("write entry");
    }

    fn entry_at(action: &str, success: bool, ts: DateTime<Utc>) -> AuditEntry {
        let mut entry = AuditEntry::new("task_store", action, json!({}), success);
        entry.timestamp = ts;
        entry
    }

    #[test]
    fn missing_dir_is_empty() {
        let temp = tempfile::tempdir().expect("tempdir");
        let entries = load_entries(&temp.path().join("Logs"), Utc::now()).expect("load");
        assert!(entries.is_empty());
    }

    #[test]
    fn filters_by_time_and_skips_garbage() {
        let temp = tempfile::tempdir().expect("tempdir");
        let now = Utc
            .with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
            .single()
            .expect("timestamp");
        write(temp.path(), &entry_at("old", true, now - Duration::hours(48)));
        write(temp.path(), &entry_at("read_task", true, now));
        write(temp.path(), &entry_at("move_task", false, now));
        fs::write(temp.path().join("broken.json"), "{").expect("write broken");
        fs::write(temp.path().join("notes.txt"), "ignored").expect("write txt");

        let entries = load_entries(temp.path(), now - Duration::hours(24)).expect("load");
        assert_eq!(entries.len(), 2);

        let errors = error_entries(&entries);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].action, "move_task");
    }

    #[test]
    fn summary_groups_by_server_and_action() {
        let now = Utc::now();
        let entries = vec![
            entry_at("read_task", true, now),
            entry_at("read_task", true, now),
            entry_at("move_task", false, now),
        ];
        let summary = summarize(&entries);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.breakdown["task_store.read_task"], 2);
        assert_eq!(summary.breakdown["task_store.move_task"], 1);
    }
}

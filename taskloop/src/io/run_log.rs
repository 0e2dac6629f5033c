//! Human-readable append-only logs in the vault root.
//!
//! `run_log.md` gets one line per lifecycle event; `prompt_history.md` one
//! block per processed task. Both are product artifacts: they are written
//! regardless of `RUST_LOG`, and a failed append only produces a warning.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::core::document::format_timestamp;
use crate::core::types::{Domain, StatusTag};

#[derive(Debug, Clone)]
pub struct RunLog {
    run_log_path: PathBuf,
    prompt_history_path: PathBuf,
}

/// One processed task as recorded in the prompt history.
#[derive(Debug, Clone)]
pub struct PromptRecord<'a> {
    pub file: &'a str,
    pub domain: Domain,
    pub model: &'a str,
    pub status: StatusTag,
    /// `None` when no generation call was made.
    pub prompt: Option<&'a str>,
    pub at: DateTime<Utc>,
}

impl RunLog {
    pub fn new(run_log_path: impl Into<PathBuf>, prompt_history_path: impl Into<PathBuf>) -> Self {
        Self {
            run_log_path: run_log_path.into(),
            prompt_history_path: prompt_history_path.into(),
        }
    }

    /// Append `<ts> - <text>` to the run log.
    pub fn event(&self, at: DateTime<Utc>, text: &str) {
        let line = format!("{} - {}\n", format_timestamp(at), text);
        if let Err(err) = append(&self.run_log_path, &line) {
            warn!(error = %format!("{err:#}"), "run log append failed");
        }
    }

    pub fn prompt(&self, record: &PromptRecord<'_>) {
        let block = format!(
            "## {file}\n\n\
             - Time: {time}\n\
             - Domain: {domain}\n\
             - Model: {model}\n\
             - Status: {status}\n\n\
             ```text\n{prompt}\n```\n\n",
            file = record.file,
            time = format_timestamp(record.at),
            domain = record.domain,
            model = record.model,
            status = record.status,
            prompt = record.prompt.unwrap_or("fallback"),
        );
        if let Err(err) = append(&self.prompt_history_path, &block) {
            warn!(error = %format!("{err:#}"), "prompt history append failed");
        }
    }
}

fn append(path: &Path, contents: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open {}", path.display()))?;
    file.write_all(contents.as_bytes())
        .with_context(|| format!("append {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 6, 7, 8, 9)
            .single()
            .expect("timestamp")
    }

    #[test]
    fn events_append_lines() {
        let temp = tempfile::tempdir().expect("tempdir");
        let log = RunLog::new(
            temp.path().join("run_log.md"),
            temp.path().join("prompt_history.md"),
        );
        log.event(at(), "Moved a.md from Inbox to Needs_Action");
        log.event(at(), "Completed a.md (business, fallback)");

        let raw = fs::read_to_string(temp.path().join("run_log.md")).expect("read");
        assert_eq!(
            raw,
            "2026-05-06 07:08:09Z - Moved a.md from Inbox to Needs_Action\n\
             2026-05-06 07:08:09Z - Completed a.md (business, fallback)\n"
        );
    }

    #[test]
    fn prompt_block_marks_fallback() {
        let temp = tempfile::tempdir().expect("tempdir");
        let log = RunLog::new(
            temp.path().join("run_log.md"),
            temp.path().join("prompt_history.md"),
        );
        log.prompt(&PromptRecord {
            file: "a.md",
            domain: Domain::Business,
            model: "gpt-4o-mini",
            status: StatusTag::Fallback,
            prompt: None,
            at: at(),
        });

        let raw = fs::read_to_string(temp.path().join("prompt_history.md")).expect("read");
        assert!(raw.starts_with("## a.md\n"));
        assert!(raw.contains("- Status: fallback\n"));
        assert!(raw.contains("```text\nfallback\n```"));
    }

    #[test]
    fn missing_parent_only_warns() {
        let temp = tempfile::tempdir().expect("tempdir");
        let log = RunLog::new(
            temp.path().join("nope").join("run_log.md"),
            temp.path().join("nope").join("prompt_history.md"),
        );
        log.event(at(), "ignored");
        assert!(!temp.path().join("nope").exists());
    }
}

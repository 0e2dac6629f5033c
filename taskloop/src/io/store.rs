//! Task file operations over vault folders.
//!
//! Every operation writes exactly one audit entry and reports failure through
//! its return value instead of an error.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde_json::json;
use tracing::{debug, warn};

use crate::io::audit::AuditSink;
use crate::io::layout::KEEP_FILE;

const SERVER: &str = "task_store";

#[derive(Debug, Clone)]
pub struct TaskStore {
    audit: AuditSink,
    extension: String,
}

impl TaskStore {
    pub fn new(audit: AuditSink, extension: impl Into<String>) -> Self {
        Self {
            audit,
            extension: extension.into(),
        }
    }

    /// Task file names in `folder`, sorted. Missing folders list as empty.
    pub fn list_tasks(&self, folder: &Path) -> Vec<String> {
        let entries = match fs::read_dir(folder) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                self.audit.log(
                    SERVER,
                    "list_tasks",
                    json!({"folder": folder.display().to_string(), "count": 0, "missing": true}),
                );
                return Vec::new();
            }
            Err(err) => {
                warn!(folder = %folder.display(), error = %err, "list tasks failed");
                self.audit.log_failure(
                    SERVER,
                    "list_tasks_error",
                    json!({"folder": folder.display().to_string(), "error": err.to_string()}),
                );
                return Vec::new();
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_ok_and(|ty| ty.is_file()))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| self.is_task_name(name))
            .collect();
        names.sort();

        self.audit.log(
            SERVER,
            "list_tasks",
            json!({"folder": folder.display().to_string(), "count": names.len()}),
        );
        names
    }

    fn is_task_name(&self, name: &str) -> bool {
        if name == KEEP_FILE || name.starts_with('.') {
            return false;
        }
        Path::new(name)
            .extension()
            .is_some_and(|ext| ext == self.extension.as_str())
    }

    /// Trimmed text content, or an empty string when the file cannot be read.
    ///
    /// Invalid UTF-8 sequences are dropped.
    pub fn read_task(&self, path: &Path) -> String {
        match fs::read(path) {
            Ok(bytes) => {
                let text = decode_lossy(&bytes);
                let content = text.trim().to_string();
                self.audit.log(
                    SERVER,
                    "read_task",
                    json!({"path": path.display().to_string(), "chars": content.chars().count()}),
                );
                content
            }
            Err(err) => {
                debug!(path = %path.display(), error = %err, "read task failed");
                self.audit.log_failure(
                    SERVER,
                    "read_task_error",
                    json!({"path": path.display().to_string(), "error": err.to_string()}),
                );
                String::new()
            }
        }
    }

    /// Write (or overwrite) `content`, creating parent folders.
    pub fn write_task(&self, path: &Path, content: &str) -> bool {
        let result = path
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|()| fs::write(path, content));
        match result {
            Ok(()) => {
                self.audit.log(
                    SERVER,
                    "write_task",
                    json!({"path": path.display().to_string(), "bytes": content.len()}),
                );
                true
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "write task failed");
                self.audit.log_failure(
                    SERVER,
                    "write_task_error",
                    json!({"path": path.display().to_string(), "error": err.to_string()}),
                );
                false
            }
        }
    }

    /// Move `src` to `dst`, creating `dst`'s parent. Fails if `src` is absent.
    pub fn move_task(&self, src: &Path, dst: &Path) -> bool {
        let details = |error: Option<String>| {
            json!({
                "src": src.display().to_string(),
                "dst": dst.display().to_string(),
                "error": error,
            })
        };
        if !src.is_file() {
            self.audit.log_failure(
                SERVER,
                "move_task_error",
                details(Some("source does not exist".to_string())),
            );
            return false;
        }
        let result = dst
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|()| fs::rename(src, dst));
        match result {
            Ok(()) => {
                self.audit.log(SERVER, "move_task", details(None));
                true
            }
            Err(err) => {
                warn!(src = %src.display(), dst = %dst.display(), error = %err, "move task failed");
                self.audit
                    .log_failure(SERVER, "move_task_error", details(Some(err.to_string())));
                false
            }
        }
    }

    /// Remove a task file. Removing an absent file succeeds.
    pub fn delete_task(&self, path: &Path) -> bool {
        match fs::remove_file(path) {
            Ok(()) => {
                self.audit.log(
                    SERVER,
                    "delete_task",
                    json!({"path": path.display().to_string(), "existed": true}),
                );
                true
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                self.audit.log(
                    SERVER,
                    "delete_task",
                    json!({"path": path.display().to_string(), "existed": false}),
                );
                true
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "delete task failed");
                self.audit.log_failure(
                    SERVER,
                    "delete_task_error",
                    json!({"path": path.display().to_string(), "error": err.to_string()}),
                );
                false
            }
        }
    }
}

fn decode_lossy(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::audit_report::load_entries;
    use chrono::{DateTime, Utc};

    fn store(root: &Path) -> TaskStore {
        TaskStore::new(AuditSink::new(root.join("Logs")), "md")
    }

    fn audit_count(root: &Path) -> usize {
        load_entries(&root.join("Logs"), DateTime::<Utc>::MIN_UTC)
            .expect("load entries")
            .len()
    }

    #[test]
    fn list_is_sorted_and_skips_placeholders() {
        let temp = tempfile::tempdir().expect("tempdir");
        let folder = temp.path().join("Needs_Action");
        fs::create_dir_all(&folder).expect("mkdir");
        for name in ["b.md", "a.md", KEEP_FILE, "notes.txt", ".hidden.md"] {
            fs::write(folder.join(name), "x").expect("write");
        }
        fs::create_dir_all(folder.join("nested.md")).expect("mkdir nested");

        let store = store(temp.path());
        assert_eq!(store.list_tasks(&folder), vec!["a.md", "b.md"]);
        assert_eq!(audit_count(temp.path()), 1);
    }

    #[test]
    fn list_missing_folder_is_empty_and_audited() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = store(temp.path());
        assert!(store.list_tasks(&temp.path().join("Inbox")).is_empty());
        assert_eq!(audit_count(temp.path()), 1);
    }

    #[test]
    fn read_drops_invalid_bytes_and_trims() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("task.md");
        fs::write(&path, b"  caf\xff\xfee meeting \n\n").expect("write");

        let store = store(temp.path());
        assert_eq!(store.read_task(&path), "cafe meeting");
        assert_eq!(store.read_task(&temp.path().join("missing.md")), "");
        assert_eq!(audit_count(temp.path()), 2);
    }

    #[test]
    fn write_creates_parents_and_overwrites() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("Done").join("task.md");
        let store = store(temp.path());

        assert!(store.write_task(&path, "first"));
        assert!(store.write_task(&path, "second"));
        assert_eq!(fs::read_to_string(&path).expect("read"), "second");
    }

    #[test]
    fn write_into_file_parent_fails() {
        let temp = tempfile::tempdir().expect("tempdir");
        let blocker = temp.path().join("Business");
        fs::write(&blocker, "file").expect("write blocker");

        let store = store(temp.path());
        assert!(!store.write_task(&blocker.join("task.md"), "x"));
        let entries = load_entries(&temp.path().join("Logs"), DateTime::<Utc>::MIN_UTC)
            .expect("load entries");
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].success);
    }

    #[test]
    fn move_requires_source_and_creates_destination() {
        let temp = tempfile::tempdir().expect("tempdir");
        let src = temp.path().join("Inbox").join("a.md");
        let dst = temp.path().join("Needs_Action").join("a.md");
        let store = store(temp.path());

        assert!(!store.move_task(&src, &dst));

        fs::create_dir_all(src.parent().expect("parent")).expect("mkdir");
        fs::write(&src, "hello").expect("write");
        assert!(store.move_task(&src, &dst));
        assert!(!src.exists());
        assert_eq!(fs::read_to_string(&dst).expect("read"), "hello");
    }

    #[test]
    fn delete_is_idempotent() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("a.md");
        fs::write(&path, "x").expect("write");
        let store = store(temp.path());

        assert!(store.delete_task(&path));
        assert!(store.delete_task(&path));
        assert!(!path.exists());
        assert_eq!(audit_count(temp.path()), 2);
    }
}

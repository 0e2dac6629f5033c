//! Test-only helpers: temporary vaults, a fixed clock and a scripted text
//! generator.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;
use tempfile::TempDir;

use crate::core::types::Domain;
use crate::io::audit::AuditEntry;
use crate::io::audit_report::load_entries;
use crate::io::layout::{InitOptions, KEEP_FILE, VaultPaths, init_vault};
use crate::io::summarizer::{GenerationError, TextGenerator};

/// Initialized vault in a temporary directory.
pub struct TestVault {
    _temp: TempDir,
    paths: VaultPaths,
}

impl TestVault {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir().context("create tempdir")?;
        let paths = init_vault(temp.path(), &InitOptions { force: false })?;
        Ok(Self { _temp: temp, paths })
    }

    pub fn root(&self) -> &Path {
        &self.paths.root
    }

    pub fn paths(&self) -> &VaultPaths {
        &self.paths
    }

    pub fn drop_in_inbox(&self, name: &str, content: &str) -> Result<()> {
        write(&self.paths.inbox_dir.join(name), content)
    }

    pub fn drop_in_pending(&self, name: &str, content: &str) -> Result<()> {
        write(&self.paths.needs_action_dir.join(name), content)
    }

    pub fn inbox(&self) -> Vec<String> {
        list(&self.paths.inbox_dir)
    }

    pub fn pending(&self) -> Vec<String> {
        list(&self.paths.needs_action_dir)
    }

    pub fn done(&self) -> Vec<String> {
        list(&self.paths.done_dir)
    }

    pub fn read_done(&self, name: &str) -> Result<String> {
        let path = self.paths.done_dir.join(name);
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))
    }

    /// Replace a domain folder with a plain file so archive writes fail.
    pub fn block_domain_folder(&self, domain: Domain) -> Result<()> {
        let dir = self.paths.domain_dir(domain);
        fs::remove_dir_all(dir).with_context(|| format!("remove {}", dir.display()))?;
        write(dir, "blocked")
    }

    /// Every audit entry written so far, in file name order.
    pub fn audit_entries(&self) -> Result<Vec<AuditEntry>> {
        load_entries(&self.paths.logs_dir, DateTime::<Utc>::MIN_UTC)
    }

    pub fn run_log(&self) -> Result<String> {
        fs::read_to_string(&self.paths.run_log_path).context("read run log")
    }
}

fn write(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).with_context(|| format!("write {}", path.display()))
}

fn list(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|entry| entry.ok())
                .filter_map(|entry| entry.file_name().into_string().ok())
                .filter(|name| name != KEEP_FILE)
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

/// Clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Default for FixedClock {
    fn default() -> Self {
        Self(
            Utc.with_ymd_and_hms(2026, 1, 1, 9, 30, 0)
                .single()
                .expect("fixed timestamp should be valid"),
        )
    }
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Text generator returning queued replies in order.
///
/// Once the queue is empty every call returns an empty reply.
pub struct ScriptedGenerator {
    replies: RefCell<VecDeque<Result<String, GenerationError>>>,
    prompts: RefCell<Vec<String>>,
    calls: Cell<u32>,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<Result<String, GenerationError>>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            prompts: RefCell::new(Vec::new()),
            calls: Cell::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.get()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }
}

impl TextGenerator for ScriptedGenerator {
    fn model(&self) -> &str {
        "scripted"
    }

    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.calls.set(self.calls.get() + 1);
        self.prompts.borrow_mut().push(prompt.to_string());
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }
}

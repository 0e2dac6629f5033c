//! Vault folder layout and initialization.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::core::state::TaskState;
use crate::core::types::Domain;
use crate::io::config::{PipelineConfig, write_config};

/// Placeholder kept in empty task folders; never treated as a task.
pub const KEEP_FILE: &str = ".gitkeep";

/// All canonical paths within a vault root.
#[derive(Debug, Clone)]
pub struct VaultPaths {
    pub root: PathBuf,
    pub inbox_dir: PathBuf,
    pub needs_action_dir: PathBuf,
    pub done_dir: PathBuf,
    pub business_dir: PathBuf,
    pub personal_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub run_log_path: PathBuf,
    pub prompt_history_path: PathBuf,
    pub config_path: PathBuf,
}

impl VaultPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            inbox_dir: root.join("Inbox"),
            needs_action_dir: root.join("Needs_Action"),
            done_dir: root.join("Done"),
            business_dir: root.join("Business"),
            personal_dir: root.join("Personal"),
            logs_dir: root.join("Logs"),
            run_log_path: root.join("run_log.md"),
            prompt_history_path: root.join("prompt_history.md"),
            config_path: root.join("taskloop.toml"),
            root,
        }
    }

    /// Folder that holds tasks in the given state.
    ///
    /// Terminal failures are stored alongside completed tasks.
    pub fn state_dir(&self, state: TaskState) -> &Path {
        match state {
            TaskState::Incoming => &self.inbox_dir,
            TaskState::Pending => &self.needs_action_dir,
            TaskState::Done | TaskState::FailedTerminal => &self.done_dir,
        }
    }

    /// Archive folder for a domain.
    pub fn domain_dir(&self, domain: Domain) -> &Path {
        match domain {
            Domain::Business => &self.business_dir,
            Domain::Personal => &self.personal_dir,
        }
    }

    fn task_dirs(&self) -> [&Path; 5] {
        [
            &self.inbox_dir,
            &self.needs_action_dir,
            &self.done_dir,
            &self.business_dir,
            &self.personal_dir,
        ]
    }
}

/// Options for `init_vault`.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// If true, reset the run log and prompt history headers.
    pub force: bool,
}

/// Create the vault scaffolding under `root`.
///
/// Existing task files and an existing `taskloop.toml` are never touched.
/// Without `force`, existing run log and prompt history files are kept as
/// they are.
pub fn init_vault(root: &Path, options: &InitOptions) -> Result<VaultPaths> {
    let paths = VaultPaths::new(root);
    debug!(root = %root.display(), force = options.force, "initializing vault");

    for dir in paths.task_dirs() {
        create_dir(dir)?;
        let keep = dir.join(KEEP_FILE);
        if !keep.exists() {
            write_file(&keep, "")?;
        }
    }
    create_dir(&paths.logs_dir)?;

    write_if_missing_or_force(&paths.run_log_path, RUN_LOG_HEADER, options.force)?;
    write_if_missing_or_force(
        &paths.prompt_history_path,
        PROMPT_HISTORY_HEADER,
        options.force,
    )?;
    if !paths.config_path.exists() {
        write_config(&paths.config_path, &PipelineConfig::default())?;
    }

    Ok(paths)
}

/// Best-effort scaffolding before a run.
///
/// Folders or log files that cannot be created are reported and skipped. The
/// store and router create folders on demand and audit their own failures,
/// so one broken folder only affects the tasks that need it.
pub fn prepare_vault(root: &Path) -> VaultPaths {
    let paths = VaultPaths::new(root);
    for dir in paths.task_dirs().into_iter().chain([paths.logs_dir.as_path()]) {
        if let Err(err) = create_dir(dir) {
            warn!(error = %format!("{err:#}"), "vault folder unavailable");
        }
    }
    for (path, header) in [
        (&paths.run_log_path, RUN_LOG_HEADER),
        (&paths.prompt_history_path, PROMPT_HISTORY_HEADER),
    ] {
        if let Err(err) = write_if_missing_or_force(path, header, false) {
            warn!(error = %format!("{err:#}"), "vault log file unavailable");
        }
    }
    paths
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).with_context(|| format!("create directory {}", path.display()))
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir(parent)?;
    }
    fs::write(path, contents).with_context(|| format!("write file {}", path.display()))
}

fn write_if_missing_or_force(path: &Path, contents: &str, force: bool) -> Result<()> {
    if !force && path.exists() {
        return Ok(());
    }
    write_file(path, contents)
}

pub const RUN_LOG_HEADER: &str = "# Run Log\n\n";
pub const PROMPT_HISTORY_HEADER: &str = "# Prompt History\n\n";

#[cfg(test)]
mod tests {
    use super::*;

    fn read_to_string(path: &Path) -> String {
        fs::read_to_string(path).expect("read file")
    }

    #[test]
    fn init_creates_expected_layout() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = init_vault(temp.path(), &InitOptions { force: false }).expect("init");

        for dir in paths.task_dirs() {
            assert!(dir.is_dir(), "missing {}", dir.display());
            assert!(dir.join(KEEP_FILE).is_file());
        }
        assert!(paths.logs_dir.is_dir());
        assert_eq!(read_to_string(&paths.run_log_path), RUN_LOG_HEADER);
        assert_eq!(
            read_to_string(&paths.prompt_history_path),
            PROMPT_HISTORY_HEADER
        );
        let seeded = crate::io::config::load_config(&paths.config_path).expect("seeded config");
        assert_eq!(seeded, PipelineConfig::default());
    }

    #[test]
    fn init_keeps_existing_config() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = VaultPaths::new(temp.path());
        fs::write(&paths.config_path, "max_loops = 7\n").expect("write config");

        init_vault(temp.path(), &InitOptions { force: true }).expect("init");
        assert_eq!(read_to_string(&paths.config_path), "max_loops = 7\n");
    }

    #[test]
    fn prepare_skips_blocked_folders() {
        let temp = tempfile::tempdir().expect("tempdir");
        let blocked = temp.path().join("Business");
        fs::write(&blocked, "blocked").expect("block business");

        let paths = prepare_vault(temp.path());
        assert!(paths.business_dir.is_file());
        assert!(paths.inbox_dir.is_dir());
        assert!(paths.personal_dir.is_dir());
        assert!(paths.logs_dir.is_dir());
        assert_eq!(read_to_string(&paths.run_log_path), RUN_LOG_HEADER);
        assert!(!paths.config_path.exists());
    }

    #[test]
    fn init_without_force_keeps_existing_logs() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = init_vault(temp.path(), &InitOptions { force: false }).expect("init");
        fs::write(&paths.run_log_path, "custom").expect("write custom");

        init_vault(temp.path(), &InitOptions { force: false }).expect("re-init");
        assert_eq!(read_to_string(&paths.run_log_path), "custom");

        init_vault(temp.path(), &InitOptions { force: true }).expect("force init");
        assert_eq!(read_to_string(&paths.run_log_path), RUN_LOG_HEADER);
    }

    #[test]
    fn failed_terminal_shares_done_folder() {
        let paths = VaultPaths::new("/vault");
        assert_eq!(
            paths.state_dir(TaskState::FailedTerminal),
            paths.state_dir(TaskState::Done)
        );
        assert_eq!(
            paths.state_dir(TaskState::Pending),
            Path::new("/vault/Needs_Action")
        );
        assert_eq!(
            paths.domain_dir(Domain::Personal),
            Path::new("/vault/Personal")
        );
    }
}

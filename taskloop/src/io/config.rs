//! Pipeline configuration stored in `<vault>/taskloop.toml`.
//!
//! Precedence, lowest to highest: built-in defaults, the TOML file,
//! environment variables, CLI flags (applied by the binary).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Pipeline configuration (TOML).
///
/// Missing fields default to values that let the pipeline run unconfigured.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Model label recorded in documents and sent to the text generator.
    pub model: String,

    /// Task text beyond this many characters is cut from the prompt.
    pub max_task_chars: usize,

    /// Failed attempts allowed per task before it is terminally failed.
    pub max_retries: u32,

    /// Maximum loop iterations per run.
    pub max_loops: u32,

    /// Pause between loop iterations in milliseconds.
    pub loop_delay_ms: u64,

    /// Extension (without dot) of files treated as tasks.
    pub task_extension: String,

    /// SQLite file for the run recorder. Unset disables the recorder.
    pub database_path: Option<PathBuf>,

    pub summarizer: SummarizerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SummarizerConfig {
    /// Base URL of an OpenAI-compatible API, including the version segment.
    pub api_url: String,
    /// Empty means the summarizer is disabled and falls back.
    pub api_key: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            max_tokens: 800,
            timeout_secs: 30,
        }
    }
}

impl SummarizerConfig {
    pub fn is_enabled(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_task_chars: 6000,
            max_retries: 3,
            max_loops: 50,
            loop_delay_ms: 1000,
            task_extension: "md".to_string(),
            database_path: None,
            summarizer: SummarizerConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(anyhow!("model must be non-empty"));
        }
        if self.max_task_chars == 0 {
            return Err(anyhow!("max_task_chars must be > 0"));
        }
        if self.max_retries == 0 {
            return Err(anyhow!("max_retries must be > 0"));
        }
        if self.max_loops == 0 {
            return Err(anyhow!("max_loops must be > 0"));
        }
        if self.task_extension.trim().is_empty() || self.task_extension.contains('.') {
            return Err(anyhow!("task_extension must be a bare extension like \"md\""));
        }
        if self.summarizer.timeout_secs == 0 {
            return Err(anyhow!("summarizer.timeout_secs must be > 0"));
        }
        Ok(())
    }

    pub fn loop_delay(&self) -> Duration {
        Duration::from_millis(self.loop_delay_ms)
    }

    /// Apply environment overrides using `lookup` to read variables.
    ///
    /// Empty values are ignored. Unparseable numbers are reported as errors.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(model) = get("OPENAI_MODEL") {
            self.model = model.trim().to_string();
        }
        if let Some(raw) = get("MAX_TASK_CHARS") {
            self.max_task_chars = parse_env("MAX_TASK_CHARS", &raw)?;
        }
        if let Some(raw) = get("MAX_RETRIES") {
            self.max_retries = parse_env("MAX_RETRIES", &raw)?;
        }
        if let Some(raw) = get("MAX_LOOPS") {
            self.max_loops = parse_env("MAX_LOOPS", &raw)?;
        }
        if let Some(raw) = get("LOOP_DELAY") {
            let secs: f64 = parse_env("LOOP_DELAY", &raw)?;
            let delay = Duration::try_from_secs_f64(secs)
                .map_err(|err| anyhow!("LOOP_DELAY={raw:?} is not a usable delay: {err}"))?;
            self.loop_delay_ms = u64::try_from(delay.as_millis())
                .map_err(|_| anyhow!("LOOP_DELAY={raw:?} is too large"))?;
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            self.summarizer.api_key = key.trim().to_string();
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            self.summarizer.api_url = url.trim().to_string();
        }
        if let Some(url) = get("DATABASE_URL") {
            let path = url.trim();
            let path = path.strip_prefix("sqlite://").unwrap_or(path);
            self.database_path = Some(PathBuf::from(path));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {key}={raw:?}: {err}"))
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `PipelineConfig::default()`.
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        let cfg = PipelineConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: PipelineConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Load the file config, then apply process environment overrides.
pub fn load_config_with_env(path: &Path) -> Result<PipelineConfig> {
    let mut cfg = load_config(path)?;
    cfg.apply_env(|key| std::env::var(key).ok())?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &PipelineConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

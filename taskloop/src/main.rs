//! Task pipeline runner.
//!
//! Operates on a vault directory (`--root`, default `.`) holding `Inbox/`,
//! `Needs_Action/`, `Done/` and the domain archives. `taskloop run` drains the
//! inbox and processes pending tasks until the queue is empty or the loop
//! cap is reached.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use mockable::DefaultClock;

use taskloop::exit_codes;
use taskloop::io::audit::AuditSink;
use taskloop::io::audit_report::{error_entries, load_entries, summarize};
use taskloop::io::config::{PipelineConfig, load_config_with_env};
use taskloop::io::layout::{InitOptions, VaultPaths, init_vault};
use taskloop::io::openai::OpenAiClient;
use taskloop::io::router::Router;
use taskloop::io::stop::stop_pair;
use taskloop::io::store::TaskStore;
use taskloop::logging;
use taskloop::pipeline::LoopStop;
use taskloop::run::{RunReport, execute_run};

#[derive(Parser)]
#[command(
    name = "taskloop",
    version,
    about = "File-based task pipeline with a bounded retry loop"
)]
struct Cli {
    /// Vault root directory.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the vault folders, run log and prompt history.
    Init {
        /// Reset the run log and prompt history.
        #[arg(short, long)]
        force: bool,
    },
    /// Drain the inbox and process pending tasks.
    Run {
        #[arg(long)]
        max_loops: Option<u32>,
        #[arg(long)]
        max_retries: Option<u32>,
        /// Pause between iterations in milliseconds.
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// Print the domain a task file would be routed to.
    Classify { file: PathBuf },
    /// List archived tasks per domain.
    Domains,
    /// Summarize recent audit entries.
    Audit {
        /// Look-back window in hours.
        #[arg(long, default_value_t = 24)]
        hours: u32,
        /// Print failing entries instead of the summary.
        #[arg(long)]
        errors: bool,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let root = cli.root.as_path();
    match cli.command {
        Command::Init { force } => cmd_init(root, force),
        Command::Run {
            max_loops,
            max_retries,
            delay_ms,
        } => cmd_run(root, max_loops, max_retries, delay_ms),
        Command::Classify { file } => cmd_classify(root, &file),
        Command::Domains => cmd_domains(root),
        Command::Audit { hours, errors } => cmd_audit(root, hours, errors),
    }
}

fn cmd_init(root: &Path, force: bool) -> Result<i32> {
    let paths = init_vault(root, &InitOptions { force })?;
    println!("initialized vault at {}", paths.root.display());
    Ok(exit_codes::OK)
}

fn load_config(root: &Path) -> Result<PipelineConfig> {
    let paths = VaultPaths::new(root);
    load_config_with_env(&paths.config_path)
        .with_context(|| format!("load config {}", paths.config_path.display()))
}

fn cmd_run(
    root: &Path,
    max_loops: Option<u32>,
    max_retries: Option<u32>,
    delay_ms: Option<u64>,
) -> Result<i32> {
    let mut config = load_config(root)?;
    if let Some(max_loops) = max_loops {
        config.max_loops = max_loops;
    }
    if let Some(max_retries) = max_retries {
        config.max_retries = max_retries;
    }
    if let Some(delay_ms) = delay_ms {
        config.loop_delay_ms = delay_ms;
    }
    config.validate()?;

    let generator = OpenAiClient::from_config(&config.summarizer, &config.model);
    println!(
        "text generation: {}",
        if generator.is_some() {
            config.model.as_str()
        } else {
            "disabled (fallback summaries)"
        }
    );

    // Ctrl-C stops the loop at the next inter-iteration wait.
    let (handle, stop) = stop_pair();
    ctrlc::set_handler(move || handle.stop()).context("install Ctrl-C handler")?;

    let report = execute_run(root, &config, generator, DefaultClock, &stop)?;
    print_report(&report);

    Ok(match report.outcome.stop {
        LoopStop::Drained => exit_codes::OK,
        LoopStop::CapReached { .. } => exit_codes::CAP_REACHED,
        LoopStop::Stopped => exit_codes::STOPPED,
    })
}

fn print_report(report: &RunReport) {
    let stats = report.outcome.stats;
    println!("stop: {}", report.outcome.stop.as_str());
    println!("loops: {}", stats.loops);
    println!("processed: {}", stats.processed);
    println!("failed: {}", stats.failed);
    for (name, count) in &report.outcome.retries {
        println!("retries: {name}={count}");
    }
    println!("db enabled: {}", report.db_enabled);
    if let Some(run_id) = report.run_id {
        println!("run id: {run_id}");
    }
    if let Some(events) = report.db_events {
        println!("db events: {events}");
    }
}

fn cmd_classify(root: &Path, file: &Path) -> Result<i32> {
    let config = load_config(root)?;
    let paths = VaultPaths::new(root);
    let audit = AuditSink::new(&paths.logs_dir);
    let store = TaskStore::new(audit.clone(), config.task_extension);
    let router = Router::new(audit, paths);

    let content = store.read_task(file);
    let result = router.classify(&content);
    match result.scores {
        Some(scores) => println!(
            "{} ({}: business={} personal={})",
            result.domain,
            result.method.as_str(),
            scores.business,
            scores.personal
        ),
        None => println!("{} ({})", result.domain, result.method.as_str()),
    }
    Ok(exit_codes::OK)
}

fn cmd_domains(root: &Path) -> Result<i32> {
    let paths = VaultPaths::new(root);
    let router = Router::new(AuditSink::new(&paths.logs_dir), paths);
    for (domain, names) in router.domain_tasks() {
        println!("{} ({})", domain.title(), names.len());
        for name in names {
            println!("  {name}");
        }
    }
    Ok(exit_codes::OK)
}

/// Start of a look-back window, clamped to the earliest representable time.
fn window_start(now: DateTime<Utc>, hours: u32) -> DateTime<Utc> {
    now.checked_sub_signed(Duration::hours(i64::from(hours)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn cmd_audit(root: &Path, hours: u32, errors: bool) -> Result<i32> {
    let paths = VaultPaths::new(root);
    let since = window_start(Utc::now(), hours);
    let entries = load_entries(&paths.logs_dir, since)?;

    if errors {
        for entry in error_entries(&entries) {
            println!(
                "{} {} {}",
                entry.timestamp.to_rfc3339(),
                entry.event_type(),
                entry.details
            );
        }
    } else {
        let summary = summarize(&entries);
        let rendered =
            serde_json::to_string_pretty(&summary).context("serialize audit summary")?;
        println!("{rendered}");
    }
    Ok(exit_codes::OK)
}

//! One complete pipeline run: recorder bookkeeping around the retry loop.

use std::path::Path;
use std::rc::Rc;

use anyhow::Result;
use mockable::Clock;
use serde_json::json;
use tracing::info;

use crate::io::audit::AuditSink;
use crate::io::config::PipelineConfig;
use crate::io::layout::prepare_vault;
use crate::io::recorder::RunRecorder;
use crate::io::run_log::RunLog;
use crate::io::stop::StopSignal;
use crate::io::summarizer::TextGenerator;
use crate::pipeline::{LoopOutcome, Pipeline};

const SERVER: &str = "taskloop";

/// What a run did and where it was recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Run record id, when the recorder is enabled.
    pub run_id: Option<i64>,
    pub outcome: LoopOutcome,
    pub db_enabled: bool,
    /// Events stored for this run, when the recorder is enabled.
    pub db_events: Option<u64>,
}

/// Execute one run against the vault at `root`.
///
/// Fails only if the config is invalid. Missing or broken vault folders are
/// handled per task by the retry policy and show up in the [`RunReport`].
pub fn execute_run<G: TextGenerator, C: Clock>(
    root: &Path,
    config: &PipelineConfig,
    generator: Option<G>,
    clock: C,
    stop: &StopSignal,
) -> Result<RunReport> {
    config.validate()?;
    let paths = prepare_vault(root);
    let summarizer_enabled = generator.is_some();

    let recorder = Rc::new(RunRecorder::open(config.database_path.as_deref()));
    let db_enabled = recorder.is_enabled();
    let run_id = recorder.start_run(&config.model, clock.utc());

    let audit = AuditSink::new(&paths.logs_dir)
        .with_events(recorder.clone())
        .for_run(run_id);
    audit.log(
        SERVER,
        "agent_start",
        json!({
            "model": config.model,
            "max_loops": config.max_loops,
            "max_retries": config.max_retries,
            "summarizer_enabled": summarizer_enabled,
            "db_enabled": db_enabled,
            "run_id": run_id,
        }),
    );

    let run_log = RunLog::new(&paths.run_log_path, &paths.prompt_history_path);
    let pipeline = Pipeline::new(paths, config.clone(), generator, clock, audit.clone());
    let outcome = pipeline.run_loop(stop);

    if let Some(id) = run_id {
        recorder.finish_run(id, &outcome.stats);
    }
    let db_events = run_id.and_then(|id| recorder.event_count(id));

    let stats = outcome.stats;
    audit.log(
        SERVER,
        "agent_complete",
        json!({
            "loops": stats.loops,
            "processed": stats.processed,
            "failed": stats.failed,
            "stop": outcome.stop.as_str(),
            "db_enabled": db_enabled,
            "run_id": run_id,
            "db_events": db_events,
        }),
    );
    run_log.event(
        pipeline.clock().utc(),
        &format!(
            "Run complete | loops={} processed={} failed={} stop={} db={} run_id={} db_events={}",
            stats.loops,
            stats.processed,
            stats.failed,
            outcome.stop.as_str(),
            db_enabled,
            display_opt(run_id),
            display_opt(db_events),
        ),
    );
    info!(?run_id, stop = outcome.stop.as_str(), "run finished");

    Ok(RunReport {
        run_id,
        outcome,
        db_enabled,
        db_events,
    })
}

fn display_opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "none".to_string(), |v| v.to_string())
}

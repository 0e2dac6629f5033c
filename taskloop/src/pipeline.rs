//! The retry loop: drain the inbox, process pending tasks, escalate tasks
//! whose retry budget is spent, repeat until the queue is empty.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Result, bail};
use mockable::Clock;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::core::document::{FailureDocument, ProcessedDocument};
use crate::core::retry::RetryLedger;
use crate::core::state::Transition;
use crate::core::types::{Domain, RunStats, StatusTag};
use crate::io::audit::AuditSink;
use crate::io::config::PipelineConfig;
use crate::io::layout::VaultPaths;
use crate::io::prompt::PromptEngine;
use crate::io::router::Router;
use crate::io::run_log::{PromptRecord, RunLog};
use crate::io::stop::StopSignal;
use crate::io::store::TaskStore;
use crate::io::summarizer::{Summarizer, TextGenerator};

const SERVER: &str = "pipeline";

/// Result of one successful `process_one` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Completed { domain: Domain, status: StatusTag },
    /// Empty or vanished source; nothing was summarized.
    Skipped,
}

/// Reason why `run_loop` stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStop {
    /// The pending queue is empty.
    Drained,
    /// `max_loops` iterations ran and work remains pending.
    CapReached { max_loops: u32 },
    /// A stop was requested during the inter-iteration wait.
    Stopped,
}

impl LoopStop {
    pub fn as_str(self) -> &'static str {
        match self {
            LoopStop::Drained => "drained",
            LoopStop::CapReached { .. } => "cap_reached",
            LoopStop::Stopped => "stopped",
        }
    }
}

/// Summary of a loop invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopOutcome {
    pub stats: RunStats,
    /// Failure counters of this run, by file name.
    pub retries: BTreeMap<String, u32>,
    pub stop: LoopStop,
}

pub struct Pipeline<G, C> {
    paths: VaultPaths,
    config: PipelineConfig,
    audit: AuditSink,
    store: TaskStore,
    router: Router,
    summarizer: Summarizer<G>,
    prompts: PromptEngine,
    run_log: RunLog,
    clock: C,
}

impl<G: TextGenerator, C: Clock> Pipeline<G, C> {
    pub fn new(
        paths: VaultPaths,
        config: PipelineConfig,
        generator: Option<G>,
        clock: C,
        audit: AuditSink,
    ) -> Self {
        Self {
            store: TaskStore::new(audit.clone(), config.task_extension.clone()),
            router: Router::new(audit.clone(), paths.clone()),
            summarizer: Summarizer::new(generator, audit.clone()),
            prompts: PromptEngine::new(),
            run_log: RunLog::new(&paths.run_log_path, &paths.prompt_history_path),
            paths,
            config,
            audit,
            clock,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn dir_for(&self, transition: Transition, name: &str) -> PathBuf {
        self.paths.state_dir(transition.to()).join(name)
    }

    fn pending_path(&self, name: &str) -> PathBuf {
        self.paths.state_dir(Transition::Complete.from()).join(name)
    }

    /// Move every inbox task into the pending queue. Returns the number moved.
    pub fn drain_inbox(&self) -> u32 {
        let inbox = self.paths.state_dir(Transition::Drain.from());
        let mut moved = 0;
        for name in self.store.list_tasks(inbox) {
            let dst = self.dir_for(Transition::Drain, &name);
            if self.store.move_task(&inbox.join(&name), &dst) {
                self.run_log.event(
                    self.clock.utc(),
                    &format!("Moved {name} from Inbox to Needs_Action"),
                );
                moved += 1;
            }
        }
        if moved > 0 {
            debug!(moved, "drained inbox");
        }
        moved
    }

    /// Pending task names, sorted.
    pub fn pending(&self) -> Vec<String> {
        let pending_dir = self.paths.state_dir(Transition::Complete.from());
        self.store.list_tasks(pending_dir)
    }

    /// Classify, summarize and file one pending task.
    ///
    /// Any error leaves the source in the pending queue. Re-running after a
    /// partial success rewrites the same destinations.
    #[instrument(skip(self))]
    pub fn process_one(&self, name: &str) -> Result<ProcessOutcome> {
        let src = self.pending_path(name);
        let done_path = self.dir_for(Transition::Complete, name);
        let content = self.store.read_task(&src);

        if content.is_empty() {
            if src.exists() && !self.store.move_task(&src, &done_path) {
                bail!("move empty task {name} to Done failed");
            }
            self.audit.log(SERVER, "skip_empty_task", json!({"file": name}));
            self.run_log
                .event(self.clock.utc(), &format!("Skipped empty task {name}"));
            return Ok(ProcessOutcome::Skipped);
        }

        let domain = self.router.classify(&content).domain;
        let prompt = self
            .prompts
            .render_summarize(domain, &content, self.config.max_task_chars)?;
        let summary = self.summarizer.summarize(&prompt);

        let processed_at = self.clock.utc();
        let document = ProcessedDocument {
            domain,
            processed_at,
            model: &self.config.model,
            status: summary.status,
            original: &content,
            summary: &summary.text,
        }
        .render();

        if !self.store.write_task(&done_path, &document) {
            bail!("write {} failed", done_path.display());
        }
        let archive_path = self.router.route(name, domain);
        if !self.store.write_task(&archive_path, &document) {
            bail!("write {} failed", archive_path.display());
        }
        if !self.store.delete_task(&src) {
            bail!("delete {} failed", src.display());
        }

        self.run_log.event(
            processed_at,
            &format!("Processed {name} | domain={domain} | {}", summary.status),
        );
        self.run_log.prompt(&PromptRecord {
            file: name,
            domain,
            model: &self.config.model,
            status: summary.status,
            prompt: self.summarizer.is_enabled().then_some(prompt.as_str()),
            at: processed_at,
        });
        self.audit.log(
            SERVER,
            "task_completed",
            json!({
                "file": name,
                "domain": domain,
                "status": summary.status,
                "transition": Transition::Complete,
            }),
        );
        info!(file = name, %domain, status = %summary.status, "task completed");

        Ok(ProcessOutcome::Completed {
            domain,
            status: summary.status,
        })
    }

    /// Write the terminal failure record and drop the pending source.
    ///
    /// Returns false if either step failed; the task then stays pending.
    fn escalate(&self, name: &str, failures: u32) -> bool {
        let src = self.pending_path(name);
        let record_path = self.dir_for(Transition::Escalate, name);
        let document = FailureDocument {
            max_retries: self.config.max_retries,
            failures,
            failed_at: self.clock.utc(),
        }
        .render();

        let escalated =
            self.store.write_task(&record_path, &document) && self.store.delete_task(&src);
        self.audit.log_failure(
            SERVER,
            "max_retries_reached",
            json!({
                "file": name,
                "retries": failures,
                "max_retries": self.config.max_retries,
                "transition": Transition::Escalate,
                "recorded": escalated,
            }),
        );
        if escalated {
            self.run_log.event(
                self.clock.utc(),
                &format!("Failed {name} | max retries ({}) exceeded", self.config.max_retries),
            );
        } else {
            warn!(file = name, "terminal failure record could not be written");
        }
        escalated
    }

    fn record_error(&self, name: &str, attempt: u32, err: &anyhow::Error) {
        let detail = format!("{err:#}");
        warn!(file = name, attempt, error = %detail, "task failed");
        self.audit.log_failure(
            SERVER,
            "task_error",
            json!({
                "file": name,
                "attempt": attempt,
                "max_retries": self.config.max_retries,
                "error": detail,
                "transition": Transition::Retry,
            }),
        );
        self.run_log
            .event(self.clock.utc(), &format!("ERROR {name} | {detail}"));
    }

    /// Run up to `max_loops` iterations, waiting `loop_delay` between them.
    pub fn run_loop(&self, stop: &StopSignal) -> LoopOutcome {
        let max_loops = self.config.max_loops;
        let mut ledger = RetryLedger::new(self.config.max_retries);
        let mut stats = RunStats::default();

        self.audit.log(
            SERVER,
            "loop_start",
            json!({"max_loops": max_loops, "max_retries": self.config.max_retries}),
        );

        let mut loop_num = 0;
        let stop_reason = loop {
            loop_num += 1;
            stats.loops = loop_num;
            debug!(loop_num, "loop iteration");

            self.drain_inbox();
            let pending = self.pending();
            if pending.is_empty() {
                break LoopStop::Drained;
            }

            for name in &pending {
                if ledger.is_exhausted(name) {
                    if self.escalate(name, ledger.failures(name)) {
                        stats.failed += 1;
                    }
                    continue;
                }
                match self.process_one(name) {
                    Ok(_) => stats.processed += 1,
                    Err(err) => {
                        let attempt = ledger.record_failure(name);
                        self.record_error(name, attempt, &err);
                    }
                }
            }

            if self.pending().is_empty() {
                break LoopStop::Drained;
            }
            if loop_num >= max_loops {
                break LoopStop::CapReached { max_loops };
            }
            if stop.wait(self.config.loop_delay()) {
                break LoopStop::Stopped;
            }
        };

        let retries = ledger.snapshot();
        let details = json!({
            "loops": stats.loops,
            "processed": stats.processed,
            "failed": stats.failed,
            "retries": retries,
        });
        match stop_reason {
            LoopStop::Drained => self.audit.log(SERVER, "loop_complete", details),
            LoopStop::CapReached { .. } => self.audit.log(SERVER, "loop_max_reached", details),
            LoopStop::Stopped => self.audit.log(SERVER, "loop_stopped", details),
        };
        info!(
            loops = stats.loops,
            processed = stats.processed,
            failed = stats.failed,
            stop = stop_reason.as_str(),
            "loop finished"
        );

        LoopOutcome {
            stats,
            retries,
            stop: stop_reason,
        }
    }
}

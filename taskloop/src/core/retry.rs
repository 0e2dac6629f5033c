//! Per-run retry bookkeeping.

use std::collections::BTreeMap;

/// Consecutive-failure counts keyed by task filename, scoped to a single run.
///
/// Counters only move forward: a success never clears a counter and a skipped
/// task never touches one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryLedger {
    max_retries: u32,
    failures: BTreeMap<String, u32>,
}

impl RetryLedger {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            failures: BTreeMap::new(),
        }
    }

    pub fn failures(&self, name: &str) -> u32 {
        self.failures.get(name).copied().unwrap_or(0)
    }

    /// True once a task has failed `max_retries` times.
    pub fn is_exhausted(&self, name: &str) -> bool {
        self.failures(name) >= self.max_retries
    }

    /// Record one failed attempt and return the new count.
    pub fn record_failure(&mut self, name: &str) -> u32 {
        let count = self.failures.entry(name.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Snapshot of all non-zero counters in filename order.
    pub fn snapshot(&self) -> BTreeMap<String, u32> {
        self.failures.clone()
    }
}

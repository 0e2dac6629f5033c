//! File-based task pipeline with a bounded retry loop.
//!
//! Task files move through vault folders (`Inbox` → `Needs_Action` → `Done`),
//! are classified into a domain, optionally summarized by a text generation
//! backend, and every step is written to an append-only audit trail.
//!
//! - **[`core`]**: Pure, deterministic logic (states, classification, retry
//!   bookkeeping, document rendering). No I/O.
//! - **[`io`]**: Side-effecting adapters (vault files, audit log, HTTP client,
//!   SQLite recorder). Isolated behind small types and traits so tests can
//!   substitute them.
//!
//! Orchestration lives in [`pipeline`] (the retry loop) and [`run`] (one full
//! run with recorder bookkeeping).

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod pipeline;
pub mod run;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

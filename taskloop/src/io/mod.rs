//! Side-effecting adapters: vault files, audit trail, text generation, SQLite.

pub mod audit;
pub mod audit_report;
pub mod config;
pub mod layout;
pub mod openai;
pub mod prompt;
pub mod recorder;
pub mod router;
pub mod run_log;
pub mod stop;
pub mod store;
pub mod summarizer;

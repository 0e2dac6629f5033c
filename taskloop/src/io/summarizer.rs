//! Best-effort task summarization.
//!
//! The [`TextGenerator`] trait decouples the pipeline from the actual text
//! generation backend (currently an OpenAI-compatible HTTP API). Every call
//! resolves to a [`SummaryOutcome`]; errors never cross this boundary.

use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::types::StatusTag;
use crate::io::audit::AuditSink;

const SERVER: &str = "summarizer";

pub const FALLBACK_SUMMARY: &str = "Task processed without a generated summary. \
(fallback: text generation not configured)\n\
- Task has been classified and routed\n\
- Content preserved in original section\n\
- Ready for human review";

pub const EMPTY_SUMMARY: &str = "Summary generated but empty response.";

/// Failure modes of a text generation call.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("unexpected response: {0}")]
    Parse(String),
}

/// Abstraction over text generation backends.
pub trait TextGenerator {
    /// Model label sent with each request and recorded in documents.
    fn model(&self) -> &str;

    fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

impl<T: TextGenerator + ?Sized> TextGenerator for &T {
    fn model(&self) -> &str {
        (**self).model()
    }

    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        (**self).generate(prompt)
    }
}

/// Explicit result of one summarization attempt.
#[derive(Debug)]
pub enum SummaryOutcome {
    Ok(String),
    Empty,
    Error(GenerationError),
    /// No generator configured; no call was attempted.
    Disabled,
}

impl SummaryOutcome {
    pub fn status(&self) -> StatusTag {
        match self {
            SummaryOutcome::Ok(_) => StatusTag::Ok,
            SummaryOutcome::Empty => StatusTag::Empty,
            SummaryOutcome::Error(_) => StatusTag::Error,
            SummaryOutcome::Disabled => StatusTag::Fallback,
        }
    }

    /// Text to place in the output document.
    pub fn into_text(self) -> String {
        match self {
            SummaryOutcome::Ok(text) => text,
            SummaryOutcome::Empty => EMPTY_SUMMARY.to_string(),
            SummaryOutcome::Error(err) => error_summary(&err),
            SummaryOutcome::Disabled => FALLBACK_SUMMARY.to_string(),
        }
    }
}

pub fn error_summary(err: &GenerationError) -> String {
    format!(
        "(Text generation error, graceful fallback)\n\
         - Error: {err}\n\
         - Task preserved and classified\n\
         - Retry or manual review recommended"
    )
}

/// Summary text plus the tag describing how it was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub text: String,
    pub status: StatusTag,
}

pub struct Summarizer<G> {
    generator: Option<G>,
    audit: AuditSink,
}

impl<G: TextGenerator> Summarizer<G> {
    pub fn new(generator: Option<G>, audit: AuditSink) -> Self {
        Self { generator, audit }
    }

    pub fn is_enabled(&self) -> bool {
        self.generator.is_some()
    }

    /// Run one attempt and return the raw outcome. Writes one audit entry.
    pub fn attempt(&self, prompt: &str) -> SummaryOutcome {
        let Some(generator) = &self.generator else {
            self.audit.log(
                SERVER,
                "summarize_fallback",
                json!({"reason": "text generation not configured"}),
            );
            return SummaryOutcome::Disabled;
        };

        let model = generator.model();
        match generator.generate(prompt) {
            Ok(text) if text.trim().is_empty() => {
                self.audit.log(SERVER, "summarize_empty", json!({"model": model}));
                SummaryOutcome::Empty
            }
            Ok(text) => {
                let text = text.trim().to_string();
                self.audit.log(
                    SERVER,
                    "summarize_ok",
                    json!({"model": model, "chars": text.chars().count()}),
                );
                SummaryOutcome::Ok(text)
            }
            Err(err) => {
                warn!(model, error = %err, "text generation failed");
                self.audit.log_failure(
                    SERVER,
                    "summarize_error",
                    json!({"model": model, "error": err.to_string()}),
                );
                SummaryOutcome::Error(err)
            }
        }
    }

    pub fn summarize(&self, prompt: &str) -> Summary {
        let outcome = self.attempt(prompt);
        let status = outcome.status();
        debug!(%status, "summarized task");
        Summary {
            text: outcome.into_text(),
            status,
        }
    }
}

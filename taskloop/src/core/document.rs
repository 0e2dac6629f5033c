//! Rendering of the documents written into the done folder.

use chrono::{DateTime, Utc};

use crate::core::types::{Domain, StatusTag};

/// Marker line terminating every successfully processed document.
pub const COMPLETED_MARKER: &str = "Status: Completed";
/// Marker line terminating every terminal failure record.
pub const FAILED_MARKER: &str = "Status: Failed";

/// Human-readable UTC timestamp used in documents and the run log.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%SZ").to_string()
}

/// Inputs for a processed task document.
#[derive(Debug, Clone)]
pub struct ProcessedDocument<'a> {
    pub domain: Domain,
    pub processed_at: DateTime<Utc>,
    pub model: &'a str,
    pub status: StatusTag,
    pub original: &'a str,
    pub summary: &'a str,
}

impl ProcessedDocument<'_> {
    pub fn render(&self) -> String {
        format!(
            "# Processed Task\n\n\
             **Domain:** {domain}\n\
             **Processed:** {processed}\n\
             **Model:** {model}\n\
             **Status:** {status}\n\n\
             ## Original Content\n\
             {original}\n\n\
             ## AI Summary\n\
             {summary}\n\n\
             {COMPLETED_MARKER}\n",
            domain = self.domain.title(),
            processed = format_timestamp(self.processed_at),
            model = self.model,
            status = self.status,
            original = self.original,
            summary = self.summary,
        )
    }
}

/// Terminal failure record for a task whose retry budget ran out.
#[derive(Debug, Clone)]
pub struct FailureDocument {
    pub max_retries: u32,
    pub failures: u32,
    pub failed_at: DateTime<Utc>,
}

impl FailureDocument {
    pub fn render(&self) -> String {
        format!(
            "# Failed Task\n\n\
             **Error:** Max retries ({max}) exceeded\n\
             **Retries:** {failures}\n\
             **Time:** {time}\n\n\
             {FAILED_MARKER}\n",
            max = self.max_retries,
            failures = self.failures,
            time = format_timestamp(self.failed_at),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn processed_document_layout() {
        let doc = ProcessedDocument {
            domain: Domain::Personal,
            processed_at: at(),
            model: "gpt-4o-mini",
            status: StatusTag::Fallback,
            original: "Domain: personal\nBuy milk",
            summary: "- buy milk",
        }
        .render();

        let expected = "# Processed Task\n\n\
                        **Domain:** Personal\n\
                        **Processed:** 2026-01-02 03:04:05Z\n\
                        **Model:** gpt-4o-mini\n\
                        **Status:** fallback\n\n\
                        ## Original Content\n\
                        Domain: personal\nBuy milk\n\n\
                        ## AI Summary\n\
                        - buy milk\n\n\
                        Status: Completed\n";
        assert_eq!(doc, expected);
    }

    #[test]
    fn failure_document_mentions_budget() {
        let doc = FailureDocument {
            max_retries: 2,
            failures: 2,
            failed_at: at(),
        }
        .render();
        assert!(doc.starts_with("# Failed Task\n"));
        assert!(doc.contains("**Error:** Max retries (2) exceeded\n"));
        assert!(doc.ends_with("Status: Failed\n"));
        assert!(!doc.contains(COMPLETED_MARKER));
    }
}

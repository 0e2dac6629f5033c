//! Shared deterministic types for the task pipeline.
//!
//! These types define stable contracts between core components and the I/O
//! adapters. They must not depend on external state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Domain a task is routed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Business,
    Personal,
}

impl Domain {
    pub fn as_str(self) -> &'static str {
        match self {
            Domain::Business => "business",
            Domain::Personal => "personal",
        }
    }

    /// Capitalized label used in document headers and folder names.
    pub fn title(self) -> &'static str {
        match self {
            Domain::Business => "Business",
            Domain::Personal => "Personal",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "business" => Some(Domain::Business),
            "personal" => Some(Domain::Personal),
            _ => None,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome tag recorded for every summarization attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusTag {
    /// No text-generation capability configured; deterministic message used.
    Fallback,
    /// Generation returned non-empty text.
    Ok,
    /// Generation succeeded but returned only whitespace.
    Empty,
    /// Generation failed; the message embeds the error detail.
    Error,
}

impl StatusTag {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusTag::Fallback => "fallback",
            StatusTag::Ok => "ok",
            StatusTag::Empty => "empty",
            StatusTag::Error => "error",
        }
    }
}

impl fmt::Display for StatusTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate counters for one run of the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Number of loop iterations started.
    pub loops: u32,
    /// Tasks completed (including empty tasks that were skipped).
    pub processed: u32,
    /// Tasks escalated to a terminal failure record.
    pub failed: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_parse_is_case_insensitive() {
        assert_eq!(Domain::parse(" Personal "), Some(Domain::Personal));
        assert_eq!(Domain::parse("BUSINESS"), Some(Domain::Business));
        assert_eq!(Domain::parse("other"), None);
    }

    #[test]
    fn status_tag_serializes_lowercase() {
        let json = serde_json::to_string(&StatusTag::Fallback).expect("serialize");
        assert_eq!(json, "\"fallback\"");
    }
}

//! Deterministic domain classification of task content.
//!
//! An explicit `domain: business|personal` declaration wins. Otherwise the
//! content is scored against two fixed keyword sets and the higher score wins.
//! Ties, including 0-0, resolve to [`TIE_DEFAULT`].

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::core::types::Domain;

/// Domain chosen when keyword scores are equal.
pub const TIE_DEFAULT: Domain = Domain::Business;

pub const BUSINESS_KEYWORDS: &[&str] = &[
    "invoice",
    "meeting",
    "quarterly",
    "revenue",
    "client",
    "project",
    "deadline",
    "stakeholder",
    "budget",
    "sprint",
    "deployment",
    "release",
    "contract",
    "proposal",
    "vendor",
    "compliance",
    "audit",
    "report",
    "roadmap",
    "milestone",
    "kpi",
    "okr",
    "pipeline",
    "onboarding",
    "payroll",
    "hr",
    "marketing",
    "sales",
    "operations",
    "strategy",
];

pub const PERSONAL_KEYWORDS: &[&str] = &[
    "grocery",
    "doctor",
    "appointment",
    "birthday",
    "vacation",
    "gym",
    "recipe",
    "family",
    "hobby",
    "travel",
    "personal",
    "reminder",
    "shopping",
    "health",
    "fitness",
    "pet",
    "home",
    "garden",
];

static DOMAIN_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"domain:\s*(business|personal)").expect("domain header regex should be valid")
});

/// How a classification was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Header,
    KeywordScore,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Header => "header",
            Method::KeywordScore => "keyword_score",
        }
    }
}

/// Result of classifying one piece of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub domain: Domain,
    pub method: Method,
    /// Keyword scores; `None` when an explicit header decided the domain.
    pub scores: Option<Scores>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scores {
    pub business: usize,
    pub personal: usize,
}

/// Classify content into a domain. Never fails.
pub fn classify(content: &str) -> Classification {
    let text = content.to_lowercase();

    if let Some(domain) = header_domain(&text) {
        return Classification {
            domain,
            method: Method::Header,
            scores: None,
        };
    }

    let scores = Scores {
        business: keyword_score(&text, BUSINESS_KEYWORDS),
        personal: keyword_score(&text, PERSONAL_KEYWORDS),
    };
    Classification {
        domain: decide(scores),
        method: Method::KeywordScore,
        scores: Some(scores),
    }
}

fn header_domain(folded: &str) -> Option<Domain> {
    DOMAIN_HEADER_RE
        .captures(folded)
        .and_then(|caps| caps.get(1))
        .and_then(|m| Domain::parse(m.as_str()))
}

/// Count how many keywords of a set occur in the folded text.
///
/// Each keyword contributes at most once regardless of how often it repeats.
fn keyword_score(folded: &str, keywords: &[&str]) -> usize {
    keywords.iter().filter(|kw| folded.contains(*kw)).count()
}

fn decide(scores: Scores) -> Domain {
    match scores.business.cmp(&scores.personal) {
        std::cmp::Ordering::Greater => Domain::Business,
        std::cmp::Ordering::Less => Domain::Personal,
        std::cmp::Ordering::Equal => TIE_DEFAULT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_header_overrides_keywords() {
        let content = "Domain: personal\nQuarterly revenue report for the client meeting";
        let result = classify(content);
        assert_eq!(result.domain, Domain::Personal);
        assert_eq!(result.method, Method::Header);
        assert_eq!(result.scores, None);
    }

    #[test]
    fn header_matches_without_space_and_in_any_case() {
        assert_eq!(classify("DOMAIN:BUSINESS\nbuy groceries").domain, Domain::Business);
    }

    #[test]
    fn business_majority_wins() {
        // invoice, client, deadline vs doctor
        let result = classify("Send the invoice to the client before the deadline, then doctor");
        assert_eq!(result.domain, Domain::Business);
        assert_eq!(
            result.scores,
            Some(Scores {
                business: 3,
                personal: 1
            })
        );
    }

    #[test]
    fn personal_majority_wins() {
        let result = classify("Book a vacation and remember the gym");
        assert_eq!(result.domain, Domain::Personal);
    }

    #[test]
    fn empty_content_ties_to_business() {
        let result = classify("");
        assert_eq!(result.domain, Domain::Business);
        assert_eq!(
            result.scores,
            Some(Scores {
                business: 0,
                personal: 0
            })
        );
    }

    #[test]
    fn equal_nonzero_scores_tie_to_default() {
        let result = classify("meeting about the birthday");
        assert_eq!(result.domain, TIE_DEFAULT);
        assert_eq!(result.method, Method::KeywordScore);
    }

    #[test]
    fn repeated_keyword_counts_once() {
        let result = classify("gym gym gym gym, invoice, budget");
        assert_eq!(result.domain, Domain::Business);
    }
}

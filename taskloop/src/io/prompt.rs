//! Summarization prompt rendering.

use anyhow::Result;
use minijinja::{Environment, context};

use crate::core::types::Domain;

const SUMMARIZE_TEMPLATE: &str = include_str!("prompts/summarize.md");

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("summarize", SUMMARIZE_TEMPLATE)
            .expect("summarize template should be valid");
        Self { env }
    }

    /// Render the summarization prompt, cutting the task to `max_chars`.
    pub fn render_summarize(&self, domain: Domain, task: &str, max_chars: usize) -> Result<String> {
        let template = self.env.get_template("summarize")?;
        let rendered = template.render(context! {
            domain => domain.as_str(),
            task => truncate_chars(task, max_chars),
        })?;
        Ok(rendered)
    }
}

/// Prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_domain_and_task() {
        let prompt = PromptEngine::new()
            .render_summarize(Domain::Personal, "Book dentist", 6000)
            .expect("render");
        assert!(prompt.starts_with("You are an AI employee handling a personal task.\n"));
        assert!(prompt.contains("Do NOT invent details."));
        assert!(prompt.trim_end().ends_with("TASK:\nBook dentist"));
    }

    #[test]
    fn truncates_by_characters() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");

        let prompt = PromptEngine::new()
            .render_summarize(Domain::Business, "ééééé", 3)
            .expect("render");
        assert!(prompt.contains("TASK:\nééé"));
        assert!(!prompt.contains("éééé"));
    }
}

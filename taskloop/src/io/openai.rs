//! Blocking client for OpenAI-compatible chat completion APIs.

use std::time::Duration;

use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::io::config::SummarizerConfig;
use crate::io::summarizer::{GenerationError, TextGenerator};

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiClient {
    pub fn new(config: &SummarizerConfig, model: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();
        Self {
            agent,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.trim().to_string(),
            model: model.to_string(),
            max_tokens: config.max_tokens,
        }
    }

    /// Client for `config`, or `None` when no API key is configured.
    pub fn from_config(config: &SummarizerConfig, model: &str) -> Option<Self> {
        config.is_enabled().then(|| Self::new(config, model))
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "max_tokens": self.max_tokens,
        })
    }
}

impl TextGenerator for OpenAiClient {
    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(model = %self.model))]
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(prompt).to_string();
        debug!(%url, prompt_chars = prompt.chars().count(), "sending completion request");

        let response = self
            .agent
            .post(&url)
            .set("Content-Type", "application/json")
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_string(&body)
            .map_err(map_ureq_error)?;

        let raw = response
            .into_string()
            .map_err(|err| GenerationError::Transport(err.to_string()))?;
        parse_completion(&raw)
    }
}

fn map_ureq_error(err: ureq::Error) -> GenerationError {
    match err {
        ureq::Error::Status(status, response) => {
            let raw = response.into_string().unwrap_or_default();
            GenerationError::Api {
                status,
                message: api_error_message(&raw),
            }
        }
        ureq::Error::Transport(transport) => {
            if is_timeout(&transport) {
                GenerationError::Timeout
            } else {
                GenerationError::Transport(transport.to_string())
            }
        }
    }
}

fn is_timeout(transport: &ureq::Transport) -> bool {
    let mut source = std::error::Error::source(transport);
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            return matches!(
                io.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            );
        }
        source = err.source();
    }
    false
}

/// Provider error message from an error body, or the body itself.
fn api_error_message(raw: &str) -> String {
    serde_json::from_str::<Value>(raw)
        .ok()
        .and_then(|value| value["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| raw.trim().to_string())
}

/// Extract `choices[0].message.content`. A null content is an empty reply.
pub fn parse_completion(raw: &str) -> Result<String, GenerationError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|err| GenerationError::Parse(err.to_string()))?;
    let message = value
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| GenerationError::Parse("missing choices[0].message".to_string()))?;
    match message.get("content") {
        Some(Value::String(text)) => Ok(text.clone()),
        Some(Value::Null) | None => Ok(String::new()),
        Some(other) => Err(GenerationError::Parse(format!(
            "content is not a string: {other}"
        ))),
    }
}

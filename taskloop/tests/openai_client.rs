//! HTTP contract tests for the chat completion client.
//!
//! The client is blocking, so each call runs on the blocking pool while the
//! mock server is driven by the test runtime.

use std::time::Duration;

use serde_json::json;
use taskloop::io::config::SummarizerConfig;
use taskloop::io::openai::OpenAiClient;
use taskloop::io::summarizer::{GenerationError, TextGenerator};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, timeout_secs: u64) -> OpenAiClient {
    let config = SummarizerConfig {
        api_url: format!("{}/v1", server.uri()),
        api_key: "test-key".to_string(),
        max_tokens: 800,
        timeout_secs,
    };
    OpenAiClient::new(&config, "gpt-4o-mini")
}

async fn generate(client: OpenAiClient, prompt: &str) -> Result<String, GenerationError> {
    let prompt = prompt.to_string();
    tokio::task::spawn_blocking(move || client.generate(&prompt))
        .await
        .expect("blocking task")
}

#[tokio::test]
async fn sends_model_prompt_and_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "max_tokens": 800,
            "messages": [{"role": "user", "content": "Summarize this"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "- done"},
                "finish_reason": "stop"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = generate(client(&server, 5), "Summarize this").await;
    assert_eq!(reply.expect("reply"), "- done");
}

#[tokio::test]
async fn provider_errors_keep_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
        })))
        .mount(&server)
        .await;

    let err = generate(client(&server, 5), "p").await.unwrap_err();
    match err {
        GenerationError::Api { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Incorrect API key provided");
        }
        other => panic!("expected api error, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_is_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = generate(client(&server, 5), "p").await.unwrap_err();
    assert!(matches!(err, GenerationError::Parse(_)), "{err:?}");
}

#[tokio::test]
async fn slow_provider_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(3))
                .set_body_json(json!({"choices": [{"message": {"content": "late"}}]})),
        )
        .mount(&server)
        .await;

    let err = generate(client(&server, 1), "p").await.unwrap_err();
    assert!(
        matches!(err, GenerationError::Timeout | GenerationError::Transport(_)),
        "{err:?}"
    );
}

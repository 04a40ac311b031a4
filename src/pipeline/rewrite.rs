//! Notation rewrite: one completion call that turns maths, tables and image
//! references into narration-friendly prose.
//!
//! The call goes through the [`Completer`] seam. [`LlmCompleter`] adapts any
//! `edgequake-llm` provider to it; tests and alternative backends implement
//! the trait directly.
//!
//! A failed call is not retried; it ends the run with
//! [`Docx2SpeechError::Upstream`] and no partial output.

use crate::config::NarrationConfig;
use crate::error::Docx2SpeechError;
use crate::prompts::{notation_prompt, SYSTEM_PERSONA};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// A role-tagged message pair plus sampling options.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
}

/// The best-ranked candidate returned by the completion service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// Text-to-text completion capability.
///
/// Errors are returned as the provider's message; the rewriter wraps them
/// into [`Docx2SpeechError::Upstream`].
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, String>;
}

/// [`Completer`] backed by an `edgequake-llm` provider.
pub struct LlmCompleter {
    provider: Arc<dyn LLMProvider>,
}

impl LlmCompleter {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Completer for LlmCompleter {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, String> {
        let messages = vec![
            ChatMessage::system(request.system.as_str()),
            ChatMessage::user(request.user.as_str()),
        ];
        let options = CompletionOptions {
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| e.to_string())?;

        Ok(Completion {
            text: response.content,
            prompt_tokens: response.prompt_tokens as u64,
            completion_tokens: response.completion_tokens as u64,
        })
    }
}

/// Outcome of a successful rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    /// Completion text with surrounding whitespace removed.
    pub text: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub duration_ms: u64,
}

/// Build the request sent for `text`.
pub fn build_request(text: &str, config: &NarrationConfig) -> CompletionRequest {
    CompletionRequest {
        system: SYSTEM_PERSONA.to_string(),
        user: notation_prompt(text),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    }
}

/// Rewrite the notation in `text` into prose.
///
/// Exactly one completion call is made. The result is the completion text
/// trimmed of leading and trailing whitespace.
pub async fn rewrite_notation(
    completer: &dyn Completer,
    text: &str,
    config: &NarrationConfig,
) -> Result<Rewrite, Docx2SpeechError> {
    let start = Instant::now();
    let request = build_request(text, config);
    info!("Rewriting {} chars of notation", text.len());

    let call = completer.complete(&request);
    let result = match config.api_timeout_secs {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), call)
            .await
            .unwrap_or_else(|_| Err(format!("completion call timed out after {secs}s"))),
        None => call.await,
    };

    let completion = result.map_err(|message| {
        warn!("Completion call failed: {}", message);
        Docx2SpeechError::Upstream { message }
    })?;

    let duration = start.elapsed();
    debug!(
        "Rewrite: {} input tokens, {} output tokens, {:?}",
        completion.prompt_tokens, completion.completion_tokens, duration
    );

    Ok(Rewrite {
        text: completion.text.trim().to_string(),
        prompt_tokens: completion.prompt_tokens,
        completion_tokens: completion.completion_tokens,
        duration_ms: duration.as_millis() as u64,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Returns a fixed reply (or error) and records every request.
    pub(crate) struct StubCompleter {
        reply: Result<String, String>,
        pub(crate) requests: Mutex<Vec<CompletionRequest>>,
    }

    impl StubCompleter {
        pub(crate) fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Completer for StubCompleter {
        async fn complete(&self, request: &CompletionRequest) -> Result<Completion, String> {
            self.requests.lock().unwrap().push(request.clone());
            self.reply.clone().map(|text| Completion {
                text,
                prompt_tokens: 12,
                completion_tokens: 5,
            })
        }
    }

    struct SlowCompleter;

    #[async_trait]
    impl Completer for SlowCompleter {
        async fn complete(&self, _request: &CompletionRequest) -> Result<Completion, String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Completion::default())
        }
    }

    #[tokio::test]
    async fn output_is_stub_reply_trimmed() {
        let stub = StubCompleter::replying("\n  Intro. x squared.  \n");
        let config = NarrationConfig::default();
        let out = rewrite_notation(&stub, "Intro\n$x^2$\n", &config)
            .await
            .unwrap();
        assert_eq!(out.text, "Intro. x squared.");
        assert_eq!(out.prompt_tokens, 12);
        assert_eq!(out.completion_tokens, 5);
    }

    #[tokio::test]
    async fn output_does_not_depend_on_input() {
        let config = NarrationConfig::default();
        for input in ["", "plain prose", "| a | b |\n| 1 | 2 |", "$$\\int_0^1 x\\,dx$$"] {
            let stub = StubCompleter::replying(" fixed ");
            let out = rewrite_notation(&stub, input, &config).await.unwrap();
            assert_eq!(out.text, "fixed");
        }
    }

    #[tokio::test]
    async fn prompt_carries_text_verbatim_and_persona() {
        let stub = StubCompleter::replying("ok");
        let config = NarrationConfig::default();
        let text = "Energy: $E = mc^2$\n\nTable:\n| x | y |";
        rewrite_notation(&stub, text, &config).await.unwrap();

        let requests = stub.requests.lock().unwrap();
        assert_eq!(requests.len(), 1, "exactly one completion call");
        assert_eq!(requests[0].system, SYSTEM_PERSONA);
        assert!(requests[0].user.contains(text));
    }

    #[tokio::test]
    async fn failure_becomes_upstream_error_with_cause() {
        let stub = StubCompleter::failing("429 quota exceeded");
        let config = NarrationConfig::default();
        let err = rewrite_notation(&stub, "x", &config).await.unwrap_err();
        match err {
            Docx2SpeechError::Upstream { message } => assert!(message.contains("429")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(stub.calls(), 1, "no retries");
    }

    #[tokio::test]
    async fn sampling_options_flow_into_request() {
        let config = NarrationConfig::builder()
            .temperature(0.2)
            .max_tokens(2048)
            .build()
            .unwrap();
        let req = build_request("x", &config);
        assert_eq!(req.temperature, Some(0.2));
        assert_eq!(req.max_tokens, Some(2048));
    }

    #[tokio::test]
    async fn configured_timeout_is_enforced() {
        let config = NarrationConfig::builder().api_timeout_secs(1).build().unwrap();
        let err = rewrite_notation(&SlowCompleter, "x", &config)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"), "got: {err}");
    }
}

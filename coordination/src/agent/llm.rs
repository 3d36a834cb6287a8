//! The seam between the agent runtime and an LLM provider.
//!
//! `LlmClient` is the only contract the runtime depends on; concrete
//! providers (HTTP clients for OpenAI/Anthropic-shaped APIs) live outside
//! this crate and are handed in by the run facade.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use super::config::ModelConfig;
use crate::task::TokenUsage;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ChatMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: Option<String>,
        #[serde(default)]
        tool_calls: Vec<ToolCallRequest>,
    },
    Tool {
        tool_call_id: String,
        name: String,
        content: String,
        is_error: bool,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub tool_schemas: Vec<serde_json::Value>,
    pub model: ModelConfig,
}

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
    pub usage: TokenUsage,
}

/// An error from a provider call, carrying whether it is worth retrying.
/// Classification is by message content per the retry rule: 429/rate-limit,
/// 5xx, timeout, or connection-reset are transient; everything else
/// (auth failures, malformed requests, content-policy rejections) is
/// permanent.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct LlmError {
    pub message: String,
    pub transient: bool,
}

impl LlmError {
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        let transient = lower.contains("429")
            || lower.contains("rate limit")
            || lower.contains("rate-limit")
            || lower.contains("timeout")
            || lower.contains("timed out")
            || lower.contains("reset")
            || is_5xx(&lower);
        Self { message, transient }
    }
}

fn is_5xx(lower: &str) -> bool {
    ["500", "502", "503", "504"].iter().any(|code| lower.contains(code))
        || lower.contains("internal server error")
        || lower.contains("bad gateway")
        || lower.contains("service unavailable")
        || lower.contains("gateway timeout")
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

const MAX_RETRIES: u32 = 3;
const RETRY_DELAYS_SECS: [u64; 3] = [1, 2, 4];

/// Invoke `client` with up to [`MAX_RETRIES`] retries on transient errors,
/// backing off 1s/2s/4s between attempts. A permanent error (or the final
/// retry) is returned as `Err`.
pub async fn complete_with_retry(
    client: &dyn LlmClient,
    request: CompletionRequest,
) -> Result<CompletionResponse, LlmError> {
    let mut attempt = 0u32;
    loop {
        match client.complete(request.clone_for_retry()).await {
            Ok(response) => return Ok(response),
            Err(err) if err.transient && attempt < MAX_RETRIES => {
                let delay = RETRY_DELAYS_SECS[attempt as usize];
                warn!(attempt, delay_secs = delay, error = %err.message, "retrying transient LLM error");
                tokio::time::sleep(Duration::from_secs(delay)).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

impl CompletionRequest {
    fn clone_for_retry(&self) -> CompletionRequest {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn classifies_rate_limit_as_transient() {
        assert!(LlmError::classify("429 Too Many Requests").transient);
        assert!(LlmError::classify("rate limit exceeded").transient);
    }

    #[test]
    fn classifies_5xx_as_transient() {
        assert!(LlmError::classify("503 Service Unavailable").transient);
    }

    #[test]
    fn classifies_auth_failure_as_permanent() {
        assert!(!LlmError::classify("401 Unauthorized: invalid API key").transient);
    }

    struct FlakyClient {
        calls: Arc<AtomicU32>,
        fail_first_n: u32,
    }

    #[async_trait]
    impl LlmClient for FlakyClient {
        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first_n {
                return Err(LlmError::classify("503 temporarily unavailable"));
            }
            Ok(CompletionResponse {
                content: Some("done".into()),
                tool_calls: Vec::new(),
                usage: TokenUsage::default(),
            })
        }
    }

    fn dummy_request() -> CompletionRequest {
        CompletionRequest {
            messages: vec![],
            tool_schemas: vec![],
            model: ModelConfig {
                provider: "openai".into(),
                model: "gpt-4".into(),
                temperature: 0.2,
                max_tokens: 100,
            },
        }
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let client = FlakyClient {
            calls: Arc::clone(&calls),
            fail_first_n: 2,
        };
        let result = complete_with_retry(&client, dummy_request()).await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let client = FlakyClient {
            calls: Arc::clone(&calls),
            fail_first_n: 10,
        };
        let result = complete_with_retry(&client, dummy_request()).await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}

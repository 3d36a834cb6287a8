//! LLM vendor clients: the seam the agent runtime's retry/timeout logic
//! sits behind. Each vendor normalizes its own wire format into one
//! `CompletionResponse`; [`ProviderRouter`] dispatches by provider name and
//! adapts the result into `coordination`'s `LlmClient` contract.

pub mod anthropic;
pub mod openai;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use coordination::agent::{CompletionRequest, CompletionResponse, LlmClient, LlmError};

/// One vendor's completion endpoint, normalized to `coordination`'s wire
/// shape. Implementations own their own HTTP client and auth.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<CompletionResponse>;
}

/// Dispatches a completion request to the provider named in
/// `request.model.provider`, converting vendor failures into the
/// transient/permanent `LlmError` classification the agent runtime retries
/// on.
pub struct ProviderRouter {
    clients: HashMap<String, Arc<dyn ProviderClient>>,
}

impl ProviderRouter {
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, client: Arc<dyn ProviderClient>) {
        self.clients.insert(name.into(), client);
    }
}

impl Default for ProviderRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmClient for ProviderRouter {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let Some(client) = self.clients.get(&request.model.provider) else {
            return Err(LlmError {
                message: format!("no provider configured for '{}'", request.model.provider),
                transient: false,
            });
        };

        client
            .complete(&request)
            .await
            .map_err(|e| LlmError::classify(&e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coordination::agent::ModelConfig;
    use coordination::task::TokenUsage;

    struct StubClient;

    #[async_trait]
    impl ProviderClient for StubClient {
        async fn complete(&self, _request: &CompletionRequest) -> anyhow::Result<CompletionResponse> {
            Ok(CompletionResponse {
                content: Some("ok".to_string()),
                tool_calls: vec![],
                usage: TokenUsage::default(),
            })
        }
    }

    fn request(provider: &str) -> CompletionRequest {
        CompletionRequest {
            messages: vec![],
            tool_schemas: vec![],
            model: ModelConfig {
                provider: provider.to_string(),
                model: "test-model".to_string(),
                temperature: 0.2,
                max_tokens: 100,
            },
        }
    }

    #[tokio::test]
    async fn dispatches_to_registered_provider() {
        let mut router = ProviderRouter::new();
        router.register("stub", Arc::new(StubClient));
        let response = router.complete(request("stub")).await.unwrap();
        assert_eq!(response.content.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn unknown_provider_is_a_permanent_error() {
        let router = ProviderRouter::new();
        let err = router.complete(request("unknown")).await.unwrap_err();
        assert!(!err.transient);
    }
}

//! Anthropic Messages API client, normalizing content-block tool use and
//! usage into `coordination`'s wire shape.

use async_trait::async_trait;
use coordination::agent::{ChatMessage, CompletionRequest, CompletionResponse, ToolCallRequest};
use coordination::task::TokenUsage;
use serde::{Deserialize, Serialize};

use super::ProviderClient;

pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(api_key: String) -> anyhow::Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(300))
                .build()?,
            api_key,
            base_url: "https://api.anthropic.com/v1".to_string(),
        })
    }
}

#[derive(Serialize)]
struct WireMessage {
    role: String,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

#[derive(Serialize)]
struct WireTool {
    name: String,
    input_schema: serde_json::Value,
}

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    system: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: UsageBlock,
}

#[derive(Deserialize)]
struct UsageBlock {
    input_tokens: u64,
    output_tokens: u64,
}

/// Anthropic keeps `system` out-of-band from `messages`; fold the leading
/// system message in and translate every other message to content blocks.
fn to_wire(messages: &[ChatMessage]) -> (String, Vec<WireMessage>) {
    let mut system = String::new();
    let mut wire = Vec::new();

    for message in messages {
        match message {
            ChatMessage::System { content } => system = content.clone(),
            ChatMessage::User { content } => wire.push(WireMessage {
                role: "user".to_string(),
                content: vec![ContentBlock::Text {
                    text: content.clone(),
                }],
            }),
            ChatMessage::Assistant { content, tool_calls } => {
                let mut blocks = Vec::new();
                if let Some(text) = content {
                    if !text.is_empty() {
                        blocks.push(ContentBlock::Text { text: text.clone() });
                    }
                }
                for call in tool_calls {
                    blocks.push(ContentBlock::ToolUse {
                        id: call.id.clone(),
                        name: call.name.clone(),
                        input: call.arguments.clone(),
                    });
                }
                wire.push(WireMessage {
                    role: "assistant".to_string(),
                    content: blocks,
                });
            }
            ChatMessage::Tool {
                tool_call_id,
                content,
                is_error,
                ..
            } => wire.push(WireMessage {
                role: "user".to_string(),
                content: vec![ContentBlock::ToolResult {
                    tool_use_id: tool_call_id.clone(),
                    content: content.clone(),
                    is_error: is_error.then_some(true),
                }],
            }),
        }
    }

    (system, wire)
}

#[async_trait]
impl ProviderClient for AnthropicClient {
    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<CompletionResponse> {
        let (system, messages) = to_wire(&request.messages);

        let body = MessagesRequest {
            model: request.model.model.clone(),
            system,
            messages,
            tools: request
                .tool_schemas
                .iter()
                .filter_map(|schema| {
                    let name = schema.get("name")?.as_str()?.to_string();
                    let input_schema = schema.get("parameters").cloned().unwrap_or_default();
                    Some(WireTool { name, input_schema })
                })
                .collect(),
            max_tokens: request.model.max_tokens,
            temperature: request.model.temperature,
        };

        let response = self
            .http
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("anthropic error ({status}): {text}");
        }

        let parsed: MessagesResponse = response.json().await?;

        let mut text_content = String::new();
        let mut tool_calls = Vec::new();
        for block in parsed.content {
            match block {
                ContentBlock::Text { text } => text_content.push_str(&text),
                ContentBlock::ToolUse { id, name, input } => tool_calls.push(ToolCallRequest {
                    id,
                    name,
                    arguments: input,
                }),
                ContentBlock::ToolResult { .. } => {}
            }
        }

        Ok(CompletionResponse {
            content: (!text_content.is_empty()).then_some(text_content),
            tool_calls,
            usage: TokenUsage {
                prompt_tokens: parsed.usage.input_tokens,
                completion_tokens: parsed.usage.output_tokens,
                total_tokens: parsed.usage.input_tokens + parsed.usage.output_tokens,
            },
        })
    }
}

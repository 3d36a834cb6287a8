//! Drives one role-playing agent: the bounded LLM turn loop, tool
//! dispatch, and the provider-facing contract it runs against.

pub mod config;
pub mod llm;
pub mod runtime;

pub use config::{role_defaults, AgentConfig, ModelConfig};
pub use llm::{complete_with_retry, ChatMessage, CompletionRequest, CompletionResponse, LlmClient, LlmError, ToolCallRequest};
pub use runtime::AgentRuntime;

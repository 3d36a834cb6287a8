//! The bounded turn loop that drives one role-playing agent to completion.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info_span, Instrument};

use super::config::AgentConfig;
use super::llm::{complete_with_retry, ChatMessage, CompletionRequest, LlmClient, ToolCallRequest};
use crate::events::{EventPayload, SharedEventBus, WorkflowEvent};
use crate::task::{AgentResult, AgentStatus, Artifact, ArtifactMetadata, TokenUsage};
use crate::tools::{Tool, ToolContext};

const MAX_CONSECUTIVE_DUPLICATES: usize = 3;
const CONTENT_DISPLAY_CAP: usize = 2_000;
const TOOL_ARG_ELLIPSIS_CAP: usize = 400;

pub struct AgentRuntime {
    pub config: AgentConfig,
    pub tools: Vec<Arc<dyn Tool>>,
    pub llm: Arc<dyn LlmClient>,
    pub bus: SharedEventBus,
}

struct CompleteTaskPayload {
    status: AgentStatus,
    summary: String,
    content: String,
    handoff_notes: Option<String>,
    review_notes: Option<String>,
    metadata: ArtifactMetadata,
}

impl AgentRuntime {
    pub async fn run(
        &self,
        agent_id: String,
        initial_context: String,
        ctx: ToolContext,
    ) -> AgentResult {
        let span = info_span!("agent", agent_id = %agent_id, role = %self.config.role, task_id = %ctx.task_id);
        self.run_inner(agent_id, initial_context, ctx)
            .instrument(span)
            .await
    }

    async fn run_inner(
        &self,
        agent_id: String,
        initial_context: String,
        ctx: ToolContext,
    ) -> AgentResult {
        self.bus.publish(WorkflowEvent::new(
            ctx.task_id.clone(),
            EventPayload::AgentSpawn {
                agent_id: agent_id.clone(),
                role: self.config.role,
            },
        ));

        let mut messages = vec![
            ChatMessage::System {
                content: self.config.system_prompt.clone(),
            },
            ChatMessage::User {
                content: initial_context,
            },
        ];
        let mut cumulative = TokenUsage::default();
        let mut recent_signatures: Vec<Vec<(String, serde_json::Value)>> = Vec::new();

        for turn in 1..=self.config.max_turns {
            if ctx.cancellation.is_cancelled() {
                return self.finalize_failed(&agent_id, &ctx, "Aborted by user", cumulative);
            }

            self.bus.publish(WorkflowEvent::new(
                ctx.task_id.clone(),
                EventPayload::AgentTurn {
                    agent_id: agent_id.clone(),
                    turn,
                },
            ));

            if turn == self.config.max_turns {
                messages.push(ChatMessage::User {
                    content: "This is your FINAL turn. You MUST call complete_task now with your best result so far.".to_string(),
                });
            }

            let request = CompletionRequest {
                messages: self.windowed_messages(&messages),
                tool_schemas: self.tools.iter().map(|t| t.parameters_schema()).collect(),
                model: self.config.model.clone(),
            };

            let response = match complete_with_retry(self.llm.as_ref(), request).await {
                Ok(r) => r,
                Err(e) => return self.finalize_failed(&agent_id, &ctx, &e.message, cumulative),
            };

            cumulative.add(response.usage);
            self.bus.publish(WorkflowEvent::new(
                ctx.task_id.clone(),
                EventPayload::TokenUpdate {
                    role: self.config.role,
                    usage: cumulative,
                },
            ));

            if let Some(text) = &response.content {
                if !text.is_empty() {
                    self.bus.publish(WorkflowEvent::new(
                        ctx.task_id.clone(),
                        EventPayload::AgentContent {
                            agent_id: agent_id.clone(),
                            text: display_truncate(text),
                        },
                    ));
                }
            }

            messages.push(ChatMessage::Assistant {
                content: response.content.clone(),
                tool_calls: response.tool_calls.clone(),
            });

            if response.tool_calls.is_empty() {
                continue;
            }

            let signature = signature_of(&response.tool_calls);
            recent_signatures.push(signature);
            if is_stuck(&recent_signatures) {
                return self.finalize_needs_review(
                    &agent_id,
                    &ctx,
                    "Agent appeared stuck in a loop",
                    cumulative,
                );
            }

            for call in &response.tool_calls {
                let outcome = self.execute_tool_call(&agent_id, &ctx, call).await;
                messages.push(ChatMessage::Tool {
                    tool_call_id: call.id.clone(),
                    name: call.name.clone(),
                    content: outcome.content.clone(),
                    is_error: outcome.is_error,
                });

                if call.name == "complete_task" {
                    match parse_complete_task(&call.arguments) {
                        Ok(payload) => {
                            return self.finalize_with_payload(&agent_id, &ctx, payload, cumulative)
                        }
                        Err(reason) => {
                            messages.push(ChatMessage::User {
                                content: format!(
                                    "Your complete_task call was invalid ({reason}). Call complete_task again with a valid payload: status, summary, and content are all required."
                                ),
                            });
                        }
                    }
                }
            }
        }

        self.finalize_needs_review(
            &agent_id,
            &ctx,
            "Agent reached maximum turns without completing",
            cumulative,
        )
    }

    async fn execute_tool_call(
        &self,
        agent_id: &str,
        ctx: &ToolContext,
        call: &ToolCallRequest,
    ) -> crate::tools::ToolResult {
        self.bus.publish(WorkflowEvent::new(
            ctx.task_id.clone(),
            EventPayload::AgentToolCall {
                agent_id: agent_id.to_string(),
                tool_name: call.name.clone(),
                arguments: ellipsize_strings(&call.arguments),
            },
        ));

        let started = Instant::now();
        let result = match self.tools.iter().find(|t| t.name() == call.name) {
            Some(tool) => tool.execute(call.arguments.clone(), ctx).await,
            None => crate::tools::ToolResult::error(format!("Unknown tool: {}", call.name)),
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        self.bus.publish(WorkflowEvent::new(
            ctx.task_id.clone(),
            EventPayload::AgentToolResult {
                agent_id: agent_id.to_string(),
                tool_name: call.name.clone(),
                is_error: result.is_error,
                duration_ms,
            },
        ));

        result
    }

    fn windowed_messages(&self, messages: &[ChatMessage]) -> Vec<ChatMessage> {
        let Some(window) = self.config.max_context_turns else {
            return messages.to_vec();
        };
        if messages.len() <= window + 2 {
            return messages.to_vec();
        }

        let assistant_indices: Vec<usize> = messages
            .iter()
            .enumerate()
            .filter(|(_, m)| matches!(m, ChatMessage::Assistant { .. }))
            .map(|(i, _)| i)
            .collect();

        let mut kept = vec![messages[0].clone(), messages[1].clone()];
        if let Some(&cutoff) = assistant_indices.iter().rev().nth(window.saturating_sub(1)) {
            kept.extend_from_slice(&messages[cutoff..]);
        } else {
            kept.extend_from_slice(&messages[2..]);
        }
        kept
    }

    fn finalize_failed(
        &self,
        agent_id: &str,
        ctx: &ToolContext,
        reason: &str,
        usage: TokenUsage,
    ) -> AgentResult {
        self.finalize(agent_id, ctx, AgentStatus::Failed, reason, reason, usage)
    }

    fn finalize_needs_review(
        &self,
        agent_id: &str,
        ctx: &ToolContext,
        reason: &str,
        usage: TokenUsage,
    ) -> AgentResult {
        self.finalize(
            agent_id,
            ctx,
            AgentStatus::NeedsReview,
            reason,
            reason,
            usage,
        )
    }

    fn finalize(
        &self,
        agent_id: &str,
        ctx: &ToolContext,
        status: AgentStatus,
        summary: &str,
        content: &str,
        usage: TokenUsage,
    ) -> AgentResult {
        let artifact = Artifact::new(self.config.role.artifact_type(), content);
        self.bus.publish(WorkflowEvent::new(
            ctx.task_id.clone(),
            EventPayload::AgentComplete {
                agent_id: agent_id.to_string(),
                status: status.to_string(),
            },
        ));
        AgentResult {
            agent_id: agent_id.to_string(),
            role: self.config.role,
            status,
            artifact: artifact.with_metadata(
                [(
                    "summary".to_string(),
                    serde_json::Value::String(summary.to_string()),
                )]
                .into_iter()
                .collect(),
            ),
            usage,
            conversation_turns: 0,
        }
    }

    fn finalize_with_payload(
        &self,
        agent_id: &str,
        ctx: &ToolContext,
        payload: CompleteTaskPayload,
        usage: TokenUsage,
    ) -> AgentResult {
        let mut metadata = payload.metadata;
        metadata.insert(
            "summary".to_string(),
            serde_json::Value::String(payload.summary.clone()),
        );
        if let Some(notes) = &payload.handoff_notes {
            metadata.insert(
                "handoff_notes".to_string(),
                serde_json::Value::String(notes.clone()),
            );
        }
        if let Some(notes) = &payload.review_notes {
            metadata.insert(
                "review_notes".to_string(),
                serde_json::Value::String(notes.clone()),
            );
        }

        let artifact =
            Artifact::new(self.config.role.artifact_type(), payload.content).with_metadata(metadata);

        self.bus.publish(WorkflowEvent::new(
            ctx.task_id.clone(),
            EventPayload::AgentComplete {
                agent_id: agent_id.to_string(),
                status: payload.status.to_string(),
            },
        ));

        AgentResult {
            agent_id: agent_id.to_string(),
            role: self.config.role,
            status: payload.status,
            artifact,
            usage,
            conversation_turns: 0,
        }
    }
}

fn signature_of(calls: &[ToolCallRequest]) -> Vec<(String, serde_json::Value)> {
    calls
        .iter()
        .map(|c| (c.name.clone(), c.arguments.clone()))
        .collect()
}

fn is_stuck(recent: &[Vec<(String, serde_json::Value)>]) -> bool {
    if recent.len() < MAX_CONSECUTIVE_DUPLICATES {
        return false;
    }
    let tail = &recent[recent.len() - MAX_CONSECUTIVE_DUPLICATES..];
    tail.windows(2).all(|w| w[0] == w[1])
}

fn display_truncate(text: &str) -> String {
    if text.chars().count() <= CONTENT_DISPLAY_CAP {
        text.to_string()
    } else {
        text.chars().take(CONTENT_DISPLAY_CAP).collect()
    }
}

fn ellipsize_strings(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::String(s) if s.chars().count() > TOOL_ARG_ELLIPSIS_CAP => {
            let truncated: String = s.chars().take(TOOL_ARG_ELLIPSIS_CAP).collect();
            serde_json::Value::String(format!("{truncated}…"))
        }
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), ellipsize_strings(v)))
                .collect(),
        ),
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.iter().map(ellipsize_strings).collect())
        }
        other => other.clone(),
    }
}

fn parse_complete_task(arguments: &serde_json::Value) -> Result<CompleteTaskPayload, String> {
    let status_str = arguments
        .get("status")
        .and_then(|v| v.as_str())
        .ok_or("missing status")?;
    let status = match status_str {
        "completed" => AgentStatus::Completed,
        "failed" => AgentStatus::Failed,
        "needs_review" => AgentStatus::NeedsReview,
        other => return Err(format!("unknown status '{other}'")),
    };

    let summary = arguments
        .get("summary")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or("missing or empty summary")?
        .to_string();
    let content = arguments
        .get("content")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or("missing or empty content")?
        .to_string();

    let handoff_notes = arguments
        .get("handoff_notes")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let review_notes = arguments
        .get("review_notes")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let metadata: ArtifactMetadata = arguments
        .get("metadata")
        .and_then(|v| v.as_object())
        .map(|m| m.clone().into_iter().collect())
        .unwrap_or_default();

    Ok(CompleteTaskPayload {
        status,
        summary,
        content,
        handoff_notes,
        review_notes,
        metadata,
    })
}

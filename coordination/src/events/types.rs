//! The closed set of events the workflow engine publishes.
//!
//! Every variant is constructed from exactly one place in the engine; this
//! file only defines shape. Consumers (renderer, cost tracker, oversight
//! tracker) match exhaustively — adding a variant is a breaking change on
//! purpose.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::{Role, TokenUsage};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowEvent {
    pub timestamp: DateTime<Utc>,
    pub task_id: String,
    pub payload: EventPayload,
}

impl WorkflowEvent {
    pub fn new(task_id: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            timestamp: Utc::now(),
            task_id: task_id.into(),
            payload,
        }
    }

    pub fn event_type(&self) -> &'static str {
        self.payload.event_type()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    WorkflowStart {
        description: String,
    },
    WorkflowComplete {
        success: bool,
        summary: String,
    },
    StepStart {
        role: Role,
    },
    StepComplete {
        role: Role,
        status: String,
        model: String,
        usage: TokenUsage,
    },
    StepRetry {
        role: Role,
        attempt: u32,
        max_retries: u32,
        reason: String,
    },
    AgentSpawn {
        agent_id: String,
        role: Role,
    },
    AgentTurn {
        agent_id: String,
        turn: usize,
    },
    AgentToolCall {
        agent_id: String,
        tool_name: String,
        arguments: serde_json::Value,
    },
    AgentContent {
        agent_id: String,
        text: String,
    },
    AgentToolResult {
        agent_id: String,
        tool_name: String,
        is_error: bool,
        duration_ms: u64,
    },
    AgentComplete {
        agent_id: String,
        status: String,
    },
    SubtaskStart {
        subtask_id: String,
        index: usize,
    },
    SubtaskComplete {
        subtask_id: String,
        index: usize,
        status: String,
    },
    TaskStatusChange {
        from: String,
        to: String,
    },
    TaskSubtaskCreated {
        subtask_id: String,
        parent_id: String,
    },
    TokenUpdate {
        role: Role,
        usage: TokenUsage,
    },
    CostUpdate {
        role: Role,
        model: String,
        cost_usd: f64,
        cumulative_usd: f64,
    },
    CompositeCycleStart {
        iteration: u32,
    },
    OracleInvoked {
        reason: String,
    },
    OracleDecision {
        action: String,
    },
    OversightCheckIn {
        signal: String,
    },
}

impl EventPayload {
    pub fn event_type(&self) -> &'static str {
        match self {
            EventPayload::WorkflowStart { .. } => "workflow:start",
            EventPayload::WorkflowComplete { .. } => "workflow:complete",
            EventPayload::StepStart { .. } => "step:start",
            EventPayload::StepComplete { .. } => "step:complete",
            EventPayload::StepRetry { .. } => "step:retry",
            EventPayload::AgentSpawn { .. } => "agent:spawn",
            EventPayload::AgentTurn { .. } => "agent:turn",
            EventPayload::AgentToolCall { .. } => "agent:tool_call",
            EventPayload::AgentContent { .. } => "agent:content",
            EventPayload::AgentToolResult { .. } => "agent:tool_result",
            EventPayload::AgentComplete { .. } => "agent:complete",
            EventPayload::SubtaskStart { .. } => "subtask:start",
            EventPayload::SubtaskComplete { .. } => "subtask:complete",
            EventPayload::TaskStatusChange { .. } => "task:status_change",
            EventPayload::TaskSubtaskCreated { .. } => "task:subtask_created",
            EventPayload::TokenUpdate { .. } => "token:update",
            EventPayload::CostUpdate { .. } => "cost:update",
            EventPayload::CompositeCycleStart { .. } => "composite_cycle:start",
            EventPayload::OracleInvoked { .. } => "oracle:invoked",
            EventPayload::OracleDecision { .. } => "oracle:decision",
            EventPayload::OversightCheckIn { .. } => "oversight:check_in",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_matches_payload() {
        let ev = WorkflowEvent::new(
            "t1",
            EventPayload::StepStart {
                role: Role::Planner,
            },
        );
        assert_eq!(ev.event_type(), "step:start");
    }
}

//! Colored, human-readable one-liners per event, written directly with
//! ANSI escape codes rather than an extra crate.

use coordination::events::{EventPayload, WorkflowEvent};

use super::Renderer;

const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";
const RESET: &str = "\x1b[0m";

pub struct TerminalRenderer;

impl Renderer for TerminalRenderer {
    fn on_event(&self, event: &WorkflowEvent) {
        let line = format_line(event);
        println!("{line}");
    }
}

fn format_line(event: &WorkflowEvent) -> String {
    let ts = event.timestamp.format("%H:%M:%S");
    let prefix = format!("{DIM}[{ts}]{RESET}");

    match &event.payload {
        EventPayload::WorkflowStart { description } => {
            format!("{prefix} {CYAN}workflow start{RESET} {description}")
        }
        EventPayload::WorkflowComplete { success, summary } => {
            let color = if *success { GREEN } else { RED };
            format!("{prefix} {color}workflow complete{RESET} {summary}")
        }
        EventPayload::StepStart { role } => format!("{prefix} {role} starting"),
        EventPayload::StepComplete {
            role,
            status,
            model,
            usage,
        } => format!(
            "{prefix} {role} {GREEN}complete{RESET} ({status}) [{model}, {} tok]",
            usage.total_tokens
        ),
        EventPayload::StepRetry { role, attempt, max_retries, reason } => {
            format!("{prefix} {YELLOW}{role} retry {attempt}/{max_retries}{RESET}: {reason}")
        }
        EventPayload::AgentSpawn { agent_id, role } => {
            format!("{prefix} {DIM}spawn {agent_id} ({role}){RESET}")
        }
        EventPayload::AgentTurn { agent_id, turn } => {
            format!("{prefix} {DIM}{agent_id} turn {turn}{RESET}")
        }
        EventPayload::AgentToolCall {
            agent_id,
            tool_name,
            ..
        } => format!("{prefix} {agent_id} → {tool_name}"),
        EventPayload::AgentContent { agent_id, text } => {
            format!("{prefix} {DIM}{agent_id}: {text}{RESET}")
        }
        EventPayload::AgentToolResult {
            agent_id,
            tool_name,
            is_error,
            duration_ms,
        } => {
            let color = if *is_error { RED } else { GREEN };
            format!("{prefix} {agent_id} ← {tool_name} {color}({duration_ms}ms){RESET}")
        }
        EventPayload::AgentComplete { agent_id, status } => {
            format!("{prefix} {agent_id} done: {status}")
        }
        EventPayload::SubtaskStart { subtask_id, index } => {
            format!("{prefix} {CYAN}subtask[{index}] {subtask_id} start{RESET}")
        }
        EventPayload::SubtaskComplete {
            subtask_id,
            index,
            status,
        } => format!("{prefix} subtask[{index}] {subtask_id} {status}"),
        EventPayload::TaskStatusChange { from, to } => {
            format!("{prefix} task {from} → {to}")
        }
        EventPayload::TaskSubtaskCreated { subtask_id, parent_id } => {
            format!("{prefix} {DIM}{parent_id} spawned {subtask_id}{RESET}")
        }
        EventPayload::TokenUpdate { role, usage } => {
            format!("{prefix} {DIM}{role} tokens: {}{RESET}", usage.total_tokens)
        }
        EventPayload::CostUpdate {
            role,
            model,
            cost_usd,
            cumulative_usd,
        } => format!(
            "{prefix} {YELLOW}cost{RESET} {role}/{model} +${cost_usd:.4} (total ${cumulative_usd:.4})"
        ),
        EventPayload::CompositeCycleStart { iteration } => {
            format!("{prefix} {CYAN}composite cycle {iteration}{RESET}")
        }
        EventPayload::OracleInvoked { reason } => {
            format!("{prefix} {YELLOW}oracle invoked{RESET}: {reason}")
        }
        EventPayload::OracleDecision { action } => {
            format!("{prefix} oracle decision: {action}")
        }
        EventPayload::OversightCheckIn { signal } => {
            format!("{prefix} {DIM}oversight: {signal}{RESET}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_start_line_includes_description() {
        let event = WorkflowEvent::new(
            "t1",
            EventPayload::WorkflowStart {
                description: "build the thing".to_string(),
            },
        );
        assert!(format_line(&event).contains("build the thing"));
    }
}

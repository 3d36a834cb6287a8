//! Root-only oracle invocation: the last resort when the root steward
//! itself escalates. Gets a terse snapshot, not the full transcript.

use crate::events::{EventPayload, WorkflowEvent};
use crate::task::{AgentResult, OracleAction, Role};

use super::engine::WorkflowEngine;

const REVIEW_NOTES_CAP: usize = 500;
const CHILD_LINE_CAP: usize = 80;
const SNAPSHOT_SUMMARY_CAP: usize = 200;

fn cap(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}

pub struct OracleInput<'a> {
    pub root_description: &'a str,
    pub steward_situation: &'a str,
    pub review_notes: Option<&'a str>,
    pub child_summaries: &'a [String],
}

fn build_context(input: &OracleInput) -> String {
    let mut sections = vec![
        format!("--- Root task ---\n{}", input.root_description),
        format!("--- Steward situation ---\n{}", input.steward_situation),
    ];

    if let Some(notes) = input.review_notes {
        sections.push(format!("--- Review notes ---\n{}", cap(notes, REVIEW_NOTES_CAP)));
    }

    if !input.child_summaries.is_empty() {
        let lines: Vec<String> = input
            .child_summaries
            .iter()
            .map(|s| cap(s, CHILD_LINE_CAP))
            .collect();
        sections.push(format!("--- Children ---\n{}", lines.join("\n")));
    }

    sections.push(
        "Decide by calling complete_task with one of: nudge_root_steward (message), \
         retry_once (focus), escalate_to_user."
            .to_string(),
    );

    sections.join("\n\n")
}

pub async fn decide(
    engine: &WorkflowEngine,
    root_task_id: &str,
    input: OracleInput<'_>,
) -> (Option<OracleAction>, AgentResult) {
    let context = build_context(&input);

    engine.deps.bus.publish(WorkflowEvent::new(
        root_task_id,
        EventPayload::OracleInvoked {
            reason: cap(input.steward_situation, SNAPSHOT_SUMMARY_CAP),
        },
    ));

    let result = engine
        .run_agent_step(Role::Oracle, root_task_id, &context, None, None, None)
        .await;
    let action = crate::parsers::oracle::parse(&result.artifact.content);

    engine.deps.bus.publish(WorkflowEvent::new(
        root_task_id,
        EventPayload::OracleDecision {
            action: action
                .as_ref()
                .map(action_label)
                .unwrap_or("escalate_to_user")
                .to_string(),
        },
    ));

    (action, result)
}

fn action_label(action: &OracleAction) -> &'static str {
    match action {
        OracleAction::NudgeRootSteward { .. } => "nudge_root_steward",
        OracleAction::RetryOnce { .. } => "retry_once",
        OracleAction::EscalateToUser => "escalate_to_user",
    }
}

//! Steward invocation: builds a terse recovery-decision context from a
//! composite's current state and parses the resulting action.

use crate::task::{AgentResult, Role, StewardAction};

use super::engine::WorkflowEngine;

const SUBTASK_SUMMARY_CAP: usize = 150;
const MERGE_SUMMARY_CAP: usize = 300;

pub struct StewardInput<'a> {
    pub original_description: &'a str,
    pub subtask_summaries: &'a [String],
    pub merge_summary: &'a str,
    pub review_notes: Option<&'a str>,
    pub oracle_nudge: Option<&'a str>,
}

fn cap(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}

fn build_context(input: &StewardInput) -> String {
    let mut sections = Vec::new();

    if let Some(nudge) = input.oracle_nudge {
        sections.push(super::steward_voice_line(nudge));
    }

    sections.push(format!("--- Task ---\n{}", input.original_description));

    if !input.subtask_summaries.is_empty() {
        let numbered: Vec<String> = input
            .subtask_summaries
            .iter()
            .enumerate()
            .map(|(i, s)| format!("{}. {}", i + 1, cap(s, SUBTASK_SUMMARY_CAP)))
            .collect();
        sections.push(format!("--- Subtasks ---\n{}", numbered.join("\n")));
    }

    sections.push(format!(
        "--- Merge/QA result ---\n{}",
        cap(input.merge_summary, MERGE_SUMMARY_CAP)
    ));

    if let Some(notes) = input.review_notes {
        sections.push(format!("--- Review notes ---\n{notes}"));
    }

    sections.push(
        "Decide the recovery action by calling complete_task with one of: retry_merge, \
         retry_children (indices + focus), add_fix_task (optional description), re_decompose, \
         escalate."
            .to_string(),
    );

    sections.join("\n\n")
}

/// Invokes the steward and parses its decision. `None` means escalate,
/// whether because the steward asked for it explicitly or its payload
/// could not be parsed.
pub async fn decide(
    engine: &WorkflowEngine,
    task_id: &str,
    input: StewardInput<'_>,
) -> (Option<StewardAction>, AgentResult) {
    let context = build_context(&input);
    let result = engine
        .run_agent_step(Role::Steward, task_id, &context, None, None, None)
        .await;
    let action = crate::parsers::steward::parse(&result.artifact.content);
    (action, result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtask_summaries_are_numbered_and_capped() {
        let long = "x".repeat(500);
        let input = StewardInput {
            original_description: "build the thing",
            subtask_summaries: &[long.clone(), "short".to_string()],
            merge_summary: "merge failed",
            review_notes: None,
            oracle_nudge: None,
        };
        let context = build_context(&input);
        assert!(context.contains("1. "));
        assert!(context.contains("2. short"));
        assert!(!context.contains(&long));
    }

    #[test]
    fn oracle_nudge_is_prepended() {
        let input = StewardInput {
            original_description: "build the thing",
            subtask_summaries: &[],
            merge_summary: "ok",
            review_notes: None,
            oracle_nudge: Some("watch subtask 2"),
        };
        let context = build_context(&input);
        assert!(context.starts_with("--- Steward voice ---"));
    }
}

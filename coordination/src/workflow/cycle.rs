//! The execute → review cycle: the leaf-level unit every direct task and
//! every decomposition subtask ultimately bottoms out in.

use crate::events::{EventPayload, WorkflowEvent};
use crate::task::{AgentStatus, Artifact, Role, TaskStatus};

use super::engine::WorkflowEngine;

const ECONOMY_EXECUTOR_MAX_TURNS: usize = 8;
const ECONOMY_REVIEWER_MAX_TURNS: usize = 5;
const ECONOMY_PREFIX: &str = "This is a small task. Make the minimal change. Prefer read_file and write_file; avoid invoke_cursor_cli unless necessary. Use as few turns as possible.\n\n";
const EXECUTOR_SUMMARY_CAP: usize = 500;

fn cap(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}

/// Runs executor, then reviewer, retrying the pair on `needs_review` up to
/// `max_retries` additional attempts. Economy mode trims both roles' turn
/// budgets, prepends a minimal-change instruction to the executor, and
/// forces the configured cheap reviewer model when one is set.
pub async fn run_cycle(
    engine: &WorkflowEngine,
    task_id: &str,
    spec_context: &str,
    file_scope: Option<Vec<String>>,
    economy: bool,
    artifacts: &mut Vec<Artifact>,
) -> TaskStatus {
    let max_retries = engine.deps.config.max_retries as u32;
    let max_attempts = engine.deps.config.max_retries + 1;
    let mut revision_notes: Option<String> = None;
    let mut oversight_count = 0u32;

    let executor_max_turns = economy.then_some(ECONOMY_EXECUTOR_MAX_TURNS);
    let reviewer_max_turns = economy.then_some(ECONOMY_REVIEWER_MAX_TURNS);
    let reviewer_model = if economy {
        engine.deps.config.reviewer_model.clone()
    } else {
        None
    };

    for attempt in 1..=max_attempts {
        if attempt > 1 {
            engine.deps.bus.publish(WorkflowEvent::new(
                task_id,
                EventPayload::StepRetry {
                    role: Role::Executor,
                    attempt: attempt as u32,
                    max_retries,
                    reason: revision_notes.clone().unwrap_or_default(),
                },
            ));
        }

        let mut executor_context = if economy {
            format!("{ECONOMY_PREFIX}{spec_context}")
        } else {
            spec_context.to_string()
        };
        if let Some(notes) = &revision_notes {
            executor_context = format!(
                "{executor_context}\n\n--- REVISION REQUIRED ---\nThe Mirror (reviewer) found issues with your previous implementation:\n{notes}\nFix ONLY the issues described above. Do not change anything else."
            );
        }
        if let Some(nudge) = engine
            .maybe_oversight_check_in(task_id, &mut oversight_count)
            .await
        {
            executor_context = format!("{}\n\n{executor_context}", super::steward_voice_line(&nudge));
        }

        let executor_result = engine
            .run_agent_step(
                Role::Executor,
                task_id,
                &executor_context,
                executor_max_turns,
                None,
                file_scope.clone(),
            )
            .await;
        artifacts.push(executor_result.artifact.clone());

        if executor_result.status == AgentStatus::Failed {
            if attempt == max_attempts {
                return TaskStatus::Failed;
            }
            revision_notes = Some("Executor failed to complete; retry from scratch.".to_string());
            continue;
        }

        let executor_summary = executor_result
            .artifact
            .metadata
            .get("summary")
            .and_then(|v| v.as_str())
            .unwrap_or(&executor_result.artifact.content);
        let mut reviewer_context = format!(
            "--- Task ---\n{spec_context}\n\n--- Executor summary ---\n{}",
            cap(executor_summary, EXECUTOR_SUMMARY_CAP)
        );
        if let Some(notes) = executor_result.artifact.handoff_notes() {
            reviewer_context.push_str(&format!("\n\n--- Handoff notes ---\n{notes}"));
        }

        let reviewer_result = engine
            .run_agent_step(
                Role::Reviewer,
                task_id,
                &reviewer_context,
                reviewer_max_turns,
                reviewer_model.clone(),
                file_scope.clone(),
            )
            .await;
        artifacts.push(reviewer_result.artifact.clone());

        match reviewer_result.status {
            AgentStatus::Completed => return TaskStatus::Completed,
            AgentStatus::Failed => {
                if attempt == max_attempts {
                    return TaskStatus::Failed;
                }
                revision_notes = Some("Reviewer could not complete; retry.".to_string());
            }
            AgentStatus::NeedsReview => {
                if attempt == max_attempts {
                    return TaskStatus::Review;
                }
                revision_notes = Some(
                    reviewer_result
                        .artifact
                        .review_notes()
                        .unwrap_or(&reviewer_result.artifact.content)
                        .to_string(),
                );
            }
        }
    }

    TaskStatus::Failed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_attempts_is_retries_plus_one() {
        let cfg = crate::workflow::EngineConfig {
            max_retries: 2,
            ..Default::default()
        };
        assert_eq!(cfg.max_retries + 1, 3);
    }

    #[test]
    fn executor_summary_cap_truncates_long_text() {
        let long = "x".repeat(900);
        let capped = cap(&long, EXECUTOR_SUMMARY_CAP);
        assert_eq!(capped.chars().count(), EXECUTOR_SUMMARY_CAP);
    }

    #[test]
    fn short_text_is_unaffected_by_cap() {
        assert_eq!(cap("short", EXECUTOR_SUMMARY_CAP), "short");
    }
}

//! Runs a planner decomposition: setup task, parallel/sequential subtasks,
//! coordinator merge, and the composite QA cycle with steward/oracle
//! escalation.

use tracing::warn;

use crate::events::{EventPayload, WorkflowEvent};
use crate::task::{AgentStatus, Artifact, Decomposition, OracleAction, Role, StewardAction, SubtaskDef, TaskStatus};

use super::engine::WorkflowEngine;
use super::{RunTaskOptions, TaskOutcome};

fn significant_words(s: &str) -> std::collections::HashSet<String> {
    s.to_lowercase()
        .split_whitespace()
        .filter(|w| w.len() > 2)
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Two descriptions are duplicates if they match exactly (trimmed,
/// case-insensitive) or share at least two significant words.
fn is_duplicate(a: &str, b: &str) -> bool {
    let a_trim = a.trim().to_lowercase();
    let b_trim = b.trim().to_lowercase();
    if a_trim == b_trim {
        return true;
    }
    significant_words(a).intersection(&significant_words(b)).count() >= 2
}

/// Normalizes a scope path by trimming a trailing slash; an empty scope
/// becomes `.`, which is a prefix of every path.
fn normalize_scope(s: &str) -> String {
    let trimmed = s.trim_end_matches('/');
    if trimmed.is_empty() {
        ".".to_string()
    } else {
        trimmed.to_string()
    }
}

fn scopes_overlap(a: &str, b: &str) -> bool {
    let a = normalize_scope(a);
    let b = normalize_scope(b);
    if a == "." || b == "." || a == b {
        return true;
    }
    a.starts_with(&format!("{b}/")) || b.starts_with(&format!("{a}/"))
}

fn have_overlapping_file_scopes(subtasks: &[SubtaskDef]) -> bool {
    for i in 0..subtasks.len() {
        for j in (i + 1)..subtasks.len() {
            if subtasks[i].file_scope.is_empty() || subtasks[j].file_scope.is_empty() {
                return true;
            }
            if subtasks[i]
                .file_scope
                .iter()
                .any(|f| subtasks[j].file_scope.iter().any(|g| scopes_overlap(f, g)))
            {
                return true;
            }
        }
    }
    false
}

struct SubtaskRun {
    def: SubtaskDef,
    subtask_id: String,
    outcome: TaskOutcome,
}

pub async fn run_decomposition(
    engine: &WorkflowEngine,
    decomposition: Decomposition,
    task_id: &str,
    description: &str,
    depth: u32,
    mut artifacts: Vec<Artifact>,
) -> TaskOutcome {
    let is_root = depth == 0;

    {
        let mut chart = engine.deps.org_chart.lock().unwrap();
        chart.mark_composite(task_id, is_root);
    }

    let mut subtasks = decomposition.subtasks;
    if let Some(setup) = &decomposition.setup_task {
        subtasks.retain(|s| !is_duplicate(&s.description, &setup.description));
    }

    let mut parallel = decomposition.parallel;
    if parallel && have_overlapping_file_scopes(&subtasks) {
        warn!(
            task_id,
            "overlapping file scopes across subtasks; downgrading to sequential execution"
        );
        parallel = false;
    }

    {
        let mut chart = engine.deps.org_chart.lock().unwrap();
        if let Some(setup) = &decomposition.setup_task {
            let id = format!("{task_id}-setup");
            chart.insert_child(task_id, id, setup.description.clone(), depth + 1);
        }
        for (i, s) in subtasks.iter().enumerate() {
            let id = format!("{task_id}-{i}");
            chart.insert_child(task_id, id, s.description.clone(), depth + 1);
        }
    }

    if let Some(setup) = decomposition.setup_task {
        let setup_id = format!("{task_id}-setup");
        let outcome = run_subtask(engine, &setup_id, 0, &setup, depth, None).await;
        artifacts.extend(outcome.artifacts.clone());
        if !outcome.is_completed() {
            return TaskOutcome {
                task_id: task_id.to_string(),
                status: TaskStatus::Failed,
                artifacts,
            };
        }
    }

    let mut runs: Vec<SubtaskRun> = if parallel {
        run_parallel(engine, task_id, &subtasks, depth).await
    } else {
        run_sequential(engine, task_id, &subtasks, depth).await
    };

    for run in &runs {
        artifacts.extend(run.outcome.artifacts.clone());
    }

    let mut oracle_nudge: Option<String> = None;
    let mut last_coordinator_status = AgentStatus::Failed;

    for iteration in 1..=engine.deps.config.max_composite_cycles {
        engine.deps.bus.publish(WorkflowEvent::new(
            task_id,
            EventPayload::CompositeCycleStart { iteration },
        ));

        let all_completed = runs.iter().all(|r| r.outcome.is_completed());

        let subtask_summaries: Vec<String> = runs
            .iter()
            .map(|r| format!("{} -> {}", r.def.description, r.outcome.status))
            .collect();

        let merge_context = format!(
            "--- Task ---\n{description}\n\n--- Subtask results ---\n{}",
            subtask_summaries.join("\n")
        );
        let coordinator_result = engine
            .run_agent_step(Role::Coordinator, task_id, &merge_context, None, None, None)
            .await;
        artifacts.push(coordinator_result.artifact.clone());
        last_coordinator_status = coordinator_result.status;

        if all_completed && coordinator_result.status == AgentStatus::Completed {
            return TaskOutcome {
                task_id: task_id.to_string(),
                status: TaskStatus::Completed,
                artifacts,
            };
        }

        let review_notes = runs
            .iter()
            .find(|r| !r.outcome.is_completed())
            .map(|r| format!("{} did not complete ({})", r.def.description, r.outcome.status));

        let (action, _steward_result) = super::steward::decide(
            engine,
            task_id,
            super::steward::StewardInput {
                original_description: description,
                subtask_summaries: &subtask_summaries,
                merge_summary: &coordinator_result.artifact.content,
                review_notes: review_notes.as_deref(),
                oracle_nudge: oracle_nudge.as_deref(),
            },
        )
        .await;
        oracle_nudge = None;

        match action {
            Some(StewardAction::RetryMerge) => continue,
            Some(StewardAction::RetryChildren { indices, focus }) => {
                for idx in indices {
                    if let Some(run) = runs.get_mut(idx) {
                        let retried = run_subtask(
                            engine,
                            &run.subtask_id,
                            idx,
                            &run.def,
                            depth,
                            Some(focus.clone()),
                        )
                        .await;
                        artifacts.extend(retried.artifacts.clone());
                        run.outcome = retried;
                    }
                }
            }
            Some(StewardAction::AddFixTask { description: fix_desc }) => {
                let fix = SubtaskDef {
                    description: fix_desc.unwrap_or_else(|| format!("Fix outstanding issues for: {description}")),
                    file_scope: Vec::new(),
                    skip_analysis: true,
                };
                let idx = runs.len();
                let subtask_id = format!("{task_id}-fix-{idx}");
                let outcome = run_subtask(engine, &subtask_id, idx, &fix, depth, None).await;
                artifacts.extend(outcome.artifacts.clone());
                runs.push(SubtaskRun {
                    def: fix,
                    subtask_id,
                    outcome,
                });
            }
            Some(StewardAction::ReDecompose) => {
                let retried = Box::pin(engine.run_task(RunTaskOptions {
                    task_id: task_id.to_string(),
                    description: description.to_string(),
                    depth,
                    file_scope: None,
                    skip_analysis: false,
                    parent_context: Some("Previous decomposition did not reach completion; re-plan.".to_string()),
                }))
                .await;
                artifacts.extend(retried.artifacts.clone());
                if retried.is_completed() {
                    return TaskOutcome {
                        task_id: task_id.to_string(),
                        status: TaskStatus::Completed,
                        artifacts,
                    };
                }
            }
            Some(StewardAction::Escalate) | None => {
                if is_root {
                    let child_summaries: Vec<String> = runs
                        .iter()
                        .map(|r| format!("{}: {}", r.def.description, r.outcome.status))
                        .collect();
                    let (oracle_action, _oracle_result) = super::oracle::decide(
                        engine,
                        task_id,
                        super::oracle::OracleInput {
                            root_description: description,
                            steward_situation: "root steward escalated after composite QA failure",
                            review_notes: review_notes.as_deref(),
                            child_summaries: &child_summaries,
                        },
                    )
                    .await;

                    match oracle_action {
                        Some(OracleAction::NudgeRootSteward { message }) => {
                            oracle_nudge = Some(message);
                            continue;
                        }
                        Some(OracleAction::RetryOnce { .. }) => continue,
                        Some(OracleAction::EscalateToUser) | None => {
                            return TaskOutcome {
                                task_id: task_id.to_string(),
                                status: TaskStatus::Review,
                                artifacts,
                            };
                        }
                    }
                } else {
                    return TaskOutcome {
                        task_id: task_id.to_string(),
                        status: TaskStatus::Failed,
                        artifacts,
                    };
                }
            }
        }
    }

    if is_root {
        let child_summaries: Vec<String> = runs
            .iter()
            .map(|r| format!("{}: {}", r.def.description, r.outcome.status))
            .collect();
        let (oracle_action, _oracle_result) = super::oracle::decide(
            engine,
            task_id,
            super::oracle::OracleInput {
                root_description: description,
                steward_situation: "composite QA cycles exhausted without completion",
                review_notes: None,
                child_summaries: &child_summaries,
            },
        )
        .await;

        let subtask_summaries: Vec<String> = runs
            .iter()
            .map(|r| format!("{} -> {}", r.def.description, r.outcome.status))
            .collect();
        let merge_context = format!(
            "--- Task ---\n{description}\n\n--- Subtask results ---\n{}",
            subtask_summaries.join("\n")
        );

        let retry_completed = match oracle_action {
            Some(OracleAction::NudgeRootSteward { message }) => {
                let (action, _steward_result) = super::steward::decide(
                    engine,
                    task_id,
                    super::steward::StewardInput {
                        original_description: description,
                        subtask_summaries: &subtask_summaries,
                        merge_summary: &merge_context,
                        review_notes: None,
                        oracle_nudge: Some(&message),
                    },
                )
                .await;

                if matches!(action, Some(StewardAction::RetryMerge)) {
                    let coordinator_result = engine
                        .run_agent_step(Role::Coordinator, task_id, &merge_context, None, None, None)
                        .await;
                    artifacts.push(coordinator_result.artifact.clone());
                    last_coordinator_status = coordinator_result.status;
                    coordinator_result.status == AgentStatus::Completed
                } else {
                    false
                }
            }
            Some(OracleAction::RetryOnce { .. }) => {
                let coordinator_result = engine
                    .run_agent_step(Role::Coordinator, task_id, &merge_context, None, None, None)
                    .await;
                artifacts.push(coordinator_result.artifact.clone());
                last_coordinator_status = coordinator_result.status;
                coordinator_result.status == AgentStatus::Completed
            }
            Some(OracleAction::EscalateToUser) | None => false,
        };

        if retry_completed {
            return TaskOutcome {
                task_id: task_id.to_string(),
                status: TaskStatus::Completed,
                artifacts,
            };
        }

        let status = if last_coordinator_status == AgentStatus::NeedsReview {
            TaskStatus::Review
        } else {
            TaskStatus::Failed
        };
        return TaskOutcome {
            task_id: task_id.to_string(),
            status,
            artifacts,
        };
    }

    TaskOutcome {
        task_id: task_id.to_string(),
        status: TaskStatus::Failed,
        artifacts,
    }
}

async fn run_subtask(
    engine: &WorkflowEngine,
    subtask_id: &str,
    index: usize,
    def: &SubtaskDef,
    parent_depth: u32,
    focus: Option<String>,
) -> TaskOutcome {
    engine.deps.bus.publish(WorkflowEvent::new(
        subtask_id,
        EventPayload::SubtaskStart {
            subtask_id: subtask_id.to_string(),
            index,
        },
    ));

    // Boxed: run_task -> run_decomposition -> run_subtask -> run_task forms a
    // type-level cycle that the compiler needs one indirection to close.
    let outcome = Box::pin(engine.run_task(RunTaskOptions {
        task_id: subtask_id.to_string(),
        description: def.description.clone(),
        depth: parent_depth + 1,
        file_scope: if def.file_scope.is_empty() {
            None
        } else {
            Some(def.file_scope.clone())
        },
        skip_analysis: def.skip_analysis,
        parent_context: focus,
    }))
    .await;

    engine.deps.bus.publish(WorkflowEvent::new(
        subtask_id,
        EventPayload::SubtaskComplete {
            subtask_id: subtask_id.to_string(),
            index,
            status: outcome.status.to_string(),
        },
    ));

    outcome
}

async fn run_sequential(
    engine: &WorkflowEngine,
    task_id: &str,
    subtasks: &[SubtaskDef],
    depth: u32,
) -> Vec<SubtaskRun> {
    let mut runs = Vec::with_capacity(subtasks.len());
    let mut oversight_count = 0u32;

    for (i, def) in subtasks.iter().enumerate() {
        let subtask_id = format!("{task_id}-{i}");
        let nudge = engine.maybe_oversight_check_in(task_id, &mut oversight_count).await;
        let focus = nudge.map(|n| super::steward_voice_line(&n));
        let outcome = run_subtask(engine, &subtask_id, i, def, depth, focus).await;

        let failed = !outcome.is_completed();
        runs.push(SubtaskRun {
            def: def.clone(),
            subtask_id,
            outcome,
        });
        if failed {
            break;
        }
    }

    runs
}

/// Fans out every subtask onto its own task via `tokio::spawn`, then fans
/// back in. Siblings run to completion regardless of each other's outcome;
/// aggregate failure is decided by the caller once all results are in.
async fn run_parallel(
    engine: &WorkflowEngine,
    task_id: &str,
    subtasks: &[SubtaskDef],
    depth: u32,
) -> Vec<SubtaskRun> {
    let mut handles = Vec::with_capacity(subtasks.len());

    for (i, def) in subtasks.iter().enumerate() {
        let subtask_id = format!("{task_id}-{i}");
        let def = def.clone();
        let engine_handle = engine.clone();
        let bus = engine.deps.bus.clone();

        bus.publish(WorkflowEvent::new(
            subtask_id.clone(),
            EventPayload::SubtaskStart {
                subtask_id: subtask_id.clone(),
                index: i,
            },
        ));

        let spawned_id = subtask_id.clone();
        let handle = tokio::spawn(async move {
            let outcome = engine_handle
                .run_task(RunTaskOptions {
                    task_id: spawned_id,
                    description: def.description.clone(),
                    depth: depth + 1,
                    file_scope: if def.file_scope.is_empty() {
                        None
                    } else {
                        Some(def.file_scope.clone())
                    },
                    skip_analysis: def.skip_analysis,
                    parent_context: None,
                })
                .await;
            (def, outcome)
        });

        handles.push((subtask_id, i, handle));
    }

    let mut runs = Vec::with_capacity(handles.len());
    for (subtask_id, index, handle) in handles {
        let (def, outcome) = match handle.await {
            Ok(pair) => pair,
            Err(join_err) => {
                warn!(subtask_id = %subtask_id, "subtask task panicked: {join_err}");
                (
                    SubtaskDef {
                        description: subtask_id.clone(),
                        file_scope: Vec::new(),
                        skip_analysis: true,
                    },
                    TaskOutcome {
                        task_id: subtask_id.clone(),
                        status: TaskStatus::Failed,
                        artifacts: Vec::new(),
                    },
                )
            }
        };

        engine.deps.bus.publish(WorkflowEvent::new(
            subtask_id.clone(),
            EventPayload::SubtaskComplete {
                subtask_id: subtask_id.clone(),
                index,
                status: outcome.status.to_string(),
            },
        ));

        runs.push(SubtaskRun {
            def,
            subtask_id,
            outcome,
        });
    }

    runs
}

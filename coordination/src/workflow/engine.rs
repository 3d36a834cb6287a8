//! The engine entry point: `run`, `run_task`, and the shared agent-step
//! helper every cycle/decomposition/steward/oracle call goes through.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::info_span;
use tracing::Instrument;

use crate::agent::{AgentConfig, AgentRuntime, LlmClient, ModelConfig};
use crate::cancellation::CancellationHandle;
use crate::events::{EventPayload, SharedEventBus, WorkflowEvent};
use crate::org_chart::OrgChart;
use crate::oversight::OversightTracker;
use crate::parsers;
use crate::persistence::PersistenceStore;
use crate::prompts::PromptProvider;
use crate::task::{AgentResult, AgentStatus, PlannerOutput, Role, TaskStatus};
use crate::tools::{ToolContext, ToolRegistry};

use super::{RunTaskOptions, TaskOutcome};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_depth: u32,
    pub max_retries: usize,
    pub max_composite_cycles: u32,
    pub complexity_direct_threshold: f64,
    pub reviewer_model: Option<String>,
    pub economy_mode: bool,
    pub max_context_turns: Option<usize>,
    pub oversight_probability: f64,
    pub max_oversight_per_composite: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: 2,
            max_retries: 2,
            max_composite_cycles: 2,
            complexity_direct_threshold: 0.35,
            reviewer_model: None,
            economy_mode: false,
            max_context_turns: None,
            oversight_probability: 0.25,
            max_oversight_per_composite: 2,
        }
    }
}

pub struct EngineDeps {
    pub bus: SharedEventBus,
    pub persistence: PersistenceStore,
    pub tools: Arc<ToolRegistry>,
    pub llm: Arc<dyn LlmClient>,
    pub prompts: Arc<dyn PromptProvider>,
    pub working_directory: PathBuf,
    pub cancellation: CancellationHandle,
    pub oversight: Arc<OversightTracker>,
    pub org_chart: Mutex<OrgChart>,
    pub config: EngineConfig,
    pub cli_enabled: bool,
    pub default_provider: String,
    pub default_model: String,
}

#[derive(Clone)]
pub struct WorkflowEngine {
    pub deps: Arc<EngineDeps>,
}

impl WorkflowEngine {
    pub fn new(deps: Arc<EngineDeps>) -> Self {
        Self { deps }
    }

    /// Entry point: emits `workflow:start`, runs the recursive task,
    /// emits `workflow:complete`. Any internal failure surfaces as a
    /// `failed` outcome rather than propagating.
    pub async fn run(&self, description: &str, root_task_id: String) -> TaskOutcome {
        let span = info_span!("workflow", task_id = %root_task_id);
        self.run_inner(description, root_task_id).instrument(span).await
    }

    async fn run_inner(&self, description: &str, root_task_id: String) -> TaskOutcome {
        let started = Instant::now();
        self.deps.bus.publish(WorkflowEvent::new(
            root_task_id.clone(),
            EventPayload::WorkflowStart {
                description: description.to_string(),
            },
        ));

        self.deps
            .org_chart
            .lock()
            .unwrap()
            .insert_root(root_task_id.clone(), description.to_string());

        let outcome = self
            .run_task(RunTaskOptions::root(root_task_id.clone(), description.to_string()))
            .await;

        self.deps.bus.publish(WorkflowEvent::new(
            root_task_id.clone(),
            EventPayload::WorkflowComplete {
                success: outcome.is_completed(),
                summary: format!(
                    "status={} duration_ms={}",
                    outcome.status,
                    started.elapsed().as_millis()
                ),
            },
        ));

        outcome
    }

    /// §4.6 `runTask`.
    pub async fn run_task(&self, opts: RunTaskOptions) -> TaskOutcome {
        let mut artifacts = Vec::new();

        if opts.skip_analysis {
            return self
                .run_execute_review(
                    &opts.task_id,
                    &opts.description,
                    opts.file_scope.clone(),
                    true,
                    &mut artifacts,
                )
                .await;
        }

        let analyzer_context = with_parent_context(&opts.description, opts.parent_context.as_deref());
        let analyzer_result = self
            .run_agent_step(Role::Analyzer, &opts.task_id, &analyzer_context, None, None, None)
            .await;
        artifacts.push(analyzer_result.artifact.clone());

        if analyzer_result.status == AgentStatus::Failed {
            return TaskOutcome {
                task_id: opts.task_id,
                status: TaskStatus::Failed,
                artifacts,
            };
        }

        let analyzer_output = parsers::analyzer::parse(&analyzer_result.artifact.content);

        if analyzer_output.complexity <= self.deps.config.complexity_direct_threshold {
            return self
                .run_execute_review(
                    &opts.task_id,
                    &opts.description,
                    opts.file_scope.clone(),
                    true,
                    &mut artifacts,
                )
                .await;
        }

        let planner_context = format!(
            "{analyzer_context}\n\n--- Analysis ---\n{}",
            analyzer_result.artifact.content
        );
        let planner_result = self
            .run_agent_step(Role::Planner, &opts.task_id, &planner_context, None, None, None)
            .await;
        artifacts.push(planner_result.artifact.clone());

        if planner_result.status == AgentStatus::Failed {
            return TaskOutcome {
                task_id: opts.task_id,
                status: TaskStatus::Failed,
                artifacts,
            };
        }

        match parsers::planner::parse(&planner_result.artifact.content) {
            PlannerOutput::Spec(spec) => {
                self.run_execute_review(
                    &opts.task_id,
                    &spec.body,
                    Some(spec.file_scope),
                    false,
                    &mut artifacts,
                )
                .await
            }
            PlannerOutput::Decomposition(decomposition) => {
                if opts.depth >= self.deps.config.max_depth {
                    let synthesized =
                        "Max depth reached; implement as a single unit of work.\n\n".to_string()
                            + &opts.description;
                    self.run_execute_review(
                        &opts.task_id,
                        &synthesized,
                        opts.file_scope.clone(),
                        false,
                        &mut artifacts,
                    )
                    .await
                } else {
                    super::decomposition::run_decomposition(
                        self,
                        decomposition,
                        &opts.task_id,
                        &opts.description,
                        opts.depth,
                        artifacts,
                    )
                    .await
                }
            }
        }
    }

    async fn run_execute_review(
        &self,
        task_id: &str,
        spec_context: &str,
        file_scope: Option<Vec<String>>,
        economy: bool,
        artifacts: &mut Vec<crate::task::Artifact>,
    ) -> TaskOutcome {
        let status = super::cycle::run_cycle(self, task_id, spec_context, file_scope, economy, artifacts).await;
        TaskOutcome {
            task_id: task_id.to_string(),
            status,
            artifacts: artifacts.clone(),
        }
    }

    /// Shared by every cycle/decomposition/steward/oracle invocation:
    /// builds the role's `AgentConfig`, runs it, and brackets the call
    /// with `step:start`/`step:complete`.
    pub async fn run_agent_step(
        &self,
        role: Role,
        task_id: &str,
        context: &str,
        max_turns_override: Option<usize>,
        model_override: Option<String>,
        file_scope: Option<Vec<String>>,
    ) -> AgentResult {
        let (temperature, max_tokens, default_max_turns) = crate::agent::role_defaults(role);
        let max_turns = max_turns_override.unwrap_or(default_max_turns);
        let model = model_override.unwrap_or_else(|| self.deps.default_model.clone());
        let agent_config_model = model.clone();

        let agent_config = AgentConfig {
            role,
            system_prompt: self.deps.prompts.system_prompt(role).to_string(),
            model: ModelConfig {
                provider: self.deps.default_provider.clone(),
                model,
                temperature,
                max_tokens,
            },
            max_turns,
            max_context_turns: self.deps.config.max_context_turns,
        };

        let tools = self.deps.tools.for_role(role);
        let runtime = AgentRuntime {
            config: agent_config,
            tools,
            llm: Arc::clone(&self.deps.llm),
            bus: Arc::clone(&self.deps.bus),
        };

        let agent_id = format!("{role}-{}", uuid::Uuid::new_v4());
        let tool_ctx = ToolContext {
            task_id: task_id.to_string(),
            agent_id: agent_id.clone(),
            working_directory: self.deps.working_directory.clone(),
            file_scope,
            cancellation: self.deps.cancellation.clone(),
            cli_enabled: self.deps.cli_enabled,
        };

        self.deps.bus.publish(WorkflowEvent::new(
            task_id,
            EventPayload::StepStart { role },
        ));

        let result = runtime.run(agent_id, context.to_string(), tool_ctx).await;

        self.deps.bus.publish(WorkflowEvent::new(
            task_id,
            EventPayload::StepComplete {
                role,
                status: result.status.to_string(),
                model: agent_config_model,
                usage: result.usage.clone(),
            },
        ));

        result
    }

    /// Probabilistically (capped per composite) invokes the steward for a
    /// lightweight nudge when oversight signals are pending. Returns
    /// `None` when no nudge applies.
    pub async fn maybe_oversight_check_in(
        &self,
        task_id: &str,
        oversight_count: &mut u32,
    ) -> Option<String> {
        if *oversight_count >= self.deps.config.max_oversight_per_composite {
            return None;
        }
        if rand::random::<f64>() >= self.deps.config.oversight_probability {
            return None;
        }

        let signals = self.deps.oversight.check_in(task_id);
        if signals.is_empty() {
            return None;
        }

        let context = format!(
            "Oversight observed signals {signals:?} on task {task_id}. If this warrants a brief course-correcting nudge, call complete_task with status=completed and a one-sentence nudge as content. If nothing is wrong, call complete_task with content=\"no action needed\"."
        );
        let result = self
            .run_agent_step(Role::Steward, task_id, &context, None, None, None)
            .await;

        *oversight_count += 1;
        if result.status != AgentStatus::Completed || result.artifact.content.trim() == "no action needed" {
            return None;
        }
        Some(result.artifact.content)
    }
}

fn with_parent_context(description: &str, parent_context: Option<&str>) -> String {
    match parent_context {
        Some(ctx) if !ctx.is_empty() => format!("{ctx}\n\n--- Task ---\n{description}"),
        _ => description.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_parent_context_prefixes_when_present() {
        let result = with_parent_context("do the thing", Some("parent info"));
        assert!(result.starts_with("parent info"));
        assert!(result.ends_with("do the thing"));
    }

    #[test]
    fn with_parent_context_passes_through_when_absent() {
        assert_eq!(with_parent_context("do the thing", None), "do the thing");
    }
}

//! The run facade: wires the event bus, providers, persistence, renderer,
//! and cost tracker together once, then drives individual runs on top of
//! that shared plumbing.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use serde::Serialize;

use coordination::events::{EventPayload, SharedEventBus, WorkflowEvent};
use coordination::org_chart::OrgChart;
use coordination::oversight::OversightTracker;
use coordination::persistence::PersistenceStore;
use coordination::prompts::PromptProvider;
use coordination::task::{Artifact, TaskStatus};
use coordination::workflow::{EngineConfig, EngineDeps, TaskOutcome, WorkflowEngine};
use coordination::{CancellationHandle, EventBus, LlmClient};

use crate::config::Config;
use crate::cost_tracker::{CostBreakdown, CostTracker};
use crate::prompts::StaticPromptProvider;
use crate::providers::{anthropic::AnthropicClient, openai::OpenAiClient, ProviderRouter};
use crate::renderer;

/// Returned from [`RunFacade::run`]: everything the CLI prints or a
/// caller might want to inspect about one completed run.
pub struct RunResult {
    pub task_id: String,
    pub status: TaskStatus,
    pub artifacts: Vec<Artifact>,
    pub cost: CostBreakdown,
    pub duration: Duration,
}

impl RunResult {
    /// The content of the last artifact, surfaced as the "reason" line
    /// when `status` is not completed.
    pub fn failure_reason(&self) -> Option<&str> {
        if self.status == TaskStatus::Completed {
            return None;
        }
        self.artifacts.last().map(|a| a.content.as_str())
    }
}

#[derive(Serialize)]
struct PersistedTask<'a> {
    task_id: &'a str,
    status: String,
    artifacts: &'a [Artifact],
}

/// Owns the long-lived plumbing (bus, providers, persistence, renderer,
/// cost tracker) a CLI invocation needs exactly once, and drives each
/// `run()` as a fresh task over that shared state.
pub struct RunFacade {
    config: Config,
    bus: SharedEventBus,
    persistence: PersistenceStore,
    llm: Arc<dyn LlmClient>,
    prompts: Arc<dyn PromptProvider>,
    cost_tracker: Arc<CostTracker>,
    active_cancellation: Arc<Mutex<Option<CancellationHandle>>>,
}

impl RunFacade {
    pub async fn new(config: Config) -> Result<Self> {
        let bus: SharedEventBus = Arc::new(EventBus::new());

        let mut router = ProviderRouter::new();
        if let Some(key) = &config.openai_api_key {
            router.register("openai", Arc::new(OpenAiClient::new(key.clone())?));
        }
        if let Some(key) = &config.anthropic_api_key {
            router.register("anthropic", Arc::new(AnthropicClient::new(key.clone())?));
        }
        if config.openai_api_key.is_none() && config.anthropic_api_key.is_none() {
            bail!("no provider configured: set OPENAI_API_KEY or ANTHROPIC_API_KEY");
        }
        let llm: Arc<dyn LlmClient> = Arc::new(router);

        let persistence = PersistenceStore::new(config.persistence_path.clone())
            .await
            .context("building persistence store")?;

        let rendered = renderer::resolve(&config.renderer);
        let rendered: Arc<dyn renderer::Renderer> = Arc::from(rendered);
        bus.subscribe(Arc::new(move |event: &WorkflowEvent| rendered.on_event(event)));

        let cost_tracker = CostTracker::new();
        cost_tracker.register(&bus);

        let active_cancellation: Arc<Mutex<Option<CancellationHandle>>> = Arc::new(Mutex::new(None));
        if let Some(budget) = config.budget_dollars {
            let slot = Arc::clone(&active_cancellation);
            bus.subscribe(Arc::new(move |event: &WorkflowEvent| {
                if let EventPayload::CostUpdate { cumulative_usd, .. } = &event.payload {
                    if *cumulative_usd > budget {
                        if let Some(handle) = slot.lock().expect("cancellation slot poisoned").as_ref() {
                            handle.cancel();
                        }
                    }
                }
            }));
        }

        Ok(Self {
            config,
            bus,
            persistence,
            llm,
            prompts: Arc::new(StaticPromptProvider),
            cost_tracker,
            active_cancellation,
        })
    }

    /// Cancels the currently running task, if any. A no-op between runs.
    pub fn abort(&self) {
        if let Some(handle) = self
            .active_cancellation
            .lock()
            .expect("cancellation slot poisoned")
            .as_ref()
        {
            handle.cancel();
        }
    }

    pub async fn run(&self, description: &str) -> Result<RunResult> {
        let started = Instant::now();
        let task_id = uuid::Uuid::new_v4().to_string();

        let cancellation = CancellationHandle::new();
        *self
            .active_cancellation
            .lock()
            .expect("cancellation slot poisoned") = Some(cancellation.clone());

        let oversight = Arc::new(OversightTracker::with_thresholds(
            self.config.oversight_repeated_tool_count as usize,
            self.config.oversight_long_step_seconds,
        ));
        let oversight_observer = Arc::clone(&oversight);
        self.bus
            .subscribe(Arc::new(move |event: &WorkflowEvent| oversight_observer.observe(event)));

        let engine_config = EngineConfig {
            max_depth: self.config.max_depth,
            max_retries: self.config.max_retries,
            max_composite_cycles: self.config.max_composite_cycles,
            complexity_direct_threshold: self.config.complexity_direct_threshold,
            reviewer_model: self.config.reviewer_model.clone(),
            economy_mode: self.config.economy_mode,
            max_context_turns: self.config.max_context_turns,
            oversight_probability: self.config.oversight_probability,
            max_oversight_per_composite: self.config.max_oversight_per_composite,
        };

        let deps = Arc::new(EngineDeps {
            bus: Arc::clone(&self.bus),
            persistence: self.persistence.clone(),
            tools: Arc::new(coordination::build_default_registry()),
            llm: Arc::clone(&self.llm),
            prompts: Arc::clone(&self.prompts),
            working_directory: self.config.working_directory.clone(),
            cancellation,
            oversight,
            org_chart: Mutex::new(OrgChart::new()),
            config: engine_config,
            cli_enabled: self.config.use_cli,
            default_provider: self.config.default_provider.clone(),
            default_model: self.config.default_model.clone(),
        });

        let engine = WorkflowEngine::new(deps);
        let outcome: TaskOutcome = engine.run(description, task_id.clone()).await;

        self.persistence
            .write(
                &format!("tasks/{task_id}"),
                &PersistedTask {
                    task_id: &task_id,
                    status: outcome.status.to_string(),
                    artifacts: &outcome.artifacts,
                },
            )
            .await
            .context("persisting final task record")?;

        Ok(RunResult {
            task_id: outcome.task_id,
            status: outcome.status,
            artifacts: outcome.artifacts,
            cost: self.cost_tracker.breakdown(),
            duration: started.elapsed(),
        })
    }
}

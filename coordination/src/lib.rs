//! Recursive multi-agent workflow engine.
//!
//! This crate drives a fixed set of role-playing LLM agents (analyzer,
//! planner, executor, reviewer, coordinator, steward, oracle) over a
//! working directory through a bounded tool surface, publishing a closed
//! set of events that downstream consumers (CLI renderer, cost tracker,
//! oversight tracker) subscribe to. It has no opinion on where the LLM
//! calls actually go, or how the terminal renders — those seams are
//! [`agent::LlmClient`] and [`prompts::PromptProvider`].

#![allow(dead_code)]
#![allow(clippy::uninlined_format_args)]

pub mod agent;
pub mod cancellation;
pub mod error;
pub mod events;
pub mod org_chart;
pub mod oversight;
pub mod parsers;
pub mod persistence;
pub mod prompts;
pub mod task;
pub mod tools;
pub mod workflow;

pub use agent::{AgentConfig, AgentRuntime, LlmClient, LlmError, ModelConfig};
pub use cancellation::CancellationHandle;
pub use error::{PersistenceError, PersistenceResult, WorkflowError};
pub use events::{EventBus, EventPayload, SharedEventBus, WorkflowEvent};
pub use org_chart::{NodeKind, OrgChart, OrgChartNode};
pub use oversight::{OversightTracker, Signal};
pub use persistence::PersistenceStore;
pub use prompts::PromptProvider;
pub use task::{
    AgentResult, AgentStatus, AnalyzerOutput, Artifact, ArtifactMetadata, ArtifactType,
    Decomposition, OracleAction, PlannerOutput, Role, Spec, StewardAction, SubtaskDef, Task,
    TaskId, TaskStatus, TokenUsage,
};
pub use tools::{build_default_registry, role_tool_names, Tool, ToolContext, ToolRegistry, ToolResult};
pub use workflow::{EngineConfig, EngineDeps, RunTaskOptions, TaskOutcome, WorkflowEngine};

//! Core data model: tasks, artifacts, planner/analyzer output, steward/oracle
//! actions, agent results and token usage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type TaskId = String;

/// A unit of work flowing through the recursive workflow engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub description: String,
    pub status: TaskStatus,
    /// Assigned at most once; later writes via [`Task::set_complexity`] are ignored.
    pub complexity: Option<f64>,
    pub assigned_role: Option<Role>,
    pub artifacts: Vec<Artifact>,
    pub children: Vec<TaskId>,
    pub parent: Option<TaskId>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            status: TaskStatus::Pending,
            complexity: None,
            assigned_role: None,
            artifacts: Vec::new(),
            children: Vec::new(),
            parent: None,
            created_at: Utc::now(),
        }
    }

    /// Set complexity once. Subsequent calls are silently ignored per the
    /// "assigned at most once" invariant.
    pub fn set_complexity(&mut self, value: f64) {
        if self.complexity.is_none() {
            self.complexity = Some(value);
        }
    }

    pub fn push_artifact(&mut self, artifact: Artifact) {
        self.artifacts.push(artifact);
    }

    /// The last artifact is the summary surfaced to the parent task, if any.
    pub fn last_artifact(&self) -> Option<&Artifact> {
        self.artifacts.last()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Blocked,
    Review,
    Completed,
    Failed,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Review => "review",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// The fixed set of role-playing agents the workflow engine drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Analyzer,
    Planner,
    Executor,
    Reviewer,
    Coordinator,
    Steward,
    Oracle,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Analyzer => "analyzer",
            Role::Planner => "planner",
            Role::Executor => "executor",
            Role::Reviewer => "reviewer",
            Role::Coordinator => "coordinator",
            Role::Steward => "steward",
            Role::Oracle => "oracle",
        }
    }

    /// Artifact type produced by a successful `complete_task` call from this role.
    pub fn artifact_type(&self) -> ArtifactType {
        match self {
            Role::Analyzer => ArtifactType::Analysis,
            Role::Planner => ArtifactType::Spec,
            Role::Executor => ArtifactType::CodeChanges,
            Role::Reviewer => ArtifactType::Review,
            Role::Coordinator => ArtifactType::Coordination,
            Role::Steward => ArtifactType::Management,
            Role::Oracle => ArtifactType::Oracle,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    Analysis,
    Spec,
    Decomposition,
    CodeChanges,
    Review,
    Coordination,
    Management,
    Oracle,
}

/// Free-form metadata an agent may attach to its artifact. Notable keys:
/// `handoff_notes` and `review_notes`, surfaced verbatim to the next agent.
pub type ArtifactMetadata = HashMap<String, serde_json::Value>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub artifact_type: ArtifactType,
    pub content: String,
    #[serde(default)]
    pub metadata: ArtifactMetadata,
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    pub fn new(artifact_type: ArtifactType, content: impl Into<String>) -> Self {
        Self {
            artifact_type,
            content: content.into(),
            metadata: ArtifactMetadata::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: ArtifactMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn handoff_notes(&self) -> Option<&str> {
        self.metadata.get("handoff_notes").and_then(|v| v.as_str())
    }

    pub fn review_notes(&self) -> Option<&str> {
        self.metadata.get("review_notes").and_then(|v| v.as_str())
    }
}

/// Parsed analyzer `complete_task` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerOutput {
    pub complexity: f64,
    pub summary: String,
    #[serde(default)]
    pub affected_files: Vec<String>,
    #[serde(default)]
    pub recommended_approach: String,
}

/// A single subtask definition inside a [`Decomposition`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtaskDef {
    pub description: String,
    #[serde(default)]
    pub file_scope: Vec<String>,
    #[serde(default)]
    pub skip_analysis: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decomposition {
    pub subtasks: Vec<SubtaskDef>,
    #[serde(default)]
    pub parallel: bool,
    #[serde(default)]
    pub setup_task: Option<SubtaskDef>,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spec {
    pub body: String,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    #[serde(default)]
    pub expected_files: Vec<String>,
    #[serde(default)]
    pub file_scope: Vec<String>,
}

/// Sum type produced by the planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlannerOutput {
    Spec(Spec),
    Decomposition(Decomposition),
}

/// Recovery action chosen by the steward after a composite QA failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StewardAction {
    RetryMerge,
    RetryChildren {
        #[serde(alias = "taskIndices")]
        indices: Vec<usize>,
        #[serde(alias = "retryFocus")]
        focus: String,
    },
    AddFixTask { description: Option<String> },
    ReDecompose,
    Escalate,
}

/// Recovery action chosen by the root-only oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OracleAction {
    NudgeRootSteward { message: String },
    RetryOnce { focus: String },
    EscalateToUser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Completed,
    Failed,
    NeedsReview,
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AgentStatus::Completed => "completed",
            AgentStatus::Failed => "failed",
            AgentStatus::NeedsReview => "needs_review",
        };
        write!(f, "{s}")
    }
}

/// Purely additive token counters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn add(&mut self, other: TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

impl std::ops::Add for TokenUsage {
    type Output = TokenUsage;
    fn add(self, rhs: TokenUsage) -> TokenUsage {
        TokenUsage {
            prompt_tokens: self.prompt_tokens + rhs.prompt_tokens,
            completion_tokens: self.completion_tokens + rhs.completion_tokens,
            total_tokens: self.total_tokens + rhs.total_tokens,
        }
    }
}

/// The outcome of driving one role-playing agent to completion.
#[derive(Debug, Clone)]
pub struct AgentResult {
    pub agent_id: String,
    pub role: Role,
    pub status: AgentStatus,
    pub artifact: Artifact,
    pub usage: TokenUsage,
    pub conversation_turns: usize,
}

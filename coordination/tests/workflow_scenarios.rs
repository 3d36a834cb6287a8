//! End-to-end workflow scenarios driven by a scripted fake LLM client.
//!
//! No real provider is touched: `FakeLlmClient` identifies the calling role
//! from the system prompt (the test's `TestPromptProvider` returns the
//! role's own name as its prompt) and pops the next canned response off a
//! per-role queue. This exercises the real routing, retry, decomposition,
//! and steward/oracle logic in `coordination::workflow` against
//! deterministic scripts instead of a network.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use coordination::agent::{ChatMessage, CompletionRequest, CompletionResponse, LlmClient, LlmError, ToolCallRequest};
use coordination::events::{EventPayload, WorkflowEvent};
use coordination::prompts::PromptProvider;
use coordination::task::{Role, TaskStatus, TokenUsage};
use coordination::workflow::{EngineConfig, EngineDeps, RunTaskOptions, WorkflowEngine};
use coordination::{CancellationHandle, EventBus, OrgChart, OversightTracker, PersistenceStore};

/// Returns the role's own name as its system prompt, so the fake client can
/// recover which role is calling from `messages[0]`.
struct TestPromptProvider;

impl PromptProvider for TestPromptProvider {
    fn system_prompt(&self, role: Role) -> &str {
        role.as_str()
    }
}

/// A scripted, per-role FIFO of responses. Each role's queue is consumed in
/// order; an empty queue is a scripting bug, surfaced as a permanent
/// `LlmError` rather than a panic so it shows up as a normal task failure.
#[derive(Default)]
struct FakeLlmClient {
    scripts: Mutex<HashMap<String, VecDeque<CompletionResponse>>>,
}

impl FakeLlmClient {
    fn new() -> Self {
        Self::default()
    }

    fn push(&self, role: &str, response: CompletionResponse) {
        self.scripts
            .lock()
            .unwrap()
            .entry(role.to_string())
            .or_default()
            .push_back(response);
    }
}

#[async_trait]
impl LlmClient for FakeLlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let role = match request.messages.first() {
            Some(ChatMessage::System { content }) => content.clone(),
            _ => return Err(LlmError::classify("fake client expects a system message first")),
        };
        let mut scripts = self.scripts.lock().unwrap();
        let queue = scripts.entry(role.clone()).or_default();
        queue
            .pop_front()
            .ok_or_else(|| LlmError::classify(format!("no scripted response queued for role {role}")))
    }
}

fn complete_task(status: &str, summary: &str, content: &str) -> CompletionResponse {
    complete_task_with(status, summary, content, None)
}

fn complete_task_with(status: &str, summary: &str, content: &str, review_notes: Option<&str>) -> CompletionResponse {
    let mut args = serde_json::json!({
        "status": status,
        "summary": summary,
        "content": content,
    });
    if let Some(notes) = review_notes {
        args["review_notes"] = serde_json::Value::String(notes.to_string());
    }
    CompletionResponse {
        content: None,
        tool_calls: vec![ToolCallRequest {
            id: "call-1".to_string(),
            name: "complete_task".to_string(),
            arguments: args,
        }],
        usage: TokenUsage {
            prompt_tokens: 100,
            completion_tokens: 50,
            total_tokens: 150,
        },
    }
}

fn tool_call(name: &str, arguments: serde_json::Value) -> CompletionResponse {
    CompletionResponse {
        content: None,
        tool_calls: vec![ToolCallRequest {
            id: "call-1".to_string(),
            name: name.to_string(),
            arguments,
        }],
        usage: TokenUsage::default(),
    }
}

/// Builds a [`WorkflowEngine`] wired to `llm` over a fresh temp working
/// directory, with default engine settings. Returns the engine alongside
/// the event bus so a test can subscribe before running.
async fn build_engine(llm: Arc<dyn LlmClient>) -> (WorkflowEngine, coordination::SharedEventBus, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let bus: coordination::SharedEventBus = Arc::new(EventBus::new());
    let persistence = PersistenceStore::new(dir.path().join(".babylon")).await.unwrap();

    let deps = Arc::new(EngineDeps {
        bus: Arc::clone(&bus),
        persistence,
        tools: Arc::new(coordination::build_default_registry()),
        llm,
        prompts: Arc::new(TestPromptProvider),
        working_directory: dir.path().to_path_buf(),
        cancellation: CancellationHandle::new(),
        oversight: Arc::new(OversightTracker::with_thresholds(3, 90)),
        org_chart: Mutex::new(OrgChart::new()),
        config: EngineConfig {
            oversight_probability: 0.0,
            ..Default::default()
        },
        cli_enabled: false,
        default_provider: "test".to_string(),
        default_model: "test-model".to_string(),
    });

    (WorkflowEngine::new(deps), bus, dir)
}

fn event_types(bus: &coordination::SharedEventBus, sink: &Arc<Mutex<Vec<String>>>) {
    let sink = Arc::clone(sink);
    bus.subscribe(Arc::new(move |event: &WorkflowEvent| {
        sink.lock().unwrap().push(event.event_type().to_string());
    }));
}

/// Records which role completed a step, in order, for tests that care
/// about exactly which agents ran (e.g. confirming the planner was
/// skipped) rather than just how many `step:complete` events fired.
fn completed_roles(bus: &coordination::SharedEventBus, sink: &Arc<Mutex<Vec<Role>>>) {
    let sink = Arc::clone(sink);
    bus.subscribe(Arc::new(move |event: &WorkflowEvent| {
        if let EventPayload::StepComplete { role, .. } = &event.payload {
            sink.lock().unwrap().push(*role);
        }
    }));
}

/// A.1 — low analyzer complexity skips the planner and goes straight to a
/// single-pass executor/reviewer cycle.
#[tokio::test]
async fn simple_task_takes_the_direct_path() {
    let llm = Arc::new(FakeLlmClient::new());
    llm.push(
        Role::Analyzer.as_str(),
        complete_task("completed", "trivial", r#"{"complexity": 0.2, "summary": "one-line fix"}"#),
    );
    llm.push(Role::Executor.as_str(), complete_task("completed", "did it", "applied the fix"));
    llm.push(Role::Reviewer.as_str(), complete_task("completed", "looks good", "approved"));

    let (engine, bus, _dir) = build_engine(llm).await;
    let roles = Arc::new(Mutex::new(Vec::new()));
    completed_roles(&bus, &roles);

    let outcome = engine
        .run_task(RunTaskOptions::root("t-simple".to_string(), "fix the typo".to_string()))
        .await;

    assert_eq!(outcome.status, TaskStatus::Completed);
    assert_eq!(
        roles.lock().unwrap().clone(),
        vec![Role::Analyzer, Role::Executor, Role::Reviewer],
        "planner should have been skipped entirely"
    );
}

/// B.1 — medium complexity routes through the planner's single-task spec,
/// and a reviewer `needs_review` verdict triggers exactly one executor
/// retry before the cycle completes.
#[tokio::test]
async fn medium_task_retries_once_after_needs_review() {
    let llm = Arc::new(FakeLlmClient::new());
    llm.push(
        Role::Analyzer.as_str(),
        complete_task("completed", "needs planning", r#"{"complexity": 0.6, "summary": "touches two modules"}"#),
    );
    llm.push(
        Role::Planner.as_str(),
        complete_task(
            "completed",
            "spec",
            r#"{"body": "wire the new field through", "file_scope": ["src/lib.rs"]}"#,
        ),
    );
    llm.push(Role::Executor.as_str(), complete_task("completed", "first pass", "added the field"));
    llm.push(
        Role::Reviewer.as_str(),
        complete_task_with("needs_review", "missing validation", "validation is missing", Some("add a bounds check")),
    );
    llm.push(Role::Executor.as_str(), complete_task("completed", "revised", "added the bounds check"));
    llm.push(Role::Reviewer.as_str(), complete_task("completed", "approved", "looks correct now"));

    let (engine, bus, _dir) = build_engine(llm).await;
    let types = Arc::new(Mutex::new(Vec::new()));
    event_types(&bus, &types);

    let outcome = engine
        .run_task(RunTaskOptions::root("t-medium".to_string(), "add a new config field".to_string()))
        .await;

    assert_eq!(outcome.status, TaskStatus::Completed);
    assert_eq!(types.lock().unwrap().iter().filter(|t| *t == "step:retry").count(), 1);
}

/// C.1 — a high-complexity decomposition with disjoint file scopes runs its
/// subtasks in parallel and completes on the first coordinator merge once
/// every subtask has finished.
#[tokio::test]
async fn complex_decomposition_runs_subtasks_in_parallel() {
    let llm = Arc::new(FakeLlmClient::new());
    llm.push(
        Role::Analyzer.as_str(),
        complete_task("completed", "needs split", r#"{"complexity": 0.9, "summary": "two independent pieces"}"#),
    );
    llm.push(
        Role::Planner.as_str(),
        complete_task(
            "completed",
            "decomposition",
            r#"{"subtasks": [
                {"description": "implement the parser", "file_scope": ["src/a.rs"], "skip_analysis": true},
                {"description": "implement the renderer", "file_scope": ["src/b.rs"], "skip_analysis": true}
            ], "parallel": true}"#,
        ),
    );
    for _ in 0..2 {
        llm.push(Role::Executor.as_str(), complete_task("completed", "done", "implemented"));
        llm.push(Role::Reviewer.as_str(), complete_task("completed", "ok", "approved"));
    }
    llm.push(Role::Coordinator.as_str(), complete_task("completed", "merged", "both pieces merged cleanly"));

    let (engine, bus, _dir) = build_engine(llm).await;
    let types = Arc::new(Mutex::new(Vec::new()));
    event_types(&bus, &types);

    let outcome = engine
        .run_task(RunTaskOptions::root("t-complex".to_string(), "build the parser and renderer".to_string()))
        .await;

    assert_eq!(outcome.status, TaskStatus::Completed);
    assert_eq!(types.lock().unwrap().iter().filter(|t| *t == "subtask:complete").count(), 2);
}

/// D.1 — a subtask exhausts its own executor/reviewer retries and comes
/// back `needs_review`; the steward's `retry_children` decision reruns just
/// that subtask, which succeeds the second time, and the next composite
/// cycle's coordinator merge completes the task.
#[tokio::test]
async fn steward_retry_children_recovers_a_failed_subtask() {
    let llm = Arc::new(FakeLlmClient::new());
    llm.push(
        Role::Analyzer.as_str(),
        complete_task("completed", "needs split", r#"{"complexity": 0.9, "summary": "one risky piece"}"#),
    );
    llm.push(
        Role::Planner.as_str(),
        complete_task(
            "completed",
            "decomposition",
            r#"{"subtasks": [{"description": "implement the tricky bit", "skip_analysis": true}], "parallel": false}"#,
        ),
    );
    // Subtask's own cycle exhausts all 3 attempts (max_retries = 2) stuck on needs_review.
    for _ in 0..3 {
        llm.push(Role::Executor.as_str(), complete_task("completed", "attempt", "tried it"));
        llm.push(
            Role::Reviewer.as_str(),
            complete_task_with("needs_review", "still broken", "edge case unhandled", Some("handle the empty-input case")),
        );
    }
    llm.push(Role::Coordinator.as_str(), complete_task("completed", "merge attempt 1", "one subtask unresolved"));
    llm.push(
        Role::Steward.as_str(),
        complete_task(
            "completed",
            "retry the subtask",
            r#"{"action": "retry_children", "indices": [0], "focus": "handle the empty-input case"}"#,
        ),
    );
    // The retried subtask's cycle succeeds on the first attempt.
    llm.push(Role::Executor.as_str(), complete_task("completed", "fixed", "handled the empty-input case"));
    llm.push(Role::Reviewer.as_str(), complete_task("completed", "approved", "edge case covered now"));
    llm.push(Role::Coordinator.as_str(), complete_task("completed", "merge attempt 2", "both pieces merged cleanly"));

    let (engine, bus, _dir) = build_engine(llm).await;
    let types = Arc::new(Mutex::new(Vec::new()));
    event_types(&bus, &types);

    let outcome = engine
        .run_task(RunTaskOptions::root("t-recover".to_string(), "build the tricky feature".to_string()))
        .await;

    assert_eq!(outcome.status, TaskStatus::Completed);
    let seen = types.lock().unwrap().clone();
    assert_eq!(seen.iter().filter(|t| *t == "composite_cycle:start").count(), 2);
}

/// F.1 — an executor that repeats the same tool call three turns running
/// is declared stuck and handed back to the reviewer as `needs_review`
/// rather than looping forever; the reviewer can still complete the cycle.
#[tokio::test]
async fn repeated_identical_tool_calls_are_detected_as_stuck() {
    let llm = Arc::new(FakeLlmClient::new());
    llm.push(
        Role::Analyzer.as_str(),
        complete_task("completed", "trivial", r#"{"complexity": 0.1, "summary": "tiny"}"#),
    );
    for _ in 0..3 {
        llm.push(
            Role::Executor.as_str(),
            tool_call("read_file", serde_json::json!({"path": "does-not-exist.rs"})),
        );
    }
    llm.push(Role::Reviewer.as_str(), complete_task("completed", "fine as-is", "no changes needed"));

    let (engine, bus, _dir) = build_engine(llm).await;
    let types = Arc::new(Mutex::new(Vec::new()));
    event_types(&bus, &types);

    let outcome = engine
        .run_task(RunTaskOptions::root("t-stuck".to_string(), "look into something".to_string()))
        .await;

    // The executor never completes, but the reviewer does, so the cycle
    // still finishes instead of exhausting retries.
    assert_eq!(outcome.status, TaskStatus::Completed);
    assert!(outcome
        .artifacts
        .iter()
        .any(|a| a.content.contains("stuck in a loop")));
}

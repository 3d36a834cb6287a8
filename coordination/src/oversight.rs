//! Passive event-bus observer that derives "the agent may be stuck"
//! signals, used to trigger lightweight mid-workflow steward nudges.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::events::{EventPayload, WorkflowEvent};
use crate::task::AgentStatus;

const DEFAULT_REPEATED_TOOL_COUNT: usize = 3;
const DEFAULT_LONG_STEP_SECONDS: u64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    RepeatedSameTool,
    LongStepDurationMs,
    StepFailedOrNeedsReview,
}

#[derive(Debug, Default)]
struct StepState {
    tool_names: Vec<String>,
    started_at: Option<DateTime<Utc>>,
    status: Option<String>,
}

pub struct OversightTracker {
    repeated_tool_count: usize,
    long_step_threshold: Duration,
    steps: Mutex<HashMap<String, StepState>>,
    agent_to_step: Mutex<HashMap<String, String>>,
    signals: Mutex<HashMap<String, Vec<Signal>>>,
    last_nudge_outcomes: Mutex<Vec<(String, String)>>,
}

impl OversightTracker {
    pub fn new() -> Self {
        Self::with_thresholds(DEFAULT_REPEATED_TOOL_COUNT, DEFAULT_LONG_STEP_SECONDS)
    }

    pub fn with_thresholds(repeated_tool_count: usize, long_step_seconds: u64) -> Self {
        Self {
            repeated_tool_count,
            long_step_threshold: Duration::from_secs(long_step_seconds),
            steps: Mutex::new(HashMap::new()),
            agent_to_step: Mutex::new(HashMap::new()),
            signals: Mutex::new(HashMap::new()),
            last_nudge_outcomes: Mutex::new(Vec::new()),
        }
    }

    /// Register the subscriber closure with an [`EventBus`](crate::events::EventBus).
    pub fn observe(&self, event: &WorkflowEvent) {
        match &event.payload {
            EventPayload::AgentSpawn { agent_id, .. } => {
                self.agent_to_step
                    .lock()
                    .unwrap()
                    .insert(agent_id.clone(), event.task_id.clone());
                self.steps
                    .lock()
                    .unwrap()
                    .entry(event.task_id.clone())
                    .or_insert_with(|| StepState {
                        tool_names: Vec::new(),
                        started_at: Some(event.timestamp),
                        status: None,
                    });
            }
            EventPayload::AgentToolCall {
                agent_id,
                tool_name,
                ..
            } => {
                let step_id = self
                    .agent_to_step
                    .lock()
                    .unwrap()
                    .get(agent_id)
                    .cloned();
                if let Some(step_id) = step_id {
                    self.steps
                        .lock()
                        .unwrap()
                        .entry(step_id)
                        .or_default()
                        .tool_names
                        .push(tool_name.clone());
                }
            }
            EventPayload::StepComplete { status, .. } => {
                let mut steps = self.steps.lock().unwrap();
                if let Some(state) = steps.get_mut(&event.task_id) {
                    state.status = Some(status.clone());
                }
                drop(steps);
                self.derive_signals(&event.task_id, event.timestamp);
            }
            _ => {}
        }
    }

    fn derive_signals(&self, step_id: &str, now: DateTime<Utc>) {
        let steps = self.steps.lock().unwrap();
        let Some(state) = steps.get(step_id) else {
            return;
        };

        let mut derived = Vec::new();

        if state.tool_names.len() >= self.repeated_tool_count {
            let tail = &state.tool_names[state.tool_names.len() - self.repeated_tool_count..];
            if tail.windows(2).all(|w| w[0] == w[1]) {
                derived.push(Signal::RepeatedSameTool);
            }
        }

        if let Some(started) = state.started_at {
            let elapsed = (now - started).to_std().unwrap_or(Duration::ZERO);
            if elapsed >= self.long_step_threshold {
                derived.push(Signal::LongStepDurationMs);
            }
        }

        if let Some(status) = &state.status {
            if status != AgentStatus::Completed.to_string().as_str() {
                derived.push(Signal::StepFailedOrNeedsReview);
            }
        }

        drop(steps);
        if !derived.is_empty() {
            self.signals
                .lock()
                .unwrap()
                .insert(step_id.to_string(), derived);
        }
    }

    /// Consume and clear the current signal set for `step_id`, if any.
    pub fn check_in(&self, step_id: &str) -> Vec<Signal> {
        self.signals
            .lock()
            .unwrap()
            .remove(step_id)
            .unwrap_or_default()
    }

    pub fn record_nudge_outcome(&self, nudge: String, child_status: String) {
        self.last_nudge_outcomes
            .lock()
            .unwrap()
            .push((nudge, child_status));
    }

    pub fn last_nudge_outcomes(&self) -> Vec<(String, String)> {
        self.last_nudge_outcomes.lock().unwrap().clone()
    }
}

impl Default for OversightTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Role;

    fn spawn_event(task_id: &str, agent_id: &str) -> WorkflowEvent {
        WorkflowEvent::new(
            task_id,
            EventPayload::AgentSpawn {
                agent_id: agent_id.to_string(),
                role: Role::Executor,
            },
        )
    }

    fn tool_call_event(task_id: &str, agent_id: &str, tool: &str) -> WorkflowEvent {
        WorkflowEvent::new(
            task_id,
            EventPayload::AgentToolCall {
                agent_id: agent_id.to_string(),
                tool_name: tool.to_string(),
                arguments: serde_json::json!({}),
            },
        )
    }

    #[test]
    fn repeated_tool_signal_after_three_same_calls() {
        let tracker = OversightTracker::new();
        tracker.observe(&spawn_event("step-1", "agent-1"));
        for _ in 0..3 {
            tracker.observe(&tool_call_event("step-1", "agent-1", "read_file"));
        }
        tracker.observe(&WorkflowEvent::new(
            "step-1",
            EventPayload::StepComplete {
                role: Role::Executor,
                status: "completed".into(),
            },
        ));

        let signals = tracker.check_in("step-1");
        assert!(signals.contains(&Signal::RepeatedSameTool));
    }

    #[test]
    fn signals_are_cleared_after_check_in() {
        let tracker = OversightTracker::new();
        tracker.observe(&spawn_event("step-1", "agent-1"));
        for _ in 0..3 {
            tracker.observe(&tool_call_event("step-1", "agent-1", "read_file"));
        }
        tracker.observe(&WorkflowEvent::new(
            "step-1",
            EventPayload::StepComplete {
                role: Role::Executor,
                status: "completed".into(),
            },
        ));

        assert!(!tracker.check_in("step-1").is_empty());
        assert!(tracker.check_in("step-1").is_empty());
    }

    #[test]
    fn needs_review_status_produces_failed_or_needs_review_signal() {
        let tracker = OversightTracker::new();
        tracker.observe(&spawn_event("step-1", "agent-1"));
        tracker.observe(&WorkflowEvent::new(
            "step-1",
            EventPayload::StepComplete {
                role: Role::Executor,
                status: "needs_review".into(),
            },
        ));

        let signals = tracker.check_in("step-1");
        assert!(signals.contains(&Signal::StepFailedOrNeedsReview));
    }
}

//! Parses the planner role's `complete_task` payload into [`PlannerOutput`].
//!
//! The payload shape (not a discriminant field) decides spec vs.
//! decomposition: a non-empty `subtasks` array means decomposition,
//! `body` means a single-task spec. Total: anything else — malformed
//! JSON, an empty `subtasks` list, neither shape present — falls back to
//! a spec whose body is the raw content and whose criteria/scope lists
//! are empty, per the planner's own totality contract.

use super::strip_code_fence;
use crate::task::{Decomposition, PlannerOutput, Spec, SubtaskDef};

pub fn parse(raw: &str) -> PlannerOutput {
    let stripped = strip_code_fence(raw);
    let Ok(value) = serde_json::from_str::<serde_json::Value>(stripped) else {
        return fallback_spec(raw);
    };

    if let Some(subtasks_value) = value.get("subtasks").and_then(|v| v.as_array()) {
        if !subtasks_value.is_empty() {
            let subtasks: Vec<SubtaskDef> = subtasks_value
                .iter()
                .filter_map(|v| serde_json::from_value(v.clone()).ok())
                .collect();
            if !subtasks.is_empty() {
                let parallel = value
                    .get("parallel")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                let setup_task = value
                    .get("setup_task")
                    .or_else(|| value.get("setupTask"))
                    .and_then(|v| serde_json::from_value(v.clone()).ok());
                let acceptance_criteria = string_array(&value, "acceptance_criteria")
                    .or_else(|| string_array(&value, "acceptanceCriteria"))
                    .unwrap_or_default();
                return PlannerOutput::Decomposition(Decomposition {
                    subtasks,
                    parallel,
                    setup_task,
                    acceptance_criteria,
                });
            }
        }
    }

    if let Some(body) = value.get("body").and_then(|v| v.as_str()) {
        let acceptance_criteria = string_array(&value, "acceptance_criteria")
            .or_else(|| string_array(&value, "acceptanceCriteria"))
            .unwrap_or_default();
        let expected_files = string_array(&value, "expected_files")
            .or_else(|| string_array(&value, "expectedFiles"))
            .unwrap_or_default();
        let file_scope = string_array(&value, "file_scope")
            .or_else(|| string_array(&value, "fileScope"))
            .unwrap_or_default();
        return PlannerOutput::Spec(Spec {
            body: body.to_string(),
            acceptance_criteria,
            expected_files,
            file_scope,
        });
    }

    fallback_spec(raw)
}

fn string_array(value: &serde_json::Value, key: &str) -> Option<Vec<String>> {
    value.get(key).and_then(|v| v.as_array()).map(|arr| {
        arr.iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect()
    })
}

fn fallback_spec(raw: &str) -> PlannerOutput {
    PlannerOutput::Spec(Spec {
        body: raw.to_string(),
        acceptance_criteria: Vec::new(),
        expected_files: Vec::new(),
        file_scope: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_task_spec() {
        let raw = r#"{"body": "implement X", "acceptance_criteria": ["compiles"]}"#;
        match parse(raw) {
            PlannerOutput::Spec(s) => {
                assert_eq!(s.body, "implement X");
                assert_eq!(s.acceptance_criteria, vec!["compiles".to_string()]);
            }
            PlannerOutput::Decomposition(_) => panic!("expected spec"),
        }
    }

    #[test]
    fn parses_decomposition() {
        let raw = r#"{"subtasks": [{"description": "part 1"}, {"description": "part 2"}], "parallel": true}"#;
        match parse(raw) {
            PlannerOutput::Decomposition(d) => {
                assert_eq!(d.subtasks.len(), 2);
                assert!(d.parallel);
            }
            PlannerOutput::Spec(_) => panic!("expected decomposition"),
        }
    }

    #[test]
    fn missing_parallel_defaults_to_false() {
        let raw = r#"{"subtasks": [{"description": "part 1"}]}"#;
        match parse(raw) {
            PlannerOutput::Decomposition(d) => assert!(!d.parallel),
            PlannerOutput::Spec(_) => panic!("expected decomposition"),
        }
    }

    #[test]
    fn empty_subtasks_falls_back_to_spec() {
        let raw = r#"{"subtasks": []}"#;
        match parse(raw) {
            PlannerOutput::Spec(s) => assert_eq!(s.body, raw),
            PlannerOutput::Decomposition(_) => panic!("expected fallback spec"),
        }
    }

    #[test]
    fn malformed_payload_falls_back_to_raw_body_spec() {
        let raw = "this is not json";
        match parse(raw) {
            PlannerOutput::Spec(s) => {
                assert_eq!(s.body, raw);
                assert!(s.acceptance_criteria.is_empty());
            }
            PlannerOutput::Decomposition(_) => panic!("expected fallback spec"),
        }
    }
}

//! Parses the steward role's recovery decision.
//!
//! Unlike the analyzer/planner parsers, failure here is not exceptional —
//! an unparseable or unrecognized payload simply means "escalate", encoded
//! as `None`. The caller treats `None` the same as an explicit `Escalate`.

use super::strip_code_fence;
use crate::task::StewardAction;

pub fn parse(raw: &str) -> Option<StewardAction> {
    let stripped = strip_code_fence(raw);
    serde_json::from_str(stripped).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_retry_children() {
        let raw = r#"{"action": "retry_children", "indices": [0, 2], "focus": "fix the tests"}"#;
        match parse(raw) {
            Some(StewardAction::RetryChildren { indices, focus }) => {
                assert_eq!(indices, vec![0, 2]);
                assert_eq!(focus, "fix the tests");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_retry_children_camel_case_aliases() {
        let raw = r#"{"action": "retry_children", "taskIndices": [1], "retryFocus": "Fix Y"}"#;
        match parse(raw) {
            Some(StewardAction::RetryChildren { indices, focus }) => {
                assert_eq!(indices, vec![1]);
                assert_eq!(focus, "Fix Y");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_escalate() {
        let raw = r#"{"action": "escalate"}"#;
        assert_eq!(parse(raw), Some(StewardAction::Escalate));
    }

    #[test]
    fn unrecognized_payload_escalates_via_none() {
        assert_eq!(parse("not json"), None);
        assert_eq!(parse(r#"{"action": "do_a_backflip"}"#), None);
    }
}

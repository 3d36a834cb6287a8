//! Parses the root-only oracle's recovery decision. Same escalate-on-`None`
//! contract as [`super::steward`].

use super::strip_code_fence;
use crate::task::OracleAction;

pub fn parse(raw: &str) -> Option<OracleAction> {
    let stripped = strip_code_fence(raw);
    serde_json::from_str(stripped).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nudge_root_steward() {
        let raw = r#"{"action": "nudge_root_steward", "message": "look at subtask 2 again"}"#;
        match parse(raw) {
            Some(OracleAction::NudgeRootSteward { message }) => {
                assert_eq!(message, "look at subtask 2 again");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_escalate_to_user() {
        let raw = r#"{"action": "escalate_to_user"}"#;
        assert_eq!(parse(raw), Some(OracleAction::EscalateToUser));
    }

    #[test]
    fn malformed_payload_escalates_via_none() {
        assert_eq!(parse("{garbage"), None);
    }
}

//! Output parsers: pure, total functions turning a `complete_task` payload
//! string into a typed record.
//!
//! Every parser here tolerates a payload wrapped in a Markdown code fence
//! (agents routinely emit ```json ... ``` even when told not to). Analyzer
//! and planner parsing is fully total — malformed input falls back to a
//! safe default rather than erroring, because a broken analyzer payload
//! should not abort a run. Steward/oracle parsing folds any failure into
//! `None` ("escalate") per their own contract instead.

pub mod analyzer;
pub mod oracle;
pub mod planner;
pub mod steward;

/// Strip a single Markdown code fence wrapping the payload, if present.
/// Tolerates an optional language tag (```json) and surrounding whitespace.
/// Payloads without a fence pass through unchanged.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let after_open = after_open
        .strip_prefix("json")
        .unwrap_or(after_open)
        .trim_start_matches(['\r', '\n']);
    match after_open.rfind("```") {
        Some(close_idx) => after_open[..close_idx].trim(),
        None => after_open.trim(),
    }
}

/// Map a raw JSON complexity value to [0,1]. Strings "simple"/"medium"/
/// "complex" map to 0.25/0.5/0.85; numeric values outside [0,1], or any
/// other shape, fall back to 0.5.
pub fn normalize_complexity(value: Option<&serde_json::Value>) -> f64 {
    match value {
        Some(serde_json::Value::String(s)) => match s.as_str() {
            "simple" => 0.25,
            "medium" => 0.5,
            "complex" => 0.85,
            _ => 0.5,
        },
        Some(serde_json::Value::Number(n)) => n
            .as_f64()
            .filter(|v| (0.0..=1.0).contains(v))
            .unwrap_or(0.5),
        _ => 0.5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_fenced_payload_with_language_tag() {
        let raw = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fence(raw), "{\"a\": 1}");
    }

    #[test]
    fn strips_fenced_payload_without_language_tag() {
        let raw = "```\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fence(raw), "{\"a\": 1}");
    }

    #[test]
    fn passes_through_unfenced_payload() {
        let raw = "{\"a\": 1}";
        assert_eq!(strip_code_fence(raw), "{\"a\": 1}");
    }

    #[test]
    fn complexity_words_map_to_fixed_points() {
        assert_eq!(normalize_complexity(Some(&json!("simple"))), 0.25);
        assert_eq!(normalize_complexity(Some(&json!("medium"))), 0.5);
        assert_eq!(normalize_complexity(Some(&json!("complex"))), 0.85);
    }

    #[test]
    fn out_of_range_or_missing_complexity_falls_back_to_half() {
        assert_eq!(normalize_complexity(Some(&json!(1.5))), 0.5);
        assert_eq!(normalize_complexity(Some(&json!(-0.2))), 0.5);
        assert_eq!(normalize_complexity(None), 0.5);
        assert_eq!(normalize_complexity(Some(&json!("unknown"))), 0.5);
    }

    #[test]
    fn in_range_numeric_complexity_passes_through() {
        assert_eq!(normalize_complexity(Some(&json!(0.42))), 0.42);
    }
}

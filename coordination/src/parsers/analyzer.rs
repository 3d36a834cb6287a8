//! Parses the analyzer role's `complete_task` payload into [`AnalyzerOutput`].
//!
//! Total: malformed or non-JSON input never errors, it falls back to
//! complexity 0.5 and a summary sliced from the raw content.

use super::{normalize_complexity, strip_code_fence};
use crate::task::AnalyzerOutput;

const FALLBACK_SUMMARY_LEN: usize = 200;

pub fn parse(raw: &str) -> AnalyzerOutput {
    let stripped = strip_code_fence(raw);
    let Ok(value) = serde_json::from_str::<serde_json::Value>(stripped) else {
        return fallback(raw);
    };

    let complexity = normalize_complexity(value.get("complexity"));
    let summary = value
        .get("summary")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| fallback_summary(raw));
    let affected_files = value
        .get("affected_files")
        .or_else(|| value.get("affectedFiles"))
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    let recommended_approach = value
        .get("recommended_approach")
        .or_else(|| value.get("recommendedApproach"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_default();

    AnalyzerOutput {
        complexity,
        summary,
        affected_files,
        recommended_approach,
    }
}

fn fallback(raw: &str) -> AnalyzerOutput {
    AnalyzerOutput {
        complexity: 0.5,
        summary: fallback_summary(raw),
        affected_files: Vec::new(),
        recommended_approach: String::new(),
    }
}

fn fallback_summary(raw: &str) -> String {
    raw.chars().take(FALLBACK_SUMMARY_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_payload() {
        let raw = r#"{"complexity": 0.3, "summary": "small fix"}"#;
        let out = parse(raw);
        assert_eq!(out.complexity, 0.3);
        assert_eq!(out.summary, "small fix");
        assert!(out.affected_files.is_empty());
    }

    #[test]
    fn parses_fenced_payload_with_camel_case_optional_fields() {
        let raw = "```json\n{\"complexity\": 0.8, \"summary\": \"big\", \"affectedFiles\": [\"a.rs\"], \"recommendedApproach\": \"decompose\"}\n```";
        let out = parse(raw);
        assert_eq!(out.affected_files, vec!["a.rs".to_string()]);
        assert_eq!(out.recommended_approach, "decompose");
    }

    #[test]
    fn word_complexity_maps_to_fixed_point() {
        let raw = r#"{"complexity": "complex", "summary": "x"}"#;
        assert_eq!(parse(raw).complexity, 0.85);
    }

    #[test]
    fn malformed_json_falls_back_instead_of_erroring() {
        let raw = "not json at all";
        let out = parse(raw);
        assert_eq!(out.complexity, 0.5);
        assert_eq!(out.summary, "not json at all");
    }

    #[test]
    fn missing_summary_falls_back_to_content_slice() {
        let raw = r#"{"complexity": 0.6}"#;
        let out = parse(raw);
        assert_eq!(out.complexity, 0.6);
        assert_eq!(out.summary, raw);
    }
}

//! Output truncation shared by every tool whose result may be large.

pub const GENERAL_CAP: usize = 30_000;
pub const SEARCH_CAP: usize = 20_000;
pub const LISTING_CAP: usize = 12_000;
pub const DIFF_CAP: usize = 12_000;
pub const TEST_OUTPUT_CAP: usize = 3_000;

/// Truncate `text` to `cap` characters, keeping the tail: if it exceeds the
/// cap, the result is the last `cap` characters with no marker. Used for
/// test-output-style caps where only the trailing context matters.
pub fn truncate_tail(text: &str, cap: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= cap {
        return text.to_string();
    }
    chars[chars.len() - cap..].iter().collect()
}

/// Truncate `text` to `cap` characters by keeping a prefix and suffix
/// separated by a `[... truncated N characters ...]` marker.
pub fn truncate_middle(text: &str, cap: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= cap {
        return text.to_string();
    }

    let truncated_count = chars.len() - cap;
    let half = cap / 2;
    let prefix: String = chars[..half].iter().collect();
    let suffix: String = chars[chars.len() - (cap - half)..].iter().collect();
    format!("{prefix}[… truncated {truncated_count} characters …]{suffix}")
}

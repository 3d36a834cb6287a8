//! `search_in_files`: regex (falling back to literal) search across the
//! working directory.

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;

use super::context::{ToolContext, ToolResult};
use super::fs_tools::SKIPPED_DIR_NAMES;
use super::path_safety::resolve;
use super::registry::Tool;
use super::truncate::{truncate_middle, SEARCH_CAP};

const MAX_FILES_VISITED: usize = 300;
const DEFAULT_MAX_RESULTS: usize = 150;
const MAX_MAX_RESULTS: usize = 500;

pub struct SearchInFilesTool;

#[derive(Deserialize)]
struct SearchArgs {
    pattern: String,
    path: Option<String>,
    glob: Option<String>,
    #[serde(rename = "maxResults")]
    max_results: Option<usize>,
}

#[async_trait]
impl Tool for SearchInFilesTool {
    fn name(&self) -> &'static str {
        "search_in_files"
    }

    fn description(&self) -> &'static str {
        "Search files under a path for a regex (or literal) pattern, optionally filtered by glob."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": {"type": "string"},
                "path": {"type": "string"},
                "glob": {"type": "string"},
                "maxResults": {"type": "integer", "maximum": 500},
            },
            "required": ["pattern"],
        })
    }

    async fn execute(&self, arguments: serde_json::Value, ctx: &ToolContext) -> ToolResult {
        let args: SearchArgs = match serde_json::from_value(arguments) {
            Ok(a) => a,
            Err(e) => return ToolResult::error(format!("invalid arguments: {e}")),
        };

        if args.pattern.is_empty() {
            return ToolResult::error("pattern must not be empty");
        }

        let relative_root = args.path.unwrap_or_else(|| ".".to_string());
        let root = match resolve(&ctx.working_directory, &relative_root) {
            Ok(p) => p,
            Err(e) => return ToolResult::error(format!("path rejected: {e}")),
        };

        let regex = Regex::new(&args.pattern)
            .unwrap_or_else(|_| Regex::new(&regex::escape(&args.pattern)).expect("escaped literal is always valid"));

        let glob_regex = args.glob.as_ref().map(|g| {
            let translated = g.replace('.', "\\.").replace('*', ".*").replace('?', ".");
            Regex::new(&format!("^{translated}$")).unwrap_or_else(|_| Regex::new(".*").unwrap())
        });

        let max_results = args
            .max_results
            .unwrap_or(DEFAULT_MAX_RESULTS)
            .min(MAX_MAX_RESULTS);

        let mut out_lines = Vec::new();
        let mut files_visited = 0usize;
        if let Err(e) = walk_and_search(
            &root,
            &ctx.working_directory,
            &regex,
            glob_regex.as_ref(),
            max_results,
            &mut files_visited,
            &mut out_lines,
        )
        .await
        {
            return ToolResult::error(format!("search failed: {e}"));
        }

        ToolResult::ok(truncate_middle(&out_lines.join("\n"), SEARCH_CAP))
    }
}

async fn walk_and_search(
    dir: &std::path::Path,
    root: &std::path::Path,
    pattern: &Regex,
    glob: Option<&Regex>,
    max_results: usize,
    files_visited: &mut usize,
    out_lines: &mut Vec<String>,
) -> std::io::Result<()> {
    if out_lines.len() >= max_results || *files_visited >= MAX_FILES_VISITED {
        return Ok(());
    }

    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let mut entries = tokio::fs::read_dir(&current).await?;
        while let Some(entry) = entries.next_entry().await? {
            if out_lines.len() >= max_results || *files_visited >= MAX_FILES_VISITED {
                return Ok(());
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if SKIPPED_DIR_NAMES.contains(&name.as_str()) {
                continue;
            }
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                stack.push(path);
                continue;
            }

            if let Some(glob) = glob {
                if !glob.is_match(&name) {
                    continue;
                }
            }

            *files_visited += 1;
            let Ok(content) = tokio::fs::read_to_string(&path).await else {
                continue;
            };
            let relative = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .to_string_lossy()
                .to_string();

            for (line_no, line) in content.lines().enumerate() {
                if pattern.is_match(line) {
                    out_lines.push(format!("{relative}:{}:{line}", line_no + 1));
                    if out_lines.len() >= max_results {
                        return Ok(());
                    }
                }
            }
        }
    }
    Ok(())
}

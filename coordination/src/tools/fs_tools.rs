//! `read_file`, `read_files`, `write_file`, `list_directory`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::context::{ToolContext, ToolResult};
use super::path_safety::resolve;
use super::registry::Tool;
use super::truncate::{truncate_middle, GENERAL_CAP, LISTING_CAP};

pub(crate) const SKIPPED_DIR_NAMES: &[&str] =
    &["node_modules", ".git", ".next", "dist", "build", ".babylon"];

pub struct ReadFileTool;

#[derive(Deserialize)]
struct ReadFileArgs {
    path: String,
    #[serde(rename = "startLine")]
    start_line: Option<usize>,
    #[serde(rename = "endLine")]
    end_line: Option<usize>,
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &'static str {
        "read_file"
    }

    fn description(&self) -> &'static str {
        "Read a UTF-8 text file, optionally sliced to a 1-based inclusive line range."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "startLine": {"type": "integer"},
                "endLine": {"type": "integer"},
            },
            "required": ["path"],
        })
    }

    async fn execute(&self, arguments: serde_json::Value, ctx: &ToolContext) -> ToolResult {
        let args: ReadFileArgs = match serde_json::from_value(arguments) {
            Ok(a) => a,
            Err(e) => return ToolResult::error(format!("invalid arguments: {e}")),
        };

        let resolved = match resolve(&ctx.working_directory, &args.path) {
            Ok(p) => p,
            Err(e) => return ToolResult::error(format!("path rejected: {e}")),
        };

        let content = match tokio::fs::read_to_string(&resolved).await {
            Ok(c) => c,
            Err(e) => return ToolResult::error(format!("failed to read {}: {e}", args.path)),
        };

        match (args.start_line, args.end_line) {
            (None, None) => ToolResult::ok(truncate_middle(&content, GENERAL_CAP)),
            (start, end) => {
                let lines: Vec<&str> = content.lines().collect();
                let start = start.unwrap_or(1).max(1);
                let end = end.unwrap_or(lines.len()).min(lines.len());
                if start > end || start > lines.len() {
                    return ToolResult::ok(format!("[Lines {start}-{end}]\n"));
                }
                let slice = lines[start - 1..end].join("\n");
                ToolResult::ok(format!(
                    "[Lines {start}-{end}]\n{}",
                    truncate_middle(&slice, GENERAL_CAP)
                ))
            }
        }
    }
}

pub struct ReadFilesTool;

#[derive(Deserialize)]
struct ReadFilesArgs {
    paths: Vec<String>,
}

const PER_FILE_CAP: usize = 8_000;
const GLOBAL_CAP: usize = 25_000;

#[async_trait]
impl Tool for ReadFilesTool {
    fn name(&self) -> &'static str {
        "read_files"
    }

    fn description(&self) -> &'static str {
        "Read up to 10 files at once, each capped at 8,000 characters."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "paths": {"type": "array", "items": {"type": "string"}, "minItems": 1, "maxItems": 10},
            },
            "required": ["paths"],
        })
    }

    async fn execute(&self, arguments: serde_json::Value, ctx: &ToolContext) -> ToolResult {
        let args: ReadFilesArgs = match serde_json::from_value(arguments) {
            Ok(a) => a,
            Err(e) => return ToolResult::error(format!("invalid arguments: {e}")),
        };

        if args.paths.is_empty() || args.paths.len() > 10 {
            return ToolResult::error("paths must contain between 1 and 10 entries");
        }

        let mut out = String::new();
        for path in &args.paths {
            let block = match resolve(&ctx.working_directory, path) {
                Err(e) => format!("--- {path} ---\n[error: {e}]\n"),
                Ok(resolved) => match tokio::fs::read_to_string(&resolved).await {
                    Ok(content) => {
                        format!("--- {path} ---\n{}\n", truncate_middle(&content, PER_FILE_CAP))
                    }
                    Err(e) => format!("--- {path} ---\n[error: {e}]\n"),
                },
            };
            if out.len() + block.len() > GLOBAL_CAP {
                out.push_str(&truncate_middle(&block, GLOBAL_CAP.saturating_sub(out.len())));
                break;
            }
            out.push_str(&block);
        }

        ToolResult::ok(out)
    }
}

pub struct WriteFileTool;

#[derive(Deserialize)]
struct WriteFileArgs {
    path: String,
    content: String,
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &'static str {
        "write_file"
    }

    fn description(&self) -> &'static str {
        "Overwrite or create a file. Writes outside the assigned file scope are allowed but logged."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "content": {"type": "string"},
            },
            "required": ["path", "content"],
        })
    }

    async fn execute(&self, arguments: serde_json::Value, ctx: &ToolContext) -> ToolResult {
        let args: WriteFileArgs = match serde_json::from_value(arguments) {
            Ok(a) => a,
            Err(e) => return ToolResult::error(format!("invalid arguments: {e}")),
        };

        let resolved = match resolve(&ctx.working_directory, &args.path) {
            Ok(p) => p,
            Err(e) => return ToolResult::error(format!("path rejected: {e}")),
        };

        if let Some(scope) = &ctx.file_scope {
            if !scope.is_empty() && !path_in_scope(&args.path, scope) {
                warn!(
                    task_id = %ctx.task_id,
                    agent_id = %ctx.agent_id,
                    path = %args.path,
                    "write_file: path outside assigned file scope, allowing anyway"
                );
            }
        }

        if let Some(parent) = resolved.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return ToolResult::error(format!("failed to create parent directories: {e}"));
            }
        }

        match tokio::fs::write(&resolved, &args.content).await {
            Ok(()) => ToolResult::ok(format!("wrote {} bytes to {}", args.content.len(), args.path)),
            Err(e) => ToolResult::error(format!("failed to write {}: {e}", args.path)),
        }
    }
}

fn path_in_scope(path: &str, scope: &[String]) -> bool {
    scope.iter().any(|prefix| path.starts_with(prefix.as_str()))
}

pub struct ListDirectoryTool;

#[derive(Deserialize)]
struct ListDirectoryArgs {
    path: Option<String>,
    #[serde(rename = "maxDepth")]
    max_depth: Option<usize>,
}

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &'static str {
        "list_directory"
    }

    fn description(&self) -> &'static str {
        "List directory entries, optionally recursively up to maxDepth (1..5)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "maxDepth": {"type": "integer", "minimum": 1, "maximum": 5},
            },
            "required": [],
        })
    }

    async fn execute(&self, arguments: serde_json::Value, ctx: &ToolContext) -> ToolResult {
        let args: ListDirectoryArgs = match serde_json::from_value(arguments) {
            Ok(a) => a,
            Err(e) => return ToolResult::error(format!("invalid arguments: {e}")),
        };

        let relative_path = args.path.unwrap_or_else(|| ".".to_string());
        let resolved = match resolve(&ctx.working_directory, &relative_path) {
            Ok(p) => p,
            Err(e) => return ToolResult::error(format!("path rejected: {e}")),
        };

        let max_depth = args.max_depth.unwrap_or(1).clamp(1, 5);
        let mut lines = Vec::new();
        if let Err(e) = walk(&resolved, 0, max_depth, &mut lines).await {
            return ToolResult::error(format!("failed to list {relative_path}: {e}"));
        }

        ToolResult::ok(truncate_middle(&lines.join("\n"), LISTING_CAP))
    }
}

fn walk<'a>(
    dir: &'a std::path::Path,
    depth: usize,
    max_depth: usize,
    lines: &'a mut Vec<String>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + 'a>> {
    Box::pin(async move {
        let mut entries = tokio::fs::read_dir(dir).await?;
        let indent = "  ".repeat(depth);
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if SKIPPED_DIR_NAMES.contains(&name.as_str()) {
                continue;
            }
            names.push((name, entry.file_type().await?.is_dir()));
        }
        names.sort();

        for (name, is_dir) in names {
            let prefix = if is_dir { "d" } else { "f" };
            lines.push(format!("{indent}{prefix} {name}"));
            if is_dir && depth + 1 < max_depth {
                walk(&dir.join(&name), depth + 1, max_depth, lines).await?;
            }
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::CancellationHandle;
    use tempfile::tempdir;

    fn ctx(root: std::path::PathBuf) -> ToolContext {
        ToolContext {
            task_id: "t1".into(),
            agent_id: "a1".into(),
            working_directory: root,
            file_scope: None,
            cancellation: CancellationHandle::new(),
            cli_enabled: true,
        }
    }

    #[tokio::test]
    async fn read_file_round_trips_full_content() {
        let dir = tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.txt"), "hello\nworld\n")
            .await
            .unwrap();

        let tool = ReadFileTool;
        let result = tool
            .execute(json!({"path": "a.txt"}), &ctx(dir.path().to_path_buf()))
            .await;
        assert!(!result.is_error);
        assert_eq!(result.content, "hello\nworld\n");
    }

    #[tokio::test]
    async fn read_file_honors_line_range() {
        let dir = tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.txt"), "one\ntwo\nthree\n")
            .await
            .unwrap();

        let tool = ReadFileTool;
        let result = tool
            .execute(
                json!({"path": "a.txt", "startLine": 2, "endLine": 3}),
                &ctx(dir.path().to_path_buf()),
            )
            .await;
        assert!(result.content.starts_with("[Lines 2-3]"));
        assert!(result.content.contains("two\nthree"));
    }

    #[tokio::test]
    async fn read_file_rejects_escaping_path() {
        let dir = tempdir().unwrap();
        let tool = ReadFileTool;
        let result = tool
            .execute(
                json!({"path": "../outside.txt"}),
                &ctx(dir.path().to_path_buf()),
            )
            .await;
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn write_file_allows_out_of_scope_with_warning() {
        let dir = tempdir().unwrap();
        let mut c = ctx(dir.path().to_path_buf());
        c.file_scope = Some(vec!["src/".to_string()]);

        let tool = WriteFileTool;
        let result = tool
            .execute(
                json!({"path": "other/file.rs", "content": "fn main() {}"}),
                &c,
            )
            .await;
        assert!(!result.is_error);
        assert!(dir.path().join("other/file.rs").exists());
    }

    #[tokio::test]
    async fn list_directory_skips_reserved_names() {
        let dir = tempdir().unwrap();
        tokio::fs::create_dir(dir.path().join("node_modules"))
            .await
            .unwrap();
        tokio::fs::create_dir(dir.path().join("src")).await.unwrap();

        let tool = ListDirectoryTool;
        let result = tool
            .execute(json!({}), &ctx(dir.path().to_path_buf()))
            .await;
        assert!(!result.content.contains("node_modules"));
        assert!(result.content.contains("d src"));
    }
}

//! `review_workspace`: one-shot snapshot of git status, diff, and test
//! output, assembled into Markdown-titled sections for the reviewer.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::process::Command;
use tokio::time::timeout;

use super::context::{ToolContext, ToolResult};
use super::registry::Tool;
use super::truncate::{truncate_middle, truncate_tail, DIFF_CAP, TEST_OUTPUT_CAP};

const TEST_TIMEOUT: Duration = Duration::from_secs(45);

pub struct ReviewWorkspaceTool;

#[derive(Deserialize)]
struct ReviewWorkspaceArgs {
    #[serde(rename = "testCommand")]
    test_command: Option<String>,
}

#[async_trait]
impl Tool for ReviewWorkspaceTool {
    fn name(&self) -> &'static str {
        "review_workspace"
    }

    fn description(&self) -> &'static str {
        "Snapshot git status, diff stat, full diff, and test output in one call."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "testCommand": {"type": "string"},
            },
            "required": [],
        })
    }

    async fn execute(&self, arguments: serde_json::Value, ctx: &ToolContext) -> ToolResult {
        let args: ReviewWorkspaceArgs = match serde_json::from_value(arguments) {
            Ok(a) => a,
            Err(e) => return ToolResult::error(format!("invalid arguments: {e}")),
        };

        if ctx.cancellation.is_cancelled() {
            return ToolResult::error("cancelled");
        }

        let status = run_quiet("git status --short", ctx).await;
        let diff_stat = run_quiet("git diff --stat", ctx).await;
        let diff = truncate_middle(&run_quiet("git diff", ctx).await, DIFF_CAP);

        let test_command = args
            .test_command
            .unwrap_or_else(|| "npm test".to_string());

        let mut sections = vec![
            format!("## git status\n```\n{status}\n```"),
            format!("## git diff --stat\n```\n{diff_stat}\n```"),
            format!("## git diff\n```\n{diff}\n```"),
        ];

        if !test_command.trim().is_empty() {
            let test_output = run_test_command(&test_command, ctx).await;
            sections.push(format!("## test output ({test_command})\n```\n{test_output}\n```"));
        }

        ToolResult::ok(sections.join("\n\n"))
    }
}

async fn run_quiet(command: &str, ctx: &ToolContext) -> String {
    match Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(&ctx.working_directory)
        .output()
        .await
    {
        Ok(output) => {
            let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            combined
        }
        Err(e) => format!("[error running '{command}': {e}]"),
    }
}

async fn run_test_command(command: &str, ctx: &ToolContext) -> String {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command).current_dir(&ctx.working_directory);
    cmd.kill_on_drop(true);

    match timeout(TEST_TIMEOUT, cmd.output()).await {
        Ok(Ok(output)) => {
            let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            truncate_tail(&combined, TEST_OUTPUT_CAP)
        }
        Ok(Err(e)) => format!("[error running test command: {e}]"),
        Err(_) => format!("[test command timed out after {}s]", TEST_TIMEOUT.as_secs()),
    }
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
    async fn empty_test_command_skips_test_section() {
        let dir = tempdir().unwrap();
        Command::new("sh")
            .arg("-c")
            .arg("git init -q")
            .current_dir(dir.path())
            .output()
            .await
            .unwrap();

        let tool = ReviewWorkspaceTool;
        let result = tool
            .execute(json!({"testCommand": ""}), &ctx(dir.path().to_path_buf()))
            .await;
        assert!(!result.is_error);
        assert!(!result.content.contains("test output"));
        assert!(result.content.contains("git status"));
    }

    #[tokio::test]
    async fn cancelled_context_short_circuits() {
        let dir = tempdir().unwrap();
        let mut c = ctx(dir.path().to_path_buf());
        c.cancellation.cancel();

        let tool = ReviewWorkspaceTool;
        let result = tool.execute(json!({}), &c).await;
        assert!(result.is_error);
    }
}

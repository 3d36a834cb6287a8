//! `invoke_cursor_cli`: delegates a prompt to an external coding-assistant
//! binary. Disabled entirely via `--no-cli`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::process::Command;
use tokio::time::timeout;

use super::context::{ToolContext, ToolResult};
use super::registry::Tool;
use super::truncate::{truncate_tail, GENERAL_CAP};

const CLI_TIMEOUT: Duration = Duration::from_secs(300);

pub struct InvokeCursorCliTool;

#[derive(Deserialize)]
struct InvokeCursorCliArgs {
    prompt: String,
    cli: Option<String>,
}

#[async_trait]
impl Tool for InvokeCursorCliTool {
    fn name(&self) -> &'static str {
        "invoke_cursor_cli"
    }

    fn description(&self) -> &'static str {
        "Delegate a prompt to an external coding-assistant CLI (cursor or claude)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "prompt": {"type": "string"},
                "cli": {"type": "string", "enum": ["cursor", "claude"]},
            },
            "required": ["prompt"],
        })
    }

    async fn execute(&self, arguments: serde_json::Value, ctx: &ToolContext) -> ToolResult {
        if !ctx.cli_enabled {
            return ToolResult::error("invoke_cursor_cli is disabled for this run (--no-cli)");
        }

        let args: InvokeCursorCliArgs = match serde_json::from_value(arguments) {
            Ok(a) => a,
            Err(e) => return ToolResult::error(format!("invalid arguments: {e}")),
        };

        let binary = args.cli.unwrap_or_else(|| "claude".to_string());
        if binary != "cursor" && binary != "claude" {
            return ToolResult::error(format!("unsupported cli: {binary}"));
        }

        let mut cmd = Command::new(&binary);
        cmd.arg(&args.prompt).current_dir(&ctx.working_directory);
        cmd.kill_on_drop(true);

        let spawn_result = tokio::select! {
            biased;
            _ = ctx.cancellation.cancelled() => return ToolResult::error("cancelled before cli started"),
            result = timeout(CLI_TIMEOUT, cmd.output()) => result,
        };

        match spawn_result {
            Ok(Ok(output)) => {
                let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
                combined.push_str(&String::from_utf8_lossy(&output.stderr));
                ToolResult::ok(truncate_tail(&combined, GENERAL_CAP))
            }
            Ok(Err(e)) => ToolResult::error(format!("failed to invoke {binary}: {e}")),
            Err(_) => ToolResult::error(format!("{binary} timed out after {}s", CLI_TIMEOUT.as_secs())),
        }
    }
}

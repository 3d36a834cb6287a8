//! `git_operations`: a fixed whitelist of git subcommands run in the
//! working directory, subject to the same blocklist/timeout as
//! `run_terminal_command`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::context::{ToolContext, ToolResult};
use super::registry::Tool;
use super::shell_tool::run_shell_command;

const ALLOWED_OPERATIONS: &[&str] = &[
    "status", "branch", "checkout", "add", "commit", "diff", "log", "merge",
];

pub struct GitOperationsTool;

#[derive(Deserialize)]
struct GitOperationsArgs {
    operation: String,
    args: Option<Vec<String>>,
}

#[async_trait]
impl Tool for GitOperationsTool {
    fn name(&self) -> &'static str {
        "git_operations"
    }

    fn description(&self) -> &'static str {
        "Run a git subcommand (status, branch, checkout, add, commit, diff, log, merge)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "operation": {"type": "string", "enum": ALLOWED_OPERATIONS},
                "args": {"type": "array", "items": {"type": "string"}},
            },
            "required": ["operation"],
        })
    }

    async fn execute(&self, arguments: serde_json::Value, ctx: &ToolContext) -> ToolResult {
        let args: GitOperationsArgs = match serde_json::from_value(arguments) {
            Ok(a) => a,
            Err(e) => return ToolResult::error(format!("invalid arguments: {e}")),
        };

        if !ALLOWED_OPERATIONS.contains(&args.operation.as_str()) {
            return ToolResult::error(format!("unsupported git operation: {}", args.operation));
        }

        let extra = args.args.unwrap_or_default().join(" ");
        let command = format!("git {} {extra}", args.operation);
        run_shell_command(&command, None, ctx).await
    }
}

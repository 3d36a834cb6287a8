//! `run_terminal_command`: non-interactive shell execution with a
//! blocklist of destructive patterns and an advisory rejection of
//! commands that never terminate on their own.

use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use tokio::process::Command;
use tokio::time::timeout;

use super::context::{ToolContext, ToolResult};
use super::truncate::{truncate_tail, GENERAL_CAP};

const COMMAND_TIMEOUT: Duration = Duration::from_secs(120);

/// Patterns that are rejected outright — never spawned.
const BLOCKED_PATTERNS: &[&str] = &[
    r"rm\s+-rf\s+/(\s|$)",
    r"rm\s+-rf\s+~(\s|$)",
    r"git\s+push\s+.*(-f\b|--force\b)",
    r"npm\s+publish",
    r"npx\s+.*publish",
    r"sudo\s+rm",
    r"mkfs",
    r"dd\s+if=",
    r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:",
];

/// Patterns for commands that block indefinitely rather than terminating —
/// rejected with an advisory message instead of a hard block.
const NON_TERMINATING_PATTERNS: &[&str] = &[
    r"npm\s+run\s+dev\b",
    r"npm\s+start\b",
    r"yarn\s+dev\b",
    r"yarn\s+start\b",
    r"next\s+dev\b",
    r"\bvite\b",
    r"\bwatch\b",
    r"ts-node-dev",
    r"\bnodemon\b",
    r"http-server",
];

const INTERACTIVE_PROMPT_MARKERS: &[&str] = &["[y/N]", "[Y/n]", "Continue?", "Are you sure"];

pub struct RunTerminalCommandTool;

#[derive(Deserialize)]
struct RunTerminalCommandArgs {
    command: String,
    cwd: Option<String>,
}

#[async_trait]
impl Tool for RunTerminalCommandTool {
    fn name(&self) -> &'static str {
        "run_terminal_command"
    }

    fn description(&self) -> &'static str {
        "Execute a non-interactive shell command with a 120s timeout."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "command": {"type": "string"},
                "cwd": {"type": "string"},
            },
            "required": ["command"],
        })
    }

    async fn execute(&self, arguments: serde_json::Value, ctx: &ToolContext) -> ToolResult {
        let args: RunTerminalCommandArgs = match serde_json::from_value(arguments) {
            Ok(a) => a,
            Err(e) => return ToolResult::error(format!("invalid arguments: {e}")),
        };
        run_shell_command(&args.command, args.cwd.as_deref(), ctx).await
    }
}

use super::registry::Tool;

/// Shared by `run_terminal_command` and `git_operations`: classify the
/// command, then spawn it with a timeout and the shared cancellation
/// handle observed alongside it.
pub async fn run_shell_command(command: &str, cwd: Option<&str>, ctx: &ToolContext) -> ToolResult {
    if let Some(reason) = blocked_reason(command) {
        return ToolResult::error(format!("blocked: command matches a disallowed pattern ({reason})"));
    }
    if let Some(reason) = non_terminating_reason(command) {
        return ToolResult::error(format!(
            "rejected: this command does not terminate on its own ({reason}); run it in the background or use a non-watching invocation"
        ));
    }

    let working_dir = match cwd {
        Some(relative) => ctx.working_directory.join(relative),
        None => ctx.working_directory.clone(),
    };

    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command).current_dir(&working_dir);
    cmd.kill_on_drop(true);

    let spawn_result = tokio::select! {
        biased;
        _ = ctx.cancellation.cancelled() => return ToolResult::error("cancelled before command started"),
        result = timeout(COMMAND_TIMEOUT, cmd.output()) => result,
    };

    match spawn_result {
        Ok(Ok(output)) => {
            let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            let mut content = truncate_tail(&combined, GENERAL_CAP);
            content.push_str(&format!("\n[exit code: {}]", output.status.code().unwrap_or(-1)));
            if looks_interactive(&combined) {
                content.push_str(
                    "\n[hint: output suggests an interactive prompt; retry with piped input or a non-interactive flag like -y]",
                );
            }
            ToolResult::ok(content)
        }
        Ok(Err(e)) => ToolResult::error(format!("failed to spawn command: {e}")),
        Err(_) => ToolResult::error(format!("command timed out after {}s", COMMAND_TIMEOUT.as_secs())),
    }
}

fn blocked_reason(command: &str) -> Option<&'static str> {
    BLOCKED_PATTERNS
        .iter()
        .find(|p| Regex::new(p).expect("static pattern is valid").is_match(command))
        .copied()
}

fn non_terminating_reason(command: &str) -> Option<&'static str> {
    NON_TERMINATING_PATTERNS
        .iter()
        .find(|p| Regex::new(p).expect("static pattern is valid").is_match(command))
        .copied()
}

fn looks_interactive(output: &str) -> bool {
    INTERACTIVE_PROMPT_MARKERS.iter().any(|m| output.contains(m))
        || output.trim_end().ends_with('>')
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
    async fn blocks_rm_rf_root() {
        let dir = tempdir().unwrap();
        let result = run_shell_command("rm -rf /", None, &ctx(dir.path().to_path_buf())).await;
        assert!(result.is_error);
        assert!(result.content.contains("blocked"));
    }

    #[tokio::test]
    async fn blocks_force_push() {
        let dir = tempdir().unwrap();
        let result = run_shell_command("git push -f origin main", None, &ctx(dir.path().to_path_buf())).await;
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn rejects_dev_server_as_non_terminating() {
        let dir = tempdir().unwrap();
        let result = run_shell_command("npm run dev", None, &ctx(dir.path().to_path_buf())).await;
        assert!(result.is_error);
        assert!(result.content.contains("does not terminate"));
    }

    #[tokio::test]
    async fn allows_and_executes_benign_command() {
        let dir = tempdir().unwrap();
        let result = run_shell_command("echo hello", None, &ctx(dir.path().to_path_buf())).await;
        assert!(!result.is_error);
        assert!(result.content.contains("hello"));
    }

    #[tokio::test]
    async fn fork_bomb_pattern_is_blocked() {
        let dir = tempdir().unwrap();
        let result = run_shell_command(":(){ :|:& };:", None, &ctx(dir.path().to_path_buf())).await;
        assert!(result.is_error);
    }
}

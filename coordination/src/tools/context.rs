//! The context passed to every tool execution, and the result shape every
//! tool returns. Execution never throws into the agent loop — failures are
//! `ToolResult { is_error: true, .. }`, not `Err`.

use std::path::PathBuf;

use crate::cancellation::CancellationHandle;

#[derive(Debug, Clone)]
pub struct ToolContext {
    pub task_id: String,
    pub agent_id: String,
    pub working_directory: PathBuf,
    pub file_scope: Option<Vec<String>>,
    pub cancellation: CancellationHandle,
    /// Whether `invoke_cursor_cli` is permitted for this run (`--no-cli`).
    pub cli_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

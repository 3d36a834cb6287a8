//! The agent-invocable tool surface: filesystem, search, shell, git,
//! review, external-CLI delegation, and task completion.

pub mod complete_tool;
pub mod context;
pub mod cursor_tool;
pub mod fs_tools;
pub mod git_tool;
pub mod path_safety;
pub mod registry;
pub mod review_tool;
pub mod search_tool;
pub mod shell_tool;
pub mod truncate;

pub use context::{ToolContext, ToolResult};
pub use registry::{role_tool_names, Tool, ToolRegistry};

use std::sync::Arc;

/// Build a registry carrying every concrete tool. `cli_enabled` is fixed
/// per run via `ToolContext`, not here — this registers `invoke_cursor_cli`
/// unconditionally and lets the tool itself refuse to run when disabled.
pub fn build_default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(fs_tools::ReadFileTool));
    registry.register(Arc::new(fs_tools::ReadFilesTool));
    registry.register(Arc::new(fs_tools::WriteFileTool));
    registry.register(Arc::new(fs_tools::ListDirectoryTool));
    registry.register(Arc::new(search_tool::SearchInFilesTool));
    registry.register(Arc::new(shell_tool::RunTerminalCommandTool));
    registry.register(Arc::new(git_tool::GitOperationsTool));
    registry.register(Arc::new(review_tool::ReviewWorkspaceTool));
    registry.register(Arc::new(cursor_tool::InvokeCursorCliTool));
    registry.register(Arc::new(complete_tool::CompleteTaskTool));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Role;

    #[test]
    fn default_registry_covers_every_role_tool() {
        let registry = build_default_registry();
        for role in [
            Role::Analyzer,
            Role::Planner,
            Role::Executor,
            Role::Reviewer,
            Role::Coordinator,
            Role::Steward,
            Role::Oracle,
        ] {
            for name in role_tool_names(role) {
                assert!(registry.get(name).is_some(), "missing tool {name} for {role:?}");
            }
        }
    }
}

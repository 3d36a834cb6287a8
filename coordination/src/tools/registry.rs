//! The tool trait and the fixed role → tool-set mapping.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::context::{ToolContext, ToolResult};
use crate::task::Role;

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// JSON-Schema-shaped parameter spec: an object with typed properties
    /// and a `required` list, handed to the LLM as the function signature.
    fn parameters_schema(&self) -> serde_json::Value;
    async fn execute(&self, arguments: serde_json::Value, ctx: &ToolContext) -> ToolResult;
}

#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<&'static str, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// The subset of this registry's tools available to `role`, in the
    /// fixed order defined by [`role_tool_names`].
    pub fn for_role(&self, role: Role) -> Vec<Arc<dyn Tool>> {
        role_tool_names(role)
            .iter()
            .filter_map(|name| self.get(name))
            .collect()
    }
}

/// The fixed role → tool-name mapping. Steward and oracle reason in a
/// single turn and only ever see `complete_task`.
pub fn role_tool_names(role: Role) -> &'static [&'static str] {
    match role {
        Role::Analyzer | Role::Planner => &[
            "read_file",
            "read_files",
            "list_directory",
            "search_in_files",
            "run_terminal_command",
            "complete_task",
        ],
        Role::Executor => &[
            "read_file",
            "read_files",
            "write_file",
            "list_directory",
            "run_terminal_command",
            "git_operations",
            "invoke_cursor_cli",
            "complete_task",
        ],
        Role::Reviewer => &[
            "review_workspace",
            "read_file",
            "read_files",
            "list_directory",
            "search_in_files",
            "run_terminal_command",
            "git_operations",
            "complete_task",
        ],
        Role::Coordinator => &[
            "read_file",
            "read_files",
            "write_file",
            "list_directory",
            "run_terminal_command",
            "git_operations",
            "complete_task",
        ],
        Role::Steward | Role::Oracle => &["complete_task"],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steward_and_oracle_only_get_complete_task() {
        assert_eq!(role_tool_names(Role::Steward), &["complete_task"]);
        assert_eq!(role_tool_names(Role::Oracle), &["complete_task"]);
    }

    #[test]
    fn executor_gets_write_and_git() {
        let names = role_tool_names(Role::Executor);
        assert!(names.contains(&"write_file"));
        assert!(names.contains(&"git_operations"));
        assert!(names.contains(&"invoke_cursor_cli"));
    }

    #[test]
    fn analyzer_does_not_get_write_file() {
        let names = role_tool_names(Role::Analyzer);
        assert!(!names.contains(&"write_file"));
    }
}

//! `complete_task`: signals termination to the agent runtime. Validation
//! of the payload happens in the runtime (see `crate::agent::runtime`),
//! not here — this tool just echoes the arguments back as its result.

use async_trait::async_trait;
use serde_json::json;

use super::context::{ToolContext, ToolResult};
use super::registry::Tool;

pub struct CompleteTaskTool;

#[async_trait]
impl Tool for CompleteTaskTool {
    fn name(&self) -> &'static str {
        "complete_task"
    }

    fn description(&self) -> &'static str {
        "Signal that this agent's work is done, with a status, summary, and content."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "status": {"type": "string", "enum": ["completed", "failed", "needs_review"]},
                "summary": {"type": "string"},
                "content": {"type": "string"},
                "handoff_notes": {"type": "string"},
                "review_notes": {"type": "string"},
                "metadata": {"type": "object"},
            },
            "required": ["status", "summary", "content"],
        })
    }

    async fn execute(&self, arguments: serde_json::Value, _ctx: &ToolContext) -> ToolResult {
        ToolResult::ok(arguments.to_string())
    }
}

//! Structured `tracing::info!` per event, for runs whose output is
//! captured by a log aggregator instead of a terminal.

use coordination::events::WorkflowEvent;

use super::Renderer;

pub struct LogRenderer;

impl Renderer for LogRenderer {
    fn on_event(&self, event: &WorkflowEvent) {
        tracing::info!(
            task_id = %event.task_id,
            event_type = event.event_type(),
            payload = ?event.payload,
            "workflow event"
        );
    }
}

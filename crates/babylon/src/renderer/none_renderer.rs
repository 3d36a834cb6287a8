//! No-op renderer for scripted/headless runs.

use coordination::events::WorkflowEvent;

use super::Renderer;

pub struct NoneRenderer;

impl Renderer for NoneRenderer {
    fn on_event(&self, _event: &WorkflowEvent) {}
}

//! Event-bus subscribers that turn a [`WorkflowEvent`] stream into
//! something a human (or a log aggregator) can watch.

mod log_renderer;
mod none_renderer;
mod terminal_renderer;

pub use log_renderer::LogRenderer;
pub use none_renderer::NoneRenderer;
pub use terminal_renderer::TerminalRenderer;

use coordination::events::WorkflowEvent;

pub trait Renderer: Send + Sync {
    fn on_event(&self, event: &WorkflowEvent);
}

/// Resolve the `--renderer` flag / config value into a concrete renderer.
/// Unknown names fall back to `terminal` rather than erroring.
pub fn resolve(name: &str) -> Box<dyn Renderer> {
    match name {
        "log" => Box::new(LogRenderer),
        "none" => Box::new(NoneRenderer),
        _ => Box::new(TerminalRenderer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_renderer_name_falls_back_to_terminal() {
        let r = resolve("nonsense");
        let event = WorkflowEvent::new("t1", coordination::EventPayload::WorkflowStart {
            description: "test".to_string(),
        });
        r.on_event(&event);
    }
}

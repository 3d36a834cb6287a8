//! Synchronous pub/sub event bus for the workflow engine.
//!
//! No persistence or replay — runs are not resumable, so there is nothing
//! to replay. The renderer, cost tracker, and oversight tracker all consume
//! the same bus as independent subscribers.

pub mod bus;
pub mod types;

pub use bus::{EventBus, SharedEventBus, Subscriber};
pub use types::{EventPayload, WorkflowEvent};

//! Synchronous, order-preserving event dispatch.
//!
//! Deliberately not `tokio::sync::broadcast`: subscribers must see events in
//! registration order within the producer's own call, and one subscriber
//! panicking must not stop delivery to the rest. A broadcast channel gives
//! neither guarantee once more than one task is polling it.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use tracing::error;

use super::types::WorkflowEvent;

pub type Subscriber = Arc<dyn Fn(&WorkflowEvent) + Send + Sync>;

#[derive(Clone)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Register a subscriber. Subscribers are invoked in registration order.
    pub fn subscribe(&self, subscriber: Subscriber) {
        self.subscribers
            .lock()
            .expect("event bus subscriber lock poisoned")
            .push(subscriber);
    }

    /// Publish synchronously: every subscriber runs before this call returns.
    /// A subscriber that panics is caught and logged; it does not prevent
    /// later subscribers in the list from running. The subscriber list is
    /// cloned out from under the lock before dispatch, so a subscriber that
    /// publishes another event from within its own callback (the cost
    /// tracker reacting to `step:complete` with `cost:update`) does not
    /// deadlock on this same mutex.
    pub fn publish(&self, event: WorkflowEvent) {
        let subscribers: Vec<Subscriber> = self
            .subscribers
            .lock()
            .expect("event bus subscriber lock poisoned")
            .clone();
        for (index, subscriber) in subscribers.iter().enumerate() {
            let result = catch_unwind(AssertUnwindSafe(|| subscriber(&event)));
            if result.is_err() {
                error!(
                    subscriber_index = index,
                    event_type = event.event_type(),
                    "event subscriber panicked; isolating and continuing"
                );
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedEventBus = Arc<EventBus>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::types::EventPayload;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn subscribers_see_events_in_registration_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let order_a = Arc::clone(&order);
        bus.subscribe(Arc::new(move |_| order_a.lock().unwrap().push("a")));
        let order_b = Arc::clone(&order);
        bus.subscribe(Arc::new(move |_| order_b.lock().unwrap().push("b")));

        bus.publish(WorkflowEvent::new(
            "t1",
            EventPayload::WorkflowStart {
                description: "go".into(),
            },
        ));

        assert_eq!(*order.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn panicking_subscriber_does_not_block_others() {
        let bus = EventBus::new();
        bus.subscribe(Arc::new(|_| panic!("boom")));

        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        bus.subscribe(Arc::new(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        }));

        bus.publish(WorkflowEvent::new(
            "t1",
            EventPayload::WorkflowStart {
                description: "go".into(),
            },
        ));

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}

//! Derives dollar costs from token usage on every `step:complete` and
//! republishes a running total as `cost:update`, for the run facade's
//! budget enforcement and the final result record's cost breakdown.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use coordination::events::{EventBus, EventPayload, SharedEventBus, WorkflowEvent};
use coordination::task::{Role, TokenUsage};

#[derive(Debug, Clone, Copy)]
struct ModelPrice {
    input_dollars_per_million: f64,
    output_dollars_per_million: f64,
}

const DEFAULT_PRICE: ModelPrice = ModelPrice {
    input_dollars_per_million: 3.0,
    output_dollars_per_million: 15.0,
};

fn price_table() -> &'static HashMap<&'static str, ModelPrice> {
    static TABLE: OnceLock<HashMap<&'static str, ModelPrice>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = HashMap::new();
        table.insert(
            "claude-opus",
            ModelPrice {
                input_dollars_per_million: 15.0,
                output_dollars_per_million: 75.0,
            },
        );
        table.insert(
            "claude-sonnet",
            ModelPrice {
                input_dollars_per_million: 3.0,
                output_dollars_per_million: 15.0,
            },
        );
        table.insert(
            "claude-haiku",
            ModelPrice {
                input_dollars_per_million: 0.8,
                output_dollars_per_million: 4.0,
            },
        );
        table.insert(
            "gpt-4o-mini",
            ModelPrice {
                input_dollars_per_million: 0.15,
                output_dollars_per_million: 0.6,
            },
        );
        table.insert(
            "gpt-4o",
            ModelPrice {
                input_dollars_per_million: 2.5,
                output_dollars_per_million: 10.0,
            },
        );
        table
    })
}

/// Match by substring so date-suffixed model names (`claude-sonnet-4-5`,
/// `gpt-4o-2024-08-06`) still hit their family's price.
fn price_for(model: &str) -> ModelPrice {
    price_table()
        .iter()
        .find(|(name, _)| model.contains(*name))
        .map(|(_, price)| *price)
        .unwrap_or(DEFAULT_PRICE)
}

fn cost_usd(model: &str, usage: &TokenUsage) -> f64 {
    let price = price_for(model);
    let input = usage.prompt_tokens as f64 / 1_000_000.0 * price.input_dollars_per_million;
    let output = usage.completion_tokens as f64 / 1_000_000.0 * price.output_dollars_per_million;
    input + output
}

#[derive(Debug, Default, Clone)]
pub struct CostBreakdown {
    pub total_usd: f64,
    pub by_role: HashMap<Role, f64>,
    pub by_model: HashMap<String, f64>,
    pub total_usage: TokenUsage,
}

#[derive(Default)]
pub struct CostTracker {
    totals: Mutex<CostBreakdown>,
}

impl CostTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Subscribes to `bus`. Every `step:complete` costs its token usage
    /// against the price table and republishes `cost:update` onto the
    /// same bus with the running totals.
    pub fn register(self: &Arc<Self>, bus: &SharedEventBus) {
        let tracker = Arc::clone(self);
        let bus_for_publish = Arc::clone(bus);
        bus.subscribe(Arc::new(move |event: &WorkflowEvent| {
            tracker.on_event(event, &bus_for_publish);
        }));
    }

    pub fn breakdown(&self) -> CostBreakdown {
        self.totals
            .lock()
            .expect("cost tracker lock poisoned")
            .clone()
    }

    fn on_event(&self, event: &WorkflowEvent, bus: &EventBus) {
        let EventPayload::StepComplete {
            role, model, usage, ..
        } = &event.payload
        else {
            return;
        };

        let cost = cost_usd(model, usage);
        let cumulative = {
            let mut totals = self.totals.lock().expect("cost tracker lock poisoned");
            totals.total_usd += cost;
            *totals.by_role.entry(*role).or_insert(0.0) += cost;
            *totals.by_model.entry(model.clone()).or_insert(0.0) += cost;
            totals.total_usage.add(*usage);
            totals.total_usd
        };

        bus.publish(WorkflowEvent::new(
            event.task_id.clone(),
            EventPayload::CostUpdate {
                role: *role,
                model: model.clone(),
                cost_usd: cost,
                cumulative_usd: cumulative,
            },
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coordination::events::EventBus;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn usage(prompt: u64, completion: u64) -> TokenUsage {
        TokenUsage {
            prompt_tokens: prompt,
            completion_tokens: completion,
            total_tokens: prompt + completion,
        }
    }

    #[test]
    fn unknown_model_falls_back_to_default_price() {
        let cost = cost_usd("mystery-model-9000", &usage(1_000_000, 1_000_000));
        assert_eq!(
            cost,
            DEFAULT_PRICE.input_dollars_per_million + DEFAULT_PRICE.output_dollars_per_million
        );
    }

    #[test]
    fn dated_model_name_matches_its_family_by_substring() {
        let cost = cost_usd("claude-sonnet-4-5-20250514", &usage(1_000_000, 0));
        assert_eq!(cost, 3.0);
    }

    #[test]
    fn step_complete_accumulates_totals_and_republishes_cost_update() {
        let bus = Arc::new(EventBus::new());
        let tracker = CostTracker::new();
        tracker.register(&bus);

        let seen_cumulative = Arc::new(AtomicU64::new(0));
        let seen_clone = Arc::clone(&seen_cumulative);
        bus.subscribe(Arc::new(move |event: &WorkflowEvent| {
            if let EventPayload::CostUpdate { cumulative_usd, .. } = &event.payload {
                seen_clone.store((*cumulative_usd * 1_000_000.0) as u64, Ordering::SeqCst);
            }
        }));

        bus.publish(WorkflowEvent::new(
            "t1",
            EventPayload::StepComplete {
                role: Role::Executor,
                status: "completed".to_string(),
                model: "claude-sonnet".to_string(),
                usage: usage(1_000_000, 0),
            },
        ));

        let breakdown = tracker.breakdown();
        assert_eq!(breakdown.total_usd, 3.0);
        assert_eq!(breakdown.by_role[&Role::Executor], 3.0);
        assert_eq!(breakdown.by_model["claude-sonnet"], 3.0);
        assert_eq!(seen_cumulative.load(Ordering::SeqCst), 3_000_000);
    }
}

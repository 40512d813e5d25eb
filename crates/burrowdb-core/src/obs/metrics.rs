use serde::{Deserialize, Serialize};
use std::{
    cell::RefCell,
    collections::BTreeMap,
    time::{SystemTime, UNIX_EPOCH},
};

///
/// EventState
/// Ephemeral, in-memory counters since `since_ms`.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub models: BTreeMap<String, ModelCounters>,
    pub since_ms: u64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            models: BTreeMap::new(),
            since_ms: now_millis(),
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Executor entrypoints
    pub load_calls: u64,
    pub save_calls: u64,
    pub delete_calls: u64,

    // Rows touched
    pub rows_loaded: u64,
    pub rows_scanned: u64,
    pub rows_saved: u64,
    pub rows_deleted: u64,

    // Index maintenance
    pub index_inserts: u64,
    pub index_removes: u64,
    pub unique_violations: u64,

    // Wall time per executor, microseconds
    pub load_micros_total: u128,
    pub save_micros_total: u128,
    pub delete_micros_total: u128,
}

///
/// ModelCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ModelCounters {
    pub load_calls: u64,
    pub save_calls: u64,
    pub delete_calls: u64,
    pub rows_loaded: u64,
    pub rows_scanned: u64,
    pub rows_saved: u64,
    pub rows_deleted: u64,
    pub index_inserts: u64,
    pub index_removes: u64,
    pub unique_violations: u64,
}

///
/// EventReport
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    pub counters: Option<EventState>,
    /// Per-model counters, busiest loaders first.
    pub models: Vec<ModelSummary>,
}

///
/// ModelSummary
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ModelSummary {
    pub model: String,
    pub load_calls: u64,
    pub save_calls: u64,
    pub delete_calls: u64,
    pub rows_loaded: u64,
    pub rows_scanned: u64,
    pub avg_rows_per_load: f64,
    pub index_inserts: u64,
    pub index_removes: u64,
    pub unique_violations: u64,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

/// Build a report from the in-memory counters.
#[must_use]
#[expect(clippy::cast_precision_loss)]
pub(crate) fn report() -> EventReport {
    let snap = with_state(Clone::clone);

    let mut models: Vec<ModelSummary> = snap
        .models
        .iter()
        .map(|(model, ops)| {
            let avg_rows_per_load = if ops.load_calls > 0 {
                ops.rows_loaded as f64 / ops.load_calls as f64
            } else {
                0.0
            };

            ModelSummary {
                model: model.clone(),
                load_calls: ops.load_calls,
                save_calls: ops.save_calls,
                delete_calls: ops.delete_calls,
                rows_loaded: ops.rows_loaded,
                rows_scanned: ops.rows_scanned,
                avg_rows_per_load,
                index_inserts: ops.index_inserts,
                index_removes: ops.index_removes,
                unique_violations: ops.unique_violations,
            }
        })
        .collect();

    models.sort_by(|a, b| {
        b.avg_rows_per_load
            .total_cmp(&a.avg_rows_per_load)
            .then_with(|| b.load_calls.cmp(&a.load_calls))
            .then_with(|| a.model.cmp(&b.model))
    });

    EventReport {
        counters: Some(snap),
        models,
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
        })
}

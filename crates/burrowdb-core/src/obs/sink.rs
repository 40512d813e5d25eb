//! Metrics sink boundary.
//!
//! Executors never touch `obs::metrics` directly. All instrumentation flows
//! through `MetricsEvent` and `MetricsSink`.

use crate::obs::metrics::{self, EventReport};
use std::{cell::RefCell, rc::Rc, time::Instant};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Rc<dyn MetricsSink>>> = RefCell::new(None);
}

///
/// ExecKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExecKind {
    Load,
    Save,
    Delete,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    ExecStart {
        kind: ExecKind,
        model: &'static str,
    },
    ExecFinish {
        kind: ExecKind,
        model: &'static str,
        rows_touched: u64,
        micros: u64,
    },
    RowsScanned {
        model: &'static str,
        rows_scanned: u64,
    },
    UniqueViolation {
        model: &'static str,
    },
    IndexDelta {
        model: &'static str,
        inserts: u64,
        removes: u64,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default sink writing into the thread-local counter state.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::ExecStart { kind, model } => {
                metrics::with_state_mut(|m| {
                    let entry = m.models.entry(model.to_string()).or_default();
                    match kind {
                        ExecKind::Load => {
                            m.ops.load_calls = m.ops.load_calls.saturating_add(1);
                            entry.load_calls = entry.load_calls.saturating_add(1);
                        }
                        ExecKind::Save => {
                            m.ops.save_calls = m.ops.save_calls.saturating_add(1);
                            entry.save_calls = entry.save_calls.saturating_add(1);
                        }
                        ExecKind::Delete => {
                            m.ops.delete_calls = m.ops.delete_calls.saturating_add(1);
                            entry.delete_calls = entry.delete_calls.saturating_add(1);
                        }
                    }
                });
            }

            MetricsEvent::ExecFinish {
                kind,
                model,
                rows_touched,
                micros,
            } => {
                metrics::with_state_mut(|m| {
                    let entry = m.models.entry(model.to_string()).or_default();
                    let micros = u128::from(micros);
                    match kind {
                        ExecKind::Load => {
                            m.ops.rows_loaded = m.ops.rows_loaded.saturating_add(rows_touched);
                            m.ops.load_micros_total = m.ops.load_micros_total.saturating_add(micros);
                            entry.rows_loaded = entry.rows_loaded.saturating_add(rows_touched);
                        }
                        ExecKind::Save => {
                            m.ops.rows_saved = m.ops.rows_saved.saturating_add(rows_touched);
                            m.ops.save_micros_total = m.ops.save_micros_total.saturating_add(micros);
                            entry.rows_saved = entry.rows_saved.saturating_add(rows_touched);
                        }
                        ExecKind::Delete => {
                            m.ops.rows_deleted = m.ops.rows_deleted.saturating_add(rows_touched);
                            m.ops.delete_micros_total =
                                m.ops.delete_micros_total.saturating_add(micros);
                            entry.rows_deleted = entry.rows_deleted.saturating_add(rows_touched);
                        }
                    }
                });
            }

            MetricsEvent::RowsScanned {
                model,
                rows_scanned,
            } => {
                metrics::with_state_mut(|m| {
                    m.ops.rows_scanned = m.ops.rows_scanned.saturating_add(rows_scanned);
                    let entry = m.models.entry(model.to_string()).or_default();
                    entry.rows_scanned = entry.rows_scanned.saturating_add(rows_scanned);
                });
            }

            MetricsEvent::UniqueViolation { model } => {
                metrics::with_state_mut(|m| {
                    m.ops.unique_violations = m.ops.unique_violations.saturating_add(1);
                    let entry = m.models.entry(model.to_string()).or_default();
                    entry.unique_violations = entry.unique_violations.saturating_add(1);
                });
            }

            MetricsEvent::IndexDelta {
                model,
                inserts,
                removes,
            } => {
                metrics::with_state_mut(|m| {
                    m.ops.index_inserts = m.ops.index_inserts.saturating_add(inserts);
                    m.ops.index_removes = m.ops.index_removes.saturating_add(removes);
                    let entry = m.models.entry(model.to_string()).or_default();
                    entry.index_inserts = entry.index_inserts.saturating_add(inserts);
                    entry.index_removes = entry.index_removes.saturating_add(removes);
                });
            }
        }
    }
}

pub(crate) fn record(event: MetricsEvent) {
    let sink = SINK_OVERRIDE.with(|cell| cell.borrow().clone());

    match sink {
        Some(sink) => sink.record(event),
        None => GlobalMetricsSink.record(event),
    }
}

/// Snapshot the current thread's metrics.
#[must_use]
pub fn metrics_report() -> EventReport {
    metrics::report()
}

/// Reset all metrics state on the current thread.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with `sink` receiving every event recorded on this thread.
/// The previous sink is restored on exit, including on unwind.
pub fn with_metrics_sink<T>(sink: Rc<dyn MetricsSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Rc<dyn MetricsSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            let previous = self.0.take();
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = previous;
            });
        }
    }

    let previous = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(previous);

    f()
}

/// Span
/// RAII guard that emits start/finish events for one executor call, so
/// finish accounting happens even on early return.

pub(crate) struct Span {
    kind: ExecKind,
    model: &'static str,
    start: Instant,
    rows: u64,
}

impl Span {
    #[must_use]
    pub(crate) fn new(kind: ExecKind, model: &'static str) -> Self {
        record(MetricsEvent::ExecStart { kind, model });

        Self {
            kind,
            model,
            start: Instant::now(),
            rows: 0,
        }
    }

    pub(crate) const fn set_rows(&mut self, rows: u64) {
        self.rows = rows;
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        let micros = u64::try_from(self.start.elapsed().as_micros()).unwrap_or(u64::MAX);

        record(MetricsEvent::ExecFinish {
            kind: self.kind,
            model: self.model,
            rows_touched: self.rows,
            micros,
        });
    }
}

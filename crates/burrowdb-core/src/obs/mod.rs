//! Observability: in-process counters and the sink boundary executors
//! report through.

pub(crate) mod metrics;
pub(crate) mod sink;


// re-exports
pub use metrics::{EventOps, EventReport, EventState, ModelCounters, ModelSummary};
pub use sink::{
    ExecKind, MetricsEvent, MetricsSink, metrics_report, metrics_reset_all, with_metrics_sink,
};

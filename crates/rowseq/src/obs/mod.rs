//! Observability: in-memory operation counters and the sink boundary the
//! collection reports through. No storage internals are read here.

pub(crate) mod metrics;
pub mod sink;

// re-exports
pub use metrics::{EventOps, EventState, metrics_report, metrics_reset_all};
pub use sink::{MetricsEvent, MetricsSink, OpKind, with_metrics_sink};

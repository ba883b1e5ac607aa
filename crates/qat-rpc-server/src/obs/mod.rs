//! Metrics reporting.
//!
//! Call sites report through [`MetricExporter`] scopes; the concrete backend
//! is any [`MetricsSink`]. The bundled [`PrometheusSink`] writes into an
//! in-process [`ReceiverMetrics`] registry rendered by the `/metrics` handler.

pub mod exporter;
pub mod metrics;
pub mod sink;

pub use exporter::{MetricExporter, MetricScope};
pub use metrics::ReceiverMetrics;
pub use sink::{MetricsSink, NullSink, PrometheusSink};

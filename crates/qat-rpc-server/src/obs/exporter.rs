//! Scoped metric reporting over any [`MetricsSink`].
//!
//! `MetricExporter` mirrors the sink's API: for every sink method there is a
//! zero-argument method here returning a [`MetricScope`] that loans out a fresh
//! outcome of the matching type. The scope commits the outcome to the sink
//! exactly once when dropped, including during `?` propagation and panics.
//! Sink failures are logged and swallowed so reporting never disturbs the
//! caller.
//!
//! ```
//! use qat_rpc_server::obs::{MetricExporter, NullSink};
//!
//! let exporter = MetricExporter::new(NullSink);
//! {
//!     let mut status = exporter.receiver_status();
//!     status.succeed();
//! } // committed here
//! ```
//!
//! Backends that do not implement [`MetricsSink`] with one outcome per method
//! are rejected at compile time:
//!
//! ```compile_fail
//! use qat_rpc_server::obs::MetricExporter;
//!
//! struct TwoArgs;
//! impl TwoArgs {
//!     fn receiver_status(&self, _a: f64, _b: f64) {}
//! }
//!
//! let _ = MetricExporter::new(TwoArgs);
//! ```

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use qat_rpc_core::error::Result;
use qat_rpc_core::outcome::{BinaryOutcome, IncrementOutcome, Outcome};

use super::sink::MetricsSink;

type Report<O> = fn(&dyn MetricsSink, &O) -> Result<()>;

#[derive(Clone)]
pub struct MetricExporter {
    sink: Arc<dyn MetricsSink>,
}

impl fmt::Debug for MetricExporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricExporter").finish_non_exhaustive()
    }
}

impl MetricExporter {
    pub fn new<S: MetricsSink + 'static>(sink: S) -> Self {
        Self { sink: Arc::new(sink) }
    }

    pub fn from_arc(sink: Arc<dyn MetricsSink>) -> Self {
        Self { sink }
    }

    pub fn receiver_status(&self) -> MetricScope<'_, BinaryOutcome> {
        self.scope("receiver_status", |s, o| s.receiver_status(o))
    }

    pub fn failed_messages(&self) -> MetricScope<'_, IncrementOutcome> {
        self.scope("failed_messages", |s, o| s.failed_messages(o))
    }

    pub fn executed_messages(&self) -> MetricScope<'_, IncrementOutcome> {
        self.scope("executed_messages", |s, o| s.executed_messages(o))
    }

    pub fn hardware_connected(&self) -> MetricScope<'_, BinaryOutcome> {
        self.scope("hardware_connected", |s, o| s.hardware_connected(o))
    }

    pub fn hardware_reloaded(&self) -> MetricScope<'_, BinaryOutcome> {
        self.scope("hardware_reloaded", |s, o| s.hardware_reloaded(o))
    }

    fn scope<O: Outcome>(&self, name: &'static str, report: Report<O>) -> MetricScope<'_, O> {
        MetricScope {
            sink: self.sink.as_ref(),
            name,
            report,
            outcome: O::default(),
        }
    }
}

/// Loans out an outcome and commits it to the sink on drop.
#[must_use = "the outcome is committed when the scope is dropped"]
pub struct MetricScope<'a, O: Outcome> {
    sink: &'a dyn MetricsSink,
    name: &'static str,
    report: Report<O>,
    outcome: O,
}

impl<O: Outcome> MetricScope<'_, O> {
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<O: Outcome> Deref for MetricScope<'_, O> {
    type Target = O;

    fn deref(&self) -> &O {
        &self.outcome
    }
}

impl<O: Outcome> DerefMut for MetricScope<'_, O> {
    fn deref_mut(&mut self) -> &mut O {
        &mut self.outcome
    }
}

impl<O: Outcome> Drop for MetricScope<'_, O> {
    fn drop(&mut self) {
        let (sink, report, outcome) = (self.sink, self.report, &self.outcome);
        match panic::catch_unwind(AssertUnwindSafe(|| report(sink, outcome))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(metric = self.name, error = %e, "metric setting errored"),
            Err(_) => tracing::warn!(metric = self.name, "metric backend panicked"),
        }
    }
}

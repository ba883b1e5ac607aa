//! Metrics backends.
//!
//! [`MetricsSink`] names everything the receiver can report. Each method takes
//! exactly one outcome, whose type fixes how the value is applied (gauge set
//! for [`BinaryOutcome`], counter increment for [`IncrementOutcome`]).

use std::sync::Arc;

use qat_rpc_core::error::Result;
use qat_rpc_core::outcome::{BinaryOutcome, IncrementOutcome, Outcome};

use super::metrics::ReceiverMetrics;

pub trait MetricsSink: Send + Sync {
    fn receiver_status(&self, outcome: &BinaryOutcome) -> Result<()>;
    fn failed_messages(&self, outcome: &IncrementOutcome) -> Result<()>;
    fn executed_messages(&self, outcome: &IncrementOutcome) -> Result<()>;
    fn hardware_connected(&self, outcome: &BinaryOutcome) -> Result<()>;
    fn hardware_reloaded(&self, outcome: &BinaryOutcome) -> Result<()>;
}

/// Discards every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl MetricsSink for NullSink {
    fn receiver_status(&self, _: &BinaryOutcome) -> Result<()> {
        Ok(())
    }
    fn failed_messages(&self, _: &IncrementOutcome) -> Result<()> {
        Ok(())
    }
    fn executed_messages(&self, _: &IncrementOutcome) -> Result<()> {
        Ok(())
    }
    fn hardware_connected(&self, _: &BinaryOutcome) -> Result<()> {
        Ok(())
    }
    fn hardware_reloaded(&self, _: &BinaryOutcome) -> Result<()> {
        Ok(())
    }
}

/// Writes into a [`ReceiverMetrics`] registry scraped over HTTP.
#[derive(Debug, Clone, Default)]
pub struct PrometheusSink {
    registry: Arc<ReceiverMetrics>,
}

impl PrometheusSink {
    pub fn new(registry: Arc<ReceiverMetrics>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> Arc<ReceiverMetrics> {
        Arc::clone(&self.registry)
    }
}

impl MetricsSink for PrometheusSink {
    fn receiver_status(&self, outcome: &BinaryOutcome) -> Result<()> {
        self.registry.receiver_status.set(outcome.value());
        Ok(())
    }

    fn failed_messages(&self, outcome: &IncrementOutcome) -> Result<()> {
        self.registry.failed_messages.inc_by(outcome.value());
        Ok(())
    }

    fn executed_messages(&self, outcome: &IncrementOutcome) -> Result<()> {
        self.registry.executed_messages.inc_by(outcome.value());
        Ok(())
    }

    fn hardware_connected(&self, outcome: &BinaryOutcome) -> Result<()> {
        self.registry.hardware_connected_status.set(outcome.value());
        Ok(())
    }

    fn hardware_reloaded(&self, outcome: &BinaryOutcome) -> Result<()> {
        self.registry.hardware_reloaded_status.set(outcome.value());
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prometheus_sink_applies_outcomes() {
        let sink = PrometheusSink::default();
        let mut status = BinaryOutcome::new();
        status.succeed();
        sink.receiver_status(&status).unwrap();

        let mut executed = IncrementOutcome::new();
        executed.increment();
        sink.executed_messages(&executed).unwrap();
        sink.executed_messages(&executed).unwrap();

        let reg = sink.registry();
        assert_eq!(reg.receiver_status.get(), 1.0);
        assert_eq!(reg.executed_messages.get(), 2.0);

        status.fail();
        sink.receiver_status(&status).unwrap();
        assert_eq!(reg.receiver_status.get(), 0.0);
    }
}

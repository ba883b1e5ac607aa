//! Shared state for the ops HTTP endpoint.

use std::sync::Arc;

use crate::obs::ReceiverMetrics;

#[derive(Clone, Debug, Default)]
pub struct OpsState {
    metrics: Arc<ReceiverMetrics>,
}

impl OpsState {
    pub fn new(metrics: Arc<ReceiverMetrics>) -> Self {
        Self { metrics }
    }

    pub fn metrics(&self) -> &ReceiverMetrics {
        &self.metrics
    }

    /// Ready while the receiver last reported itself as serving.
    pub fn is_ready(&self) -> bool {
        self.metrics.is_serving()
    }
}

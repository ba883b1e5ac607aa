//! Minimal metrics registry for the receiver.
//!
//! Counter/gauge types are backed by atomics storing `f64` bits and rendered in
//! Prometheus text exposition format by the `/metrics` handler.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counter.
#[derive(Debug)]
pub struct Counter {
    bits: AtomicU64,
}

impl Default for Counter {
    fn default() -> Self {
        Self { bits: AtomicU64::new(0f64.to_bits()) }
    }
}

impl Counter {
    /// Increment by an arbitrary non-negative value. Negative deltas are ignored.
    pub fn inc_by(&self, v: f64) {
        if !(v.is_finite() && v >= 0.0) {
            return;
        }
        let _ = self
            .bits
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |cur| {
                Some((f64::from_bits(cur) + v).to_bits())
            });
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    fn render(&self, name: &str, help: &str, out: &mut String) {
        let _ = writeln!(out, "# HELP {} {}", name, help);
        let _ = writeln!(out, "# TYPE {} counter", name);
        let _ = writeln!(out, "{} {}", name, self.get());
    }
}

/// Settable gauge.
#[derive(Debug)]
pub struct Gauge {
    bits: AtomicU64,
}

impl Default for Gauge {
    fn default() -> Self {
        Self { bits: AtomicU64::new(0f64.to_bits()) }
    }
}

impl Gauge {
    pub fn set(&self, v: f64) {
        self.bits.store(v.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    fn render(&self, name: &str, help: &str, out: &mut String) {
        let _ = writeln!(out, "# HELP {} {}", name, help);
        let _ = writeln!(out, "# TYPE {} gauge", name);
        let _ = writeln!(out, "{} {}", name, self.get());
    }
}

#[derive(Debug, Default)]
pub struct ReceiverMetrics {
    pub receiver_status: Gauge,
    pub failed_messages: Counter,
    pub executed_messages: Counter,
    pub hardware_connected_status: Gauge,
    pub hardware_reloaded_status: Gauge,
}

impl ReceiverMetrics {
    /// Whether the receiver last reported itself as serving.
    pub fn is_serving(&self) -> bool {
        self.receiver_status.get() >= 1.0
    }

    /// Render all registered metrics.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.receiver_status.render(
            "receiver_status",
            "Measure the Receiver backend up state",
            &mut out,
        );
        self.failed_messages.render("failed_messages_total", "messages failure counter", &mut out);
        self.executed_messages.render(
            "executed_messages_total",
            "messages executed counter",
            &mut out,
        );
        self.hardware_connected_status.render(
            "hardware_connected_status",
            "Indicate connected status of live hardware",
            &mut out,
        );
        self.hardware_reloaded_status.render(
            "hardware_reloaded_status",
            "Indicate if hardware reload from calibration succeeded or failed",
            &mut out,
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_accumulates_and_ignores_negative() {
        let c = Counter::default();
        c.inc_by(1.0);
        c.inc_by(2.5);
        c.inc_by(-4.0);
        assert_eq!(c.get(), 3.5);
    }

    #[test]
    fn render_contains_type_lines() {
        let m = ReceiverMetrics::default();
        m.receiver_status.set(1.0);
        m.executed_messages.inc_by(5.0);
        let out = m.render();
        assert!(out.contains("# TYPE receiver_status gauge\nreceiver_status 1\n"));
        let executed = "# TYPE executed_messages_total counter\nexecuted_messages_total 5\n";
        assert!(out.contains(executed));
        assert!(out.contains("failed_messages_total 0\n"));
        assert!(m.is_serving());
    }
}

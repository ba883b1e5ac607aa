//! Mutable outcome holders loaned out by metric scopes.
//!
//! An outcome is created fresh for one reporting scope, mutated by the caller,
//! and committed to a metrics sink exactly once when the scope ends.

use crate::error::{Result, RpcError};

/// Marker for values that can be loaned out by a metric scope.
pub trait Outcome: Default {
    /// Numeric value committed to the backend.
    fn value(&self) -> f64;
}

/// Tri-state of a [`BinaryOutcome`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BinaryState {
    #[default]
    Unset,
    Success,
    Failure,
}

/// Events that drive a [`BinaryState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryEvent {
    Succeed,
    Fail,
}

impl BinaryState {
    /// Failure is sticky: `Succeed` only overwrites `Unset`.
    pub fn transition(self, event: BinaryEvent) -> Self {
        match (self, event) {
            (_, BinaryEvent::Fail) => BinaryState::Failure,
            (BinaryState::Failure, BinaryEvent::Succeed) => BinaryState::Failure,
            (_, BinaryEvent::Succeed) => BinaryState::Success,
        }
    }

    /// `Unset` commits as failure.
    pub fn is_success(self) -> bool {
        matches!(self, BinaryState::Success)
    }
}

/// Success/failure report intent (status gauges).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BinaryOutcome {
    state: BinaryState,
}

impl BinaryOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn succeed(&mut self) {
        self.state = self.state.transition(BinaryEvent::Succeed);
    }

    pub fn fail(&mut self) {
        self.state = self.state.transition(BinaryEvent::Fail);
    }

    pub fn state(&self) -> BinaryState {
        self.state
    }

    pub fn is_success(&self) -> bool {
        self.state.is_success()
    }
}

impl Outcome for BinaryOutcome {
    fn value(&self) -> f64 {
        if self.is_success() {
            1.0
        } else {
            0.0
        }
    }
}

impl From<&BinaryOutcome> for bool {
    fn from(o: &BinaryOutcome) -> bool {
        o.is_success()
    }
}

impl From<&BinaryOutcome> for f64 {
    fn from(o: &BinaryOutcome) -> f64 {
        o.value()
    }
}

impl PartialEq<bool> for BinaryOutcome {
    fn eq(&self, other: &bool) -> bool {
        self.is_success() == *other
    }
}

/// Non-negative accumulator (counters).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IncrementOutcome {
    count: f64,
}

impl IncrementOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one.
    pub fn increment(&mut self) {
        self.count += 1.0;
    }

    /// Add an arbitrary non-negative amount.
    pub fn increment_by(&mut self, amount: f64) -> Result<()> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(RpcError::Validation(format!(
                "increment amount must be a non-negative finite number, got {amount}"
            )));
        }
        self.count += amount;
        Ok(())
    }

    pub fn count(&self) -> f64 {
        self.count
    }
}

impl Outcome for IncrementOutcome {
    fn value(&self) -> f64 {
        self.count
    }
}

impl From<&IncrementOutcome> for f64 {
    fn from(o: &IncrementOutcome) -> f64 {
        o.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replay(events: &[BinaryEvent]) -> BinaryOutcome {
        let mut o = BinaryOutcome::new();
        for e in events {
            match e {
                BinaryEvent::Succeed => o.succeed(),
                BinaryEvent::Fail => o.fail(),
            }
        }
        o
    }

    #[test]
    fn unset_commits_as_failure() {
        let o = BinaryOutcome::new();
        assert_eq!(o.state(), BinaryState::Unset);
        assert!(!o.is_success());
        assert_eq!(o.value(), 0.0);
    }

    #[test]
    fn failure_is_sticky() {
        use BinaryEvent::*;
        assert_eq!(replay(&[Succeed, Fail, Succeed]).state(), BinaryState::Failure);
        assert_eq!(replay(&[Fail, Succeed]).state(), BinaryState::Failure);
        assert_eq!(replay(&[Succeed, Succeed]).state(), BinaryState::Success);
    }

    #[test]
    fn any_failure_in_any_sequence_wins() {
        use BinaryEvent::*;
        // every sequence of length <= 4
        for len in 0..=4u32 {
            for bits in 0..(1u32 << len) {
                let events: Vec<BinaryEvent> = (0..len)
                    .map(|i| if bits & (1 << i) != 0 { Fail } else { Succeed })
                    .collect();
                let o = replay(&events);
                let expected = !events.is_empty() && !events.contains(&Fail);
                assert_eq!(o.is_success(), expected, "events={events:?}");
                assert!(o == expected);
            }
        }
    }

    #[test]
    fn conversions_follow_state() {
        let mut o = BinaryOutcome::new();
        o.succeed();
        assert_eq!(f64::from(&o), 1.0);
        assert!(bool::from(&o));
        o.fail();
        assert_eq!(f64::from(&o), 0.0);
        assert!(!bool::from(&o));
    }

    #[test]
    fn increments_sum_exactly() {
        let mut o = IncrementOutcome::new();
        for _ in 0..5 {
            o.increment();
        }
        assert_eq!(o.value(), 5.0);
        assert!(o.increment_by(2.5).is_ok());
        assert_eq!(f64::from(&o), 7.5);
    }

    #[test]
    fn negative_increment_is_rejected() {
        let mut o = IncrementOutcome::new();
        assert!(o.increment_by(-1.0).is_err());
        assert!(o.increment_by(f64::NAN).is_err());
        assert_eq!(o.count(), 0.0);
    }
}

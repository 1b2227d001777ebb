//! Pure circuit breaker state machine.
//!
//! `BreakerState` owns the state, counters, and recovery deadline of one
//! breaker. Every method takes "now" as epoch milliseconds, so the machine is
//! deterministic and has no I/O. The async `CircuitBreaker` in the
//! application layer wraps it with locking, persistence, and call execution.
//!
//! The serialized form is what gets written to shared storage, so other
//! processes guarding the same service see the same circuit.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{CircuitBreakerConfig, CircuitState};
use crate::domain::foundation::{StateMachine, Timestamp};

/// Failure and success bookkeeping for one breaker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitMetrics {
    /// Failures since the last reset or full recovery.
    pub failures: u32,
    /// Successes since entering half-open. Zero in every other state.
    pub successes: u32,
    /// Epoch millis of the most recent failure.
    pub last_failure_time: Option<u64>,
    /// Epoch millis of the most recent success.
    pub last_success_time: Option<u64>,
    /// Failure timestamps inside the sliding window, oldest first.
    pub recent_failures: Vec<u64>,
}

impl CircuitMetrics {
    fn purge_recent(&mut self, now: u64, window_ms: u64) {
        self.recent_failures
            .retain(|&at| now.saturating_sub(at) < window_ms);
    }
}

/// Rejection raised when a call arrives while the circuit is open.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("circuit breaker for '{service_name}' is open; retry in {retry_in_ms}ms")]
pub struct CircuitOpenError {
    /// Service the breaker protects.
    pub service_name: String,
    /// Epoch millis after which a trial call is allowed.
    pub next_attempt_time: u64,
    /// Milliseconds remaining until the trial window.
    pub retry_in_ms: u64,
}

impl CircuitOpenError {
    /// Returns the retry-after moment as a timestamp.
    pub fn retry_after(&self) -> Timestamp {
        Timestamp::from_unix_millis(self.next_attempt_time)
    }
}

/// A state change produced by the machine, reported for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: CircuitState,
    pub to: CircuitState,
}

/// Complete state of one breaker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerState {
    pub state: CircuitState,
    pub metrics: CircuitMetrics,
    /// Epoch millis after which a half-open trial is allowed. Zero unless open.
    pub next_attempt_time: u64,
}

impl BreakerState {
    /// Creates a closed breaker with zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits or rejects a call attempt at `now`.
    ///
    /// An open circuit whose deadline has passed moves to half-open here, on
    /// the attempt itself rather than on a timer.
    pub fn try_acquire(
        &mut self,
        service_name: &str,
        now: u64,
    ) -> Result<Option<Transition>, CircuitOpenError> {
        if self.state != CircuitState::Open {
            return Ok(None);
        }

        if now < self.next_attempt_time {
            return Err(CircuitOpenError {
                service_name: service_name.to_string(),
                next_attempt_time: self.next_attempt_time,
                retry_in_ms: self.next_attempt_time - now,
            });
        }

        let transition = self.move_to(CircuitState::HalfOpen);
        if transition.is_some() {
            self.metrics.successes = 0;
        }
        Ok(transition)
    }

    /// Records a successful call at `now`.
    pub fn record_success(&mut self, now: u64, config: &CircuitBreakerConfig) -> Option<Transition> {
        self.metrics.last_success_time = Some(now);

        match self.state {
            CircuitState::Closed => {
                self.metrics.failures = 0;
                self.metrics.successes = 0;
                self.metrics.recent_failures.clear();
                None
            }
            CircuitState::HalfOpen => {
                self.metrics.successes = self.metrics.successes.saturating_add(1);
                if self.metrics.successes < config.success_threshold {
                    return None;
                }
                let transition = self.move_to(CircuitState::Closed);
                self.metrics.failures = 0;
                self.metrics.successes = 0;
                self.metrics.recent_failures.clear();
                self.next_attempt_time = 0;
                transition
            }
            // Late success from a call admitted before the circuit opened.
            CircuitState::Open => None,
        }
    }

    /// Records a failed call at `now`.
    pub fn record_failure(&mut self, now: u64, config: &CircuitBreakerConfig) -> Option<Transition> {
        self.metrics.failures = self.metrics.failures.saturating_add(1);
        self.metrics.last_failure_time = Some(now);
        self.metrics.recent_failures.push(now);
        self.metrics.purge_recent(now, config.window_millis());

        match self.state {
            CircuitState::Closed
                if self.metrics.recent_failures.len() as u64
                    >= u64::from(config.failure_threshold) =>
            {
                self.open(now, config)
            }
            CircuitState::HalfOpen => self.open(now, config),
            _ => None,
        }
    }

    /// Forces the breaker closed with all counters zeroed.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Returns a copy whose recent-failure list only holds entries inside the
    /// window as seen from `now`.
    pub fn snapshot_at(&self, now: u64, config: &CircuitBreakerConfig) -> Self {
        let mut copy = self.clone();
        copy.metrics.purge_recent(now, config.window_millis());
        copy
    }

    /// Recovery deadline, present only while open.
    pub fn next_attempt(&self) -> Option<u64> {
        (self.state == CircuitState::Open).then_some(self.next_attempt_time)
    }

    fn open(&mut self, now: u64, config: &CircuitBreakerConfig) -> Option<Transition> {
        let transition = self.move_to(CircuitState::Open);
        if transition.is_some() {
            self.next_attempt_time = now.saturating_add(config.timeout_millis());
            self.metrics.successes = 0;
        }
        transition
    }

    fn move_to(&mut self, target: CircuitState) -> Option<Transition> {
        let next = self.state.transition_to(target).ok()?;
        let transition = Transition {
            from: self.state,
            to: next,
        };
        self.state = next;
        Some(transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;

    fn config(failure_threshold: u32, timeout_ms: u64) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold,
            success_threshold: 2,
            timeout: Duration::from_millis(timeout_ms),
            time_window: Duration::from_millis(60_000),
        }
    }

    fn opened_at(now: u64, cfg: &CircuitBreakerConfig) -> BreakerState {
        let mut state = BreakerState::new();
        for _ in 0..cfg.failure_threshold {
            state.record_failure(now, cfg);
        }
        state
    }

    #[test]
    fn trips_open_at_failure_threshold() {
        let cfg = config(2, 1_000);
        let mut state = BreakerState::new();

        assert_eq!(state.record_failure(10_000, &cfg), None);
        assert_eq!(state.state, CircuitState::Closed);

        let transition = state.record_failure(10_000, &cfg);
        assert_eq!(
            transition,
            Some(Transition {
                from: CircuitState::Closed,
                to: CircuitState::Open
            })
        );
        assert_eq!(state.next_attempt_time, 11_000);
        assert_eq!(state.metrics.successes, 0);
    }

    #[test]
    fn failures_outside_window_do_not_count() {
        let cfg = config(2, 1_000);
        let mut state = BreakerState::new();

        state.record_failure(0, &cfg);
        state.record_failure(60_000, &cfg);

        assert_eq!(state.state, CircuitState::Closed);
        assert_eq!(state.metrics.recent_failures, vec![60_000]);
        assert_eq!(state.metrics.failures, 2);
    }

    #[test]
    fn rejects_before_deadline_and_half_opens_after() {
        let cfg = config(2, 1_000);
        let mut state = opened_at(0, &cfg);

        let err = state.try_acquire("keywords", 500).unwrap_err();
        assert_eq!(err.retry_in_ms, 500);
        assert_eq!(err.next_attempt_time, 1_000);
        assert_eq!(state.state, CircuitState::Open);

        let transition = state.try_acquire("keywords", 1_001).unwrap();
        assert_eq!(transition.map(|t| t.to), Some(CircuitState::HalfOpen));
    }

    #[test]
    fn half_open_failure_reopens_with_new_deadline() {
        let cfg = config(2, 1_000);
        let mut state = opened_at(0, &cfg);
        state.try_acquire("ai", 1_500).unwrap();
        state.record_success(1_500, &cfg);
        assert_eq!(state.metrics.successes, 1);

        state.record_failure(1_600, &cfg);

        assert_eq!(state.state, CircuitState::Open);
        assert_eq!(state.metrics.successes, 0);
        assert_eq!(state.next_attempt_time, 2_600);
    }

    #[test]
    fn half_open_closes_after_success_threshold() {
        let cfg = config(2, 1_000);
        let mut state = opened_at(0, &cfg);
        state.try_acquire("ai", 2_000).unwrap();

        assert_eq!(state.record_success(2_000, &cfg), None);
        let transition = state.record_success(2_100, &cfg);

        assert_eq!(transition.map(|t| t.to), Some(CircuitState::Closed));
        assert_eq!(state.metrics.failures, 0);
        assert_eq!(state.metrics.successes, 0);
        assert!(state.metrics.recent_failures.is_empty());
        assert_eq!(state.next_attempt(), None);
    }

    #[test]
    fn closed_success_grants_full_recovery_credit() {
        let cfg = config(3, 1_000);
        let mut state = BreakerState::new();
        state.record_failure(0, &cfg);
        state.record_failure(1, &cfg);

        state.record_success(2, &cfg);

        assert_eq!(state.metrics.failures, 0);
        assert!(state.metrics.recent_failures.is_empty());
        state.record_failure(3, &cfg);
        assert_eq!(state.state, CircuitState::Closed);
    }

    #[test]
    fn late_success_while_open_does_not_count_toward_closing() {
        let cfg = config(1, 1_000);
        let mut state = opened_at(0, &cfg);

        assert_eq!(state.record_success(10, &cfg), None);
        assert_eq!(state.metrics.successes, 0);
        assert_eq!(state.state, CircuitState::Open);

        state.try_acquire("inventory", 1_001).unwrap();
        assert_eq!(state.metrics.successes, 0);

        assert_eq!(state.record_success(1_002, &cfg), None);
        assert_eq!(state.state, CircuitState::HalfOpen);

        let transition = state.record_success(1_003, &cfg);
        assert_eq!(transition.map(|t| t.to), Some(CircuitState::Closed));
    }

    #[test]
    fn closed_successes_leave_counter_at_zero() {
        let cfg = config(3, 1_000);
        let mut state = BreakerState::new();

        for at in 0..5 {
            state.record_success(at, &cfg);
        }

        assert_eq!(state.metrics.successes, 0);
        assert_eq!(state.metrics.last_success_time, Some(4));
    }

    #[test]
    fn reset_is_idempotent() {
        let cfg = config(1, 1_000);
        let mut state = opened_at(0, &cfg);

        state.reset();
        let once = state.clone();
        state.reset();

        assert_eq!(state, once);
        assert_eq!(state, BreakerState::new());
    }

    #[test]
    fn snapshot_purges_stale_failures() {
        let cfg = config(5, 1_000);
        let mut state = BreakerState::new();
        state.record_failure(0, &cfg);
        state.record_failure(30_000, &cfg);

        let snapshot = state.snapshot_at(70_000, &cfg);
        assert_eq!(snapshot.metrics.recent_failures, vec![30_000]);
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let cfg = config(1, 1_000);
        let state = opened_at(42, &cfg);
        let json = serde_json::to_value(&state).unwrap();

        assert_eq!(json["state"], "OPEN");
        assert_eq!(json["nextAttemptTime"], 1_042);
        assert_eq!(json["metrics"]["recentFailures"][0], 42);

        let back: BreakerState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }

    proptest! {
        #[test]
        fn opens_exactly_at_threshold(threshold in 1u32..20, failures in 0u32..40) {
            let cfg = config(threshold, 1_000);
            let mut state = BreakerState::new();
            for i in 0..failures {
                state.record_failure(u64::from(i), &cfg);
            }
            let expected = if failures >= threshold { CircuitState::Open } else { CircuitState::Closed };
            prop_assert_eq!(state.state, expected);
        }

        #[test]
        fn open_circuit_never_admits_before_deadline(
            timeout_ms in 1u64..100_000,
            offset in 0u64..100_000,
        ) {
            let cfg = config(1, timeout_ms);
            let mut state = opened_at(1_000, &cfg);
            let now = 1_000 + (offset % timeout_ms);
            prop_assert!(state.try_acquire("svc", now).is_err());
            prop_assert_eq!(state.state, CircuitState::Open);
        }
    }
}

//! Circuit states for external service protection.
//!
//! ```text
//! Closed   --[recent failures >= failure_threshold]--> Open
//! Open     --[next call after next_attempt_time]-----> HalfOpen
//! HalfOpen --[successes >= success_threshold]--------> Closed
//! HalfOpen --[any failure]---------------------------> Open
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::StateMachine;

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Normal operation - calls pass through and failures are counted.
    #[default]
    Closed,

    /// Too many failures - calls are rejected until the recovery deadline.
    Open,

    /// Trial window - a success streak closes the circuit, any failure reopens it.
    HalfOpen,
}

impl CircuitState {
    /// Check if the circuit lets calls through without consulting the deadline.
    pub fn allows_requests(&self) -> bool {
        matches!(self, CircuitState::Closed | CircuitState::HalfOpen)
    }

    /// Returns the canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StateMachine for CircuitState {
    fn valid_transitions(&self) -> Vec<Self> {
        use CircuitState::*;
        match self {
            Closed => vec![Open],
            Open => vec![HalfOpen],
            HalfOpen => vec![Closed, Open],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circuit_state_allows_requests() {
        assert!(CircuitState::Closed.allows_requests());
        assert!(CircuitState::HalfOpen.allows_requests());
        assert!(!CircuitState::Open.allows_requests());
    }

    #[test]
    fn open_cannot_jump_straight_to_closed() {
        assert!(CircuitState::Open.transition_to(CircuitState::Closed).is_err());
        assert!(CircuitState::Closed.transition_to(CircuitState::HalfOpen).is_err());
    }

    #[test]
    fn no_state_is_terminal() {
        for state in [CircuitState::Closed, CircuitState::Open, CircuitState::HalfOpen] {
            assert!(!state.is_terminal());
        }
    }

    #[test]
    fn serializes_screaming_snake_case() {
        let json = serde_json::to_string(&CircuitState::HalfOpen).unwrap();
        assert_eq!(json, "\"HALF_OPEN\"");
        assert_eq!(CircuitState::HalfOpen.to_string(), "HALF_OPEN");
    }
}

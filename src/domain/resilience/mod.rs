//! Resilience domain - the circuit breaker state machine.
//!
//! Pure, clock-injected logic. Locking, persistence to shared storage, and
//! executing guarded calls live in `application::resilience`.

mod breaker_state;
mod circuit_state;
mod config;

pub use breaker_state::{BreakerState, CircuitMetrics, CircuitOpenError, Transition};
pub use circuit_state::CircuitState;
pub use config::CircuitBreakerConfig;

//! Circuit breakers for external service calls.

mod circuit_breaker;
mod registry;

pub use circuit_breaker::{
    state_key, CircuitBreaker, CircuitBreakerError, CircuitStatus, STATE_KEY_PREFIX, STATE_TTL,
};
pub use registry::CircuitBreakerRegistry;

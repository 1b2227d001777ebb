//! Application layer - orchestration over domain logic and ports.
//!
//! - `resilience` - circuit breakers and their registry
//! - `optimizer` - the recursive opportunity optimizer

pub mod optimizer;
pub mod resilience;

pub use optimizer::{OpportunityOptimizer, OptimizationConfig, OptimizationResult, OptimizerError};
pub use resilience::{CircuitBreaker, CircuitBreakerError, CircuitBreakerRegistry, CircuitStatus};

//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `resilience` - Circuit breaker state machine
//! - `opportunity` - Suggestion decoding, scoring, learning, and ranking

pub mod foundation;
pub mod opportunity;
pub mod resilience;

//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresOpportunityRepository` - durable opportunity store

mod opportunity_repository;

pub use opportunity_repository::PostgresOpportunityRepository;

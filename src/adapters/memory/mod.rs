//! In-memory repository adapters.

mod opportunity_repository;

pub use opportunity_repository::InMemoryOpportunityRepository;

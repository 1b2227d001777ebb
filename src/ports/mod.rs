//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Collaborators
//!
//! - `SuggestionGenerator` - AI text completion
//! - `KeywordMetricsGateway` - bulk keyword research
//! - `InventoryGateway` - bookable product discovery
//! - `DomainAvailabilityChecker` - heuristic domain lookup
//! - `OpportunityRepository` - durable opportunity store
//!
//! ## Infrastructure
//!
//! - `SharedStateStore` - cross-process breaker state
//! - `Clock` - injectable time source

mod clock;
mod domain_availability;
mod inventory_gateway;
mod keyword_metrics_gateway;
mod opportunity_repository;
mod shared_state_store;
mod suggestion_generator;

pub use clock::Clock;
pub use domain_availability::DomainAvailabilityChecker;
pub use inventory_gateway::{
    InventoryError, InventoryFilter, InventoryGateway, InventoryPage, InventoryProduct,
};
pub use keyword_metrics_gateway::{KeywordGatewayError, KeywordMetricsGateway};
pub use opportunity_repository::OpportunityRepository;
pub use shared_state_store::{SharedStateStore, StateStoreError};
pub use suggestion_generator::{
    FinishReason, GenerationPurpose, GenerationRequest, GenerationResponse, GeneratorError,
    GeneratorInfo, SuggestionGenerator, TokenUsage,
};

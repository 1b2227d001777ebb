//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `ai` - suggestion generators (Anthropic, mock)
//! - `keyword_research` - keyword metrics (DataForSEO, in-memory)
//! - `inventory` - product discovery (Holibob, in-memory)
//! - `domain_check` - DNS domain availability heuristic
//! - `postgres` / `memory` - opportunity repositories
//! - `storage` - shared state stores (Redis, in-memory)
//! - `rate_limiter` - client-side request throttling
//! - `clock` - system and manual clocks

pub mod ai;
pub mod clock;
pub mod domain_check;
pub mod inventory;
pub mod keyword_research;
pub mod memory;
pub mod postgres;
pub mod rate_limiter;
pub mod storage;

pub use ai::{AnthropicConfig, AnthropicSuggestionGenerator, MockSuggestionGenerator};
pub use clock::{ManualClock, SystemClock};
pub use domain_check::DnsDomainChecker;
pub use inventory::{HolibobConfig, HolibobInventoryGateway, InMemoryInventoryGateway};
pub use keyword_research::{DataForSeoConfig, DataForSeoGateway, InMemoryKeywordGateway};
pub use memory::InMemoryOpportunityRepository;
pub use postgres::PostgresOpportunityRepository;
pub use rate_limiter::SlidingWindowThrottle;
pub use storage::{InMemorySharedStateStore, RedisSharedStateStore};

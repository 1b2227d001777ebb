//! Keyword research adapters.

mod dataforseo_gateway;
mod in_memory_gateway;

pub use dataforseo_gateway::{DataForSeoConfig, DataForSeoGateway};
pub use in_memory_gateway::InMemoryKeywordGateway;

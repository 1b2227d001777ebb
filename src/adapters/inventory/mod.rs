//! Inventory feasibility adapters.

mod holibob_gateway;
mod in_memory_gateway;

pub use holibob_gateway::{HolibobConfig, HolibobInventoryGateway};
pub use in_memory_gateway::InMemoryInventoryGateway;

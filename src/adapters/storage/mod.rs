//! Shared state storage adapters.
//!
//! ## Available Adapters
//!
//! - **RedisSharedStateStore** - cross-process state in Redis
//! - **InMemorySharedStateStore** - process-local state (testing/development)

mod in_memory_shared_state_store;
mod redis_shared_state_store;

pub use in_memory_shared_state_store::InMemorySharedStateStore;
pub use redis_shared_state_store::RedisSharedStateStore;

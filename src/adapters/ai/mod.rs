//! Suggestion generator adapters.
//!
//! - `AnthropicSuggestionGenerator` - Anthropic Messages API
//! - `MockSuggestionGenerator` - scripted responses for tests

mod anthropic_generator;
mod mock_generator;

pub use anthropic_generator::{AnthropicConfig, AnthropicSuggestionGenerator};
pub use mock_generator::MockSuggestionGenerator;

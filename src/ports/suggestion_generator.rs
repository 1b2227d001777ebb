//! Suggestion Generator Port - single-shot text completion.
//!
//! The optimizer asks an AI model for candidate opportunities and for
//! short explanations. Output is untrusted text; callers decode it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Port for AI text generation.
#[async_trait]
pub trait SuggestionGenerator: Send + Sync {
    /// Generates one completion for the request.
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, GeneratorError>;

    /// False when no credential is configured. A run cannot start without one.
    fn is_configured(&self) -> bool;

    /// Name and model, for logging.
    fn generator_info(&self) -> GeneratorInfo;
}

/// What a generation is for. Used for cost attribution and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationPurpose {
    Suggestions,
    Explanation,
}

/// Request for a completion.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub purpose: GenerationPurpose,
    /// Correlates log lines of one run.
    pub trace_id: String,
}

impl GenerationRequest {
    pub fn new(purpose: GenerationPurpose, prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            max_tokens: None,
            temperature: None,
            purpose,
            trace_id: String::new(),
        }
    }

    /// Sets the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Sets the maximum tokens to generate.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Sets the temperature.
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = trace_id.into();
        self
    }
}

/// Completed generation.
#[derive(Debug, Clone)]
pub struct GenerationResponse {
    pub content: String,
    pub usage: TokenUsage,
    pub model: String,
    pub finish_reason: FinishReason,
}

/// Token usage information for cost tracking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    /// Estimated cost in millionths of a dollar.
    pub estimated_cost_micros: u64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32, cost_micros: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            estimated_cost_micros: cost_micros,
        }
    }

    pub fn cost_usd(&self) -> f64 {
        self.estimated_cost_micros as f64 / 1_000_000.0
    }
}

/// Reason the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural stop (end of response).
    Stop,
    /// Hit max_tokens limit. The text is likely truncated.
    Length,
    /// Content was filtered for safety.
    ContentFilter,
    Error,
}

/// Generator information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorInfo {
    pub name: String,
    pub model: String,
    pub max_context_tokens: u32,
}

impl GeneratorInfo {
    pub fn new(name: impl Into<String>, model: impl Into<String>, max_context_tokens: u32) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            max_context_tokens,
        }
    }
}

/// Generator errors.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// No credential configured. Fatal for a run.
    #[error("suggestion generator is not configured")]
    NotConfigured,

    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u32 },

    #[error("content filtered: {reason}")]
    ContentFiltered { reason: String },

    #[error("provider unavailable: {message}")]
    Unavailable { message: String },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u32 },
}

impl GeneratorError {
    pub fn rate_limited(retry_after_secs: u32) -> Self {
        Self::RateLimited { retry_after_secs }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Returns true if retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GeneratorError::RateLimited { .. }
                | GeneratorError::Unavailable { .. }
                | GeneratorError::Network(_)
                | GeneratorError::Timeout { .. }
        )
    }

    /// Returns true if no run can succeed until configuration changes.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            GeneratorError::NotConfigured | GeneratorError::AuthenticationFailed
        )
    }
}

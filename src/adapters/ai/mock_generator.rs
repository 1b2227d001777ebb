//! Mock Suggestion Generator for testing.
//!
//! Returns queued responses in order, records every request, and can be
//! marked unconfigured to exercise the fatal configuration path.
//!
//! # Example
//!
//! ```ignore
//! let generator = MockSuggestionGenerator::new()
//!     .with_response(r#"[{"destination":"Rome","keyword":"rome food tour"}]"#)
//!     .with_error(GeneratorError::unavailable("overloaded"));
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::sleep;

use crate::ports::{
    FinishReason, GenerationPurpose, GenerationRequest, GenerationResponse, GeneratorError,
    GeneratorInfo, SuggestionGenerator, TokenUsage,
};

#[derive(Debug)]
enum MockResponse {
    Success { content: String, usage: TokenUsage },
    Error(GeneratorError),
}

/// Scripted generator.
///
/// Suggestion and explanation requests draw from separate queues so tests
/// can script iterations without accounting for explanation calls.
#[derive(Debug, Clone)]
pub struct MockSuggestionGenerator {
    suggestions: Arc<Mutex<VecDeque<MockResponse>>>,
    explanations: Arc<Mutex<VecDeque<MockResponse>>>,
    calls: Arc<Mutex<Vec<GenerationRequest>>>,
    configured: bool,
    delay: Duration,
}

impl Default for MockSuggestionGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSuggestionGenerator {
    pub fn new() -> Self {
        Self {
            suggestions: Arc::new(Mutex::new(VecDeque::new())),
            explanations: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            configured: true,
            delay: Duration::ZERO,
        }
    }

    /// Queues a suggestion response.
    pub fn with_response(self, content: impl Into<String>) -> Self {
        push(&self.suggestions, MockResponse::Success {
            content: content.into(),
            usage: TokenUsage::new(1_000, 2_000, 30_000),
        });
        self
    }

    /// Queues a suggestion error.
    pub fn with_error(self, error: GeneratorError) -> Self {
        push(&self.suggestions, MockResponse::Error(error));
        self
    }

    /// Queues an explanation response.
    pub fn with_explanation(self, content: impl Into<String>) -> Self {
        push(&self.explanations, MockResponse::Success {
            content: content.into(),
            usage: TokenUsage::new(200, 100, 10_000),
        });
        self
    }

    /// Queues an explanation error.
    pub fn with_explanation_error(self, error: GeneratorError) -> Self {
        push(&self.explanations, MockResponse::Error(error));
        self
    }

    /// Reports no credential configured.
    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Number of calls with the given purpose.
    pub fn calls_for(&self, purpose: GenerationPurpose) -> usize {
        lock(&self.calls).iter().filter(|c| c.purpose == purpose).count()
    }

    pub fn get_calls(&self) -> Vec<GenerationRequest> {
        lock(&self.calls).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn push(queue: &Mutex<VecDeque<MockResponse>>, response: MockResponse) {
    lock(queue).push_back(response);
}

#[async_trait]
impl SuggestionGenerator for MockSuggestionGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, GeneratorError> {
        let purpose = request.purpose;
        lock(&self.calls).push(request);

        if !self.configured {
            return Err(GeneratorError::NotConfigured);
        }
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        let queue = match purpose {
            GenerationPurpose::Suggestions => &self.suggestions,
            GenerationPurpose::Explanation => &self.explanations,
        };
        let next = lock(queue).pop_front();

        match next {
            Some(MockResponse::Success { content, usage }) => Ok(GenerationResponse {
                content,
                usage,
                model: "mock-model-1".to_string(),
                finish_reason: FinishReason::Stop,
            }),
            Some(MockResponse::Error(err)) => Err(err),
            None => Ok(GenerationResponse {
                content: match purpose {
                    GenerationPurpose::Suggestions => "[]".to_string(),
                    GenerationPurpose::Explanation => "Mock explanation.".to_string(),
                },
                usage: TokenUsage::new(5, 10, 0),
                model: "mock-model-1".to_string(),
                finish_reason: FinishReason::Stop,
            }),
        }
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    fn generator_info(&self) -> GeneratorInfo {
        GeneratorInfo::new("mock", "mock-model-1", 128_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suggestions() -> GenerationRequest {
        GenerationRequest::new(GenerationPurpose::Suggestions, "go")
    }

    #[tokio::test]
    async fn returns_queued_responses_in_order() {
        let generator = MockSuggestionGenerator::new()
            .with_response("first")
            .with_error(GeneratorError::unavailable("down"))
            .with_response("second");

        assert_eq!(generator.generate(suggestions()).await.unwrap().content, "first");
        assert!(generator.generate(suggestions()).await.is_err());
        assert_eq!(generator.generate(suggestions()).await.unwrap().content, "second");
        assert_eq!(generator.generate(suggestions()).await.unwrap().content, "[]");
        assert_eq!(generator.call_count(), 4);
    }

    #[tokio::test]
    async fn explanation_queue_is_separate() {
        let generator = MockSuggestionGenerator::new()
            .with_response("[]")
            .with_explanation("Because demand is high.");

        let explanation = generator
            .generate(GenerationRequest::new(GenerationPurpose::Explanation, "why"))
            .await
            .unwrap();
        assert_eq!(explanation.content, "Because demand is high.");
        assert_eq!(generator.calls_for(GenerationPurpose::Explanation), 1);
        assert_eq!(generator.calls_for(GenerationPurpose::Suggestions), 0);
    }

    #[tokio::test]
    async fn unconfigured_generator_fails_every_call() {
        let generator = MockSuggestionGenerator::new().unconfigured();
        assert!(!generator.is_configured());
        assert!(matches!(
            generator.generate(suggestions()).await,
            Err(GeneratorError::NotConfigured)
        ));
    }
}

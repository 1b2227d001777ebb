//! Circuit breaker configuration.

use std::time::Duration;

/// Configuration for circuit breaker behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Number of failures inside `time_window` that trips the circuit open.
    ///
    /// Default: 5 failures
    pub failure_threshold: u32,

    /// Number of successes in half-open state needed to close the circuit.
    ///
    /// Default: 2 successes
    pub success_threshold: u32,

    /// Time to wait after opening before a half-open trial is allowed.
    ///
    /// Default: 60 seconds
    pub timeout: Duration,

    /// Sliding window for counting failures.
    ///
    /// Default: 60 seconds
    pub time_window: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout: Duration::from_secs(60),
            time_window: Duration::from_secs(60),
        }
    }
}

impl CircuitBreakerConfig {
    /// Config for AI providers (lower threshold, longer window).
    pub fn for_ai_provider() -> Self {
        Self {
            failure_threshold: 3,
            success_threshold: 2,
            timeout: Duration::from_secs(60),
            time_window: Duration::from_secs(120),
        }
    }

    /// Config for rate-limited keyword research APIs.
    pub fn for_keyword_api() -> Self {
        Self {
            failure_threshold: 3,
            success_threshold: 1,
            timeout: Duration::from_secs(120),
            time_window: Duration::from_secs(300),
        }
    }

    /// Config for inventory lookups (many small calls, tolerate more noise).
    pub fn for_inventory_api() -> Self {
        Self {
            failure_threshold: 10,
            success_threshold: 2,
            timeout: Duration::from_secs(30),
            time_window: Duration::from_secs(60),
        }
    }

    pub(crate) fn timeout_millis(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    pub(crate) fn window_millis(&self) -> u64 {
        self.time_window.as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = CircuitBreakerConfig::default();
        assert_eq!(config.failure_threshold, 5);
        assert_eq!(config.success_threshold, 2);
        assert_eq!(config.timeout, Duration::from_millis(60_000));
        assert_eq!(config.time_window, Duration::from_millis(60_000));
    }

    #[test]
    fn ai_provider_config() {
        let config = CircuitBreakerConfig::for_ai_provider();
        assert_eq!(config.failure_threshold, 3);
        assert_eq!(config.timeout_millis(), 60_000);
    }

    #[test]
    fn inventory_config_is_more_tolerant() {
        let config = CircuitBreakerConfig::for_inventory_api();
        assert!(config.failure_threshold > CircuitBreakerConfig::default().failure_threshold);
    }
}

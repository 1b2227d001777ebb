//! Circuit breaker configuration
//!
//! `default` applies to any breaker created without an explicit config.
//! Per-service sections replace the built-in presets for the optimizer's
//! three upstreams.

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::application::optimizer::ServiceBreakerConfigs;
use crate::domain::resilience::CircuitBreakerConfig;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResilienceConfig {
    #[serde(default)]
    pub default: BreakerSettings,
    pub ai: Option<BreakerSettings>,
    pub keywords: Option<BreakerSettings>,
    pub inventory: Option<BreakerSettings>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct BreakerSettings {
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,

    /// Open duration before a trial call, in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Sliding failure window, in milliseconds
    #[serde(default = "default_time_window_ms")]
    pub time_window_ms: u64,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            success_threshold: default_success_threshold(),
            timeout_ms: default_timeout_ms(),
            time_window_ms: default_time_window_ms(),
        }
    }
}

impl BreakerSettings {
    fn validate(&self, section: &'static str) -> Result<(), ValidationError> {
        if self.failure_threshold == 0
            || self.success_threshold == 0
            || self.timeout_ms == 0
            || self.time_window_ms == 0
        {
            return Err(ValidationError::InvalidBreaker(section));
        }
        Ok(())
    }
}

impl From<BreakerSettings> for CircuitBreakerConfig {
    fn from(settings: BreakerSettings) -> Self {
        Self {
            failure_threshold: settings.failure_threshold,
            success_threshold: settings.success_threshold,
            timeout: Duration::from_millis(settings.timeout_ms),
            time_window: Duration::from_millis(settings.time_window_ms),
        }
    }
}

impl ResilienceConfig {
    pub fn default_breaker(&self) -> CircuitBreakerConfig {
        self.default.into()
    }

    /// Service configs with presets where no override is set.
    pub fn service_configs(&self) -> ServiceBreakerConfigs {
        let presets = ServiceBreakerConfigs::default();
        ServiceBreakerConfigs {
            ai: self.ai.map_or(presets.ai, Into::into),
            keywords: self.keywords.map_or(presets.keywords, Into::into),
            inventory: self.inventory.map_or(presets.inventory, Into::into),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.default.validate("resilience.default")?;
        if let Some(ai) = &self.ai {
            ai.validate("resilience.ai")?;
        }
        if let Some(keywords) = &self.keywords {
            keywords.validate("resilience.keywords")?;
        }
        if let Some(inventory) = &self.inventory {
            inventory.validate("resilience.inventory")?;
        }
        Ok(())
    }
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_success_threshold() -> u32 {
    2
}

fn default_timeout_ms() -> u64 {
    60_000
}

fn default_time_window_ms() -> u64 {
    60_000
}

//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `OPPORTUNITY_SCOUT`
//! prefix and nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use opportunity_scout::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Running up to {} iterations", config.optimizer.max_iterations);
//! ```

mod ai;
mod error;
mod inventory;
mod keyword_research;
mod optimizer;
mod resilience;
mod storage;

pub use ai::AiConfig;
pub use error::{ConfigError, ValidationError};
pub use inventory::InventoryConfig;
pub use keyword_research::KeywordResearchConfig;
pub use optimizer::OptimizerSettings;
pub use resilience::{BreakerSettings, ResilienceConfig};
pub use storage::{DatabaseConfig, RedisConfig};

use serde::Deserialize;

use crate::application::optimizer::OptimizationConfig;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Emit logs as JSON lines instead of human-readable text
    #[serde(default)]
    pub log_json: bool,

    /// Suggestion generator (Anthropic)
    #[serde(default)]
    pub ai: AiConfig,

    /// Keyword metrics provider (DataForSEO)
    #[serde(default)]
    pub keyword_research: KeywordResearchConfig,

    /// Experience inventory provider (Holibob)
    #[serde(default)]
    pub inventory: InventoryConfig,

    /// Shared breaker state; breakers are process-local when absent
    pub redis: Option<RedisConfig>,

    /// Opportunity store; results are kept in memory when absent
    pub database: Option<DatabaseConfig>,

    #[serde(default)]
    pub resilience: ResilienceConfig,

    #[serde(default)]
    pub optimizer: OptimizerSettings,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `OPPORTUNITY_SCOUT` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `OPPORTUNITY_SCOUT__AI__ANTHROPIC_API_KEY=...` -> `ai.anthropic_api_key`
    /// - `OPPORTUNITY_SCOUT__OPTIMIZER__MAX_ITERATIONS=3` -> `optimizer.max_iterations = 3`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("OPPORTUNITY_SCOUT")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for the first invalid section. A missing
    /// Anthropic key is reported as `NoAiProviderConfigured`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.ai.validate()?;
        self.keyword_research.validate()?;
        self.inventory.validate()?;
        if let Some(redis) = &self.redis {
            redis.validate()?;
        }
        if let Some(database) = &self.database {
            database.validate()?;
        }
        self.resilience.validate()?;
        Ok(())
    }

    /// Builds the optimizer run configuration, checking its semantic rules.
    pub fn optimization_config(&self) -> Result<OptimizationConfig, ConfigError> {
        let config = self.optimizer.to_optimization_config(&self.inventory)?;
        config
            .validate()
            .map_err(|e| ValidationError::InvalidOptimizer(e.to_string()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "OPPORTUNITY_SCOUT__AI__ANTHROPIC_API_KEY",
        "OPPORTUNITY_SCOUT__KEYWORD_RESEARCH__LOGIN",
        "OPPORTUNITY_SCOUT__KEYWORD_RESEARCH__PASSWORD",
        "OPPORTUNITY_SCOUT__INVENTORY__API_KEY",
        "OPPORTUNITY_SCOUT__REDIS__URL",
        "OPPORTUNITY_SCOUT__OPTIMIZER__MAX_ITERATIONS",
        "OPPORTUNITY_SCOUT__OPTIMIZER__NARROWING_FACTOR",
        "OPPORTUNITY_SCOUT__RESILIENCE__AI__FAILURE_THRESHOLD",
        "OPPORTUNITY_SCOUT__LOG_JSON",
    ];

    fn set_minimal_env() {
        env::set_var("OPPORTUNITY_SCOUT__AI__ANTHROPIC_API_KEY", "sk-ant-xxx");
        env::set_var("OPPORTUNITY_SCOUT__KEYWORD_RESEARCH__LOGIN", "scout@example.com");
        env::set_var("OPPORTUNITY_SCOUT__KEYWORD_RESEARCH__PASSWORD", "secret");
        env::set_var("OPPORTUNITY_SCOUT__INVENTORY__API_KEY", "hb-key");
    }

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.ai.anthropic_api_key.as_deref(), Some("sk-ant-xxx"));
        assert_eq!(
            config.keyword_research.credentials(),
            Some(("scout@example.com", "secret"))
        );
        assert!(config.redis.is_none());
        assert!(config.database.is_none());
        assert!(!config.log_json);
    }

    #[test]
    fn test_validate_full_config() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.validate().is_ok());
        assert!(config.optimization_config().is_ok());
    }

    #[test]
    fn test_missing_anthropic_key_fails_validation() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::remove_var("OPPORTUNITY_SCOUT__AI__ANTHROPIC_API_KEY");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::NoAiProviderConfigured)
        ));
    }

    #[test]
    fn test_nested_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("OPPORTUNITY_SCOUT__OPTIMIZER__MAX_ITERATIONS", "3");
        env::set_var("OPPORTUNITY_SCOUT__RESILIENCE__AI__FAILURE_THRESHOLD", "9");
        env::set_var("OPPORTUNITY_SCOUT__REDIS__URL", "redis://localhost:6379");
        env::set_var("OPPORTUNITY_SCOUT__LOG_JSON", "true");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.optimizer.max_iterations, 3);
        assert_eq!(config.resilience.service_configs().ai.failure_threshold, 9);
        assert_eq!(
            config.redis.as_ref().map(|r| r.url.as_str()),
            Some("redis://localhost:6379")
        );
        assert!(config.log_json);
    }

    #[test]
    fn test_invalid_optimizer_settings_rejected() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("OPPORTUNITY_SCOUT__OPTIMIZER__NARROWING_FACTOR", "1.5");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(matches!(
            config.optimization_config(),
            Err(ConfigError::ValidationFailed(ValidationError::InvalidOptimizer(_)))
        ));
    }
}

//! Optimizer run configuration
//!
//! Mirrors the tunable knobs of `OptimizationConfig`. Seeds and the inventory
//! landscape are read from JSON files when paths are given.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::ConfigError;
use super::inventory::InventoryConfig;
use crate::application::optimizer::OptimizationConfig;
use crate::domain::opportunity::{InventoryLandscape, SeedSuggestion};

#[derive(Debug, Clone, Deserialize)]
pub struct OptimizerSettings {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    #[serde(default = "default_initial_suggestions")]
    pub initial_suggestions_count: usize,

    #[serde(default = "default_narrowing_factor")]
    pub narrowing_factor: f64,

    #[serde(default = "default_min_score")]
    pub min_score_threshold: u8,

    #[serde(default = "default_target_score")]
    pub target_score_threshold: u8,

    /// Percent
    #[serde(default = "default_early_stop")]
    pub early_stop_improvement_threshold: f64,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_explanation_top_k")]
    pub explanation_top_k: usize,

    #[serde(default = "default_final_min_volume")]
    pub final_min_cluster_volume: u64,

    #[serde(default = "default_final_min_score")]
    pub final_min_score: u8,

    pub max_api_cost_usd: Option<f64>,

    pub max_duration_secs: Option<u64>,

    #[serde(default = "default_true")]
    pub persist_results: bool,

    /// JSON array of seed suggestions
    pub seeds_file: Option<PathBuf>,

    /// JSON inventory landscape
    pub landscape_file: Option<PathBuf>,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            initial_suggestions_count: default_initial_suggestions(),
            narrowing_factor: default_narrowing_factor(),
            min_score_threshold: default_min_score(),
            target_score_threshold: default_target_score(),
            early_stop_improvement_threshold: default_early_stop(),
            batch_size: default_batch_size(),
            explanation_top_k: default_explanation_top_k(),
            final_min_cluster_volume: default_final_min_volume(),
            final_min_score: default_final_min_score(),
            max_api_cost_usd: None,
            max_duration_secs: None,
            persist_results: true,
            seeds_file: None,
            landscape_file: None,
        }
    }
}

impl OptimizerSettings {
    /// Builds the run configuration, reading seed and landscape files.
    pub fn to_optimization_config(
        &self,
        inventory: &InventoryConfig,
    ) -> Result<OptimizationConfig, ConfigError> {
        let mut config = OptimizationConfig {
            max_iterations: self.max_iterations,
            initial_suggestions_count: self.initial_suggestions_count,
            narrowing_factor: self.narrowing_factor,
            min_score_threshold: self.min_score_threshold,
            target_score_threshold: self.target_score_threshold,
            early_stop_improvement_threshold: self.early_stop_improvement_threshold,
            batch_size: self.batch_size,
            inventory_concurrency: inventory.concurrency,
            inventory_page_size: inventory.page_size,
            explanation_top_k: self.explanation_top_k,
            final_min_cluster_volume: self.final_min_cluster_volume,
            final_min_score: self.final_min_score,
            max_api_cost_usd: self.max_api_cost_usd,
            max_duration: self.max_duration_secs.map(Duration::from_secs),
            persist_results: self.persist_results,
            request_timeout: inventory.timeout(),
            ..OptimizationConfig::default()
        };

        if let Some(path) = &self.seeds_file {
            config.seed_suggestions = read_json::<Vec<SeedSuggestion>>(path)?;
        }
        if let Some(path) = &self.landscape_file {
            config.inventory_landscape = Some(read_json::<InventoryLandscape>(path)?);
        }
        Ok(config)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let seed_error = |reason: String| ConfigError::SeedFile {
        path: path.display().to_string(),
        reason,
    };
    let raw = std::fs::read_to_string(path).map_err(|e| seed_error(e.to_string()))?;
    serde_json::from_str(&raw).map_err(|e| seed_error(e.to_string()))
}

fn default_max_iterations() -> u32 {
    5
}

fn default_initial_suggestions() -> usize {
    40
}

fn default_narrowing_factor() -> f64 {
    0.7
}

fn default_min_score() -> u8 {
    50
}

fn default_target_score() -> u8 {
    75
}

fn default_early_stop() -> f64 {
    2.0
}

fn default_batch_size() -> usize {
    200
}

fn default_explanation_top_k() -> usize {
    10
}

fn default_final_min_volume() -> u64 {
    100
}

fn default_final_min_score() -> u8 {
    40
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_optimization_config() {
        let built = OptimizerSettings::default()
            .to_optimization_config(&InventoryConfig::default())
            .unwrap();
        let expected = OptimizationConfig::default();

        assert_eq!(built.max_iterations, expected.max_iterations);
        assert_eq!(built.initial_suggestions_count, expected.initial_suggestions_count);
        assert_eq!(built.batch_size, expected.batch_size);
        assert_eq!(built.inventory_concurrency, expected.inventory_concurrency);
        assert_eq!(built.inventory_page_size, expected.inventory_page_size);
        assert!(built.persist_results);
        assert!(built.validate().is_ok());
    }

    #[test]
    fn test_budgets_are_carried_over() {
        let settings = OptimizerSettings {
            max_api_cost_usd: Some(2.5),
            max_duration_secs: Some(600),
            ..Default::default()
        };
        let built = settings
            .to_optimization_config(&InventoryConfig::default())
            .unwrap();

        assert_eq!(built.max_api_cost_usd, Some(2.5));
        assert_eq!(built.max_duration, Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_missing_seed_file_is_reported() {
        let settings = OptimizerSettings {
            seeds_file: Some(PathBuf::from("/nonexistent/seeds.json")),
            ..Default::default()
        };
        let result = settings.to_optimization_config(&InventoryConfig::default());

        assert!(matches!(result, Err(ConfigError::SeedFile { .. })));
    }

    #[test]
    fn test_seed_file_is_parsed() {
        let path = std::env::temp_dir().join(format!("scout-seeds-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"[{"keyword":"london food tours","destination":"London","category":"food tours"}]"#,
        )
        .unwrap();

        let settings = OptimizerSettings {
            seeds_file: Some(path.clone()),
            ..Default::default()
        };
        let built = settings.to_optimization_config(&InventoryConfig::default());
        std::fs::remove_file(&path).ok();

        let seeds = built.unwrap().seed_suggestions;
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].destination, "London");
    }
}

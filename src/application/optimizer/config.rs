//! Run configuration for the opportunity optimizer.

use std::time::Duration;

use super::errors::OptimizerError;
use crate::domain::opportunity::{
    InventoryLandscape, LearningThresholds, ProjectionAssumptions, RankingFilter, ScoringWeights,
    SeedSuggestion,
};

/// Flat prices used to estimate API spend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApiCostModel {
    /// USD per bulk keyword request.
    pub keyword_request_usd: f64,
    /// USD per inventory lookup.
    pub inventory_request_usd: f64,
}

impl Default for ApiCostModel {
    fn default() -> Self {
        Self {
            keyword_request_usd: 0.075,
            inventory_request_usd: 0.0,
        }
    }
}

/// Configuration for one optimization run.
#[derive(Debug, Clone)]
pub struct OptimizationConfig {
    pub max_iterations: u32,
    /// Suggestions requested in the first iteration.
    pub initial_suggestions_count: usize,
    /// Each iteration requests `initial * factor^(i-1)` suggestions.
    pub narrowing_factor: f64,
    pub min_score_threshold: u8,
    pub target_score_threshold: u8,
    /// Percent. Two consecutive improvements below this stop the run.
    pub early_stop_improvement_threshold: f64,
    /// Maximum keywords per bulk metrics request.
    pub batch_size: usize,
    pub inventory_concurrency: usize,
    pub inventory_page_size: u32,
    pub learning_sample_size: usize,
    /// Ranked opportunities explained by the generator; the rest get a template.
    pub explanation_top_k: usize,
    pub final_min_cluster_volume: u64,
    pub final_min_score: u8,
    pub max_api_cost_usd: Option<f64>,
    pub max_duration: Option<Duration>,
    pub persist_results: bool,
    /// Deadline for one generator call, retries included.
    pub generation_timeout: Duration,
    /// Deadline for one keyword or inventory request.
    pub request_timeout: Duration,
    pub seed_suggestions: Vec<SeedSuggestion>,
    pub inventory_landscape: Option<InventoryLandscape>,
    pub scoring_weights: ScoringWeights,
    pub cost_model: ApiCostModel,
    pub projection: ProjectionAssumptions,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            initial_suggestions_count: 40,
            narrowing_factor: 0.7,
            min_score_threshold: 50,
            target_score_threshold: 75,
            early_stop_improvement_threshold: 2.0,
            batch_size: 200,
            inventory_concurrency: 4,
            inventory_page_size: 10,
            learning_sample_size: 5,
            explanation_top_k: 10,
            final_min_cluster_volume: 100,
            final_min_score: 40,
            max_api_cost_usd: None,
            max_duration: None,
            persist_results: true,
            generation_timeout: Duration::from_secs(300),
            request_timeout: Duration::from_secs(30),
            seed_suggestions: Vec::new(),
            inventory_landscape: None,
            scoring_weights: ScoringWeights::default(),
            cost_model: ApiCostModel::default(),
            projection: ProjectionAssumptions::default(),
        }
    }
}

impl OptimizationConfig {
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_seeds(mut self, seeds: Vec<SeedSuggestion>) -> Self {
        self.seed_suggestions = seeds;
        self
    }

    pub fn with_landscape(mut self, landscape: InventoryLandscape) -> Self {
        self.inventory_landscape = Some(landscape);
        self
    }

    pub fn with_cost_budget(mut self, max_usd: f64) -> Self {
        self.max_api_cost_usd = Some(max_usd);
        self
    }

    pub fn with_time_budget(mut self, max_duration: Duration) -> Self {
        self.max_duration = Some(max_duration);
        self
    }

    pub fn with_persist_results(mut self, persist: bool) -> Self {
        self.persist_results = persist;
        self
    }

    /// Number of suggestions to request in 1-based `iteration`.
    pub fn suggestions_for_iteration(&self, iteration: u32) -> usize {
        let exponent = iteration.saturating_sub(1) as i32;
        let count = self.initial_suggestions_count as f64 * self.narrowing_factor.powi(exponent);
        (count.round() as usize).max(1)
    }

    pub fn learning_thresholds(&self) -> LearningThresholds {
        LearningThresholds {
            min_score: self.min_score_threshold,
            target_score: self.target_score_threshold,
            sample_size: self.learning_sample_size,
        }
    }

    pub fn ranking_filter(&self) -> RankingFilter {
        RankingFilter {
            min_cluster_volume: self.final_min_cluster_volume,
            min_score: self.final_min_score,
        }
    }

    /// Semantic checks; a failing config never starts a run.
    pub fn validate(&self) -> Result<(), OptimizerError> {
        let invalid = |msg: &str| Err(OptimizerError::InvalidConfig(msg.to_string()));

        if self.max_iterations == 0 {
            return invalid("max_iterations must be at least 1");
        }
        if self.initial_suggestions_count == 0 {
            return invalid("initial_suggestions_count must be at least 1");
        }
        if !(self.narrowing_factor > 0.0 && self.narrowing_factor <= 1.0) {
            return invalid("narrowing_factor must be in (0, 1]");
        }
        if self.min_score_threshold > 100 || self.target_score_threshold > 100 {
            return invalid("score thresholds must be at most 100");
        }
        if self.min_score_threshold > self.target_score_threshold {
            return invalid("min_score_threshold must not exceed target_score_threshold");
        }
        if !self.early_stop_improvement_threshold.is_finite() || self.early_stop_improvement_threshold < 0.0 {
            return invalid("early_stop_improvement_threshold must be a non-negative number");
        }
        if self.batch_size == 0 || self.inventory_concurrency == 0 || self.inventory_page_size == 0 {
            return invalid("batch_size, inventory_concurrency and inventory_page_size must be positive");
        }
        if self.max_api_cost_usd.is_some_and(|b| !(b > 0.0)) {
            return invalid("max_api_cost_usd must be positive when set");
        }
        if self.scoring_weights.total() <= 0.0 {
            return invalid("scoring weights must not all be zero");
        }
        Ok(())
    }
}

//! Recursive opportunity optimizer.
//!
//! Each iteration generates candidates, drops the ones already in the
//! durable store, validates and scores the rest, and distills learnings that
//! shape the next prompt. After the last iteration (or an early stop) the
//! validated records are merged by keyword, filtered, ranked, explained and
//! optionally persisted.
//!
//! Every external call goes through a circuit breaker from the injected
//! registry. Iteration failures are recorded and skipped; only missing or
//! rejected credentials abort a run.

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::config::OptimizationConfig;
use super::errors::{IterationError, IterationOutcomeError, OptimizerError};
use super::result::{
    ApiCostBreakdown, IterationFailure, IterationResult, OptimizationResult, StopReason,
};
use super::validation::BatchValidator;
use crate::application::resilience::{CircuitBreaker, CircuitBreakerError, CircuitBreakerRegistry};
use crate::domain::foundation::{RunId, Timestamp};
use crate::domain::opportunity::prompt::{
    build_explanation_prompt, build_suggestion_prompt, SUGGESTION_SYSTEM_PROMPT,
};
use crate::domain::opportunity::{
    extract_learnings, merge_across_iterations, rank_merged, should_stop_early,
    templated_explanation, ExplanationSource, IterationCost, IterationLearnings, IterationMetrics,
    MergedOpportunity, OpportunityKey, OpportunitySuggestion, PriorityScorer, PromptContext,
    PromptStage, RankedOpportunity, SuggestionDecoder,
};
use crate::domain::resilience::CircuitBreakerConfig;
use crate::ports::{
    Clock, DomainAvailabilityChecker, GenerationPurpose, GenerationRequest, GeneratorError,
    InventoryGateway, KeywordMetricsGateway, OpportunityRepository, SuggestionGenerator,
};

/// Breaker name for the suggestion generator.
pub const AI_SERVICE: &str = "anthropic";
/// Breaker name for keyword metrics.
pub const KEYWORD_SERVICE: &str = "dataforseo";
/// Breaker name for inventory lookups.
pub const INVENTORY_SERVICE: &str = "holibob";

const SUGGESTION_MAX_TOKENS: u32 = 8_000;
const EXPLANATION_MAX_TOKENS: u32 = 400;

/// Breaker configuration per collaborator, applied when the registry first
/// creates each breaker.
#[derive(Debug, Clone)]
pub struct ServiceBreakerConfigs {
    pub ai: CircuitBreakerConfig,
    pub keywords: CircuitBreakerConfig,
    pub inventory: CircuitBreakerConfig,
}

impl Default for ServiceBreakerConfigs {
    fn default() -> Self {
        Self {
            ai: CircuitBreakerConfig::for_ai_provider(),
            keywords: CircuitBreakerConfig::for_keyword_api(),
            inventory: CircuitBreakerConfig::for_inventory_api(),
        }
    }
}

struct RunBreakers {
    ai: Arc<CircuitBreaker>,
    keywords: Arc<CircuitBreaker>,
    inventory: Arc<CircuitBreaker>,
}

/// State carried from one iteration to the next within a run.
struct RunContext<'a> {
    run_id: RunId,
    config: &'a OptimizationConfig,
    breakers: &'a RunBreakers,
    scorer: PriorityScorer,
    /// Keys already in the durable store, loaded once at run start.
    existing_keys: HashSet<OpportunityKey>,
}

/// Orchestrates optimization runs.
pub struct OpportunityOptimizer {
    generator: Arc<dyn SuggestionGenerator>,
    keywords: Arc<dyn KeywordMetricsGateway>,
    inventory: Arc<dyn InventoryGateway>,
    repository: Arc<dyn OpportunityRepository>,
    domain_checker: Option<Arc<dyn DomainAvailabilityChecker>>,
    registry: Arc<CircuitBreakerRegistry>,
    breaker_configs: ServiceBreakerConfigs,
    clock: Arc<dyn Clock>,
    decoder: SuggestionDecoder,
}

impl OpportunityOptimizer {
    pub fn new(
        generator: Arc<dyn SuggestionGenerator>,
        keywords: Arc<dyn KeywordMetricsGateway>,
        inventory: Arc<dyn InventoryGateway>,
        repository: Arc<dyn OpportunityRepository>,
        registry: Arc<CircuitBreakerRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            generator,
            keywords,
            inventory,
            repository,
            domain_checker: None,
            registry,
            breaker_configs: ServiceBreakerConfigs::default(),
            clock,
            decoder: SuggestionDecoder::new(),
        }
    }

    pub fn with_domain_checker(mut self, checker: Arc<dyn DomainAvailabilityChecker>) -> Self {
        self.domain_checker = Some(checker);
        self
    }

    pub fn with_breaker_configs(mut self, configs: ServiceBreakerConfigs) -> Self {
        self.breaker_configs = configs;
        self
    }

    pub fn with_decoder(mut self, decoder: SuggestionDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    /// Runs to completion, early stop, or budget exhaustion.
    pub async fn run(&self, config: OptimizationConfig) -> Result<OptimizationResult, OptimizerError> {
        let (_keep_open, cancel) = watch::channel(false);
        self.run_with_cancellation(config, cancel).await
    }

    /// Like `run`, but stops between iterations once `cancel` reads `true`.
    /// Whatever was accumulated so far is still ranked.
    pub async fn run_with_cancellation(
        &self,
        config: OptimizationConfig,
        cancel: watch::Receiver<bool>,
    ) -> Result<OptimizationResult, OptimizerError> {
        config.validate()?;
        if !self.generator.is_configured() {
            return Err(OptimizerError::Configuration(
                "no suggestion generator credential configured".to_string(),
            ));
        }

        let run_id = RunId::new();
        let started_at = self.clock.now();
        let generator_info = self.generator.generator_info();
        info!(
            %run_id,
            generator = %generator_info.name,
            model = %generator_info.model,
            max_iterations = config.max_iterations,
            seeds = config.seed_suggestions.len(),
            "Optimization run started"
        );

        let breakers = self.breakers().await;
        let ctx = RunContext {
            run_id,
            config: &config,
            breakers: &breakers,
            scorer: PriorityScorer::new(config.scoring_weights.clone()),
            existing_keys: self.load_existing_keys().await,
        };

        let mut iterations: Vec<IterationResult> = Vec::new();
        let mut history: Vec<IterationMetrics> = Vec::new();
        let mut failed_iterations = Vec::new();
        let mut cost = ApiCostBreakdown::default();
        let mut stop_reason = StopReason::Completed;

        for iteration in 1..=config.max_iterations {
            if let Some(reason) = self.check_budgets(&config, &cost, &started_at, &cancel) {
                info!(%run_id, iteration, reason = reason.as_str(), "Stopping before iteration");
                stop_reason = reason;
                break;
            }

            let previous = iterations.last();
            let mut iteration_cost = IterationCost::default();
            let outcome = self
                .run_iteration(&ctx, iteration, previous, &mut iteration_cost)
                .await;
            cost.add_iteration(&iteration_cost);

            match outcome {
                Ok(result) => {
                    history.push(result.metrics.clone());
                    iterations.push(result);
                    if should_stop_early(&history, config.early_stop_improvement_threshold) {
                        info!(%run_id, iteration, "Improvement flattened, stopping early");
                        stop_reason = StopReason::EarlyStop;
                        break;
                    }
                }
                Err(IterationOutcomeError::Fatal(e)) => {
                    error!(%run_id, iteration, error = %e, "Run aborted");
                    return Err(e);
                }
                Err(IterationOutcomeError::Iteration(e)) => {
                    warn!(%run_id, iteration, kind = e.kind().as_str(), error = %e, "Iteration failed, continuing");
                    failed_iterations.push(IterationFailure {
                        iteration,
                        error: e.to_string(),
                        kind: e.kind(),
                    });
                }
            }
        }

        let merged = rank_merged(
            merge_across_iterations(iterations.iter().flat_map(|i| i.validated.iter())),
            config.ranking_filter(),
        );
        let final_opportunities = self.explain(&config, &breakers.ai, merged, &mut cost).await;
        let persisted = if config.persist_results {
            self.persist(&final_opportunities).await
        } else {
            0
        };

        let mut result = OptimizationResult {
            run_id,
            iterations,
            final_opportunities,
            cost,
            stop_reason,
            failed_iterations,
            persisted,
            started_at,
            finished_at: self.clock.now(),
            summary: String::new(),
        };
        result.summary = result.build_summary(config.max_iterations);
        info!(
            %run_id,
            ranked = result.final_opportunities.len(),
            partial = result.is_partial(),
            cost_usd = result.cost.total_usd(),
            "{}",
            result.summary
        );

        Ok(result)
    }

    async fn breakers(&self) -> RunBreakers {
        let configs = &self.breaker_configs;
        RunBreakers {
            ai: self.registry.get_breaker(AI_SERVICE, Some(configs.ai.clone())).await,
            keywords: self
                .registry
                .get_breaker(KEYWORD_SERVICE, Some(configs.keywords.clone()))
                .await,
            inventory: self
                .registry
                .get_breaker(INVENTORY_SERVICE, Some(configs.inventory.clone()))
                .await,
        }
    }

    async fn load_existing_keys(&self) -> HashSet<OpportunityKey> {
        match self.repository.find_existing_keys().await {
            Ok(keys) => {
                debug!(count = keys.len(), "Loaded existing opportunity keys");
                keys
            }
            Err(e) => {
                warn!(error = %e, "Could not load existing opportunities, pre-filter disabled for this run");
                HashSet::new()
            }
        }
    }

    fn check_budgets(
        &self,
        config: &OptimizationConfig,
        cost: &ApiCostBreakdown,
        started_at: &Timestamp,
        cancel: &watch::Receiver<bool>,
    ) -> Option<StopReason> {
        if *cancel.borrow() {
            return Some(StopReason::Cancelled);
        }
        if config.max_api_cost_usd.is_some_and(|max| cost.total_usd() >= max) {
            return Some(StopReason::BudgetExhausted);
        }
        let elapsed_ms = self.clock.now().millis_since(started_at);
        if config
            .max_duration
            .is_some_and(|max| u128::from(elapsed_ms) >= max.as_millis())
        {
            return Some(StopReason::TimeBudgetExhausted);
        }
        None
    }

    async fn run_iteration(
        &self,
        ctx: &RunContext<'_>,
        iteration: u32,
        previous: Option<&IterationResult>,
        cost: &mut IterationCost,
    ) -> Result<IterationResult, IterationOutcomeError> {
        let config = ctx.config;
        let started = self.clock.now_millis();
        let target_count = config.suggestions_for_iteration(iteration);
        info!(run_id = %ctx.run_id, iteration, target_count, "Iteration started");

        let suggestions = self
            .generate(ctx, iteration, target_count, previous.map(|p| &p.learnings), cost)
            .await?;

        let (fresh, pre_filtered) = pre_filter(&suggestions, &ctx.existing_keys);
        debug!(iteration, generated = suggestions.len(), pre_filtered, "Pre-filter applied");

        let validator = BatchValidator {
            keywords: self.keywords.as_ref(),
            inventory: self.inventory.as_ref(),
            domain_checker: self.domain_checker.as_deref(),
            keyword_breaker: &ctx.breakers.keywords,
            inventory_breaker: &ctx.breakers.inventory,
            scorer: &ctx.scorer,
            clock: self.clock.as_ref(),
            config,
        };
        let outcome = validator.validate(fresh).await?;

        cost.keyword_usd += outcome.keyword_requests as f64 * config.cost_model.keyword_request_usd;
        cost.inventory_usd +=
            outcome.inventory_requests as f64 * config.cost_model.inventory_request_usd;

        let learnings = extract_learnings(&outcome.validated, config.learning_thresholds());
        let metrics = IterationMetrics {
            iteration,
            suggestions_generated: suggestions.len(),
            pre_filtered,
            zero_volume_dropped: outcome.zero_volume_dropped,
            cost: *cost,
            duration_ms: self.clock.now_millis().saturating_sub(started),
            ..IterationMetrics::default()
        }
        .with_scores(&outcome.validated, previous.map(|p| p.metrics.average_score));

        info!(
            run_id = %ctx.run_id,
            iteration,
            validated = metrics.validated,
            average_score = metrics.average_score,
            top_score = metrics.top_score,
            improvement_pct = metrics.improvement_pct,
            "Iteration complete"
        );

        Ok(IterationResult {
            iteration,
            suggestions,
            validated: outcome.validated,
            learnings,
            metrics,
            completed_at: self.clock.now(),
        })
    }

    async fn generate(
        &self,
        ctx: &RunContext<'_>,
        iteration: u32,
        target_count: usize,
        previous: Option<&IterationLearnings>,
        cost: &mut IterationCost,
    ) -> Result<Vec<OpportunitySuggestion>, IterationOutcomeError> {
        let config = ctx.config;
        let prompt_ctx = PromptContext {
            iteration,
            max_iterations: config.max_iterations,
            target_count,
            seeds: &config.seed_suggestions,
            previous,
            landscape: config.inventory_landscape.as_ref(),
        };
        let temperature = match prompt_ctx.stage() {
            PromptStage::Exploratory | PromptStage::SeedEvaluation => 0.8,
            PromptStage::Refinement => 0.6,
            PromptStage::Final => 0.4,
        };
        let request = GenerationRequest::new(
            GenerationPurpose::Suggestions,
            build_suggestion_prompt(&prompt_ctx),
        )
        .with_system_prompt(SUGGESTION_SYSTEM_PROMPT)
        .with_max_tokens(SUGGESTION_MAX_TOKENS)
        .with_temperature(temperature)
        .with_trace_id(ctx.run_id.to_string());

        let response = ctx
            .breakers
            .ai
            .execute_with_timeout(config.generation_timeout, || self.generator.generate(request))
            .await
            .map_err(classify_generator_error)?;
        cost.ai_usd += response.usage.cost_usd();

        let batch = self
            .decoder
            .decode(&response.content)
            .map_err(|e| IterationOutcomeError::Iteration(e.into()))?;
        if batch.skipped > 0 {
            debug!(iteration, skipped = batch.skipped, "Skipped malformed suggestion entries");
        }
        debug!(iteration, strategy = ?batch.strategy, count = batch.suggestions.len(), "Decoded suggestions");

        Ok(batch
            .suggestions
            .into_iter()
            .filter_map(|raw| raw.into_suggestion(iteration))
            .collect())
    }

    async fn explain(
        &self,
        config: &OptimizationConfig,
        ai_breaker: &CircuitBreaker,
        merged: Vec<MergedOpportunity>,
        cost: &mut ApiCostBreakdown,
    ) -> Vec<RankedOpportunity> {
        let mut ranked = Vec::with_capacity(merged.len());

        for (index, opportunity) in merged.into_iter().enumerate() {
            let rank = index + 1;
            let (explanation, source) = if rank <= config.explanation_top_k {
                match self.generate_explanation(config, ai_breaker, &opportunity, rank).await {
                    Ok((text, usd)) => {
                        cost.explanation_usd += usd;
                        (text, ExplanationSource::Generated)
                    }
                    Err(e) => {
                        debug!(rank, error = %e, "Falling back to templated explanation");
                        (templated_explanation(&opportunity, rank), ExplanationSource::Templated)
                    }
                }
            } else {
                (templated_explanation(&opportunity, rank), ExplanationSource::Templated)
            };

            ranked.push(RankedOpportunity::new(
                rank,
                opportunity,
                explanation,
                source,
                &config.projection,
            ));
        }

        ranked
    }

    async fn generate_explanation(
        &self,
        config: &OptimizationConfig,
        ai_breaker: &CircuitBreaker,
        opportunity: &MergedOpportunity,
        rank: usize,
    ) -> Result<(String, f64), CircuitBreakerError<GeneratorError>> {
        let request = GenerationRequest::new(
            GenerationPurpose::Explanation,
            build_explanation_prompt(&opportunity.best, rank),
        )
        .with_max_tokens(EXPLANATION_MAX_TOKENS)
        .with_temperature(0.3);

        let response = ai_breaker
            .execute_with_timeout(config.generation_timeout, || self.generator.generate(request))
            .await?;

        let text = response.content.trim();
        if text.is_empty() {
            return Err(CircuitBreakerError::Upstream(GeneratorError::parse(
                "empty explanation",
            )));
        }
        Ok((text.to_string(), response.usage.cost_usd()))
    }

    async fn persist(&self, ranked: &[RankedOpportunity]) -> usize {
        let mut persisted = 0;
        for opportunity in ranked {
            match self.repository.upsert(opportunity).await {
                Ok(()) => persisted += 1,
                Err(e) => warn!(keyword = %opportunity.keyword(), error = %e, "Failed to persist opportunity"),
            }
        }
        persisted
    }
}

/// Splits off suggestions whose key is already known or repeated in the batch.
fn pre_filter(
    suggestions: &[OpportunitySuggestion],
    existing: &HashSet<OpportunityKey>,
) -> (Vec<OpportunitySuggestion>, usize) {
    let mut seen = HashSet::new();
    let mut pre_filtered = 0;
    let fresh = suggestions
        .iter()
        .filter(|s| {
            let key = s.key();
            if existing.contains(&key) {
                pre_filtered += 1;
                return false;
            }
            seen.insert(key)
        })
        .cloned()
        .collect();
    (fresh, pre_filtered)
}

fn classify_generator_error(e: CircuitBreakerError<GeneratorError>) -> IterationOutcomeError {
    match e {
        CircuitBreakerError::Upstream(inner) if inner.is_configuration() => {
            IterationOutcomeError::Fatal(OptimizerError::Configuration(inner.to_string()))
        }
        CircuitBreakerError::Open(open) => IterationError::CircuitOpen(open).into(),
        other => IterationError::Generator(other.to_string()).into(),
    }
}

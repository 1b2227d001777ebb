//! Batch validation of one iteration's suggestions.
//!
//! One bulk metrics lookup covers every primary and cluster keyword of the
//! batch, chunked by `batch_size`. Inventory and domain checks then run per
//! suggestion with bounded concurrency. A failed metrics request discards
//! the whole batch; a failed inventory lookup only zeroes that suggestion's
//! inventory.

use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use super::config::OptimizationConfig;
use super::errors::{IterationError, IterationOutcomeError, OptimizerError};
use crate::application::resilience::{CircuitBreaker, CircuitBreakerError};
use crate::domain::opportunity::{
    aggregate_cluster, normalize, proxy_metrics, ClusterData, DomainAvailability, InventorySnapshot, KeywordMetrics,
    OpportunitySuggestion, PriorityScorer, ScoringInput, ValidatedOpportunity,
};
use crate::ports::{
    Clock, DomainAvailabilityChecker, InventoryFilter, InventoryGateway, KeywordGatewayError,
    KeywordMetricsGateway,
};

/// Validated opportunities plus the request counts behind them.
#[derive(Debug, Default)]
pub(crate) struct ValidationOutcome {
    pub validated: Vec<ValidatedOpportunity>,
    pub zero_volume_dropped: usize,
    pub keyword_requests: usize,
    pub inventory_requests: usize,
}

pub(crate) struct BatchValidator<'a> {
    pub keywords: &'a dyn KeywordMetricsGateway,
    pub inventory: &'a dyn InventoryGateway,
    pub domain_checker: Option<&'a dyn DomainAvailabilityChecker>,
    pub keyword_breaker: &'a CircuitBreaker,
    pub inventory_breaker: &'a CircuitBreaker,
    pub scorer: &'a PriorityScorer,
    pub clock: &'a dyn Clock,
    pub config: &'a OptimizationConfig,
}

struct Candidate {
    suggestion: OpportunitySuggestion,
    metrics: KeywordMetrics,
    cluster: ClusterData,
}

impl BatchValidator<'_> {
    pub(crate) async fn validate(
        &self,
        suggestions: Vec<OpportunitySuggestion>,
    ) -> Result<ValidationOutcome, IterationOutcomeError> {
        let mut outcome = ValidationOutcome::default();
        if suggestions.is_empty() {
            return Ok(outcome);
        }

        let keywords = union_keywords(&suggestions);
        let (lookup, requests) = self.fetch_metrics(&keywords).await?;
        outcome.keyword_requests = requests;

        let mut candidates = Vec::with_capacity(suggestions.len());
        for suggestion in suggestions {
            let all = suggestion.all_keywords();
            let cluster = aggregate_cluster(all.iter().map(String::as_str), &lookup);
            if cluster.total_volume == 0 {
                debug!(keyword = %suggestion.keyword, "Dropping suggestion with zero cluster volume");
                outcome.zero_volume_dropped += 1;
                continue;
            }
            let metrics = match lookup.get(&normalize(&suggestion.keyword)) {
                Some(m) => m.clone(),
                None => {
                    debug!(keyword = %suggestion.keyword, "Primary keyword has no metrics, using cluster proxy");
                    proxy_metrics(suggestion.keyword.clone(), &cluster, &lookup)
                }
            };
            candidates.push(Candidate {
                suggestion,
                metrics,
                cluster,
            });
        }

        outcome.inventory_requests = candidates.len();
        outcome.validated = stream::iter(candidates)
            .map(|candidate| self.enrich(candidate))
            .buffered(self.config.inventory_concurrency.max(1))
            .collect()
            .await;

        Ok(outcome)
    }

    async fn fetch_metrics(
        &self,
        keywords: &[String],
    ) -> Result<(HashMap<String, KeywordMetrics>, usize), IterationOutcomeError> {
        let mut lookup = HashMap::with_capacity(keywords.len());
        let mut requests = 0;

        for chunk in keywords.chunks(self.config.batch_size.max(1)) {
            requests += 1;
            let metrics = self
                .keyword_breaker
                .execute_with_timeout(self.config.request_timeout, || {
                    self.keywords.get_bulk_metrics(chunk)
                })
                .await
                .map_err(classify_keyword_error)?;

            for m in metrics {
                lookup.insert(normalize(&m.keyword), m);
            }
        }

        debug!(keywords = keywords.len(), found = lookup.len(), requests, "Keyword metrics fetched");
        Ok((lookup, requests))
    }

    async fn enrich(&self, candidate: Candidate) -> ValidatedOpportunity {
        let Candidate {
            suggestion,
            metrics,
            cluster,
        } = candidate;

        let inventory = self.lookup_inventory(&suggestion).await;
        let domain_availability = self.check_domain(&suggestion).await;

        let input = ScoringInput::from_parts(
            &metrics,
            Some(&cluster),
            &inventory,
            domain_availability,
            suggestion.confidence_score,
        );
        let priority_score = self.scorer.score(&input);

        ValidatedOpportunity {
            suggestion,
            keyword_metrics: metrics,
            cluster_data: Some(cluster),
            inventory,
            domain_availability,
            priority_score,
            validated_at: self.clock.now(),
        }
    }

    async fn lookup_inventory(&self, suggestion: &OpportunitySuggestion) -> InventorySnapshot {
        let filter =
            InventoryFilter::new(&suggestion.destination).with_category(&suggestion.category);

        let result = self
            .inventory_breaker
            .execute_with_timeout(self.config.request_timeout, || {
                self.inventory.discover(&filter, self.config.inventory_page_size)
            })
            .await;

        match result {
            Ok(page) => {
                let mut categories: Vec<String> = page
                    .products
                    .iter()
                    .filter_map(|p| p.category.clone())
                    .collect::<HashSet<_>>()
                    .into_iter()
                    .collect();
                categories.sort();
                InventorySnapshot {
                    product_count: page.total_count,
                    categories,
                    lookup_failed: false,
                }
            }
            Err(e) => {
                warn!(
                    destination = %suggestion.destination,
                    category = %suggestion.category,
                    error = %e,
                    "Inventory lookup failed, treating as zero inventory"
                );
                InventorySnapshot::unavailable()
            }
        }
    }

    async fn check_domain(&self, suggestion: &OpportunitySuggestion) -> DomainAvailability {
        match (self.domain_checker, suggestion.suggested_domain.as_deref()) {
            (Some(checker), Some(domain)) => checker.check(domain).await,
            _ => DomainAvailability::Unknown,
        }
    }
}

fn classify_keyword_error(e: CircuitBreakerError<KeywordGatewayError>) -> IterationOutcomeError {
    match e {
        CircuitBreakerError::Upstream(inner) if inner.is_configuration() => {
            IterationOutcomeError::Fatal(OptimizerError::Configuration(inner.to_string()))
        }
        CircuitBreakerError::Open(open) => IterationError::CircuitOpen(open).into(),
        other => IterationError::ValidationBatch(other.to_string()).into(),
    }
}

/// Primary and cluster keywords of every suggestion, normalized, first
/// occurrence order.
pub(crate) fn union_keywords(suggestions: &[OpportunitySuggestion]) -> Vec<String> {
    let mut seen = HashSet::new();
    suggestions
        .iter()
        .flat_map(|s| s.all_keywords())
        .filter(|k| seen.insert(k.clone()))
        .collect()
}

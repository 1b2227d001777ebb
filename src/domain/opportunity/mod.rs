//! Opportunity discovery domain.
//!
//! Pure algorithms used by the optimizer: decoding generator output,
//! cluster aggregation, scoring, learning extraction, iteration metrics,
//! prompt construction, and final ranking.

pub mod decoder;
pub mod keyword_metrics;
pub mod learnings;
pub mod metrics;
pub mod prompt;
pub mod ranking;
pub mod scoring;
pub mod suggestion;
pub mod validated;

pub use decoder::{DecodeError, DecodeStrategy, DecodedBatch, RawSuggestion, SuggestionDecoder};
pub use keyword_metrics::{
    aggregate_cluster, derive_trend, detect_seasonality, proxy_metrics, ClusterData, KeywordMetrics,
    MonthlySearches, Trend,
};
pub use learnings::{extract_learnings, IterationLearnings, LearningThresholds, PerformerSummary};
pub use metrics::{should_stop_early, IterationCost, IterationMetrics, ScoreDistribution};
pub use prompt::{InventoryLandscape, LandscapeEntry, PromptContext, PromptStage};
pub use ranking::{
    merge_across_iterations, project_value, rank_merged, templated_explanation,
    DomainSuggestions, ExplanationSource, MergedOpportunity, OpportunityJourney,
    ProjectedValue, ProjectionAssumptions, RankedOpportunity, RankingFilter, ScorePoint,
};
pub use scoring::{PriorityScorer, ScoreBreakdown, ScoringInput, ScoringWeights};
pub use suggestion::{normalize, OpportunityKey, OpportunitySuggestion, SeedSuggestion};
pub use validated::{DomainAvailability, InventorySnapshot, ValidatedOpportunity};

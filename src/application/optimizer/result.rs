//! Outputs of an optimization run.

use serde::{Deserialize, Serialize};
use std::fmt::Write;

use super::errors::IterationFailureKind;
use crate::domain::foundation::{RunId, Timestamp};
use crate::domain::opportunity::{
    IterationCost, IterationLearnings, IterationMetrics, OpportunitySuggestion, RankedOpportunity,
    ValidatedOpportunity,
};

/// One completed iteration. Never modified after it is produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationResult {
    pub iteration: u32,
    /// Decoded suggestions, before pre-filtering.
    pub suggestions: Vec<OpportunitySuggestion>,
    pub validated: Vec<ValidatedOpportunity>,
    pub learnings: IterationLearnings,
    pub metrics: IterationMetrics,
    pub completed_at: Timestamp,
}

/// An iteration that failed and was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationFailure {
    pub iteration: u32,
    pub error: String,
    pub kind: IterationFailureKind,
}

/// Why the iteration loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Every configured iteration was attempted.
    Completed,
    /// Improvement flattened out.
    EarlyStop,
    BudgetExhausted,
    TimeBudgetExhausted,
    Cancelled,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::Completed => "completed",
            StopReason::EarlyStop => "early stop",
            StopReason::BudgetExhausted => "cost budget exhausted",
            StopReason::TimeBudgetExhausted => "time budget exhausted",
            StopReason::Cancelled => "cancelled",
        }
    }

    /// True when the run stopped before its natural end.
    pub fn is_interrupted(&self) -> bool {
        matches!(
            self,
            StopReason::BudgetExhausted | StopReason::TimeBudgetExhausted | StopReason::Cancelled
        )
    }
}

/// Estimated API spend for a run, in USD.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCostBreakdown {
    /// Suggestion generation.
    pub ai_usd: f64,
    /// Explanations for the top ranked opportunities.
    pub explanation_usd: f64,
    pub keyword_usd: f64,
    pub inventory_usd: f64,
}

impl ApiCostBreakdown {
    pub fn add_iteration(&mut self, cost: &IterationCost) {
        self.ai_usd += cost.ai_usd;
        self.keyword_usd += cost.keyword_usd;
        self.inventory_usd += cost.inventory_usd;
    }

    pub fn total_usd(&self) -> f64 {
        self.ai_usd + self.explanation_usd + self.keyword_usd + self.inventory_usd
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    pub run_id: RunId,
    pub iterations: Vec<IterationResult>,
    pub final_opportunities: Vec<RankedOpportunity>,
    pub cost: ApiCostBreakdown,
    pub stop_reason: StopReason,
    pub failed_iterations: Vec<IterationFailure>,
    /// Ranked opportunities written to the durable store.
    pub persisted: usize,
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
    pub summary: String,
}

impl OptimizationResult {
    /// True when iterations failed or the run was interrupted.
    pub fn is_partial(&self) -> bool {
        !self.failed_iterations.is_empty() || self.stop_reason.is_interrupted()
    }

    pub fn total_validated(&self) -> usize {
        self.iterations.iter().map(|i| i.validated.len()).sum()
    }

    pub fn duration_ms(&self) -> u64 {
        self.finished_at.millis_since(&self.started_at)
    }

    pub(crate) fn build_summary(&self, max_iterations: u32) -> String {
        let mut out = String::new();
        let _ = write!(
            out,
            "Run {}: {} of {} iterations completed ({}), {} opportunities validated, {} ranked",
            self.run_id,
            self.iterations.len(),
            max_iterations,
            self.stop_reason.as_str(),
            self.total_validated(),
            self.final_opportunities.len(),
        );
        if let Some(top) = self.final_opportunities.first() {
            let _ = write!(out, ", top \"{}\" at {}/100", top.keyword(), top.score().value());
        }
        let _ = write!(out, ", API cost ${:.2}", self.cost.total_usd());
        if self.is_partial() {
            let _ = write!(
                out,
                ". PARTIAL RESULT: {} iteration(s) failed",
                self.failed_iterations.len()
            );
            if self.stop_reason.is_interrupted() {
                let _ = write!(out, ", stopped early ({})", self.stop_reason.as_str());
            }
        }
        out
    }
}

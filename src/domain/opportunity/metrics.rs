//! Per-iteration metrics and the early-stop rule.

use serde::{Deserialize, Serialize};

use super::validated::ValidatedOpportunity;

/// Count of validated opportunities per score band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDistribution {
    /// 85 and above.
    pub excellent: usize,
    /// 70 to 84.
    pub good: usize,
    /// 50 to 69.
    pub moderate: usize,
    /// Below 50.
    pub poor: usize,
}

impl ScoreDistribution {
    pub fn from_scores(scores: impl IntoIterator<Item = u8>) -> Self {
        let mut d = Self::default();
        for s in scores {
            match s {
                85.. => d.excellent += 1,
                70..=84 => d.good += 1,
                50..=69 => d.moderate += 1,
                _ => d.poor += 1,
            }
        }
        d
    }

    pub fn total(&self) -> usize {
        self.excellent + self.good + self.moderate + self.poor
    }
}

/// Estimated spend for one iteration, in USD.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationCost {
    pub ai_usd: f64,
    pub keyword_usd: f64,
    pub inventory_usd: f64,
}

impl IterationCost {
    pub fn total(&self) -> f64 {
        self.ai_usd + self.keyword_usd + self.inventory_usd
    }
}

/// Summary statistics of one iteration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationMetrics {
    pub iteration: u32,
    pub suggestions_generated: usize,
    /// Suggestions removed because they already exist in the durable store.
    pub pre_filtered: usize,
    pub validated: usize,
    /// Suggestions dropped because their cluster had no search volume.
    pub zero_volume_dropped: usize,
    pub average_score: f64,
    pub top_score: u8,
    pub distribution: ScoreDistribution,
    /// Change in average score relative to the previous iteration, in percent.
    pub improvement_pct: Option<f64>,
    pub cost: IterationCost,
    pub duration_ms: u64,
}

impl IterationMetrics {
    /// Fills the score statistics from validated opportunities.
    pub fn with_scores(mut self, validated: &[ValidatedOpportunity], previous_average: Option<f64>) -> Self {
        let scores: Vec<u8> = validated.iter().map(|v| v.priority_score.value()).collect();
        self.validated = scores.len();
        self.average_score = average(&scores);
        self.top_score = scores.iter().copied().max().unwrap_or(0);
        self.distribution = ScoreDistribution::from_scores(scores);
        self.improvement_pct = improvement_pct(previous_average, self.average_score);
        self
    }
}

fn average(scores: &[u8]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().map(|s| f64::from(*s)).sum::<f64>() / scores.len() as f64
}

/// Percent change from `previous` to `current`.
///
/// Undefined for the first iteration or when the previous average was zero.
pub fn improvement_pct(previous: Option<f64>, current: f64) -> Option<f64> {
    match previous {
        Some(prev) if prev > 0.0 => Some((current - prev) / prev * 100.0),
        _ => None,
    }
}

/// True once at least three iterations ran and the last two improvements
/// were both below `threshold_pct` in magnitude.
pub fn should_stop_early(history: &[IterationMetrics], threshold_pct: f64) -> bool {
    if history.len() < 3 {
        return false;
    }
    history[history.len() - 2..]
        .iter()
        .all(|m| m.improvement_pct.is_some_and(|i| i.abs() < threshold_pct))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_improvement(improvement: Option<f64>) -> IterationMetrics {
        IterationMetrics {
            improvement_pct: improvement,
            ..Default::default()
        }
    }

    #[test]
    fn distribution_buckets_are_inclusive_at_lower_bound() {
        let d = ScoreDistribution::from_scores([85, 84, 70, 69, 50, 49, 0, 100]);
        assert_eq!(d.excellent, 2);
        assert_eq!(d.good, 2);
        assert_eq!(d.moderate, 2);
        assert_eq!(d.poor, 2);
        assert_eq!(d.total(), 8);
    }

    #[test]
    fn improvement_is_relative_percent() {
        assert_eq!(improvement_pct(Some(50.0), 55.0), Some(10.0));
        assert_eq!(improvement_pct(None, 55.0), None);
        assert_eq!(improvement_pct(Some(0.0), 55.0), None);
    }

    #[test]
    fn early_stop_needs_three_iterations() {
        let history = vec![with_improvement(None), with_improvement(Some(0.5))];
        assert!(!should_stop_early(&history, 2.0));
    }

    #[test]
    fn early_stop_when_last_two_improvements_small() {
        let history = vec![
            with_improvement(None),
            with_improvement(Some(1.0)),
            with_improvement(Some(-1.5)),
        ];
        assert!(should_stop_early(&history, 2.0));
    }

    #[test]
    fn one_large_improvement_keeps_going() {
        let history = vec![
            with_improvement(None),
            with_improvement(Some(12.0)),
            with_improvement(Some(1.0)),
        ];
        assert!(!should_stop_early(&history, 2.0));
    }

    #[test]
    fn empty_iteration_has_zero_statistics() {
        let m = IterationMetrics::default().with_scores(&[], Some(40.0));
        assert_eq!(m.average_score, 0.0);
        assert_eq!(m.top_score, 0);
        assert_eq!(m.improvement_pct, Some(-100.0));
    }
}

//! Priority scoring.
//!
//! The score is a weighted sum of normalized components, adjusted by the
//! generator's confidence and rounded to an integer percentage. It is a pure
//! function of its inputs.

use serde::{Deserialize, Serialize};

use super::keyword_metrics::{sanitize_money, Trend};
use super::validated::{DomainAvailability, InventorySnapshot, ValidatedOpportunity};
use super::{ClusterData, KeywordMetrics};
use crate::domain::foundation::Percentage;

const VOLUME_REFERENCE: f64 = 100_000.0;
const CPC_REFERENCE_USD: f64 = 5.0;
const INVENTORY_REFERENCE: f64 = 100.0;
const EMPTY_INVENTORY_SCORE: f64 = 0.3;
const SEASONAL_PENALTY: f64 = 0.8;
const CONFIDENCE_FLOOR: f64 = 0.85;
const CONFIDENCE_SPAN: f64 = 0.30;

/// Relative weight of each scoring component, in points.
///
/// Defaults sum to 100. Custom weights need not, but the result is always
/// clamped to 0-100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoringWeights {
    pub search_volume: f64,
    pub difficulty: f64,
    pub commercial_intent: f64,
    pub inventory: f64,
    pub trend: f64,
    pub domain: f64,
    pub competition: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            search_volume: 35.0,
            difficulty: 20.0,
            commercial_intent: 20.0,
            inventory: 10.0,
            trend: 5.0,
            domain: 5.0,
            competition: 5.0,
        }
    }
}

impl ScoringWeights {
    pub fn total(&self) -> f64 {
        self.search_volume
            + self.difficulty
            + self.commercial_intent
            + self.inventory
            + self.trend
            + self.domain
            + self.competition
    }
}

/// Everything the score depends on.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringInput {
    /// Cluster volume when available, else primary volume.
    pub search_volume: u64,
    pub difficulty: u8,
    /// Cluster-weighted CPC when available, else primary CPC.
    pub cpc: f64,
    pub competition: f64,
    pub trend: Trend,
    pub seasonal: bool,
    pub product_count: u32,
    pub domain: DomainAvailability,
    pub confidence: Percentage,
}

impl ScoringInput {
    pub fn from_parts(
        metrics: &KeywordMetrics,
        cluster: Option<&ClusterData>,
        inventory: &InventorySnapshot,
        domain: DomainAvailability,
        confidence: Percentage,
    ) -> Self {
        Self {
            search_volume: cluster.map(|c| c.total_volume).unwrap_or(metrics.search_volume),
            difficulty: metrics.difficulty,
            cpc: cluster.map(|c| c.weighted_cpc).unwrap_or(metrics.cpc),
            competition: metrics.competition,
            trend: metrics.trend,
            seasonal: metrics.seasonal,
            product_count: inventory.product_count,
            domain,
            confidence,
        }
    }

    pub fn from_validated(opportunity: &ValidatedOpportunity) -> Self {
        Self::from_parts(
            &opportunity.keyword_metrics,
            opportunity.cluster_data.as_ref(),
            &opportunity.inventory,
            opportunity.domain_availability,
            opportunity.suggestion.confidence_score,
        )
    }
}

/// Normalized component values, each in 0-1.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBreakdown {
    pub search_volume: f64,
    pub difficulty: f64,
    pub commercial_intent: f64,
    pub inventory: f64,
    pub trend: f64,
    pub domain: f64,
    pub competition: f64,
    pub confidence_factor: f64,
    /// Weighted total after the confidence adjustment, before rounding.
    pub raw_total: f64,
}

/// Computes priority scores with a fixed set of weights.
#[derive(Debug, Clone, Default)]
pub struct PriorityScorer {
    weights: ScoringWeights,
}

impl PriorityScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Integer score in 0-100.
    pub fn score(&self, input: &ScoringInput) -> Percentage {
        Percentage::from_f64_rounded(self.breakdown(input).raw_total)
    }

    pub fn breakdown(&self, input: &ScoringInput) -> ScoreBreakdown {
        let w = &self.weights;

        let search_volume = volume_component(input.search_volume);
        let difficulty = (100.0 - f64::from(input.difficulty.min(100))) / 100.0;
        let commercial_intent = (sanitize_money(input.cpc) / CPC_REFERENCE_USD).min(1.0);
        let inventory = inventory_component(input.product_count);
        let trend = trend_component(input.trend, input.seasonal);
        let domain = match input.domain {
            DomainAvailability::Likely => 1.0,
            DomainAvailability::Unknown => 0.5,
            DomainAvailability::Unlikely => 0.2,
        };
        let competition = 1.0 - unit(input.competition);

        let weighted = search_volume * w.search_volume
            + difficulty * w.difficulty
            + commercial_intent * w.commercial_intent
            + inventory * w.inventory
            + trend * w.trend
            + domain * w.domain
            + competition * w.competition;

        let confidence_factor = CONFIDENCE_FLOOR + CONFIDENCE_SPAN * input.confidence.as_fraction();

        ScoreBreakdown {
            search_volume,
            difficulty,
            commercial_intent,
            inventory,
            trend,
            domain,
            competition,
            confidence_factor,
            raw_total: (weighted * confidence_factor).clamp(0.0, 100.0),
        }
    }
}

fn volume_component(volume: u64) -> f64 {
    ((volume as f64 + 1.0).log10() / (VOLUME_REFERENCE + 1.0).log10()).min(1.0)
}

fn inventory_component(count: u32) -> f64 {
    if count == 0 {
        return EMPTY_INVENTORY_SCORE;
    }
    let depth = ((f64::from(count) + 1.0).log10() / (INVENTORY_REFERENCE + 1.0).log10()).min(1.0);
    0.5 + 0.5 * depth
}

fn trend_component(trend: Trend, seasonal: bool) -> f64 {
    let base = match trend {
        Trend::Rising => 1.0,
        Trend::Stable => 0.7,
        Trend::Declining => 0.3,
    };
    if seasonal {
        base * SEASONAL_PENALTY
    } else {
        base
    }
}

fn unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn input() -> ScoringInput {
        ScoringInput {
            search_volume: 5_000,
            difficulty: 40,
            cpc: 2.0,
            competition: 0.3,
            trend: Trend::Stable,
            seasonal: false,
            product_count: 12,
            domain: DomainAvailability::Unknown,
            confidence: Percentage::new(70),
        }
    }

    #[test]
    fn default_weights_sum_to_one_hundred() {
        assert_eq!(ScoringWeights::default().total(), 100.0);
    }

    #[test]
    fn typical_opportunity_scores_strictly_inside_range() {
        let score = PriorityScorer::default().score(&input()).value();
        assert!(score > 0 && score < 100, "score was {score}");
    }

    #[test]
    fn empty_inventory_still_earns_partial_credit() {
        let b = PriorityScorer::default().breakdown(&ScoringInput {
            product_count: 0,
            ..input()
        });
        assert_eq!(b.inventory, 0.3);
    }

    #[test]
    fn seasonal_keywords_are_penalised() {
        let scorer = PriorityScorer::default();
        let plain = scorer.breakdown(&input()).trend;
        let seasonal = scorer
            .breakdown(&ScoringInput {
                seasonal: true,
                ..input()
            })
            .trend;
        assert!((seasonal - plain * 0.8).abs() < 1e-12);
    }

    #[test]
    fn cpc_caps_at_reference() {
        let b = PriorityScorer::default().breakdown(&ScoringInput {
            cpc: 50.0,
            ..input()
        });
        assert_eq!(b.commercial_intent, 1.0);
    }

    #[test]
    fn non_finite_inputs_do_not_poison_score() {
        let score = PriorityScorer::default().score(&ScoringInput {
            cpc: f64::NAN,
            competition: f64::INFINITY,
            ..input()
        });
        assert!(score.value() <= 100);
    }

    #[test]
    fn confidence_scales_between_floor_and_ceiling() {
        let scorer = PriorityScorer::default();
        let low = scorer.breakdown(&ScoringInput {
            confidence: Percentage::ZERO,
            ..input()
        });
        let high = scorer.breakdown(&ScoringInput {
            confidence: Percentage::HUNDRED,
            ..input()
        });
        assert!((low.confidence_factor - 0.85).abs() < 1e-12);
        assert!((high.confidence_factor - 1.15).abs() < 1e-12);
    }

    #[test]
    fn cluster_data_overrides_primary_volume_and_cpc() {
        let metrics = KeywordMetrics {
            search_volume: 100,
            cpc: 1.0,
            ..KeywordMetrics::zero("k")
        };
        let cluster = ClusterData {
            total_volume: 900,
            weighted_cpc: 3.0,
            keywords: vec!["k".into(), "j".into()],
        };
        let built = ScoringInput::from_parts(
            &metrics,
            Some(&cluster),
            &InventorySnapshot::default(),
            DomainAvailability::Likely,
            Percentage::new(50),
        );
        assert_eq!(built.search_volume, 900);
        assert_eq!(built.cpc, 3.0);
    }

    proptest! {
        #[test]
        fn score_is_pure(volume in 0u64..10_000_000, difficulty in 0u8..=100, conf in 0u8..=100) {
            let scorer = PriorityScorer::default();
            let i = ScoringInput { search_volume: volume, difficulty, confidence: Percentage::new(conf), ..input() };
            prop_assert_eq!(scorer.score(&i), scorer.score(&i.clone()));
        }

        #[test]
        fn score_never_decreases_with_volume(a in 0u64..1_000_000, b in 0u64..1_000_000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let scorer = PriorityScorer::default();
            let s_lo = scorer.score(&ScoringInput { search_volume: lo, ..input() });
            let s_hi = scorer.score(&ScoringInput { search_volume: hi, ..input() });
            prop_assert!(s_hi >= s_lo);
        }

        #[test]
        fn score_never_decreases_with_cpc(a in 0.0f64..50.0, b in 0.0f64..50.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let scorer = PriorityScorer::default();
            let cheap = scorer.score(&ScoringInput { cpc: lo, ..input() });
            let pricey = scorer.score(&ScoringInput { cpc: hi, ..input() });
            prop_assert!(pricey >= cheap);
        }

        #[test]
        fn score_never_decreases_with_inventory(a in any::<u32>(), b in any::<u32>()) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let scorer = PriorityScorer::default();
            let thin = scorer.score(&ScoringInput { product_count: lo, ..input() });
            let deep = scorer.score(&ScoringInput { product_count: hi, ..input() });
            prop_assert!(deep >= thin);
        }

        #[test]
        fn score_never_increases_with_difficulty(a in 0u8..=100, b in 0u8..=100) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let scorer = PriorityScorer::default();
            let easy = scorer.score(&ScoringInput { difficulty: lo, ..input() });
            let hard = scorer.score(&ScoringInput { difficulty: hi, ..input() });
            prop_assert!(easy >= hard);
        }

        #[test]
        fn score_stays_in_range(
            volume in any::<u64>(),
            difficulty in any::<u8>(),
            cpc in -10.0f64..1_000.0,
            competition in -1.0f64..2.0,
            products in any::<u32>(),
            conf in 0u8..=100,
        ) {
            let i = ScoringInput {
                search_volume: volume,
                difficulty,
                cpc,
                competition,
                product_count: products,
                confidence: Percentage::new(conf),
                ..input()
            };
            prop_assert!(PriorityScorer::default().score(&i).value() <= 100);
        }
    }
}

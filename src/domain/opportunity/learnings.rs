//! Learning extraction from one iteration's validated opportunities.
//!
//! Learnings are fed back into the next iteration's prompt: which kinds of
//! niches scored well, which scored badly and why, and which metric ranges
//! the good ones fell into.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::validated::ValidatedOpportunity;
use crate::domain::foundation::Percentage;

const LOW_VOLUME: u64 = 500;
const HIGH_DIFFICULTY: u8 = 70;
const LOW_CPC_USD: f64 = 0.5;
const GROUP_LIST_LIMIT: usize = 5;

/// Score bands that split performers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LearningThresholds {
    pub min_score: u8,
    pub target_score: u8,
    /// Maximum number of top and bottom performers kept.
    pub sample_size: usize,
}

impl Default for LearningThresholds {
    fn default() -> Self {
        Self {
            min_score: 50,
            target_score: 75,
            sample_size: 5,
        }
    }
}

/// Compact description of one opportunity for prompts and reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformerSummary {
    pub keyword: String,
    pub destination: String,
    pub category: String,
    pub score: Percentage,
    pub search_volume: u64,
    pub difficulty: u8,
    pub cpc: f64,
    pub product_count: u32,
    /// Why the opportunity underperformed; empty for top performers.
    pub failure_reasons: Vec<String>,
}

impl PerformerSummary {
    fn from_validated(opportunity: &ValidatedOpportunity, with_reasons: bool) -> Self {
        Self {
            keyword: opportunity.suggestion.keyword.clone(),
            destination: opportunity.suggestion.destination.clone(),
            category: opportunity.suggestion.category.clone(),
            score: opportunity.priority_score,
            search_volume: opportunity.cluster_volume(),
            difficulty: opportunity.keyword_metrics.difficulty,
            cpc: opportunity.effective_cpc(),
            product_count: opportunity.inventory.product_count,
            failure_reasons: if with_reasons {
                failure_reasons(opportunity)
            } else {
                Vec::new()
            },
        }
    }
}

/// Min, max, and mean of a metric across good performers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObservedRange {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl ObservedRange {
    fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        Some(Self { min, max, mean })
    }
}

/// Structured learnings for the next iteration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationLearnings {
    pub top_performers: Vec<PerformerSummary>,
    pub bottom_performers: Vec<PerformerSummary>,
    pub success_patterns: Vec<String>,
    pub failure_patterns: Vec<String>,
    pub optimal_difficulty: Option<ObservedRange>,
    pub optimal_volume: Option<ObservedRange>,
    pub best_destinations: Vec<String>,
    pub avoid_destinations: Vec<String>,
    pub best_categories: Vec<String>,
    pub avoid_categories: Vec<String>,
    pub recommendations: Vec<String>,
}

impl IterationLearnings {
    pub fn is_empty(&self) -> bool {
        self.top_performers.is_empty() && self.bottom_performers.is_empty()
    }
}

/// Reasons an opportunity scored poorly.
pub fn failure_reasons(opportunity: &ValidatedOpportunity) -> Vec<String> {
    let mut reasons = Vec::new();
    let volume = opportunity.cluster_volume();
    if volume < LOW_VOLUME {
        reasons.push(format!("low search volume ({volume}/month)"));
    }
    let difficulty = opportunity.keyword_metrics.difficulty;
    if difficulty > HIGH_DIFFICULTY {
        reasons.push(format!("high keyword difficulty ({difficulty})"));
    }
    if opportunity.inventory.product_count == 0 {
        reasons.push("no bookable inventory".to_string());
    }
    let cpc = opportunity.effective_cpc();
    if cpc < LOW_CPC_USD {
        reasons.push(format!("weak commercial intent (CPC ${cpc:.2})"));
    }
    reasons
}

/// Extracts learnings from one iteration's validated opportunities.
pub fn extract_learnings(
    validated: &[ValidatedOpportunity],
    thresholds: LearningThresholds,
) -> IterationLearnings {
    let mut by_score: Vec<&ValidatedOpportunity> = validated.iter().collect();
    by_score.sort_by(|a, b| b.priority_score.cmp(&a.priority_score));

    let top: Vec<&ValidatedOpportunity> = by_score
        .iter()
        .copied()
        .filter(|o| o.priority_score.value() >= thresholds.target_score)
        .take(thresholds.sample_size)
        .collect();

    let bottom: Vec<&ValidatedOpportunity> = by_score
        .iter()
        .rev()
        .copied()
        .filter(|o| o.priority_score.value() < thresholds.min_score)
        .take(thresholds.sample_size)
        .collect();

    let acceptable: Vec<&ValidatedOpportunity> = by_score
        .iter()
        .copied()
        .filter(|o| o.priority_score.value() >= thresholds.min_score)
        .collect();

    let optimal_difficulty = ObservedRange::from_values(
        &acceptable
            .iter()
            .map(|o| f64::from(o.keyword_metrics.difficulty))
            .collect::<Vec<_>>(),
    );
    let optimal_volume = ObservedRange::from_values(
        &acceptable
            .iter()
            .map(|o| o.cluster_volume() as f64)
            .collect::<Vec<_>>(),
    );

    let destinations = GroupAverages::collect(validated, |o| &o.suggestion.destination);
    let categories = GroupAverages::collect(validated, |o| &o.suggestion.category);

    let mut learnings = IterationLearnings {
        top_performers: top
            .iter()
            .map(|o| PerformerSummary::from_validated(o, false))
            .collect(),
        bottom_performers: bottom
            .iter()
            .map(|o| PerformerSummary::from_validated(o, true))
            .collect(),
        success_patterns: success_patterns(&top),
        failure_patterns: failure_patterns(&bottom),
        optimal_difficulty,
        optimal_volume,
        best_destinations: destinations.best(thresholds),
        avoid_destinations: destinations.avoid(thresholds),
        best_categories: categories.best(thresholds),
        avoid_categories: categories.avoid(thresholds),
        recommendations: Vec::new(),
    };
    learnings.recommendations = recommendations(&learnings, &bottom);
    learnings
}

fn success_patterns(top: &[&ValidatedOpportunity]) -> Vec<String> {
    if top.is_empty() {
        return Vec::new();
    }
    let n = top.len() as f64;
    let avg_volume = top.iter().map(|o| o.cluster_volume() as f64).sum::<f64>() / n;
    let avg_difficulty = top
        .iter()
        .map(|o| f64::from(o.keyword_metrics.difficulty))
        .sum::<f64>()
        / n;
    let with_inventory = top.iter().filter(|o| o.inventory.product_count > 0).count();

    let mut patterns = vec![
        format!("top performers average {avg_volume:.0} monthly searches"),
        format!("top performers average difficulty {avg_difficulty:.0}"),
    ];
    if with_inventory == top.len() {
        patterns.push("every top performer has bookable inventory".to_string());
    }
    let clustered = top
        .iter()
        .filter(|o| o.cluster_data.as_ref().is_some_and(|c| c.keyword_count() > 1))
        .count();
    if clustered * 2 > top.len() {
        patterns.push("keyword clusters outperform single keywords".to_string());
    }
    patterns
}

fn failure_patterns(bottom: &[&ValidatedOpportunity]) -> Vec<String> {
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for o in bottom {
        if o.cluster_volume() < LOW_VOLUME {
            *counts.entry("low search volume").or_default() += 1;
        }
        if o.keyword_metrics.difficulty > HIGH_DIFFICULTY {
            *counts.entry("high keyword difficulty").or_default() += 1;
        }
        if o.inventory.product_count == 0 {
            *counts.entry("no bookable inventory").or_default() += 1;
        }
        if o.effective_cpc() < LOW_CPC_USD {
            *counts.entry("weak commercial intent").or_default() += 1;
        }
    }
    let mut ordered: Vec<(&str, usize)> = counts.into_iter().collect();
    ordered.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    ordered
        .into_iter()
        .map(|(reason, n)| format!("{reason} ({n} of {})", bottom.len()))
        .collect()
}

fn recommendations(learnings: &IterationLearnings, bottom: &[&ValidatedOpportunity]) -> Vec<String> {
    let mut out = Vec::new();
    if learnings.top_performers.is_empty() {
        out.push(
            "No opportunity reached the target score; try less competitive long-tail niches"
                .to_string(),
        );
    }
    if let Some(range) = learnings.optimal_difficulty {
        out.push(format!(
            "Target keyword difficulty between {:.0} and {:.0}",
            range.min, range.max
        ));
    }
    if let Some(range) = learnings.optimal_volume {
        out.push(format!(
            "Aim for clusters with {:.0}-{:.0} monthly searches",
            range.min, range.max
        ));
    }
    if !learnings.best_destinations.is_empty() {
        out.push(format!(
            "Explore more niches in {}",
            learnings.best_destinations.join(", ")
        ));
    }
    if !learnings.avoid_destinations.is_empty() {
        out.push(format!(
            "Deprioritise {}",
            learnings.avoid_destinations.join(", ")
        ));
    }
    let missing_inventory = bottom.iter().filter(|o| o.inventory.product_count == 0).count();
    if !bottom.is_empty() && missing_inventory * 2 > bottom.len() {
        out.push("Favour categories with existing bookable products".to_string());
    }
    out
}

/// Average score per group, keyed case-insensitively.
struct GroupAverages {
    groups: BTreeMap<String, (String, f64, usize)>,
}

impl GroupAverages {
    fn collect<F>(validated: &[ValidatedOpportunity], key: F) -> Self
    where
        F: Fn(&ValidatedOpportunity) -> &String,
    {
        let mut groups: BTreeMap<String, (String, f64, usize)> = BTreeMap::new();
        for o in validated {
            let label = key(o);
            let entry = groups
                .entry(label.to_lowercase())
                .or_insert_with(|| (label.clone(), 0.0, 0));
            entry.1 += f64::from(o.priority_score.value());
            entry.2 += 1;
        }
        Self { groups }
    }

    fn averages(&self) -> Vec<(String, f64)> {
        let mut out: Vec<(String, f64)> = self
            .groups
            .values()
            .map(|(label, sum, n)| (label.clone(), sum / *n as f64))
            .collect();
        out.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        out
    }

    fn best(&self, thresholds: LearningThresholds) -> Vec<String> {
        self.averages()
            .into_iter()
            .filter(|(_, avg)| *avg >= f64::from(thresholds.target_score))
            .take(GROUP_LIST_LIMIT)
            .map(|(label, _)| label)
            .collect()
    }

    fn avoid(&self, thresholds: LearningThresholds) -> Vec<String> {
        let mut low: Vec<(String, f64)> = self
            .averages()
            .into_iter()
            .filter(|(_, avg)| *avg < f64::from(thresholds.min_score))
            .collect();
        low.reverse();
        low.into_iter()
            .take(GROUP_LIST_LIMIT)
            .map(|(label, _)| label)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{OpportunityId, Timestamp};
    use crate::domain::opportunity::{
        DomainAvailability, InventorySnapshot, KeywordMetrics, OpportunitySuggestion,
    };

    fn validated(keyword: &str, destination: &str, score: u8, volume: u64, products: u32) -> ValidatedOpportunity {
        ValidatedOpportunity {
            suggestion: OpportunitySuggestion {
                id: OpportunityId::new(),
                destination: destination.into(),
                category: "tours".into(),
                niche: "tours".into(),
                keyword: keyword.into(),
                cluster_keywords: vec![],
                rationale: String::new(),
                suggested_domain: None,
                alternative_domains: vec![],
                confidence_score: Percentage::new(60),
                iteration_source: 1,
            },
            keyword_metrics: KeywordMetrics {
                search_volume: volume,
                difficulty: 30,
                cpc: 1.5,
                ..KeywordMetrics::zero(keyword)
            },
            cluster_data: None,
            inventory: InventorySnapshot {
                product_count: products,
                ..Default::default()
            },
            domain_availability: DomainAvailability::Unknown,
            priority_score: Percentage::new(score),
            validated_at: Timestamp::now(),
        }
    }

    #[test]
    fn splits_top_and_bottom_by_thresholds() {
        let batch = vec![
            validated("a", "Rome", 90, 5_000, 10),
            validated("b", "Rome", 80, 4_000, 10),
            validated("c", "Oslo", 60, 2_000, 3),
            validated("d", "Oslo", 30, 100, 0),
        ];
        let learnings = extract_learnings(&batch, LearningThresholds::default());

        let top: Vec<_> = learnings.top_performers.iter().map(|p| p.keyword.as_str()).collect();
        let bottom: Vec<_> = learnings.bottom_performers.iter().map(|p| p.keyword.as_str()).collect();
        assert_eq!(top, vec!["a", "b"]);
        assert_eq!(bottom, vec!["d"]);
        assert!(learnings.bottom_performers[0]
            .failure_reasons
            .iter()
            .any(|r| r.contains("no bookable inventory")));
    }

    #[test]
    fn sample_size_limits_performers() {
        let batch: Vec<_> = (0..10)
            .map(|i| validated(&format!("k{i}"), "Rome", 90, 5_000, 5))
            .collect();
        let learnings = extract_learnings(
            &batch,
            LearningThresholds {
                sample_size: 3,
                ..Default::default()
            },
        );
        assert_eq!(learnings.top_performers.len(), 3);
    }

    #[test]
    fn optimal_ranges_cover_acceptable_scores_only() {
        let batch = vec![
            validated("a", "Rome", 90, 8_000, 10),
            validated("b", "Rome", 55, 2_000, 10),
            validated("c", "Rome", 20, 50, 0),
        ];
        let learnings = extract_learnings(&batch, LearningThresholds::default());
        let volume = learnings.optimal_volume.unwrap();
        assert_eq!(volume.min, 2_000.0);
        assert_eq!(volume.max, 8_000.0);
    }

    #[test]
    fn groups_destinations_by_average_score() {
        let batch = vec![
            validated("a", "Rome", 90, 8_000, 10),
            validated("b", "rome", 80, 8_000, 10),
            validated("c", "Oslo", 20, 50, 0),
        ];
        let learnings = extract_learnings(&batch, LearningThresholds::default());
        assert_eq!(learnings.best_destinations, vec!["Rome"]);
        assert_eq!(learnings.avoid_destinations, vec!["Oslo"]);
    }

    #[test]
    fn empty_input_recommends_broadening() {
        let learnings = extract_learnings(&[], LearningThresholds::default());
        assert!(learnings.is_empty());
        assert_eq!(learnings.recommendations.len(), 1);
    }
}

//! Cross-iteration merging, final ranking, and value projection.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::validated::ValidatedOpportunity;
use crate::domain::foundation::Percentage;

/// Score observed for an opportunity in one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScorePoint {
    pub iteration: u32,
    pub score: Percentage,
}

/// How an opportunity evolved across iterations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityJourney {
    pub first_seen_iteration: u32,
    pub score_history: Vec<ScorePoint>,
    /// Seen in more than one iteration.
    pub was_refined: bool,
}

/// Best version of one opportunity plus its journey.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedOpportunity {
    pub best: ValidatedOpportunity,
    pub journey: OpportunityJourney,
}

/// Merges validated records by lowercase keyword, keeping the highest score.
///
/// Ties keep the earliest record. Output order follows first appearance.
pub fn merge_across_iterations<'a, I>(validated: I) -> Vec<MergedOpportunity>
where
    I: IntoIterator<Item = &'a ValidatedOpportunity>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<MergedOpportunity> = Vec::new();

    for opportunity in validated {
        let point = ScorePoint {
            iteration: opportunity.suggestion.iteration_source,
            score: opportunity.priority_score,
        };
        let key = opportunity.merge_key();
        match index.get(&key).copied() {
            Some(i) => {
                let entry = &mut merged[i];
                entry.journey.score_history.push(point);
                entry.journey.first_seen_iteration =
                    entry.journey.first_seen_iteration.min(point.iteration);
                entry.journey.was_refined = true;
                if opportunity.priority_score > entry.best.priority_score {
                    entry.best = opportunity.clone();
                }
            }
            None => {
                index.insert(key, merged.len());
                merged.push(MergedOpportunity {
                    best: opportunity.clone(),
                    journey: OpportunityJourney {
                        first_seen_iteration: point.iteration,
                        score_history: vec![point],
                        was_refined: false,
                    },
                });
            }
        }
    }
    merged
}

/// Floors applied before ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankingFilter {
    pub min_cluster_volume: u64,
    pub min_score: u8,
}

/// Filters by the floors and sorts by descending score.
///
/// Equal scores are ordered by cluster volume, then keyword.
pub fn rank_merged(mut merged: Vec<MergedOpportunity>, filter: RankingFilter) -> Vec<MergedOpportunity> {
    merged.retain(|m| {
        m.best.cluster_volume() >= filter.min_cluster_volume
            && m.best.priority_score.value() >= filter.min_score
    });
    merged.sort_by(|a, b| {
        b.best
            .priority_score
            .cmp(&a.best.priority_score)
            .then_with(|| b.best.cluster_volume().cmp(&a.best.cluster_volume()))
            .then_with(|| a.best.merge_key().cmp(&b.best.merge_key()))
    });
    merged
}

/// Assumptions behind the projected-value estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectionAssumptions {
    /// Click-through rate expected for the primary keyword.
    pub primary_ctr: f64,
    /// Click-through rate expected for the rest of the cluster.
    pub cluster_ctr: f64,
    /// Share of visits that book.
    pub conversion_rate: f64,
    pub average_order_value_usd: f64,
    /// One-off cost to launch the site.
    pub setup_cost_usd: f64,
    pub max_payback_months: f64,
}

impl Default for ProjectionAssumptions {
    fn default() -> Self {
        Self {
            primary_ctr: 0.25,
            cluster_ctr: 0.08,
            conversion_rate: 0.02,
            average_order_value_usd: 85.0,
            setup_cost_usd: 500.0,
            max_payback_months: 24.0,
        }
    }
}

/// Monthly traffic and revenue estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedValue {
    pub monthly_traffic: u64,
    pub monthly_revenue_usd: f64,
    /// Months to recover the setup cost, capped.
    pub payback_months: f64,
}

pub fn project_value(opportunity: &ValidatedOpportunity, assumptions: &ProjectionAssumptions) -> ProjectedValue {
    let primary = opportunity.keyword_metrics.search_volume;
    let cluster_rest = opportunity.cluster_volume().saturating_sub(primary);

    let traffic = primary as f64 * assumptions.primary_ctr + cluster_rest as f64 * assumptions.cluster_ctr;
    let revenue = traffic * assumptions.conversion_rate * assumptions.average_order_value_usd;
    let payback = if revenue > 0.0 {
        (assumptions.setup_cost_usd / revenue).min(assumptions.max_payback_months)
    } else {
        assumptions.max_payback_months
    };

    ProjectedValue {
        monthly_traffic: traffic.round() as u64,
        monthly_revenue_usd: (revenue * 100.0).round() / 100.0,
        payback_months: (payback * 10.0).round() / 10.0,
    }
}

/// Domain names proposed for the opportunity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainSuggestions {
    pub primary: Option<String>,
    pub alternatives: Vec<String>,
}

/// Origin of a ranked opportunity's explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplanationSource {
    Generated,
    Templated,
}

/// One row of the final output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedOpportunity {
    /// 1-based.
    pub rank: usize,
    pub opportunity: ValidatedOpportunity,
    pub domains: DomainSuggestions,
    pub journey: OpportunityJourney,
    pub explanation: String,
    pub explanation_source: ExplanationSource,
    pub projected_value: ProjectedValue,
}

impl RankedOpportunity {
    pub fn new(
        rank: usize,
        merged: MergedOpportunity,
        explanation: String,
        explanation_source: ExplanationSource,
        assumptions: &ProjectionAssumptions,
    ) -> Self {
        let projected_value = project_value(&merged.best, assumptions);
        let domains = DomainSuggestions {
            primary: merged.best.suggestion.suggested_domain.clone(),
            alternatives: merged.best.suggestion.alternative_domains.clone(),
        };
        Self {
            rank,
            opportunity: merged.best,
            domains,
            journey: merged.journey,
            explanation,
            explanation_source,
            projected_value,
        }
    }

    pub fn keyword(&self) -> &str {
        self.opportunity.keyword()
    }

    pub fn score(&self) -> Percentage {
        self.opportunity.priority_score
    }
}

/// Cheap explanation built from the numbers alone.
pub fn templated_explanation(merged: &MergedOpportunity, rank: usize) -> String {
    let o = &merged.best;
    let m = &o.keyword_metrics;
    let mut text = format!(
        "#{rank} \"{}\" in {} scores {}/100: {} monthly searches across the cluster, difficulty {}, CPC ${:.2}, {} trend",
        o.suggestion.keyword,
        o.suggestion.destination,
        o.priority_score.value(),
        o.cluster_volume(),
        m.difficulty,
        o.effective_cpc(),
        m.trend.as_str(),
    );
    if m.seasonal {
        text.push_str(" (seasonal)");
    }
    if o.inventory.product_count > 0 {
        text.push_str(&format!(", {} bookable products", o.inventory.product_count));
    } else {
        text.push_str(", no bookable products yet");
    }
    if merged.journey.was_refined {
        text.push_str(&format!(
            ". Surfaced in iteration {} and refined over {} iterations",
            merged.journey.first_seen_iteration,
            merged.journey.score_history.len()
        ));
    }
    text.push('.');
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{OpportunityId, Timestamp};
    use crate::domain::opportunity::{
        ClusterData, DomainAvailability, InventorySnapshot, KeywordMetrics, OpportunitySuggestion,
    };

    fn validated(keyword: &str, iteration: u32, score: u8, volume: u64) -> ValidatedOpportunity {
        ValidatedOpportunity {
            suggestion: OpportunitySuggestion {
                id: OpportunityId::new(),
                destination: "Lisbon".into(),
                category: "tours".into(),
                niche: "tours".into(),
                keyword: keyword.into(),
                cluster_keywords: vec![],
                rationale: String::new(),
                suggested_domain: Some("lisbontours.com".into()),
                alternative_domains: vec!["lisbon-tours.com".into()],
                confidence_score: Percentage::new(60),
                iteration_source: iteration,
            },
            keyword_metrics: KeywordMetrics {
                search_volume: volume,
                difficulty: 30,
                cpc: 1.0,
                ..KeywordMetrics::zero(keyword)
            },
            cluster_data: None,
            inventory: InventorySnapshot::default(),
            domain_availability: DomainAvailability::Unknown,
            priority_score: Percentage::new(score),
            validated_at: Timestamp::now(),
        }
    }

    #[test]
    fn merge_keeps_best_and_full_history() {
        let records = vec![
            validated("Lisbon Tram Tour", 1, 60, 1_000),
            validated("lisbon tram tour", 2, 72, 1_000),
            validated("lisbon tram tour", 3, 70, 1_000),
            validated("sintra day trip", 2, 55, 2_000),
        ];
        let merged = merge_across_iterations(&records);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].best.priority_score.value(), 72);
        assert_eq!(merged[0].journey.first_seen_iteration, 1);
        assert_eq!(merged[0].journey.score_history.len(), 3);
        assert!(merged[0].journey.was_refined);
        assert!(!merged[1].journey.was_refined);
    }

    #[test]
    fn ranking_applies_floors_and_sorts() {
        let records = vec![
            validated("a", 1, 45, 5_000),
            validated("b", 1, 90, 5_000),
            validated("c", 1, 95, 50),
            validated("d", 1, 30, 5_000),
        ];
        let ranked = rank_merged(
            merge_across_iterations(&records),
            RankingFilter {
                min_cluster_volume: 100,
                min_score: 40,
            },
        );
        let keys: Vec<_> = ranked.iter().map(|m| m.best.keyword().to_string()).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn projection_blends_primary_and_cluster_ctr() {
        let mut o = validated("k", 1, 70, 1_000);
        o.cluster_data = Some(ClusterData {
            total_volume: 3_000,
            weighted_cpc: 1.0,
            keywords: vec!["k".into(), "j".into()],
        });
        let value = project_value(&o, &ProjectionAssumptions::default());

        // 1000 * 0.25 + 2000 * 0.08 = 410 visits; 410 * 0.02 * 85 = 697
        assert_eq!(value.monthly_traffic, 410);
        assert!((value.monthly_revenue_usd - 697.0).abs() < 1e-6);
        assert!((value.payback_months - 0.7).abs() < 1e-9);
    }

    #[test]
    fn payback_is_capped_without_revenue() {
        let value = project_value(&validated("k", 1, 70, 0), &ProjectionAssumptions::default());
        assert_eq!(value.monthly_traffic, 0);
        assert_eq!(value.payback_months, 24.0);
    }

    #[test]
    fn ranked_row_carries_domains_and_projection() {
        let merged = merge_across_iterations(&[validated("k", 1, 70, 1_000)]).remove(0);
        let text = templated_explanation(&merged, 1);
        let row = RankedOpportunity::new(1, merged, text, ExplanationSource::Templated, &ProjectionAssumptions::default());

        assert_eq!(row.domains.primary.as_deref(), Some("lisbontours.com"));
        assert_eq!(row.domains.alternatives.len(), 1);
        assert!(row.explanation.starts_with("#1 \"k\" in Lisbon scores 70/100"));
        assert_eq!(row.projected_value.monthly_traffic, 250);
    }
}

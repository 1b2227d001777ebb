//! Suggestions enriched with measured data and a priority score.

use serde::{Deserialize, Serialize};

use super::keyword_metrics::{ClusterData, KeywordMetrics};
use super::suggestion::OpportunitySuggestion;
use crate::domain::foundation::{Percentage, Timestamp};

/// Bookable inventory observed for a destination and category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySnapshot {
    pub product_count: u32,
    /// Distinct product categories seen in the sample page.
    pub categories: Vec<String>,
    /// True when the lookup itself failed and the count is a fallback zero.
    pub lookup_failed: bool,
}

impl InventorySnapshot {
    /// Zero inventory recorded because the lookup failed.
    pub fn unavailable() -> Self {
        Self {
            lookup_failed: true,
            ..Self::default()
        }
    }
}

/// Heuristic guess at whether a suggested domain can be registered.
///
/// This is a weak signal: a name that resolves is certainly taken, one that
/// does not may still be registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainAvailability {
    Likely,
    #[default]
    Unknown,
    Unlikely,
}

impl DomainAvailability {
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainAvailability::Likely => "likely",
            DomainAvailability::Unknown => "unknown",
            DomainAvailability::Unlikely => "unlikely",
        }
    }
}

/// A suggestion after keyword, inventory, and domain validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedOpportunity {
    pub suggestion: OpportunitySuggestion,
    /// Metrics of the primary keyword.
    pub keyword_metrics: KeywordMetrics,
    /// Aggregate over primary and cluster keywords, when the cluster had volume.
    pub cluster_data: Option<ClusterData>,
    pub inventory: InventorySnapshot,
    pub domain_availability: DomainAvailability,
    pub priority_score: Percentage,
    pub validated_at: Timestamp,
}

impl ValidatedOpportunity {
    pub fn keyword(&self) -> &str {
        &self.suggestion.keyword
    }

    pub fn destination(&self) -> &str {
        &self.suggestion.destination
    }

    pub fn merge_key(&self) -> String {
        self.suggestion.merge_key()
    }

    /// Cluster volume when aggregated, otherwise the primary keyword's volume.
    pub fn cluster_volume(&self) -> u64 {
        self.cluster_data
            .as_ref()
            .map(|c| c.total_volume)
            .unwrap_or(self.keyword_metrics.search_volume)
    }

    /// Cluster-weighted CPC when aggregated, otherwise the primary CPC.
    pub fn effective_cpc(&self) -> f64 {
        self.cluster_data
            .as_ref()
            .map(|c| c.weighted_cpc)
            .unwrap_or(self.keyword_metrics.cpc)
    }
}

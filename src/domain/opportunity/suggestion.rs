//! Candidate opportunities as produced by the suggestion generator.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{OpportunityId, Percentage};

/// Normalized `(keyword, location)` identity used to recognise opportunities
/// that already exist in the durable store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OpportunityKey {
    pub keyword: String,
    pub location: String,
}

impl OpportunityKey {
    /// Creates a key, trimming and lowercasing both parts.
    pub fn new(keyword: &str, location: &str) -> Self {
        Self {
            keyword: normalize(keyword),
            location: normalize(location),
        }
    }
}

/// Lowercases and collapses inner whitespace.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// A candidate niche proposed for validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunitySuggestion {
    pub id: OpportunityId,
    pub destination: String,
    pub category: String,
    pub niche: String,
    /// Primary search phrase.
    pub keyword: String,
    /// Related search phrases aggregated with the primary one.
    pub cluster_keywords: Vec<String>,
    pub rationale: String,
    pub suggested_domain: Option<String>,
    pub alternative_domains: Vec<String>,
    /// AI-assigned confidence.
    pub confidence_score: Percentage,
    /// Iteration that produced this suggestion.
    pub iteration_source: u32,
}

impl OpportunitySuggestion {
    /// Identity used by the pre-filter.
    pub fn key(&self) -> OpportunityKey {
        OpportunityKey::new(&self.keyword, &self.destination)
    }

    /// Identity used to merge the same opportunity across iterations.
    pub fn merge_key(&self) -> String {
        normalize(&self.keyword)
    }

    /// Primary keyword followed by cluster keywords, normalized and deduplicated.
    pub fn all_keywords(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        std::iter::once(&self.keyword)
            .chain(self.cluster_keywords.iter())
            .map(|k| normalize(k))
            .filter(|k| !k.is_empty() && seen.insert(k.clone()))
            .collect()
    }
}

/// An externally supplied starting opportunity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedSuggestion {
    pub keyword: String,
    pub destination: String,
    pub category: String,
    #[serde(default)]
    pub niche: Option<String>,
    #[serde(default)]
    pub cluster_keywords: Vec<String>,
    #[serde(default)]
    pub rationale: Option<String>,
}

impl SeedSuggestion {
    /// Creates a seed from its three required parts.
    pub fn new(
        keyword: impl Into<String>,
        destination: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            keyword: keyword.into(),
            destination: destination.into(),
            category: category.into(),
            ..Default::default()
        }
    }
}

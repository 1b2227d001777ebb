//! Keyword metrics and cluster aggregation.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::suggestion::normalize;

/// Twelve-month search interest direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Rising,
    #[default]
    Stable,
    Declining,
}

impl Trend {
    /// Returns the lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Rising => "rising",
            Trend::Stable => "stable",
            Trend::Declining => "declining",
        }
    }
}

/// Search volume for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySearches {
    pub year: i32,
    pub month: u32,
    pub search_volume: u64,
}

/// Metrics for a single keyword as reported by the keyword gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordMetrics {
    pub keyword: String,
    pub search_volume: u64,
    /// Ranking difficulty, 0-100.
    pub difficulty: u8,
    /// Cost per click in USD.
    pub cpc: f64,
    /// Advertiser competition, 0-1.
    pub competition: f64,
    pub trend: Trend,
    pub seasonal: bool,
    #[serde(default)]
    pub monthly_trends: Vec<MonthlySearches>,
}

impl KeywordMetrics {
    /// Metrics for a keyword the gateway returned nothing for.
    pub fn zero(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            search_volume: 0,
            difficulty: 0,
            cpc: 0.0,
            competition: 0.0,
            trend: Trend::Stable,
            seasonal: false,
            monthly_trends: Vec::new(),
        }
    }
}

/// Metrics that stand in for a primary keyword the gateway returned nothing
/// for.
///
/// Difficulty, competition, trend and seasonality come from the
/// highest-volume contributing cluster keyword; volume and CPC stay zero so
/// only the cluster aggregate carries them. With no contributing keyword the
/// difficulty and competition are worst case.
pub fn proxy_metrics(
    keyword: impl Into<String>,
    cluster: &ClusterData,
    metrics: &HashMap<String, KeywordMetrics>,
) -> KeywordMetrics {
    let anchor = cluster
        .keywords
        .iter()
        .filter_map(|k| metrics.get(k))
        .max_by_key(|m| m.search_volume);

    match anchor {
        Some(m) => KeywordMetrics {
            keyword: keyword.into(),
            search_volume: 0,
            difficulty: m.difficulty,
            cpc: 0.0,
            competition: m.competition,
            trend: m.trend,
            seasonal: m.seasonal,
            monthly_trends: Vec::new(),
        },
        None => KeywordMetrics {
            difficulty: 100,
            competition: 1.0,
            ..KeywordMetrics::zero(keyword)
        },
    }
}

/// Volume and CPC aggregated across a primary keyword and its cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterData {
    pub total_volume: u64,
    /// Volume-weighted average CPC over keywords with nonzero volume.
    pub weighted_cpc: f64,
    /// Keywords that contributed volume.
    pub keywords: Vec<String>,
}

impl ClusterData {
    /// Number of keywords that contributed volume.
    pub fn keyword_count(&self) -> usize {
        self.keywords.len()
    }
}

/// Aggregates the given keywords against a normalized-keyword lookup.
///
/// Keywords missing from the lookup or with zero volume contribute nothing.
pub fn aggregate_cluster<'a, I>(keywords: I, metrics: &HashMap<String, KeywordMetrics>) -> ClusterData
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    let mut total_volume = 0_u64;
    let mut cpc_weight = 0.0_f64;
    let mut contributing = Vec::new();

    for keyword in keywords {
        let key = normalize(keyword);
        if !seen.insert(key.clone()) {
            continue;
        }
        let Some(m) = metrics.get(&key) else {
            continue;
        };
        if m.search_volume == 0 {
            continue;
        }
        total_volume += m.search_volume;
        cpc_weight += m.search_volume as f64 * sanitize_money(m.cpc);
        contributing.push(key);
    }

    let weighted_cpc = if total_volume > 0 {
        cpc_weight / total_volume as f64
    } else {
        0.0
    };

    ClusterData {
        total_volume,
        weighted_cpc,
        keywords: contributing,
    }
}

/// Derives the trend from monthly volumes: mean of the latest three months
/// against the three before them, with a ±10% dead band.
pub fn derive_trend(monthly: &[MonthlySearches]) -> Trend {
    if monthly.len() < 6 {
        return Trend::Stable;
    }
    let mut ordered: Vec<&MonthlySearches> = monthly.iter().collect();
    ordered.sort_by_key(|m| (m.year, m.month));

    let n = ordered.len();
    let recent = mean(ordered[n - 3..].iter().map(|m| m.search_volume as f64));
    let prior = mean(ordered[n - 6..n - 3].iter().map(|m| m.search_volume as f64));

    if prior == 0.0 {
        return if recent > 0.0 { Trend::Rising } else { Trend::Stable };
    }

    let change = (recent - prior) / prior;
    if change > 0.10 {
        Trend::Rising
    } else if change < -0.10 {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

/// A keyword is seasonal when its monthly volumes vary by more than half
/// their mean (coefficient of variation above 0.5).
pub fn detect_seasonality(monthly: &[MonthlySearches]) -> bool {
    if monthly.len() < 6 {
        return false;
    }
    let values: Vec<f64> = monthly.iter().map(|m| m.search_volume as f64).collect();
    let avg = mean(values.iter().copied());
    if avg == 0.0 {
        return false;
    }
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt() / avg > 0.5
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

pub(crate) fn sanitize_money(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

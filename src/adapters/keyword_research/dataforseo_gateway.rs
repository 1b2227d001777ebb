//! DataForSEO keyword gateway.
//!
//! Uses the Labs keyword overview endpoint, which returns volume, CPC,
//! competition, difficulty and twelve months of search counts in one call.
//! Requests are throttled client-side with a sliding window.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::adapters::rate_limiter::SlidingWindowThrottle;
use crate::domain::opportunity::keyword_metrics::sanitize_money;
use crate::domain::opportunity::{derive_trend, detect_seasonality, KeywordMetrics, MonthlySearches};
use crate::ports::{KeywordGatewayError, KeywordMetricsGateway};

const OVERVIEW_PATH: &str = "/v3/dataforseo_labs/google/keyword_overview/live";

/// Labs endpoints accept at most this many keywords per task.
const MAX_KEYWORDS_PER_TASK: usize = 700;

/// DataForSEO task status for success.
const TASK_OK: u32 = 20000;

/// Configuration for the DataForSEO gateway.
#[derive(Debug, Clone)]
pub struct DataForSeoConfig {
    pub login: String,
    password: Secret<String>,
    pub base_url: String,
    /// Google Ads location code (2840 = United States).
    pub location_code: u32,
    pub language_code: String,
    pub timeout: Duration,
    pub batch_size: usize,
    /// Throttle: requests allowed per window.
    pub max_requests: usize,
    pub window: Duration,
}

impl DataForSeoConfig {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: Secret::new(password.into()),
            base_url: "https://api.dataforseo.com".to_string(),
            location_code: 2840,
            language_code: "en".to_string(),
            timeout: Duration::from_secs(60),
            batch_size: MAX_KEYWORDS_PER_TASK,
            max_requests: 12,
            window: Duration::from_secs(60),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_location(mut self, location_code: u32, language_code: impl Into<String>) -> Self {
        self.location_code = location_code;
        self.language_code = language_code.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_KEYWORDS_PER_TASK);
        self
    }

    pub fn with_throttle(mut self, max_requests: usize, window: Duration) -> Self {
        self.max_requests = max_requests;
        self.window = window;
        self
    }
}

/// Keyword gateway backed by DataForSEO.
pub struct DataForSeoGateway {
    config: DataForSeoConfig,
    client: Client,
    throttle: SlidingWindowThrottle,
}

impl DataForSeoGateway {
    pub fn new(config: DataForSeoConfig) -> Result<Self, KeywordGatewayError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| KeywordGatewayError::Network(format!("HTTP client: {e}")))?;
        let throttle = SlidingWindowThrottle::new(config.max_requests, config.window);

        Ok(Self {
            config,
            client,
            throttle,
        })
    }

    async fn fetch_chunk(&self, keywords: &[String]) -> Result<Vec<KeywordMetrics>, KeywordGatewayError> {
        self.throttle.acquire().await;

        let body = vec![OverviewTask {
            keywords,
            location_code: self.config.location_code,
            language_code: &self.config.language_code,
        }];

        let response = self
            .client
            .post(format!("{}{}", self.config.base_url.trim_end_matches('/'), OVERVIEW_PATH))
            .basic_auth(&self.config.login, Some(self.config.password.expose_secret()))
            .json(&body)
            .send()
            .await
            .map_err(|e| KeywordGatewayError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => KeywordGatewayError::AuthenticationFailed,
                StatusCode::TOO_MANY_REQUESTS => KeywordGatewayError::RateLimited,
                _ => KeywordGatewayError::Api {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        let envelope: OverviewResponse = response
            .json()
            .await
            .map_err(|e| KeywordGatewayError::Parse(e.to_string()))?;

        parse_overview(envelope)
    }
}

#[async_trait]
impl KeywordMetricsGateway for DataForSeoGateway {
    async fn get_bulk_metrics(&self, keywords: &[String]) -> Result<Vec<KeywordMetrics>, KeywordGatewayError> {
        let mut metrics = Vec::with_capacity(keywords.len());
        for chunk in keywords.chunks(self.config.batch_size.max(1)) {
            let mut found = self.fetch_chunk(chunk).await?;
            debug!(requested = chunk.len(), returned = found.len(), "DataForSEO chunk fetched");
            metrics.append(&mut found);
        }
        Ok(metrics)
    }
}

fn parse_overview(envelope: OverviewResponse) -> Result<Vec<KeywordMetrics>, KeywordGatewayError> {
    let task = envelope
        .tasks
        .into_iter()
        .next()
        .ok_or_else(|| KeywordGatewayError::Parse("response has no tasks".to_string()))?;

    if task.status_code != TASK_OK {
        return Err(KeywordGatewayError::Api {
            status: 200,
            message: format!("task {}: {}", task.status_code, task.status_message),
        });
    }

    let items = task
        .result
        .unwrap_or_default()
        .into_iter()
        .flat_map(|result| result.items.unwrap_or_default());

    Ok(items.filter_map(item_to_metrics).collect())
}

fn item_to_metrics(item: OverviewItem) -> Option<KeywordMetrics> {
    let keyword = item.keyword?;
    let info = item.keyword_info.unwrap_or_default();

    let mut monthly: Vec<MonthlySearches> = info
        .monthly_searches
        .unwrap_or_default()
        .into_iter()
        .map(|m| MonthlySearches {
            year: m.year,
            month: m.month,
            search_volume: m.search_volume.unwrap_or(0),
        })
        .collect();
    monthly.sort_by_key(|m| (m.year, m.month));

    let difficulty = item
        .keyword_properties
        .and_then(|p| p.keyword_difficulty)
        .unwrap_or(0)
        .min(100) as u8;

    let competition = info.competition.unwrap_or(0.0);
    if !(0.0..=1.0).contains(&competition) {
        warn!(%keyword, competition, "Competition outside 0-1, clamping");
    }

    Some(KeywordMetrics {
        search_volume: info.search_volume.unwrap_or(0),
        difficulty,
        cpc: sanitize_money(info.cpc.unwrap_or(0.0)),
        competition: if competition.is_finite() { competition.clamp(0.0, 1.0) } else { 0.0 },
        trend: derive_trend(&monthly),
        seasonal: detect_seasonality(&monthly),
        monthly_trends: monthly,
        keyword,
    })
}

// ----- DataForSEO API Types -----

#[derive(Debug, Serialize)]
struct OverviewTask<'a> {
    keywords: &'a [String],
    location_code: u32,
    language_code: &'a str,
}

#[derive(Debug, Deserialize)]
struct OverviewResponse {
    #[serde(default)]
    tasks: Vec<OverviewTaskResult>,
}

#[derive(Debug, Deserialize)]
struct OverviewTaskResult {
    status_code: u32,
    #[serde(default)]
    status_message: String,
    result: Option<Vec<OverviewResult>>,
}

#[derive(Debug, Deserialize)]
struct OverviewResult {
    items: Option<Vec<OverviewItem>>,
}

#[derive(Debug, Deserialize)]
struct OverviewItem {
    keyword: Option<String>,
    keyword_info: Option<KeywordInfo>,
    keyword_properties: Option<KeywordProperties>,
}

#[derive(Debug, Default, Deserialize)]
struct KeywordInfo {
    search_volume: Option<u64>,
    cpc: Option<f64>,
    competition: Option<f64>,
    monthly_searches: Option<Vec<MonthlyItem>>,
}

#[derive(Debug, Deserialize)]
struct MonthlyItem {
    year: i32,
    month: u32,
    search_volume: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct KeywordProperties {
    keyword_difficulty: Option<u32>,
}

//! Scripted keyword gateway for tests and offline runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::opportunity::{normalize, KeywordMetrics};
use crate::ports::{KeywordGatewayError, KeywordMetricsGateway};

/// In-memory keyword gateway.
///
/// Returns the scripted metrics for known keywords and nothing for the
/// rest. A number of upcoming calls can be made to fail.
#[derive(Clone, Default)]
pub struct InMemoryKeywordGateway {
    metrics: Arc<RwLock<HashMap<String, KeywordMetrics>>>,
    fail_next: Arc<AtomicUsize>,
    reject_credentials: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
    requested: Arc<RwLock<Vec<Vec<String>>>>,
}

impl InMemoryKeywordGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds metrics, keyed by normalized keyword.
    pub fn with_metrics(self, metrics: KeywordMetrics) -> Self {
        let metrics_map = Arc::clone(&self.metrics);
        if let Ok(mut map) = metrics_map.try_write() {
            map.insert(normalize(&metrics.keyword), metrics);
        }
        self
    }

    pub async fn insert(&self, metrics: KeywordMetrics) {
        self.metrics
            .write()
            .await
            .insert(normalize(&metrics.keyword), metrics);
    }

    /// Makes the next `count` calls fail with an API error.
    pub fn fail_next(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Makes every call fail as if the credentials were rejected.
    pub fn reject_credentials(&self) {
        self.reject_credentials.store(true, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Keyword lists received, one entry per call.
    pub async fn requests(&self) -> Vec<Vec<String>> {
        self.requested.read().await.clone()
    }
}

#[async_trait]
impl KeywordMetricsGateway for InMemoryKeywordGateway {
    async fn get_bulk_metrics(&self, keywords: &[String]) -> Result<Vec<KeywordMetrics>, KeywordGatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.write().await.push(keywords.to_vec());

        if self.reject_credentials.load(Ordering::SeqCst) {
            return Err(KeywordGatewayError::AuthenticationFailed);
        }

        let failing = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(KeywordGatewayError::Api {
                status: 503,
                message: "scripted failure".to_string(),
            });
        }

        let metrics = self.metrics.read().await;
        Ok(keywords
            .iter()
            .filter_map(|k| metrics.get(&normalize(k)).cloned())
            .collect())
    }
}

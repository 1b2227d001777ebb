//! Keyword Metrics Gateway Port - bulk keyword research lookups.

use async_trait::async_trait;

use crate::domain::opportunity::KeywordMetrics;

/// Errors from the keyword metrics provider.
#[derive(Debug, thiserror::Error)]
pub enum KeywordGatewayError {
    #[error("keyword API rate limited")]
    RateLimited,

    #[error("keyword API authentication failed")]
    AuthenticationFailed,

    #[error("keyword API returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response: {0}")]
    Parse(String),
}

impl KeywordGatewayError {
    /// True when retrying cannot help because the credentials are wrong.
    pub fn is_configuration(&self) -> bool {
        matches!(self, KeywordGatewayError::AuthenticationFailed)
    }
}

/// Port for keyword metrics.
#[async_trait]
pub trait KeywordMetricsGateway: Send + Sync {
    /// Returns metrics for the given keywords.
    ///
    /// Keywords the provider has no data for may be missing from the result.
    async fn get_bulk_metrics(&self, keywords: &[String]) -> Result<Vec<KeywordMetrics>, KeywordGatewayError>;
}

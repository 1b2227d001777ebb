//! Keyword research (DataForSEO) configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct KeywordResearchConfig {
    pub login: Option<String>,
    pub password: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// DataForSEO location code (2826 = United Kingdom)
    #[serde(default = "default_location_code")]
    pub location_code: u32,

    #[serde(default = "default_language_code")]
    pub language_code: String,

    /// Requests allowed per throttle window
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,

    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl KeywordResearchConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns the credential pair when both halves are present.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.login.as_deref(), self.password.as_deref()) {
            (Some(login), Some(password)) if !login.is_empty() && !password.is_empty() => {
                Some((login, password))
            }
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.credentials().is_none() {
            return Err(ValidationError::MissingRequired(
                "KEYWORD_RESEARCH__LOGIN / KEYWORD_RESEARCH__PASSWORD",
            ));
        }
        if !self.base_url.starts_with("https://") && !self.base_url.starts_with("http://") {
            return Err(ValidationError::InvalidUrl("keyword_research.base_url"));
        }
        if self.max_requests == 0 || self.window_secs == 0 {
            return Err(ValidationError::InvalidThrottle);
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout("keyword_research"));
        }
        Ok(())
    }
}

impl Default for KeywordResearchConfig {
    fn default() -> Self {
        Self {
            login: None,
            password: None,
            base_url: default_base_url(),
            location_code: default_location_code(),
            language_code: default_language_code(),
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.dataforseo.com".to_string()
}

fn default_location_code() -> u32 {
    2826
}

fn default_language_code() -> String {
    "en".to_string()
}

fn default_max_requests() -> usize {
    12
}

fn default_window_secs() -> u64 {
    60
}

fn default_timeout() -> u64 {
    30
}

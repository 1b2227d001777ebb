//! Inventory (Holibob) configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct InventoryConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    pub api_key: Option<String>,

    pub partner_id: Option<String>,

    /// Products requested per destination lookup
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Concurrent destination lookups per validation batch
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl InventoryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(ValidationError::MissingRequired("INVENTORY__API_KEY"));
        }
        if !self.api_url.starts_with("https://") && !self.api_url.starts_with("http://") {
            return Err(ValidationError::InvalidUrl("inventory.api_url"));
        }
        if self.concurrency == 0 || self.page_size == 0 {
            return Err(ValidationError::InvalidThrottle);
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout("inventory"));
        }
        Ok(())
    }
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
            partner_id: None,
            page_size: default_page_size(),
            concurrency: default_concurrency(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.holibob.tech/graphql".to_string()
}

fn default_page_size() -> u32 {
    10
}

fn default_concurrency() -> usize {
    4
}

fn default_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key() {
        assert!(matches!(
            InventoryConfig::default().validate(),
            Err(ValidationError::MissingRequired("INVENTORY__API_KEY"))
        ));
    }

    #[test]
    fn test_invalid_url() {
        let config = InventoryConfig {
            api_key: Some("key".to_string()),
            api_url: "ftp://inventory".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ValidationError::InvalidUrl(_))));
    }

    #[test]
    fn test_valid_config() {
        let config = InventoryConfig {
            api_key: Some("key".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.page_size, 10);
    }
}

//! Inventory Gateway Port - bookable product discovery.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Discovery filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryFilter {
    pub destination: String,
    pub category: Option<String>,
}

impl InventoryFilter {
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            category: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// A product returned by discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryProduct {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
}

/// One page of discovery results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryPage {
    pub products: Vec<InventoryProduct>,
    /// Total matches across all pages.
    pub total_count: u32,
}

/// Errors from the inventory provider.
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("inventory API returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response: {0}")]
    Parse(String),
}

/// Port for inventory feasibility checks.
#[async_trait]
pub trait InventoryGateway: Send + Sync {
    async fn discover(&self, filter: &InventoryFilter, page_size: u32) -> Result<InventoryPage, InventoryError>;
}

//! Scripted inventory gateway for tests and offline runs.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::opportunity::normalize;
use crate::ports::{InventoryError, InventoryFilter, InventoryGateway, InventoryPage, InventoryProduct};

/// In-memory inventory gateway.
///
/// Product counts are keyed by normalized destination. Destinations marked
/// as failing return an API error on every lookup.
#[derive(Clone, Default)]
pub struct InMemoryInventoryGateway {
    counts: Arc<RwLock<HashMap<String, u32>>>,
    failing: Arc<RwLock<HashSet<String>>>,
    calls: Arc<AtomicUsize>,
}

impl InMemoryInventoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_count(&self, destination: &str, count: u32) {
        self.counts.write().await.insert(normalize(destination), count);
    }

    pub async fn fail_for(&self, destination: &str) {
        self.failing.write().await.insert(normalize(destination));
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InventoryGateway for InMemoryInventoryGateway {
    async fn discover(&self, filter: &InventoryFilter, page_size: u32) -> Result<InventoryPage, InventoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let destination = normalize(&filter.destination);

        if self.failing.read().await.contains(&destination) {
            return Err(InventoryError::Api {
                status: 502,
                message: format!("scripted failure for {destination}"),
            });
        }

        let total_count = self.counts.read().await.get(&destination).copied().unwrap_or(0);
        let products = (0..total_count.min(page_size))
            .map(|i| InventoryProduct {
                id: format!("{destination}-{i}"),
                name: format!("Product {i}"),
                category: filter.category.clone(),
            })
            .collect();

        Ok(InventoryPage {
            products,
            total_count,
        })
    }
}

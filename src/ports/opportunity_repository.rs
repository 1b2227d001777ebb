//! Opportunity Repository Port - durable store of known opportunities.

use async_trait::async_trait;
use std::collections::HashSet;

use crate::domain::foundation::DomainError;
use crate::domain::opportunity::{OpportunityKey, RankedOpportunity};

/// Port for the durable opportunity store.
#[async_trait]
pub trait OpportunityRepository: Send + Sync {
    /// Every stored `(keyword, location)` pair, normalized.
    async fn find_existing_keys(&self) -> Result<HashSet<OpportunityKey>, DomainError>;

    /// Inserts the opportunity or updates the record with the same key.
    async fn upsert(&self, opportunity: &RankedOpportunity) -> Result<(), DomainError>;
}

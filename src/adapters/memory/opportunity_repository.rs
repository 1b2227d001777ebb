//! In-memory implementation of OpportunityRepository.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::opportunity::{OpportunityKey, RankedOpportunity};
use crate::ports::OpportunityRepository;

/// Process-local opportunity store. Clones share the same data.
#[derive(Clone, Default)]
pub struct InMemoryOpportunityRepository {
    records: Arc<RwLock<HashMap<OpportunityKey, RankedOpportunity>>>,
    /// Keys known without a full record, e.g. imported from elsewhere.
    known: Arc<RwLock<HashSet<OpportunityKey>>>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryOpportunityRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a known key without a full record.
    pub async fn add_existing(&self, keyword: &str, location: &str) {
        self.known
            .write()
            .await
            .insert(OpportunityKey::new(keyword, location));
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    pub async fn get(&self, keyword: &str, location: &str) -> Option<RankedOpportunity> {
        self.records
            .read()
            .await
            .get(&OpportunityKey::new(keyword, location))
            .cloned()
    }

    /// Makes subsequent upserts fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl OpportunityRepository for InMemoryOpportunityRepository {
    async fn find_existing_keys(&self) -> Result<HashSet<OpportunityKey>, DomainError> {
        let mut keys: HashSet<OpportunityKey> = self.records.read().await.keys().cloned().collect();
        keys.extend(self.known.read().await.iter().cloned());
        Ok(keys)
    }

    async fn upsert(&self, opportunity: &RankedOpportunity) -> Result<(), DomainError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                "scripted write failure",
            ));
        }
        self.records
            .write()
            .await
            .insert(opportunity.opportunity.suggestion.key(), opportunity.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{OpportunityId, Percentage, Timestamp};
    use crate::domain::opportunity::{
        merge_across_iterations, DomainAvailability, ExplanationSource, InventorySnapshot,
        KeywordMetrics, OpportunitySuggestion, ProjectionAssumptions, ValidatedOpportunity,
    };

    fn ranked(keyword: &str, destination: &str, score: u8) -> RankedOpportunity {
        let validated = ValidatedOpportunity {
            suggestion: OpportunitySuggestion {
                id: OpportunityId::new(),
                destination: destination.to_string(),
                category: "tours".to_string(),
                niche: "tours".to_string(),
                keyword: keyword.to_string(),
                cluster_keywords: vec![],
                rationale: String::new(),
                suggested_domain: None,
                alternative_domains: vec![],
                confidence_score: Percentage::new(50),
                iteration_source: 1,
            },
            keyword_metrics: KeywordMetrics::zero(keyword),
            cluster_data: None,
            inventory: InventorySnapshot::default(),
            domain_availability: DomainAvailability::Unknown,
            priority_score: Percentage::new(score),
            validated_at: Timestamp::now(),
        };
        let merged = merge_across_iterations([&validated]).remove(0);
        RankedOpportunity::new(
            1,
            merged,
            "x".to_string(),
            ExplanationSource::Templated,
            &ProjectionAssumptions::default(),
        )
    }

    #[tokio::test]
    async fn upsert_replaces_same_key() {
        let repo = InMemoryOpportunityRepository::new();
        repo.upsert(&ranked("Rome Food Tour", "Rome", 60)).await.unwrap();
        repo.upsert(&ranked("rome food tour", "rome", 80)).await.unwrap();

        assert_eq!(repo.len().await, 1);
        let stored = repo.get("rome food tour", "Rome").await.unwrap();
        assert_eq!(stored.score().value(), 80);
    }

    #[tokio::test]
    async fn existing_keys_include_seeded_and_stored() {
        let repo = InMemoryOpportunityRepository::new();
        repo.add_existing("Paris Wine", "Paris").await;
        repo.upsert(&ranked("rome food tour", "Rome", 60)).await.unwrap();

        let keys = repo.find_existing_keys().await.unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&OpportunityKey::new("paris wine", "paris")));
    }

    #[tokio::test]
    async fn scripted_write_failure() {
        let repo = InMemoryOpportunityRepository::new();
        repo.fail_writes(true);
        assert!(repo.upsert(&ranked("a b", "C", 10)).await.is_err());
        assert!(repo.is_empty().await);
    }
}

//! PostgreSQL implementation of OpportunityRepository.
//!
//! Keys are stored normalized, so the unique `(keyword, location)` index
//! matches the pre-filter's notion of identity.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use std::collections::HashSet;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::opportunity::{OpportunityKey, RankedOpportunity};
use crate::ports::OpportunityRepository;

/// PostgreSQL implementation of OpportunityRepository.
#[derive(Clone)]
pub struct PostgresOpportunityRepository {
    pool: PgPool,
}

impl PostgresOpportunityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct KeyRow {
    keyword: String,
    location: String,
}

#[async_trait]
impl OpportunityRepository for PostgresOpportunityRepository {
    async fn find_existing_keys(&self) -> Result<HashSet<OpportunityKey>, DomainError> {
        let rows: Vec<KeyRow> = sqlx::query_as("SELECT keyword, location FROM opportunities")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Failed to load opportunity keys: {}", e),
                )
            })?;

        Ok(rows
            .into_iter()
            .map(|row| OpportunityKey::new(&row.keyword, &row.location))
            .collect())
    }

    async fn upsert(&self, ranked: &RankedOpportunity) -> Result<(), DomainError> {
        let opportunity = &ranked.opportunity;
        let suggestion = &opportunity.suggestion;
        let key = suggestion.key();
        let payload = serde_json::to_string(ranked).map_err(|e| {
            DomainError::new(
                ErrorCode::SerializationFailed,
                format!("Failed to serialize opportunity: {}", e),
            )
            .with_detail("keyword", key.keyword.clone())
        })?;

        sqlx::query(
            r#"
            INSERT INTO opportunities (
                id, keyword, location, category, niche, priority_score,
                search_volume, cluster_volume, difficulty, cpc,
                suggested_domain, explanation, payload, validated_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, NOW())
            ON CONFLICT (keyword, location) DO UPDATE SET
                category = EXCLUDED.category,
                niche = EXCLUDED.niche,
                priority_score = EXCLUDED.priority_score,
                search_volume = EXCLUDED.search_volume,
                cluster_volume = EXCLUDED.cluster_volume,
                difficulty = EXCLUDED.difficulty,
                cpc = EXCLUDED.cpc,
                suggested_domain = EXCLUDED.suggested_domain,
                explanation = EXCLUDED.explanation,
                payload = EXCLUDED.payload,
                validated_at = EXCLUDED.validated_at,
                updated_at = NOW()
            "#,
        )
        .bind(suggestion.id.as_uuid())
        .bind(&key.keyword)
        .bind(&key.location)
        .bind(&suggestion.category)
        .bind(&suggestion.niche)
        .bind(i16::from(opportunity.priority_score.value()))
        .bind(opportunity.keyword_metrics.search_volume as i64)
        .bind(opportunity.cluster_volume() as i64)
        .bind(i16::from(opportunity.keyword_metrics.difficulty))
        .bind(opportunity.effective_cpc())
        .bind(suggestion.suggested_domain.as_deref())
        .bind(&ranked.explanation)
        .bind(payload)
        .bind(opportunity.validated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to upsert opportunity: {}", e),
            )
            .with_detail("keyword", key.keyword.clone())
            .with_detail("location", key.location.clone())
        })?;

        Ok(())
    }
}

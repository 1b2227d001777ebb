//! Domain Availability Port - approximate registrability check.

use async_trait::async_trait;

use crate::domain::opportunity::DomainAvailability;

/// Port for checking whether a domain name is likely available.
///
/// Answers are heuristic. Implementations must not fail; anything they
/// cannot determine is `Unknown`.
#[async_trait]
pub trait DomainAvailabilityChecker: Send + Sync {
    async fn check(&self, domain: &str) -> DomainAvailability;
}

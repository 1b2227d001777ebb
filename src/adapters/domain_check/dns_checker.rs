//! DNS-based domain availability heuristic.
//!
//! A name that resolves is registered. A name that does not resolve may
//! still be registered without records, so a failed lookup only means
//! "likely available".

use async_trait::async_trait;
use std::time::Duration;
use tokio::net::lookup_host;
use tokio::time::timeout;
use tracing::debug;

use crate::domain::opportunity::DomainAvailability;
use crate::ports::DomainAvailabilityChecker;

/// Checks domains by resolving them.
#[derive(Debug, Clone)]
pub struct DnsDomainChecker {
    timeout: Duration,
}

impl Default for DnsDomainChecker {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}

impl DnsDomainChecker {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

/// Lowercases and strips scheme, path and a leading "www.".
///
/// Returns `None` for anything that cannot be a registrable name.
pub(crate) fn clean_domain(raw: &str) -> Option<String> {
    let mut name = raw.trim().to_lowercase();
    for scheme in ["https://", "http://"] {
        if let Some(rest) = name.strip_prefix(scheme) {
            name = rest.to_string();
        }
    }
    let name = name.split('/').next().unwrap_or_default();
    let name = name.strip_prefix("www.").unwrap_or(name);

    let labels: Vec<&str> = name.split('.').collect();
    let valid = labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        });

    valid.then(|| name.to_string())
}

#[async_trait]
impl DomainAvailabilityChecker for DnsDomainChecker {
    async fn check(&self, domain: &str) -> DomainAvailability {
        let Some(name) = clean_domain(domain) else {
            return DomainAvailability::Unknown;
        };

        let result = timeout(self.timeout, lookup_host((name.as_str(), 80))).await;
        match result {
            Ok(Ok(mut addrs)) => {
                if addrs.next().is_some() {
                    DomainAvailability::Unlikely
                } else {
                    DomainAvailability::Likely
                }
            }
            Ok(Err(_)) => DomainAvailability::Likely,
            Err(_) => {
                debug!(domain = %name, "DNS lookup timed out");
                DomainAvailability::Unknown
            }
        }
    }
}

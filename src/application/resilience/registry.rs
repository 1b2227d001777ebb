//! Registry of named circuit breakers.
//!
//! Constructed once by the composition root and passed to whoever needs
//! breakers. When built with a shared store, every breaker it creates
//! persists through that store, and status/reset also cover breakers that
//! only other processes have created.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::circuit_breaker::{CircuitBreaker, CircuitStatus, STATE_KEY_PREFIX};
use crate::domain::resilience::{BreakerState, CircuitBreakerConfig};
use crate::ports::{Clock, SharedStateStore};

pub struct CircuitBreakerRegistry {
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
    default_config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
    store: Option<Arc<dyn SharedStateStore>>,
}

impl CircuitBreakerRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            breakers: RwLock::new(HashMap::new()),
            default_config: CircuitBreakerConfig::default(),
            clock,
            store: None,
        }
    }

    /// Config used when `get_breaker` is called without one.
    pub fn with_default_config(mut self, config: CircuitBreakerConfig) -> Self {
        self.default_config = config;
        self
    }

    /// Shares breaker state with other processes through `store`.
    pub fn with_shared_store(mut self, store: Arc<dyn SharedStateStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn is_shared(&self) -> bool {
        self.store.is_some()
    }

    /// Returns the breaker for `service_name`, creating it on first use.
    ///
    /// `config` only applies when the breaker is created.
    pub async fn get_breaker(
        &self,
        service_name: &str,
        config: Option<CircuitBreakerConfig>,
    ) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.read().await.get(service_name) {
            return existing.clone();
        }

        let mut breakers = self.breakers.write().await;
        breakers
            .entry(service_name.to_string())
            .or_insert_with(|| {
                let config = config.unwrap_or_else(|| self.default_config.clone());
                let mut breaker = CircuitBreaker::new(service_name, config, self.clock.clone());
                if let Some(store) = &self.store {
                    breaker = breaker.with_shared_store(store.clone());
                }
                Arc::new(breaker)
            })
            .clone()
    }

    /// Status of every known breaker, sorted by service name.
    pub async fn get_all_status(&self) -> Vec<CircuitStatus> {
        let local: Vec<Arc<CircuitBreaker>> = self.breakers.read().await.values().cloned().collect();

        let mut statuses = Vec::with_capacity(local.len());
        for breaker in &local {
            statuses.push(breaker.get_status().await);
        }

        for service in self.remote_only_services(&local).await {
            if let Some(status) = self.load_remote_status(&service).await {
                statuses.push(status);
            }
        }

        statuses.sort_by(|a, b| a.service_name.cmp(&b.service_name));
        statuses
    }

    /// Resets every known breaker, including entries only present in the
    /// shared store.
    pub async fn reset_all(&self) {
        let local: Vec<Arc<CircuitBreaker>> = self.breakers.read().await.values().cloned().collect();
        for breaker in &local {
            breaker.reset().await;
        }

        let remote = self.remote_only_services(&local).await;
        if let Some(store) = &self.store {
            for service in &remote {
                let key = format!("{STATE_KEY_PREFIX}{service}");
                if let Err(e) = store.delete(&key).await {
                    warn!(service = %service, error = %e, "Failed to delete shared breaker state");
                }
            }
        }

        info!(count = local.len() + remote.len(), "Reset all circuit breakers");
    }

    /// Services with state in the shared store but no local breaker.
    async fn remote_only_services(&self, local: &[Arc<CircuitBreaker>]) -> Vec<String> {
        let Some(store) = &self.store else {
            return Vec::new();
        };

        let keys = match store.list_keys_by_prefix(STATE_KEY_PREFIX).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "Failed to list shared breaker keys");
                return Vec::new();
            }
        };

        keys.into_iter()
            .filter_map(|key| key.strip_prefix(STATE_KEY_PREFIX).map(str::to_string))
            .filter(|service| !local.iter().any(|b| b.service_name() == service.as_str()))
            .collect()
    }

    async fn load_remote_status(&self, service: &str) -> Option<CircuitStatus> {
        let store = self.store.as_ref()?;
        let key = format!("{STATE_KEY_PREFIX}{service}");
        let bytes = match store.get(&key).await {
            Ok(bytes) => bytes?,
            Err(e) => {
                warn!(service = %service, error = %e, "Failed to load shared breaker state");
                return None;
            }
        };
        match serde_json::from_slice::<BreakerState>(&bytes) {
            Ok(state) => {
                let now = self.clock.now_millis();
                Some(CircuitStatus::from_state(
                    service,
                    &state.snapshot_at(now, &self.default_config),
                ))
            }
            Err(e) => {
                warn!(service = %service, error = %e, "Ignoring undecodable shared breaker state");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clock::ManualClock;
    use crate::adapters::storage::InMemorySharedStateStore;
    use crate::domain::resilience::CircuitState;
    use std::time::Duration;

    fn registry(clock: &Arc<ManualClock>) -> CircuitBreakerRegistry {
        CircuitBreakerRegistry::new(clock.clone())
    }

    #[tokio::test]
    async fn returns_same_breaker_for_same_name() {
        let clock = Arc::new(ManualClock::new(0));
        let reg = registry(&clock);

        let a = reg.get_breaker("anthropic", None).await;
        let b = reg.get_breaker("anthropic", Some(CircuitBreakerConfig::for_keyword_api())).await;

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(b.config(), &CircuitBreakerConfig::default());
    }

    #[tokio::test]
    async fn uses_caller_config_on_creation() {
        let clock = Arc::new(ManualClock::new(0));
        let reg = registry(&clock);

        let breaker = reg
            .get_breaker("dataforseo", Some(CircuitBreakerConfig::for_keyword_api()))
            .await;
        assert_eq!(breaker.config(), &CircuitBreakerConfig::for_keyword_api());
    }

    #[tokio::test]
    async fn all_status_is_sorted_and_reset_all_closes() {
        let clock = Arc::new(ManualClock::new(0));
        let config = CircuitBreakerConfig {
            failure_threshold: 1,
            ..Default::default()
        };
        let reg = registry(&clock).with_default_config(config);

        let b = reg.get_breaker("holibob", None).await;
        reg.get_breaker("anthropic", None).await;
        let _ = b.execute(|| async { Err::<(), _>("down") }).await;

        let statuses = reg.get_all_status().await;
        let names: Vec<_> = statuses.iter().map(|s| s.service_name.as_str()).collect();
        assert_eq!(names, vec!["anthropic", "holibob"]);
        assert_eq!(statuses[1].state, CircuitState::Open);

        reg.reset_all().await;
        assert!(reg
            .get_all_status()
            .await
            .iter()
            .all(|s| s.state == CircuitState::Closed));
    }

    #[tokio::test]
    async fn shared_store_exposes_breakers_from_other_registries() {
        let clock = Arc::new(ManualClock::new(0));
        let store: Arc<InMemorySharedStateStore> = Arc::new(InMemorySharedStateStore::new(clock.clone()));
        let config = CircuitBreakerConfig {
            failure_threshold: 1,
            timeout: Duration::from_secs(30),
            ..Default::default()
        };
        let first = registry(&clock)
            .with_default_config(config.clone())
            .with_shared_store(store.clone());
        let second = registry(&clock)
            .with_default_config(config)
            .with_shared_store(store.clone());

        let b = first.get_breaker("dataforseo", None).await;
        let _ = b.execute(|| async { Err::<(), _>("500") }).await;

        let seen = second.get_all_status().await;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].service_name, "dataforseo");
        assert_eq!(seen[0].state, CircuitState::Open);

        second.reset_all().await;
        assert!(store.get("circuit_breaker:dataforseo").await.unwrap().is_none());
    }
}

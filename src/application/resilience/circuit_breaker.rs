//! Async circuit breaker guarding calls to one external service.
//!
//! Wraps the pure `BreakerState` machine with a lock, an injected clock,
//! and optional persistence to a `SharedStateStore`. When a store is
//! configured the state is re-read before every call and written after
//! every outcome, so processes guarding the same service name share one
//! circuit. Store failures are logged and ignored; the breaker then
//! behaves as a purely in-memory one.

use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::resilience::{
    BreakerState, CircuitBreakerConfig, CircuitMetrics, CircuitOpenError, CircuitState, Transition,
};
use crate::ports::{Clock, SharedStateStore};

/// Key prefix for breaker entries in the shared store.
pub const STATE_KEY_PREFIX: &str = "circuit_breaker:";

/// Lifetime of a shared breaker entry after its last write.
pub const STATE_TTL: Duration = Duration::from_secs(3600);

/// Shared-store key for a service.
pub fn state_key(service_name: &str) -> String {
    format!("{STATE_KEY_PREFIX}{service_name}")
}

/// Outcome of a guarded call that did not succeed.
#[derive(Debug, Error)]
pub enum CircuitBreakerError<E> {
    /// Rejected without calling the service.
    #[error(transparent)]
    Open(#[from] CircuitOpenError),

    /// The guarded call failed. The error is passed through unchanged.
    #[error("{0}")]
    Upstream(E),

    /// The guarded call exceeded its deadline and was dropped.
    #[error("call timed out after {0:?}")]
    Timeout(Duration),
}

impl<E> CircuitBreakerError<E> {
    pub fn is_open(&self) -> bool {
        matches!(self, CircuitBreakerError::Open(_))
    }

    /// Returns the upstream error, if that is what this is.
    pub fn into_upstream(self) -> Option<E> {
        match self {
            CircuitBreakerError::Upstream(e) => Some(e),
            _ => None,
        }
    }
}

/// Read-only snapshot for observability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitStatus {
    pub service_name: String,
    pub state: CircuitState,
    pub metrics: CircuitMetrics,
    /// Epoch millis of the next allowed trial, present only while open.
    pub next_attempt_time: Option<u64>,
}

impl CircuitStatus {
    pub(crate) fn from_state(service_name: &str, state: &BreakerState) -> Self {
        Self {
            service_name: service_name.to_string(),
            state: state.state,
            metrics: state.metrics.clone(),
            next_attempt_time: state.next_attempt(),
        }
    }
}

/// Circuit breaker for one named service.
pub struct CircuitBreaker {
    service_name: String,
    config: CircuitBreakerConfig,
    state: Mutex<BreakerState>,
    clock: Arc<dyn Clock>,
    store: Option<Arc<dyn SharedStateStore>>,
}

impl CircuitBreaker {
    pub fn new(service_name: impl Into<String>, config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            service_name: service_name.into(),
            config,
            state: Mutex::new(BreakerState::new()),
            clock,
            store: None,
        }
    }

    /// Enables cross-process state through `store`.
    pub fn with_shared_store(mut self, store: Arc<dyn SharedStateStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Runs `operation` if the circuit admits it and records the outcome.
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.acquire().await?;

        match operation().await {
            Ok(value) => {
                self.on_success().await;
                Ok(value)
            }
            Err(e) => {
                self.on_failure().await;
                Err(CircuitBreakerError::Upstream(e))
            }
        }
    }

    /// Like `execute`, but a call still running after `timeout` is dropped
    /// and counted as a failure.
    pub async fn execute_with_timeout<T, E, F, Fut>(
        &self,
        timeout: Duration,
        operation: F,
    ) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.acquire().await?;

        match tokio::time::timeout(timeout, operation()).await {
            Ok(Ok(value)) => {
                self.on_success().await;
                Ok(value)
            }
            Ok(Err(e)) => {
                self.on_failure().await;
                Err(CircuitBreakerError::Upstream(e))
            }
            Err(_) => {
                warn!(service = %self.service_name, timeout_ms = timeout.as_millis() as u64, "Guarded call timed out");
                self.on_failure().await;
                Err(CircuitBreakerError::Timeout(timeout))
            }
        }
    }

    /// Forces the circuit closed with zeroed counters.
    pub async fn reset(&self) {
        self.rehydrate().await;
        let snapshot = {
            let mut state = self.state.lock().await;
            state.reset();
            state.clone()
        };
        info!(service = %self.service_name, "Circuit breaker reset");
        self.persist(&snapshot).await;
    }

    /// Current state, counters, and deadline.
    pub async fn get_status(&self) -> CircuitStatus {
        self.rehydrate().await;
        let now = self.clock.now_millis();
        let state = self.state.lock().await;
        CircuitStatus::from_state(&self.service_name, &state.snapshot_at(now, &self.config))
    }

    async fn acquire(&self) -> Result<(), CircuitOpenError> {
        self.rehydrate().await;
        let now = self.clock.now_millis();

        let (transition, snapshot) = {
            let mut state = self.state.lock().await;
            match state.try_acquire(&self.service_name, now) {
                Ok(transition) => (transition, transition.map(|_| state.clone())),
                Err(rejection) => {
                    debug!(
                        service = %self.service_name,
                        retry_in_ms = rejection.retry_in_ms,
                        "Circuit open, rejecting call"
                    );
                    return Err(rejection);
                }
            }
        };

        if let Some(t) = transition {
            self.log_transition(t);
        }
        if let Some(s) = snapshot {
            self.persist(&s).await;
        }
        Ok(())
    }

    async fn on_success(&self) {
        let now = self.clock.now_millis();
        let (transition, snapshot) = {
            let mut state = self.state.lock().await;
            let transition = state.record_success(now, &self.config);
            (transition, state.snapshot_at(now, &self.config))
        };
        if let Some(t) = transition {
            self.log_transition(t);
        }
        self.persist(&snapshot).await;
    }

    async fn on_failure(&self) {
        let now = self.clock.now_millis();
        let (transition, snapshot) = {
            let mut state = self.state.lock().await;
            let transition = state.record_failure(now, &self.config);
            (transition, state.snapshot_at(now, &self.config))
        };
        debug!(
            service = %self.service_name,
            recent_failures = snapshot.metrics.recent_failures.len(),
            "Recorded failure"
        );
        if let Some(t) = transition {
            self.log_transition(t);
        }
        self.persist(&snapshot).await;
    }

    /// Replaces local state with the shared copy, when one exists.
    async fn rehydrate(&self) {
        let Some(store) = &self.store else {
            return;
        };

        let bytes = match store.get(&state_key(&self.service_name)).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return,
            Err(e) => {
                warn!(service = %self.service_name, error = %e, "Failed to load shared breaker state");
                return;
            }
        };

        match serde_json::from_slice::<BreakerState>(&bytes) {
            Ok(shared) => *self.state.lock().await = shared,
            Err(e) => {
                warn!(service = %self.service_name, error = %e, "Ignoring undecodable shared breaker state");
            }
        }
    }

    async fn persist(&self, snapshot: &BreakerState) {
        let Some(store) = &self.store else {
            return;
        };

        let bytes = match serde_json::to_vec(snapshot) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(service = %self.service_name, error = %e, "Failed to encode breaker state");
                return;
            }
        };

        if let Err(e) = store
            .set_with_ttl(&state_key(&self.service_name), &bytes, STATE_TTL)
            .await
        {
            warn!(service = %self.service_name, error = %e, "Failed to persist breaker state");
        }
    }

    fn log_transition(&self, transition: Transition) {
        match transition.to {
            CircuitState::Open => warn!(
                service = %self.service_name,
                from = %transition.from,
                to = %transition.to,
                "Circuit opened"
            ),
            _ => info!(
                service = %self.service_name,
                from = %transition.from,
                to = %transition.to,
                "Circuit state changed"
            ),
        }
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("service_name", &self.service_name)
            .field("config", &self.config)
            .field("shared", &self.store.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clock::ManualClock;
    use crate::adapters::storage::InMemorySharedStateStore;
    use crate::ports::StateStoreError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn config(failure_threshold: u32, timeout_ms: u64) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold,
            success_threshold: 2,
            timeout: Duration::from_millis(timeout_ms),
            time_window: Duration::from_secs(60),
        }
    }

    fn breaker(clock: &Arc<ManualClock>) -> CircuitBreaker {
        CircuitBreaker::new("keywords", config(2, 1_000), clock.clone())
    }

    async fn fail(b: &CircuitBreaker) -> Result<(), CircuitBreakerError<&'static str>> {
        b.execute(|| async { Err::<(), _>("boom") }).await
    }

    async fn succeed(b: &CircuitBreaker) -> Result<u32, CircuitBreakerError<&'static str>> {
        b.execute(|| async { Ok::<_, &'static str>(7) }).await
    }

    #[tokio::test]
    async fn propagates_upstream_error_unchanged() {
        let clock = Arc::new(ManualClock::new(10_000));
        let b = breaker(&clock);

        let err = fail(&b).await.unwrap_err();
        assert_eq!(err.into_upstream(), Some("boom"));
    }

    #[tokio::test]
    async fn open_circuit_does_not_invoke_operation() {
        let clock = Arc::new(ManualClock::new(10_000));
        let b = breaker(&clock);
        fail(&b).await.unwrap_err();
        fail(&b).await.unwrap_err();

        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        clock.advance_millis(500);
        let err = b
            .execute(move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, &'static str>(())
            })
            .await
            .unwrap_err();

        assert!(err.is_open());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        match err {
            CircuitBreakerError::Open(open) => assert_eq!(open.retry_in_ms, 500),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn trial_call_after_deadline_reaches_operation() {
        let clock = Arc::new(ManualClock::new(10_000));
        let b = breaker(&clock);
        fail(&b).await.unwrap_err();
        fail(&b).await.unwrap_err();

        clock.advance_millis(1_001);
        assert_eq!(succeed(&b).await.unwrap(), 7);
        assert_eq!(b.get_status().await.state, CircuitState::HalfOpen);

        succeed(&b).await.unwrap();
        assert_eq!(b.get_status().await.state, CircuitState::Closed);
    }

    #[tokio::test]
    async fn timeout_counts_as_failure() {
        let clock = Arc::new(ManualClock::new(0));
        let b = CircuitBreaker::new("ai", config(1, 1_000), clock.clone());

        let err = b
            .execute_with_timeout(Duration::from_millis(10), || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, &'static str>(())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CircuitBreakerError::Timeout(_)));
        assert_eq!(b.get_status().await.state, CircuitState::Open);
    }

    #[tokio::test]
    async fn reset_closes_and_zeroes() {
        let clock = Arc::new(ManualClock::new(0));
        let b = breaker(&clock);
        fail(&b).await.unwrap_err();
        fail(&b).await.unwrap_err();

        b.reset().await;
        b.reset().await;

        let status = b.get_status().await;
        assert_eq!(status.state, CircuitState::Closed);
        assert_eq!(status.metrics, CircuitMetrics::default());
        assert_eq!(status.next_attempt_time, None);
    }

    #[tokio::test]
    async fn persists_state_to_shared_store() {
        let clock = Arc::new(ManualClock::new(5_000));
        let store = Arc::new(InMemorySharedStateStore::new(clock.clone()));
        let b = breaker(&clock).with_shared_store(store.clone());

        fail(&b).await.unwrap_err();
        fail(&b).await.unwrap_err();

        let bytes = store.get("circuit_breaker:keywords").await.unwrap().unwrap();
        let shared: BreakerState = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(shared.state, CircuitState::Open);
        assert_eq!(shared.next_attempt_time, 6_000);
    }

    struct BrokenStore;

    #[async_trait]
    impl SharedStateStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StateStoreError> {
            Err(StateStoreError::Connection("refused".into()))
        }
        async fn set_with_ttl(&self, _key: &str, _value: &[u8], _ttl: Duration) -> Result<(), StateStoreError> {
            Err(StateStoreError::Connection("refused".into()))
        }
        async fn delete(&self, _key: &str) -> Result<(), StateStoreError> {
            Err(StateStoreError::Connection("refused".into()))
        }
        async fn list_keys_by_prefix(&self, _prefix: &str) -> Result<Vec<String>, StateStoreError> {
            Err(StateStoreError::Connection("refused".into()))
        }
    }

    #[tokio::test]
    async fn store_failures_degrade_to_in_memory() {
        let clock = Arc::new(ManualClock::new(0));
        let b = breaker(&clock).with_shared_store(Arc::new(BrokenStore));

        assert_eq!(succeed(&b).await.unwrap(), 7);
        fail(&b).await.unwrap_err();
        fail(&b).await.unwrap_err();
        assert!(succeed(&b).await.unwrap_err().is_open());
    }
}

//! Circuit breaker scenarios driven through the public API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use opportunity_scout::adapters::{InMemorySharedStateStore, ManualClock};
use opportunity_scout::application::{CircuitBreakerError, CircuitBreakerRegistry};
use opportunity_scout::domain::resilience::{CircuitBreakerConfig, CircuitState};
use opportunity_scout::ports::SharedStateStore;

fn fast_config() -> CircuitBreakerConfig {
    CircuitBreakerConfig {
        failure_threshold: 2,
        success_threshold: 1,
        timeout: Duration::from_millis(1_000),
        time_window: Duration::from_millis(60_000),
    }
}

#[tokio::test]
async fn open_circuit_rejects_until_timeout_then_allows_trial() {
    let clock = Arc::new(ManualClock::new(10_000));
    let registry = CircuitBreakerRegistry::new(clock.clone());
    let breaker = registry.get_breaker("dataforseo", Some(fast_config())).await;
    let invocations = AtomicUsize::new(0);

    for _ in 0..2 {
        let result = breaker
            .execute(|| async {
                invocations.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>("503 Service Unavailable")
            })
            .await;
        assert!(matches!(result, Err(CircuitBreakerError::Upstream("503 Service Unavailable"))));
    }
    assert_eq!(breaker.get_status().await.state, CircuitState::Open);

    clock.advance_millis(500);
    let rejected = breaker
        .execute(|| async {
            invocations.fetch_add(1, Ordering::SeqCst);
            Ok::<_, &str>(())
        })
        .await;
    match rejected {
        Err(CircuitBreakerError::Open(open)) => {
            assert_eq!(open.service_name, "dataforseo");
            assert_eq!(open.retry_in_ms, 500);
        }
        other => panic!("expected open rejection, got {other:?}"),
    }
    assert_eq!(invocations.load(Ordering::SeqCst), 2);

    clock.advance_millis(501);
    let trial = breaker
        .execute(|| async {
            invocations.fetch_add(1, Ordering::SeqCst);
            Ok::<_, &str>(42)
        })
        .await;
    assert_eq!(trial.ok(), Some(42));
    assert_eq!(invocations.load(Ordering::SeqCst), 3);
    assert_eq!(breaker.get_status().await.state, CircuitState::Closed);
}

#[tokio::test]
async fn failed_trial_reopens_circuit() {
    let clock = Arc::new(ManualClock::new(0));
    let registry = CircuitBreakerRegistry::new(clock.clone());
    let breaker = registry.get_breaker("holibob", Some(fast_config())).await;

    for _ in 0..2 {
        let _ = breaker.execute(|| async { Err::<(), _>("timeout") }).await;
    }
    clock.advance_millis(1_001);
    let _ = breaker.execute(|| async { Err::<(), _>("timeout") }).await;

    let status = breaker.get_status().await;
    assert_eq!(status.state, CircuitState::Open);
    assert_eq!(status.next_attempt_time, Some(2_001));
}

#[tokio::test]
async fn two_registries_share_one_circuit_through_the_store() {
    let clock = Arc::new(ManualClock::new(0));
    let store = Arc::new(InMemorySharedStateStore::new(clock.clone()));
    let process_a = CircuitBreakerRegistry::new(clock.clone())
        .with_default_config(fast_config())
        .with_shared_store(store.clone());
    let process_b = CircuitBreakerRegistry::new(clock.clone())
        .with_default_config(fast_config())
        .with_shared_store(store.clone());

    let a = process_a.get_breaker("anthropic", None).await;
    for _ in 0..2 {
        let _ = a.execute(|| async { Err::<(), _>("overloaded") }).await;
    }

    let b = process_b.get_breaker("anthropic", None).await;
    let invoked = AtomicUsize::new(0);
    let result = b
        .execute(|| async {
            invoked.fetch_add(1, Ordering::SeqCst);
            Ok::<_, &str>(())
        })
        .await;

    assert!(matches!(result, Err(CircuitBreakerError::Open(_))));
    assert_eq!(invoked.load(Ordering::SeqCst), 0);

    assert!(store.get("circuit_breaker:anthropic").await.unwrap().is_some());

    process_b.reset_all().await;
    assert_eq!(process_b.get_all_status().await[0].state, CircuitState::Closed);
    assert_eq!(a.get_status().await.state, CircuitState::Closed);
}

#[tokio::test]
async fn timed_out_call_counts_toward_threshold() {
    let clock = Arc::new(ManualClock::new(0));
    let registry = CircuitBreakerRegistry::new(clock.clone());
    let breaker = registry.get_breaker("dataforseo", Some(fast_config())).await;

    for _ in 0..2 {
        let result = breaker
            .execute_with_timeout(Duration::from_millis(10), || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, &str>(())
            })
            .await;
        assert!(matches!(result, Err(CircuitBreakerError::Timeout(_))));
    }

    assert_eq!(breaker.get_status().await.state, CircuitState::Open);
}

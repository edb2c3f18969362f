//! Concurrent callers sharing one breaker.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinSet;

use ai_worker_breaker::resilience::BreakerEvent;
use ai_worker_breaker::{BreakerConfig, BreakerError, CircuitState};

mod common;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_failures_trip_exactly_once() {
    let (registry, _) = common::manual_registry(BreakerConfig::new(5, 60_000));
    let registry = Arc::new(registry);
    let mut events = registry.subscribe();

    let mut tasks = JoinSet::new();
    for _ in 0..50 {
        let registry = registry.clone();
        tasks.spawn(async move {
            let breaker = registry.get_or_create("ai-worker", "/asr", None);
            breaker
                .execute(|| async {
                    tokio::task::yield_now().await;
                    Err::<(), _>("503".to_string())
                })
                .await
        });
    }
    while tasks.join_next().await.is_some() {}

    let breaker = registry.get_or_create("ai-worker", "/asr", None);
    assert_eq!(registry.len(), 1);
    assert_eq!(breaker.state(), CircuitState::Open);

    let mut trips = 0;
    while let Ok(event) = events.try_recv() {
        if let BreakerEvent::StateChanged(t) = event {
            assert_eq!(t.to, CircuitState::Open);
            trips += 1;
        }
    }
    assert_eq!(trips, 1);

    let snapshot = breaker.get_metrics();
    assert_eq!(
        snapshot.total_failures + snapshot.total_rejected,
        50,
        "every call either failed or was rejected"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_half_open_admits_a_single_probe() {
    let (registry, clock) = common::manual_registry(BreakerConfig::new(1, 100));
    let breaker = registry.get_or_create("ai-worker", "/moderation", None);

    breaker
        .execute(|| async { Err::<(), _>("down".to_string()) })
        .await
        .unwrap_err();
    clock.advance(100);

    // The probe stays in flight until we release it.
    let (release, released) = oneshot::channel::<()>();
    let probe_breaker = breaker.clone();
    let probe = tokio::spawn(async move {
        probe_breaker
            .execute(|| async move {
                let _ = released.await;
                Ok::<_, String>("recovered")
            })
            .await
    });

    while breaker.state() != CircuitState::HalfOpen {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    let invoked = Arc::new(AtomicU32::new(0));
    let mut others = JoinSet::new();
    for _ in 0..20 {
        let breaker = breaker.clone();
        let invoked = invoked.clone();
        others.spawn(async move {
            breaker
                .execute(|| async move {
                    invoked.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>("extra")
                })
                .await
        });
    }
    while let Some(result) = others.join_next().await {
        assert!(matches!(result.unwrap(), Err(BreakerError::CircuitOpen { .. })));
    }
    assert_eq!(invoked.load(Ordering::SeqCst), 0);

    release.send(()).unwrap();
    assert_eq!(probe.await.unwrap().unwrap(), "recovered");
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test]
async fn test_cancelled_probe_releases_slot() {
    let (registry, clock) = common::manual_registry(BreakerConfig::new(1, 100));
    let breaker = registry.get_or_create("ai-worker", "/asr", None);

    breaker
        .execute(|| async { Err::<(), _>("down".to_string()) })
        .await
        .unwrap_err();
    clock.advance(100);

    let stuck = {
        let breaker = breaker.clone();
        tokio::spawn(async move {
            breaker
                .execute(|| std::future::pending::<Result<(), String>>())
                .await
        })
    };
    while breaker.state() != CircuitState::HalfOpen {
        tokio::task::yield_now().await;
    }
    stuck.abort();
    let _ = stuck.await;

    breaker
        .execute(|| async { Ok::<_, String>(()) })
        .await
        .unwrap();
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_get_or_create_returns_one_instance() {
    let (registry, _) = common::manual_registry(BreakerConfig::default());
    let registry = Arc::new(registry);

    let mut tasks = JoinSet::new();
    for i in 0..32 {
        let registry = registry.clone();
        tasks.spawn(async move {
            registry.get_or_create("ai-worker", "/asr", Some(BreakerConfig::new(i + 1, 10)))
        });
    }

    let mut breakers = Vec::new();
    while let Some(breaker) = tasks.join_next().await {
        breakers.push(breaker.unwrap());
    }
    assert!(breakers.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    assert_eq!(registry.len(), 1);
}

//! Many callers sharing one router.

use super::{init_tracing, ScriptedCache, PROBE_INTERVAL};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;
use tower_failover::cache::{Cache, CacheClient};
use tower_failover::{Backend, FailoverConfig, FailoverEvent};
use tower_failover_core::{Error, ErrorKind};

const CALLERS: usize = 32;

struct Counts {
    degraded: AtomicUsize,
    probes: AtomicUsize,
    recovered: AtomicUsize,
}

fn counted_config(counts: &Arc<Counts>, interval: Duration) -> FailoverConfig<Error> {
    let c = Arc::clone(counts);
    FailoverConfig::builder()
        .name("shared")
        .recovery_probe_interval(interval)
        .on_event(move |event: &FailoverEvent| {
            let counter = match event {
                FailoverEvent::Degraded { .. } => &c.degraded,
                FailoverEvent::ProbeAllowed { .. } => &c.probes,
                FailoverEvent::Recovered { .. } => &c.recovered,
                _ => return,
            };
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build()
}

fn counts() -> Arc<Counts> {
    Arc::new(Counts {
        degraded: AtomicUsize::new(0),
        probes: AtomicUsize::new(0),
        recovered: AtomicUsize::new(0),
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_probes_promote_once() {
    init_tracing();
    let counts = counts();
    let primary = ScriptedCache::new();
    let cache = CacheClient::failover(
        Arc::clone(&primary),
        ScriptedCache::new(),
        counted_config(&counts, PROBE_INTERVAL),
    );

    primary.go_down(ErrorKind::Unavailable, "redis down");
    cache.get("k1").await.unwrap();
    primary.come_back();

    tokio::time::sleep(PROBE_INTERVAL + Duration::from_millis(50)).await;

    let barrier = Arc::new(Barrier::new(CALLERS));
    let handles: Vec<_> = (0..CALLERS)
        .map(|_| {
            let cache = cache.clone();
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                cache.get("k1").await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(counts.degraded.load(Ordering::SeqCst), 1);
    assert_eq!(counts.probes.load(Ordering::SeqCst), 1);
    assert_eq!(counts.recovered.load(Ordering::SeqCst), 1);
    assert_eq!(cache.router().current(), Backend::Primary);
    assert_eq!(cache.router().metrics().promotion_count, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_infra_failures_degrade_once() {
    init_tracing();
    let counts = counts();
    let primary = ScriptedCache::new();
    let fallback = ScriptedCache::new();
    let cache = CacheClient::failover(
        Arc::clone(&primary),
        Arc::clone(&fallback),
        counted_config(&counts, Duration::from_secs(60)),
    );
    primary.go_down(ErrorKind::Unavailable, "redis down");

    let barrier = Arc::new(Barrier::new(CALLERS));
    let handles: Vec<_> = (0..CALLERS)
        .map(|i| {
            let cache = cache.clone();
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                cache.incr(&format!("counter-{i}")).await
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), 1);
    }

    // Callers that read the router before the switch still tried the
    // primary; only one of them performed the transition.
    assert_eq!(counts.degraded.load(Ordering::SeqCst), 1);
    assert_eq!(fallback.calls(), CALLERS);
    assert!(primary.calls() >= 1);
    assert_eq!(cache.router().current(), Backend::Fallback);
}

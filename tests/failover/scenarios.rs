//! The canonical cache walkthroughs, against `get("k1")`.

use super::{wire, PROBE_INTERVAL};
use std::error::Error as StdError;
use std::time::Duration;
use tower_failover::cache::Cache;
use tower_failover::Backend;
use tower_failover_core::{Error, ErrorKind};

#[tokio::test]
async fn test_primary_success_skips_fallback() {
    let (cache, primary, fallback) = wire(PROBE_INTERVAL);
    primary.queue_value("redis");
    fallback.queue_value("local");

    assert_eq!(cache.get("k1").await.unwrap().as_deref(), Some("redis"));
    assert_eq!(primary.calls(), 1);
    assert_eq!(fallback.calls(), 0);
}

#[tokio::test]
async fn test_infra_error_served_by_fallback() {
    let (cache, primary, fallback) = wire(PROBE_INTERVAL);
    primary.queue_get(Err(Error::unavailable("redis down")));
    fallback.queue_value("local");

    assert_eq!(cache.get("k1").await.unwrap().as_deref(), Some("local"));
    assert_eq!(cache.router().current(), Backend::Fallback);
}

#[tokio::test]
async fn test_degraded_calls_skip_primary_until_interval() {
    let (cache, primary, fallback) = wire(PROBE_INTERVAL);
    primary.queue_get(Err(Error::unavailable("redis down")));
    fallback.queue_value("local");
    fallback.queue_value("local");

    assert_eq!(cache.get("k1").await.unwrap().as_deref(), Some("local"));
    assert_eq!(cache.get("k1").await.unwrap().as_deref(), Some("local"));

    assert_eq!(primary.calls(), 1);
    assert_eq!(fallback.calls(), 2);
}

#[tokio::test]
async fn test_probe_after_interval_recovers_primary() {
    let (cache, primary, fallback) = wire(PROBE_INTERVAL);
    primary.queue_get(Err(Error::unavailable("redis down")));
    fallback.queue_value("local");

    assert_eq!(cache.get("k1").await.unwrap().as_deref(), Some("local"));

    tokio::time::sleep(PROBE_INTERVAL + Duration::from_millis(50)).await;

    primary.queue_value("redis-recovered");
    primary.queue_value("redis-2");
    primary.queue_value("redis-3");

    assert_eq!(
        cache.get("k1").await.unwrap().as_deref(),
        Some("redis-recovered")
    );
    assert_eq!(cache.get("k1").await.unwrap().as_deref(), Some("redis-2"));
    assert_eq!(cache.get("k1").await.unwrap().as_deref(), Some("redis-3"));

    assert_eq!(primary.calls(), 4);
    assert_eq!(fallback.calls(), 1);
    assert_eq!(cache.router().current(), Backend::Primary);
}

#[tokio::test]
async fn test_failed_probe_degrades_again() {
    let (cache, primary, fallback) = wire(PROBE_INTERVAL);
    primary.go_down(ErrorKind::Unavailable, "redis down");

    cache.set("k1", "v".to_string(), None).await.unwrap();
    tokio::time::sleep(PROBE_INTERVAL + Duration::from_millis(50)).await;
    cache.set("k1", "v".to_string(), None).await.unwrap();
    cache.set("k1", "v".to_string(), None).await.unwrap();

    // Initial attempt plus one probe; the call after the failed probe
    // stays on the fallback.
    assert_eq!(primary.calls(), 2);
    assert_eq!(fallback.calls(), 3);

    let metrics = cache.router().metrics();
    assert_eq!(metrics.backend, Backend::Fallback);
    assert_eq!(metrics.degrade_count, 2);
    assert_eq!(metrics.promotion_count, 1);
}

#[tokio::test]
async fn test_double_failure_surfaces_fallback_error() {
    let (cache, primary, fallback) = wire(PROBE_INTERVAL);
    primary.queue_get(Err(Error::unavailable("redis down")));
    fallback.queue_get(Err(Error::illegal_state("local fail")));

    let err = cache.get("k1").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::IllegalState);
    assert_eq!(err.message(), "local fail");
    assert!(
        err.chain().any(|e| e.to_string() == "redis down"),
        "primary error not reachable from {err:?}"
    );
}

#[tokio::test]
async fn test_operation_error_is_returned_untouched() {
    let (cache, primary, fallback) = wire(PROBE_INTERVAL);
    let cause = std::io::Error::other("constraint violated");
    primary.queue_get(Err(
        Error::illegal_state("business fail").with_source(cause)
    ));

    let err = cache.get("k1").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::IllegalState);
    assert_eq!(err.message(), "business fail");
    assert_eq!(
        err.source().map(|s| s.to_string()).as_deref(),
        Some("constraint violated")
    );
    assert!(err.suppressed().is_empty());
    assert_eq!(fallback.calls(), 0);
    assert_eq!(cache.router().current(), Backend::Primary);
}

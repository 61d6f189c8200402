//! Property tests for the dispatcher.
//!
//! Invariants tested:
//! - A healthy primary answer never reaches the fallback
//! - Operation errors are returned unchanged and never reach the fallback
//! - Each call reaches the fallback at most once

use super::paused_runtime;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::{ServiceExt, service_fn};
use tower_failover::{Backend, Failover, FailoverConfig, Operation, OperationSignature};
use tower_failover_core::Error;

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Ok,
    Infra,
    Rejected,
}

#[derive(Debug, Clone)]
struct Call;

impl Operation for Call {
    fn signature(&self) -> OperationSignature {
        OperationSignature::new("call", &[])
    }
}

fn outcome() -> impl Strategy<Value = Outcome> {
    prop_oneof![Just(Outcome::Ok), Just(Outcome::Infra), Just(Outcome::Rejected)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: fallback traffic is exactly what the routing rules predict
    #[test]
    fn fallback_calls_follow_routing_rules(
        outcomes in prop::collection::vec((outcome(), 0u64..200), 1..40),
    ) {
        let rt = paused_runtime();
        rt.block_on(async {
            let next = Arc::new(Mutex::new(Outcome::Ok));
            let primary_calls = Arc::new(AtomicUsize::new(0));
            let fallback_calls = Arc::new(AtomicUsize::new(0));

            let (n, pc) = (Arc::clone(&next), Arc::clone(&primary_calls));
            let primary = service_fn(move |_: Call| {
                pc.fetch_add(1, Ordering::SeqCst);
                let outcome = *n.lock().unwrap();
                async move {
                    match outcome {
                        Outcome::Ok => Ok("primary"),
                        Outcome::Infra => Err(Error::unavailable("down")),
                        Outcome::Rejected => Err(Error::invalid_argument("rejected")),
                    }
                }
            });
            let fc = Arc::clone(&fallback_calls);
            let fallback = service_fn(move |_: Call| {
                fc.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, Error>("fallback") }
            });

            let interval = 100;
            let svc = Failover::new(
                primary,
                fallback,
                FailoverConfig::<Error>::builder()
                    .recovery_probe_interval(Duration::from_millis(interval))
                    .build(),
            );

            let mut degraded_since: Option<u64> = None;
            let mut now = 0u64;
            let mut expected_primary = 0;
            let mut expected_fallback = 0;

            for (outcome, gap) in outcomes {
                tokio::time::advance(Duration::from_millis(gap)).await;
                now += gap;

                if let Some(since) = degraded_since {
                    if now - since >= interval {
                        degraded_since = None;
                    }
                }

                *next.lock().unwrap() = outcome;
                let before = fallback_calls.load(Ordering::SeqCst);
                let result = svc.clone().oneshot(Call).await;
                let reached_fallback = fallback_calls.load(Ordering::SeqCst) - before;
                prop_assert!(reached_fallback <= 1);

                if degraded_since.is_some() {
                    prop_assert_eq!(result.unwrap(), "fallback");
                    expected_fallback += 1;
                    continue;
                }

                expected_primary += 1;
                match outcome {
                    Outcome::Ok => prop_assert_eq!(result.unwrap(), "primary"),
                    Outcome::Rejected => {
                        let err = result.unwrap_err();
                        prop_assert_eq!(err.message(), "rejected");
                    }
                    Outcome::Infra => {
                        prop_assert_eq!(result.unwrap(), "fallback");
                        degraded_since = Some(now);
                        expected_fallback += 1;
                    }
                }
            }

            prop_assert_eq!(fallback_calls.load(Ordering::SeqCst), expected_fallback);
            prop_assert_eq!(primary_calls.load(Ordering::SeqCst), expected_primary);
            let backend = if degraded_since.is_some() { Backend::Fallback } else { Backend::Primary };
            prop_assert_eq!(svc.router().current(), backend);

            Ok(())
        })?;
    }
}

//! Property tests for the router.
//!
//! Invariants tested:
//! - Promotion is granted iff degraded and a full interval passed since the last probe
//! - Every promotion follows a degrade
//! - Degrading an already degraded router changes nothing

use super::paused_runtime;
use proptest::prelude::*;
use std::time::Duration;
use tower_failover::{Backend, Router};

#[derive(Debug, Clone)]
enum Step {
    Fail,
    Advance(u64),
    Probe,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::Fail),
        (1u64..400).prop_map(Step::Advance),
        Just(Step::Probe),
    ]
}

/// Reference model of the router.
#[derive(Debug, Default)]
struct Model {
    degraded: bool,
    now: u64,
    last_probe: u64,
    degrades: u64,
    promotions: u64,
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: the router agrees with the model after every step
    #[test]
    fn router_matches_model(
        interval_ms in 1u64..250,
        steps in prop::collection::vec(step(), 1..60),
    ) {
        let rt = paused_runtime();
        rt.block_on(async {
            let router = Router::new("prop", Duration::from_millis(interval_ms));
            let mut model = Model::default();

            for step in steps {
                match step {
                    Step::Fail => {
                        prop_assert_eq!(router.switch_to_fallback(&"boom"), Backend::Fallback);
                        if !model.degraded {
                            model.degraded = true;
                            model.last_probe = model.now;
                            model.degrades += 1;
                        }
                    }
                    Step::Advance(ms) => {
                        tokio::time::advance(Duration::from_millis(ms)).await;
                        model.now += ms;
                    }
                    Step::Probe => {
                        let expected =
                            model.degraded && model.now - model.last_probe >= interval_ms;
                        prop_assert_eq!(router.maybe_promote_to_primary(), expected);
                        if expected {
                            model.degraded = false;
                            model.last_probe = model.now;
                            model.promotions += 1;
                        }
                    }
                }

                let metrics = router.metrics();
                let backend = if model.degraded { Backend::Fallback } else { Backend::Primary };
                prop_assert_eq!(metrics.backend, backend);
                prop_assert_eq!(metrics.degrade_count, model.degrades);
                prop_assert_eq!(metrics.promotion_count, model.promotions);
                prop_assert!(metrics.promotion_count <= metrics.degrade_count);
            }

            Ok(())
        })?;
    }

    /// Property: intervals below one millisecond are raised to one millisecond
    #[test]
    fn probe_interval_is_at_least_one_millisecond(micros in 0u64..5_000) {
        let router = Router::new("prop", Duration::from_micros(micros));
        prop_assert!(router.recovery_probe_interval() >= Duration::from_millis(1));
    }
}

//! Property-based tests for tower-failover.
//!
//! These tests use proptest to generate random inputs and verify that
//! routing invariants hold.

pub mod dispatch;
pub mod router;

/// A current-thread runtime whose clock only moves when advanced.
pub fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}

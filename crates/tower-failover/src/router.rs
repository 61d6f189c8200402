//! Backend selection state.
//!
//! The [`Router`] owns the only mutable routing state: which backend is
//! active, and when the last promotion attempt happened. Reads are single
//! atomic loads. Writes go through a mutex that is held only for the
//! check-and-store; events and logs are emitted after it is released.

use crate::{FailoverConfig, FailoverEvent};
#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_gauge, gauge};
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tower_failover_core::EventListeners;

#[cfg(feature = "metrics")]
static METRICS_INIT: std::sync::Once = std::sync::Once::new();

/// Which backend serves calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Backend {
    /// The preferred, typically networked backend.
    Primary = 0,
    /// The local backend used while the primary is unhealthy.
    Fallback = 1,
}

impl Backend {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Backend::Primary,
            _ => Backend::Fallback,
        }
    }

    /// Label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Primary => "primary",
            Backend::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a router.
#[derive(Debug, Clone, PartialEq)]
pub struct RouterMetrics {
    /// Backend currently active.
    pub backend: Backend,
    /// Number of primary to fallback transitions so far.
    pub degrade_count: u64,
    /// Number of probes granted so far.
    pub promotion_count: u64,
    /// Time since the last degrade or probe, if either has happened.
    pub time_since_last_probe: Option<Duration>,
}

/// Tracks the active backend and gates recovery probes.
///
/// State machine: starts on [`Backend::Primary`]. An infra failure on the
/// primary moves it to [`Backend::Fallback`] via
/// [`switch_to_fallback`](Router::switch_to_fallback). While on the
/// fallback, [`maybe_promote_to_primary`](Router::maybe_promote_to_primary)
/// flips it back at most once per recovery probe interval.
pub struct Router {
    name: String,
    active: AtomicU8,
    last_probe_ms: AtomicU64,
    switch_lock: Mutex<()>,
    recovery_probe_interval: Duration,
    epoch: Instant,
    degrade_count: AtomicU64,
    promotion_count: AtomicU64,
    event_listeners: EventListeners<FailoverEvent>,
}

impl Router {
    /// Creates a router on the primary backend.
    ///
    /// Intervals below one millisecond are raised to one millisecond.
    pub fn new(name: impl Into<String>, recovery_probe_interval: Duration) -> Self {
        #[cfg(feature = "metrics")]
        METRICS_INIT.call_once(|| {
            describe_counter!(
                "failover_transitions_total",
                "Total number of backend switches"
            );
            describe_gauge!(
                "failover_active_backend",
                "Active backend (0 = primary, 1 = fallback)"
            );
        });

        let router = Self {
            name: name.into(),
            active: AtomicU8::new(Backend::Primary as u8),
            last_probe_ms: AtomicU64::new(0),
            switch_lock: Mutex::new(()),
            recovery_probe_interval: recovery_probe_interval.max(Duration::from_millis(1)),
            epoch: Instant::now(),
            degrade_count: AtomicU64::new(0),
            promotion_count: AtomicU64::new(0),
            event_listeners: EventListeners::new(),
        };

        #[cfg(feature = "metrics")]
        gauge!("failover_active_backend", "failover" => router.name.clone()).set(0.0);

        router
    }

    pub(crate) fn from_config<E>(config: &FailoverConfig<E>) -> Self {
        let mut router = Self::new(config.name.clone(), config.recovery_probe_interval);
        router.event_listeners = config.event_listeners.clone();
        router
    }

    /// Name of this router.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The configured recovery probe interval.
    pub fn recovery_probe_interval(&self) -> Duration {
        self.recovery_probe_interval
    }

    /// The active backend. Never blocks.
    pub fn current(&self) -> Backend {
        Backend::from_u8(self.active.load(Ordering::Acquire))
    }

    /// Returns true if `backend` is the fallback.
    pub fn is_fallback(&self, backend: Backend) -> bool {
        backend == Backend::Fallback
    }

    /// Lets the next call try the primary again if the router is degraded
    /// and the probe interval has elapsed since the last probe.
    ///
    /// Returns true iff this call performed the promotion. Concurrent
    /// callers racing on an elapsed interval see exactly one `true`. The
    /// primary is not contacted here; the caller's own request is the probe.
    pub fn maybe_promote_to_primary(&self) -> bool {
        if self.current() != Backend::Fallback {
            return false;
        }

        let now = self.now_ms();
        if !self.probe_due(now) {
            return false;
        }

        {
            let _guard = self
                .switch_lock
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            // Another caller may have promoted (or re-degraded) meanwhile.
            if self.current() != Backend::Fallback || !self.probe_due(now) {
                return false;
            }

            self.last_probe_ms.store(now, Ordering::Release);
            self.active.store(Backend::Primary as u8, Ordering::Release);
        }

        self.promotion_count.fetch_add(1, Ordering::Relaxed);

        #[cfg(feature = "tracing")]
        tracing::debug!(router = %self.name, "Probe interval elapsed, next call tries primary");

        #[cfg(feature = "metrics")]
        self.record_transition(Backend::Primary);

        self.event_listeners.emit(&FailoverEvent::ProbeAllowed {
            router_name: self.name.clone(),
            timestamp: std::time::Instant::now(),
        });

        true
    }

    /// Moves the router to the fallback after an infra failure on the
    /// primary. A no-op if another caller already did so.
    ///
    /// Always returns [`Backend::Fallback`].
    pub fn switch_to_fallback(&self, cause: &dyn fmt::Display) -> Backend {
        let switched = {
            let _guard = self
                .switch_lock
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            if self.current() == Backend::Primary {
                self.active.store(Backend::Fallback as u8, Ordering::Release);
                self.last_probe_ms.store(self.now_ms(), Ordering::Release);
                true
            } else {
                false
            }
        };

        if switched {
            self.degrade_count.fetch_add(1, Ordering::Relaxed);
            let cause = cause.to_string();

            #[cfg(feature = "tracing")]
            tracing::warn!(
                router = %self.name,
                cause = %cause,
                retry_in = ?self.recovery_probe_interval,
                "Primary backend unavailable, degrading to fallback"
            );

            #[cfg(feature = "metrics")]
            self.record_transition(Backend::Fallback);

            self.event_listeners.emit(&FailoverEvent::Degraded {
                router_name: self.name.clone(),
                timestamp: std::time::Instant::now(),
                cause,
            });
        }

        Backend::Fallback
    }

    /// Returns a snapshot of the router's state and counters.
    pub fn metrics(&self) -> RouterMetrics {
        let degrade_count = self.degrade_count.load(Ordering::Relaxed);
        let time_since_last_probe = (degrade_count > 0).then(|| {
            let last = self.last_probe_ms.load(Ordering::Acquire);
            Duration::from_millis(self.now_ms().saturating_sub(last))
        });

        RouterMetrics {
            backend: self.current(),
            degrade_count,
            promotion_count: self.promotion_count.load(Ordering::Relaxed),
            time_since_last_probe,
        }
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn probe_due(&self, now: u64) -> bool {
        let last = self.last_probe_ms.load(Ordering::Acquire);
        now.saturating_sub(last) >= self.recovery_probe_interval.as_millis() as u64
    }

    #[cfg(feature = "metrics")]
    fn record_transition(&self, to: Backend) {
        counter!(
            "failover_transitions_total",
            "failover" => self.name.clone(),
            "to" => to.as_str()
        )
        .increment(1);
        gauge!("failover_active_backend", "failover" => self.name.clone()).set(to as u8 as f64);
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("name", &self.name)
            .field("backend", &self.current())
            .field("recovery_probe_interval", &self.recovery_probe_interval)
            .finish()
    }
}

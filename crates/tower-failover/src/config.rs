//! Configuration for the failover router.

use crate::FailoverEvent;
use std::sync::Arc;
use std::time::Duration;
use tower_failover_core::{Classify, EventListeners, FnListener};

/// Default interval between recovery probes while degraded.
pub const DEFAULT_RECOVERY_PROBE_INTERVAL: Duration = Duration::from_secs(30);

const MIN_RECOVERY_PROBE_INTERVAL: Duration = Duration::from_millis(1);

/// Predicate deciding whether an error means the backend is unreachable.
pub type InfraPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Configuration for a failover router and its dispatcher.
pub struct FailoverConfig<E> {
    pub(crate) name: String,
    pub(crate) recovery_probe_interval: Duration,
    pub(crate) infra_predicate: Option<InfraPredicate<E>>,
    pub(crate) event_listeners: EventListeners<FailoverEvent>,
}

impl<E> FailoverConfig<E> {
    /// Creates a new configuration builder.
    pub fn builder() -> FailoverConfigBuilder<E> {
        FailoverConfigBuilder::new()
    }

    /// Name of this failover instance.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// How long the router stays on the fallback before letting a call
    /// try the primary again.
    pub fn recovery_probe_interval(&self) -> Duration {
        self.recovery_probe_interval
    }

    pub(crate) fn is_infra(&self, error: &E) -> bool
    where
        E: Classify,
    {
        match &self.infra_predicate {
            Some(predicate) => predicate(error),
            None => error.is_infra(),
        }
    }
}

impl<E> Default for FailoverConfig<E> {
    fn default() -> Self {
        FailoverConfigBuilder::new().build()
    }
}

/// Builder for [`FailoverConfig`].
pub struct FailoverConfigBuilder<E> {
    name: String,
    recovery_probe_interval: Duration,
    infra_predicate: Option<InfraPredicate<E>>,
    event_listeners: EventListeners<FailoverEvent>,
}

impl<E> Default for FailoverConfigBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> FailoverConfigBuilder<E> {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            name: "failover".to_string(),
            recovery_probe_interval: DEFAULT_RECOVERY_PROBE_INTERVAL,
            infra_predicate: None,
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the name for this failover instance (used in metrics, logs and events).
    ///
    /// Default: "failover"
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets how often, while degraded, one call is allowed to try the primary again.
    ///
    /// Intervals below one millisecond are raised to one millisecond.
    ///
    /// Default: 30 seconds
    pub fn recovery_probe_interval(mut self, interval: Duration) -> Self {
        self.recovery_probe_interval = interval.max(MIN_RECOVERY_PROBE_INTERVAL);
        self
    }

    /// Overrides how errors from the primary are classified.
    ///
    /// Errors for which `predicate` returns true trigger failover; all
    /// others are returned to the caller unchanged. Without a predicate the
    /// error type's [`Classify::is_infra`] decides.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tower_failover::FailoverConfig;
    /// use tower_failover_core::{Error, ErrorKind};
    ///
    /// // Only connection loss fails over; timeouts surface to the caller.
    /// let config = FailoverConfig::<Error>::builder()
    ///     .classify(|e: &Error| e.kind() == ErrorKind::Unavailable)
    ///     .build();
    /// ```
    pub fn classify<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.infra_predicate = Some(Arc::new(predicate));
        self
    }

    /// Adds an event listener.
    pub fn on_event<F>(mut self, listener: F) -> Self
    where
        F: Fn(&FailoverEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(listener));
        self
    }

    /// Registers a callback for primary to fallback transitions.
    ///
    /// # Callback Signature
    /// `Fn(&str)` - Called with the display text of the infra error that
    /// caused the switch.
    pub fn on_degraded<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.add_for("degraded", FnListener::new(move |event| {
            if let FailoverEvent::Degraded { cause, .. } = event {
                f(cause);
            }
        }));
        self
    }

    /// Registers a callback for successful recovery probes.
    ///
    /// # Callback Signature
    /// `Fn(&'static str)` - Called with the name of the operation whose
    /// primary call succeeded.
    pub fn on_recovered<F>(mut self, f: F) -> Self
    where
        F: Fn(&'static str) + Send + Sync + 'static,
    {
        self.event_listeners.add_for("recovered", FnListener::new(move |event| {
            if let FailoverEvent::Recovered { operation, .. } = event {
                f(operation);
            }
        }));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> FailoverConfig<E> {
        FailoverConfig {
            name: self.name,
            recovery_probe_interval: self.recovery_probe_interval,
            infra_predicate: self.infra_predicate,
            event_listeners: self.event_listeners,
        }
    }
}

/// Plain failover settings, as read from a configuration file.
///
/// With the `serde` feature the settings deserialize from
/// `{"recoveryProbeIntervalMs": 30000}`; a missing key keeps the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase", default)
)]
pub struct FailoverSettings {
    /// Probe interval in milliseconds. Zero is treated as one.
    pub recovery_probe_interval_ms: u64,
}

impl Default for FailoverSettings {
    fn default() -> Self {
        Self {
            recovery_probe_interval_ms: DEFAULT_RECOVERY_PROBE_INTERVAL.as_millis() as u64,
        }
    }
}

impl FailoverSettings {
    /// Starts a builder seeded with these settings.
    pub fn builder<E>(&self) -> FailoverConfigBuilder<E> {
        FailoverConfigBuilder::new()
            .recovery_probe_interval(Duration::from_millis(self.recovery_probe_interval_ms))
    }
}

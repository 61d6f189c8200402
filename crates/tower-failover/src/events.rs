//! Events emitted by the failover router and dispatcher.

use std::time::Instant;
use tower_failover_core::RouterEvent;

/// Events emitted while routing calls between the primary and fallback backends.
#[derive(Debug, Clone)]
pub enum FailoverEvent {
    /// The primary served the call.
    PrimarySucceeded {
        /// Name of the failover instance.
        router_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Operation that was served.
        operation: &'static str,
    },

    /// The primary failed with an operation error; it was returned as-is.
    Passthrough {
        /// Name of the failover instance.
        router_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Operation that failed.
        operation: &'static str,
    },

    /// The router switched from the primary to the fallback.
    Degraded {
        /// Name of the failover instance.
        router_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Display text of the infra error that caused the switch.
        cause: String,
    },

    /// The fallback served the call.
    FallbackSucceeded {
        /// Name of the failover instance.
        router_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Operation that was served.
        operation: &'static str,
    },

    /// The fallback failed; its error was returned to the caller.
    FallbackFailed {
        /// Name of the failover instance.
        router_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Operation that failed.
        operation: &'static str,
    },

    /// The probe interval elapsed and the next call may try the primary.
    ProbeAllowed {
        /// Name of the failover instance.
        router_name: String,
        /// When the event occurred.
        timestamp: Instant,
    },

    /// A probe call succeeded on the primary.
    Recovered {
        /// Name of the failover instance.
        router_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Operation that served as the probe.
        operation: &'static str,
    },
}

impl RouterEvent for FailoverEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::PrimarySucceeded { .. } => "primary_succeeded",
            Self::Passthrough { .. } => "passthrough",
            Self::Degraded { .. } => "degraded",
            Self::FallbackSucceeded { .. } => "fallback_succeeded",
            Self::FallbackFailed { .. } => "fallback_failed",
            Self::ProbeAllowed { .. } => "probe_allowed",
            Self::Recovered { .. } => "recovered",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            Self::PrimarySucceeded { timestamp, .. }
            | Self::Passthrough { timestamp, .. }
            | Self::Degraded { timestamp, .. }
            | Self::FallbackSucceeded { timestamp, .. }
            | Self::FallbackFailed { timestamp, .. }
            | Self::ProbeAllowed { timestamp, .. }
            | Self::Recovered { timestamp, .. } => *timestamp,
        }
    }

    fn router_name(&self) -> &str {
        match self {
            Self::PrimarySucceeded { router_name, .. }
            | Self::Passthrough { router_name, .. }
            | Self::Degraded { router_name, .. }
            | Self::FallbackSucceeded { router_name, .. }
            | Self::FallbackFailed { router_name, .. }
            | Self::ProbeAllowed { router_name, .. }
            | Self::Recovered { router_name, .. } => router_name,
        }
    }
}

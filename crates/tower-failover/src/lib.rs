//! Primary/fallback failover routing for Tower services.
//!
//! Keeps an application serving when a remote backend (a networked cache,
//! a distributed lock service) becomes unreachable, by routing calls to a
//! local in-process implementation of the same capability until the remote
//! one recovers.
//!
//! # Overview
//!
//! Three pieces cooperate:
//!
//! - [`Router`] remembers which backend is active and decides, at most once
//!   per recovery probe interval, when to try the primary again.
//! - [`Failover`] is the dispatcher. It calls the active backend, degrades
//!   on infrastructure errors and replays the call on the fallback.
//! - Capability facades ([`cache::CacheClient`], [`lock::LockClient`])
//!   expose the capability's own interface, so callers never see that two
//!   backends exist.
//!
//! # Error Classification
//!
//! Only infrastructure errors (the backend is unreachable or timed out)
//! trigger failover. Operation errors, such as a non-numeric value passed to
//! `incr`, come back to the caller untouched and never change the active
//! backend. By default this follows [`Classify`](tower_failover_core::Classify);
//! a custom predicate can be supplied with
//! [`FailoverConfigBuilder::classify`].
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use tower_failover::cache::{Cache, CacheClient, MemoryCache};
//! use tower_failover::{Backend, FailoverConfig};
//!
//! # async fn example() -> Result<(), tower_failover_core::Error> {
//! let config = FailoverConfig::builder()
//!     .name("cache")
//!     .recovery_probe_interval(Duration::from_secs(30))
//!     .on_degraded(|cause| eprintln!("cache degraded: {cause}"))
//!     .build();
//!
//! let cache = CacheClient::failover(MemoryCache::new(), MemoryCache::new(), config);
//! cache.set("k", "v".to_string(), None).await?;
//! assert_eq!(cache.router().current(), Backend::Primary);
//! # Ok(())
//! # }
//! ```
//!
//! # Composition
//!
//! A remote backend usually sits behind a timeout. Wrap it with
//! [`NormalizeLayer`] so that elapsed deadlines and I/O failures surface as
//! infrastructure [`Error`](tower_failover_core::Error)s the dispatcher can
//! classify:
//!
//! ```rust
//! use std::time::Duration;
//! use tower::ServiceBuilder;
//! use tower_failover::cache::{CacheService, MemoryCache};
//! use tower_failover::{FailoverConfig, FailoverLayer, NormalizeLayer};
//! use tower_failover_core::Error;
//!
//! let service = ServiceBuilder::new()
//!     .layer(FailoverLayer::new(
//!         CacheService::new(MemoryCache::new()),
//!         FailoverConfig::<Error>::default(),
//!     ))
//!     .layer(NormalizeLayer)
//!     .timeout(Duration::from_millis(250))
//!     .service(CacheService::new(MemoryCache::new()));
//! ```
//!
//! # Events
//!
//! Listeners registered on [`FailoverConfigBuilder`] receive a
//! [`FailoverEvent`] for each routed call and for every transition:
//!
//! - `PrimarySucceeded`: the primary served the call
//! - `Passthrough`: the primary failed with an operation error
//! - `Degraded`: the router switched to the fallback
//! - `FallbackSucceeded` / `FallbackFailed`: outcome of a fallback call
//! - `ProbeAllowed`: the router granted a recovery probe
//! - `Recovered`: a probe call succeeded on the primary

mod config;
mod events;
mod layer;
mod router;
mod service;

pub mod cache;
pub mod lock;
pub mod resolve;

pub use config::{
    FailoverConfig, FailoverConfigBuilder, FailoverSettings, InfraPredicate,
    DEFAULT_RECOVERY_PROBE_INTERVAL,
};
pub use events::FailoverEvent;
pub use layer::FailoverLayer;
pub use resolve::{normalize, Normalize, NormalizeLayer, Operation, OperationSignature};
pub use router::{Backend, Router, RouterMetrics};
pub use service::Failover;

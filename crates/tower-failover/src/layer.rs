//! Tower layer for failover.

use crate::router::Router;
use crate::{Failover, FailoverConfig};
use std::sync::Arc;
use tower_layer::Layer;

/// A Tower layer that puts a fallback backend behind a primary service.
///
/// The layer owns one [`Router`]; every service it produces (and every
/// clone of those) shares it.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use tower::ServiceBuilder;
/// use tower_failover::cache::{CacheService, MemoryCache};
/// use tower_failover::{FailoverConfig, FailoverLayer};
/// use tower_failover_core::Error;
///
/// let config = FailoverConfig::<Error>::builder()
///     .name("session-cache")
///     .recovery_probe_interval(Duration::from_secs(10))
///     .build();
///
/// let service = ServiceBuilder::new()
///     .layer(FailoverLayer::new(CacheService::new(MemoryCache::new()), config))
///     .service(CacheService::new(MemoryCache::new()));
/// ```
pub struct FailoverLayer<F, E> {
    fallback: F,
    router: Arc<Router>,
    config: Arc<FailoverConfig<E>>,
}

impl<F, E> FailoverLayer<F, E> {
    /// Creates a layer routing to `fallback` whenever the wrapped primary is unavailable.
    pub fn new(fallback: F, config: FailoverConfig<E>) -> Self {
        Self {
            fallback,
            router: Arc::new(Router::from_config(&config)),
            config: Arc::new(config),
        }
    }

    /// Creates a layer with the default configuration.
    pub fn with_defaults(fallback: F) -> Self {
        Self::new(fallback, FailoverConfig::default())
    }

    /// The router shared by every service this layer produces.
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }
}

impl<F, E> Clone for FailoverLayer<F, E>
where
    F: Clone,
{
    fn clone(&self) -> Self {
        Self {
            fallback: self.fallback.clone(),
            router: Arc::clone(&self.router),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, F, E> Layer<S> for FailoverLayer<F, E>
where
    F: Clone,
{
    type Service = Failover<S, F, E>;

    fn layer(&self, primary: S) -> Self::Service {
        Failover::with_router(
            primary,
            self.fallback.clone(),
            Arc::clone(&self.router),
            Arc::clone(&self.config),
        )
    }
}

//! The failover dispatcher.

use crate::resolve::Operation;
use crate::router::{Backend, Router};
use crate::{FailoverConfig, FailoverEvent};
use futures::future::BoxFuture;
#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter};
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::ServiceExt;
use tower_failover_core::Classify;
use tower_service::Service;

#[cfg(feature = "metrics")]
static METRICS_INIT: std::sync::Once = std::sync::Once::new();

/// A Tower service that routes each call to the primary or the fallback
/// backend, as decided by its shared [`Router`].
///
/// Per call:
///
/// 1. The router may grant a recovery probe (only while degraded, at most
///    once per probe interval).
/// 2. If the router is on the fallback, the call goes straight to the
///    fallback and its outcome is returned unchanged.
/// 3. Otherwise the primary is called. Success is returned. An operation
///    error is returned untouched. An infra error degrades the router and
///    the same request is replayed once on the fallback; if that fails too,
///    the fallback's error is returned with the primary's error attached
///    as suppressed.
///
/// Clones share the router, so every clone observes the same state.
pub struct Failover<P, F, E> {
    primary: P,
    fallback: F,
    router: Arc<Router>,
    config: Arc<FailoverConfig<E>>,
}

impl<P, F, E> Failover<P, F, E> {
    /// Creates a failover service with its own router.
    pub fn new(primary: P, fallback: F, config: FailoverConfig<E>) -> Self {
        let router = Arc::new(Router::from_config(&config));
        Self::with_router(primary, fallback, router, Arc::new(config))
    }

    pub(crate) fn with_router(
        primary: P,
        fallback: F,
        router: Arc<Router>,
        config: Arc<FailoverConfig<E>>,
    ) -> Self {
        #[cfg(feature = "metrics")]
        METRICS_INIT.call_once(|| {
            describe_counter!(
                "failover_calls_total",
                "Total number of calls routed by the failover dispatcher"
            );
        });

        Self {
            primary,
            fallback,
            router,
            config,
        }
    }

    /// The router shared by this service and its clones.
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Gets a reference to the primary service.
    pub fn get_primary(&self) -> &P {
        &self.primary
    }

    /// Gets a reference to the fallback service.
    pub fn get_fallback(&self) -> &F {
        &self.fallback
    }
}

impl<P, F, E> Clone for Failover<P, F, E>
where
    P: Clone,
    F: Clone,
{
    fn clone(&self) -> Self {
        Self {
            primary: self.primary.clone(),
            fallback: self.fallback.clone(),
            router: Arc::clone(&self.router),
            config: Arc::clone(&self.config),
        }
    }
}

impl<P, F, E> fmt::Debug for Failover<P, F, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Failover")
            .field("router", &self.router)
            .finish()
    }
}

impl<P, F, E, Req> Service<Req> for Failover<P, F, E>
where
    P: Service<Req, Error = E> + Clone + Send + 'static,
    P::Future: Send + 'static,
    F: Service<Req, Response = P::Response, Error = E> + Clone + Send + 'static,
    F::Future: Send + 'static,
    Req: Operation + Clone + Send + 'static,
    P::Response: Send + 'static,
    E: Classify + fmt::Display + Send + Sync + 'static,
{
    type Response = P::Response;
    type Error = E;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Readiness is checked per backend inside `call`, once the route is known.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let primary = self.primary.clone();
        let fallback = self.fallback.clone();
        let router = Arc::clone(&self.router);
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            let operation = req.name();
            let attempted_promotion = router.maybe_promote_to_primary();
            let current = router.current();

            if router.is_fallback(current) {
                #[cfg(feature = "tracing")]
                tracing::debug!(failover = %config.name, operation, "Degraded, calling fallback");

                return call_fallback(fallback, req, &config, operation).await;
            }

            let replay = req.clone();
            match primary.oneshot(req).await {
                Ok(response) => {
                    record(&config, Backend::Primary, "success");

                    if attempted_promotion {
                        #[cfg(feature = "tracing")]
                        tracing::info!(
                            failover = %config.name,
                            operation,
                            "Primary backend recovered"
                        );

                        config.event_listeners.emit(&FailoverEvent::Recovered {
                            router_name: config.name.clone(),
                            timestamp: Instant::now(),
                            operation,
                        });
                    }

                    config.event_listeners.emit(&FailoverEvent::PrimarySucceeded {
                        router_name: config.name.clone(),
                        timestamp: Instant::now(),
                        operation,
                    });

                    Ok(response)
                }
                Err(error) if !config.is_infra(&error) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        failover = %config.name,
                        operation,
                        "Operation error from primary, not failing over"
                    );

                    record(&config, Backend::Primary, "passthrough");

                    config.event_listeners.emit(&FailoverEvent::Passthrough {
                        router_name: config.name.clone(),
                        timestamp: Instant::now(),
                        operation,
                    });

                    Err(error)
                }
                Err(error) => {
                    record(&config, Backend::Primary, "infra_error");
                    router.switch_to_fallback(&error);

                    call_fallback(fallback, replay, &config, operation)
                        .await
                        .map_err(|fallback_error| fallback_error.with_suppressed(error))
                }
            }
        })
    }
}

async fn call_fallback<F, Req, E>(
    fallback: F,
    req: Req,
    config: &FailoverConfig<E>,
    operation: &'static str,
) -> Result<F::Response, E>
where
    F: Service<Req, Error = E>,
{
    match fallback.oneshot(req).await {
        Ok(response) => {
            record(config, Backend::Fallback, "success");

            config.event_listeners.emit(&FailoverEvent::FallbackSucceeded {
                router_name: config.name.clone(),
                timestamp: Instant::now(),
                operation,
            });

            Ok(response)
        }
        Err(error) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(failover = %config.name, operation, "Fallback backend failed");

            record(config, Backend::Fallback, "failure");

            config.event_listeners.emit(&FailoverEvent::FallbackFailed {
                router_name: config.name.clone(),
                timestamp: Instant::now(),
                operation,
            });

            Err(error)
        }
    }
}

#[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
fn record<E>(config: &FailoverConfig<E>, backend: Backend, outcome: &'static str) {
    #[cfg(feature = "metrics")]
    counter!(
        "failover_calls_total",
        "failover" => config.name.clone(),
        "backend" => backend.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

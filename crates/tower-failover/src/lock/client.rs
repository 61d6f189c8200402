//! Caller-facing lock facade.

use super::{Lock, LockRequest, LockService, LockTask};
use crate::router::Router;
use crate::{Failover, FailoverConfig};
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use tower::ServiceExt;
use tower_failover_core::Error;

/// The [`Lock`] callers hold, routing between a primary and a fallback lock.
///
/// When the primary lock service is unreachable, the task runs under the
/// fallback's lock instead. Callers sharing one process-wide client
/// therefore hold at most one backend's lock for a given key at a time,
/// except during the brief window of a transition.
pub struct LockClient<P, F> {
    inner: Failover<LockService<P>, LockService<F>, Error>,
}

impl<P: Lock, F: Lock> LockClient<P, F> {
    /// Wires a router, dispatcher and facade over `primary` and `fallback`.
    pub fn failover(primary: P, fallback: F, config: FailoverConfig<Error>) -> Self {
        Self::from_service(Failover::new(
            LockService::new(primary),
            LockService::new(fallback),
            config,
        ))
    }

    /// Wraps an existing dispatcher, e.g. one built with
    /// [`FailoverLayer`](crate::FailoverLayer).
    pub fn from_service(inner: Failover<LockService<P>, LockService<F>, Error>) -> Self {
        Self { inner }
    }

    /// The router deciding which backend serves calls.
    pub fn router(&self) -> &Arc<Router> {
        self.inner.router()
    }
}

impl<P, F> Clone for LockClient<P, F> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<P, F> fmt::Debug for LockClient<P, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockClient")
            .field("inner", &self.inner)
            .finish()
    }
}

impl<P: Lock, F: Lock> Lock for LockClient<P, F> {
    fn with_lock<'a, T: Send + 'static>(
        &'a self,
        key: &'a str,
        task: LockTask<T>,
    ) -> BoxFuture<'a, Result<T, Error>> {
        let req = LockRequest::Key {
            key: key.to_string(),
            task,
        };
        Box::pin(self.inner.clone().oneshot(req))
    }

    fn with_global_lock<'a, T: Send + 'static>(
        &'a self,
        task: LockTask<T>,
    ) -> BoxFuture<'a, Result<T, Error>> {
        Box::pin(self.inner.clone().oneshot(LockRequest::Global { task }))
    }
}

//! Serves [`LockRequest`]s from a concrete [`Lock`] backend.

use super::{Lock, LockRequest};
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower_failover_core::Error;
use tower_service::Service;

/// Adapts a [`Lock`] backend into a Tower service for tasks of any result type.
pub struct LockService<L> {
    backend: Arc<L>,
}

impl<L: Lock> LockService<L> {
    /// Wraps `backend`.
    pub fn new(backend: L) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Wraps an already shared backend.
    pub fn from_arc(backend: Arc<L>) -> Self {
        Self { backend }
    }

    /// The wrapped backend.
    pub fn backend(&self) -> &Arc<L> {
        &self.backend
    }
}

impl<L> Clone for LockService<L> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<L> fmt::Debug for LockService<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockService").finish_non_exhaustive()
    }
}

impl<L, T> Service<LockRequest<T>> for LockService<L>
where
    L: Lock,
    T: Send + 'static,
{
    type Response = T;
    type Error = Error;
    type Future = BoxFuture<'static, Result<T, Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: LockRequest<T>) -> Self::Future {
        let backend = Arc::clone(&self.backend);
        Box::pin(async move {
            match req {
                LockRequest::Key { key, task } => backend.with_lock(&key, task).await,
                LockRequest::Global { task } => backend.with_global_lock(task).await,
            }
        })
    }
}

//! Serves [`CacheRequest`]s from a concrete [`Cache`] backend.

use super::{Cache, CacheRequest, CacheResponse};
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower_failover_core::Error;
use tower_service::Service;

/// Adapts a [`Cache`] backend into a Tower service.
///
/// Each request variant is resolved onto the backend method of the same
/// name. Cloning is cheap; clones share the backend.
pub struct CacheService<C: ?Sized> {
    backend: Arc<C>,
}

impl<C: Cache> CacheService<C> {
    /// Wraps `backend`.
    pub fn new(backend: C) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }
}

impl<C: Cache + ?Sized> CacheService<C> {
    /// Wraps an already shared backend.
    pub fn from_arc(backend: Arc<C>) -> Self {
        Self { backend }
    }

    /// The wrapped backend.
    pub fn backend(&self) -> &Arc<C> {
        &self.backend
    }
}

impl<C: ?Sized> Clone for CacheService<C> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<C: ?Sized> fmt::Debug for CacheService<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheService").finish_non_exhaustive()
    }
}

impl<C: Cache + ?Sized> Service<CacheRequest> for CacheService<C> {
    type Response = CacheResponse;
    type Error = Error;
    type Future = BoxFuture<'static, Result<CacheResponse, Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: CacheRequest) -> Self::Future {
        let backend = Arc::clone(&self.backend);
        Box::pin(async move { dispatch(&*backend, req).await })
    }
}

async fn dispatch<C>(backend: &C, req: CacheRequest) -> Result<CacheResponse, Error>
where
    C: Cache + ?Sized,
{
    let response = match req {
        CacheRequest::Get { key } => CacheResponse::Value(backend.get(&key).await?),
        CacheRequest::Set { key, value, ttl } => {
            backend.set(&key, value, ttl).await?;
            CacheResponse::Stored
        }
        CacheRequest::SetIfAbsent { key, value, ttl } => {
            CacheResponse::Applied(backend.set_if_absent(&key, value, ttl).await?)
        }
        CacheRequest::Incr { key } => CacheResponse::Counter(backend.incr(&key).await?),
        CacheRequest::DecrBy { key, delta } => {
            CacheResponse::Counter(backend.decr_by(&key, delta).await?)
        }
        CacheRequest::Evict { key } => CacheResponse::Applied(backend.evict(&key).await?),
        CacheRequest::EvictByPrefix { prefix } => {
            CacheResponse::Evicted(backend.evict_by_prefix(&prefix).await?)
        }
        CacheRequest::MGet { keys } => CacheResponse::Values(backend.mget(&keys).await?),
        CacheRequest::MSet { entries, ttl } => {
            backend.mset(entries, ttl).await?;
            CacheResponse::Stored
        }
    };
    Ok(response)
}

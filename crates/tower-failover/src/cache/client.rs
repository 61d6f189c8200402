//! Caller-facing cache facade.

use super::{Cache, CacheRequest, CacheResponse, CacheResult, CacheService};
use crate::resolve::Operation;
use crate::router::Router;
use crate::{Failover, FailoverConfig};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use tower_failover_core::Error;
use tower_service::Service;

/// The [`Cache`] callers hold.
///
/// Each method becomes a [`CacheRequest`] sent through the wrapped
/// service, normally a [`Failover`] over two [`CacheService`]s. Callers
/// cannot tell which backend answered.
#[derive(Debug, Clone)]
pub struct CacheClient<S> {
    inner: S,
}

/// A [`CacheClient`] routing between a primary and a fallback backend.
pub type FailoverCache<P, F> = CacheClient<Failover<CacheService<P>, CacheService<F>, Error>>;

impl<S> CacheClient<S> {
    /// Wraps a service answering cache requests.
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// The wrapped service.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Consumes the client, returning the wrapped service.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<P: Cache, F: Cache> FailoverCache<P, F> {
    /// Wires a router, dispatcher and facade over `primary` and `fallback`.
    pub fn failover(primary: P, fallback: F, config: FailoverConfig<Error>) -> Self {
        Self::new(Failover::new(
            CacheService::new(primary),
            CacheService::new(fallback),
            config,
        ))
    }

    /// The router deciding which backend serves calls.
    pub fn router(&self) -> &Arc<Router> {
        self.inner.router()
    }
}

impl<S> CacheClient<S>
where
    S: Service<CacheRequest, Response = CacheResponse, Error = Error> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    fn send<T>(
        &self,
        req: CacheRequest,
        extract: fn(CacheResponse) -> Option<T>,
    ) -> BoxFuture<'static, CacheResult<T>>
    where
        T: Send + 'static,
    {
        let service = self.inner.clone();
        Box::pin(async move {
            let operation = req.name();
            let response = service.oneshot(req).await?;
            extract(response)
                .ok_or_else(|| Error::illegal_state(format!("unexpected response to {operation}")))
        })
    }
}

impl<S> Cache for CacheClient<S>
where
    S: Service<CacheRequest, Response = CacheResponse, Error = Error>
        + Clone
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
{
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, CacheResult<Option<String>>> {
        let req = CacheRequest::Get {
            key: key.to_string(),
        };
        self.send(req, |r| match r {
            CacheResponse::Value(value) => Some(value),
            _ => None,
        })
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: String,
        ttl: Option<Duration>,
    ) -> BoxFuture<'a, CacheResult<()>> {
        let req = CacheRequest::Set {
            key: key.to_string(),
            value,
            ttl,
        };
        self.send(req, |r| matches!(r, CacheResponse::Stored).then_some(()))
    }

    fn set_if_absent<'a>(
        &'a self,
        key: &'a str,
        value: String,
        ttl: Option<Duration>,
    ) -> BoxFuture<'a, CacheResult<bool>> {
        let req = CacheRequest::SetIfAbsent {
            key: key.to_string(),
            value,
            ttl,
        };
        self.send(req, applied)
    }

    fn incr<'a>(&'a self, key: &'a str) -> BoxFuture<'a, CacheResult<i64>> {
        let req = CacheRequest::Incr {
            key: key.to_string(),
        };
        self.send(req, counter)
    }

    fn decr_by<'a>(&'a self, key: &'a str, delta: i64) -> BoxFuture<'a, CacheResult<i64>> {
        let req = CacheRequest::DecrBy {
            key: key.to_string(),
            delta,
        };
        self.send(req, counter)
    }

    fn evict<'a>(&'a self, key: &'a str) -> BoxFuture<'a, CacheResult<bool>> {
        let req = CacheRequest::Evict {
            key: key.to_string(),
        };
        self.send(req, applied)
    }

    fn evict_by_prefix<'a>(&'a self, prefix: &'a str) -> BoxFuture<'a, CacheResult<u64>> {
        let req = CacheRequest::EvictByPrefix {
            prefix: prefix.to_string(),
        };
        self.send(req, |r| match r {
            CacheResponse::Evicted(count) => Some(count),
            _ => None,
        })
    }

    fn mget<'a>(&'a self, keys: &'a [String]) -> BoxFuture<'a, CacheResult<Vec<Option<String>>>> {
        let req = CacheRequest::MGet {
            keys: keys.to_vec(),
        };
        self.send(req, |r| match r {
            CacheResponse::Values(values) => Some(values),
            _ => None,
        })
    }

    fn mset<'a>(
        &'a self,
        entries: Vec<(String, String)>,
        ttl: Option<Duration>,
    ) -> BoxFuture<'a, CacheResult<()>> {
        let req = CacheRequest::MSet { entries, ttl };
        self.send(req, |r| matches!(r, CacheResponse::Stored).then_some(()))
    }
}

fn applied(response: CacheResponse) -> Option<bool> {
    match response {
        CacheResponse::Applied(applied) => Some(applied),
        _ => None,
    }
}

fn counter(response: CacheResponse) -> Option<i64> {
    match response {
        CacheResponse::Counter(value) => Some(value),
        _ => None,
    }
}

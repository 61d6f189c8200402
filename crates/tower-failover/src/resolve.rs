//! Operation identity and error normalization.
//!
//! Every capability request names the interface operation it invokes
//! through [`Operation`], and the backend adapters
//! ([`CacheService`](crate::cache::CacheService),
//! [`LockService`](crate::lock::LockService)) resolve each request onto the
//! matching backend method with a `match`, so no runtime method lookup is
//! needed.
//!
//! Backends reached through generic tower stacks fail with boxed errors.
//! [`normalize`] unwraps those to the underlying cause and classifies it
//! before the dispatcher looks at it, and [`Normalize`] applies that to
//! every call of a wrapped service.

use futures::future::BoxFuture;
use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::task::{Context, Poll};
use tower::timeout::error::Elapsed;
use tower_failover_core::{BoxError, Error, ErrorKind};
use tower_layer::Layer;
use tower_service::Service;

/// Name and parameter shape of an interface operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperationSignature {
    /// Operation name, e.g. `"set_if_absent"`.
    pub name: &'static str,
    /// Parameter types in order.
    pub params: &'static [&'static str],
}

impl OperationSignature {
    /// Creates a signature.
    pub const fn new(name: &'static str, params: &'static [&'static str]) -> Self {
        Self { name, params }
    }
}

impl fmt::Display for OperationSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.params.join(", "))
    }
}

/// A request that invokes one operation of a capability interface.
pub trait Operation {
    /// The invoked operation's signature.
    fn signature(&self) -> OperationSignature;

    /// The invoked operation's name.
    fn name(&self) -> &'static str {
        self.signature().name
    }
}

/// Converts a boxed service error into an [`Error`].
///
/// An `Error` anywhere in the cause chain is returned as-is (if outermost)
/// or re-created with its kind and message (if wrapped). A tower timeout
/// becomes [`ErrorKind::Timeout`]; an I/O error is classified by its kind.
/// Anything unrecognized is [`ErrorKind::Other`]. Wrapped errors keep the
/// original as their source, so a wrapped `Error`'s suppressed errors are
/// still reached by [`Error::chain`].
pub fn normalize(err: BoxError) -> Error {
    let err = match err.downcast::<Error>() {
        Ok(err) => return *err,
        Err(err) => err,
    };

    let (kind, message) = root_cause(&*err);
    Error::new(kind, message).with_source(err)
}

fn root_cause(err: &(dyn StdError + 'static)) -> (ErrorKind, String) {
    let mut cause = Some(err);
    while let Some(current) = cause {
        if let Some(inner) = current.downcast_ref::<Error>() {
            return (inner.kind(), inner.message().to_string());
        }
        if current.is::<Elapsed>() {
            return (ErrorKind::Timeout, current.to_string());
        }
        if let Some(io_err) = current.downcast_ref::<io::Error>() {
            return (ErrorKind::from_io(io_err.kind()), io_err.to_string());
        }
        cause = current.source();
    }
    (ErrorKind::Other, err.to_string())
}

/// Service wrapper that normalizes its inner service's errors.
///
/// Stack it outside generic tower middleware so the dispatcher sees
/// classified errors:
///
/// ```rust
/// use std::time::Duration;
/// use tower::ServiceBuilder;
/// use tower_failover::NormalizeLayer;
/// # use tower_failover::cache::{CacheService, MemoryCache};
///
/// let primary = ServiceBuilder::new()
///     .layer(NormalizeLayer)
///     .timeout(Duration::from_millis(250))
///     .service(CacheService::new(MemoryCache::new()));
/// ```
#[derive(Debug, Clone)]
pub struct Normalize<S> {
    inner: S,
}

impl<S> Normalize<S> {
    /// Wraps `inner`.
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Returns the wrapped service.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S, Req> Service<Req> for Normalize<S>
where
    S: Service<Req>,
    S::Error: Into<BoxError>,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = Error;
    type Future = BoxFuture<'static, Result<S::Response, Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner
            .poll_ready(cx)
            .map_err(|err| normalize(err.into()))
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let fut = self.inner.call(req);
        Box::pin(async move { fut.await.map_err(|err| normalize(err.into())) })
    }
}

/// Layer producing [`Normalize`] services.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeLayer;

impl<S> Layer<S> for NormalizeLayer {
    type Service = Normalize<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Normalize::new(inner)
    }
}

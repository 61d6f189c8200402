//! Key-value cache capability.
//!
//! [`Cache`] is the interface both backends implement and callers use.
//! Requests travel through tower as [`CacheRequest`] values; the
//! [`CacheService`] adapter turns a request back into a call on a concrete
//! backend, and [`CacheClient`] turns method calls into requests.
//!
//! ```rust
//! use std::time::Duration;
//! use tower_failover::cache::{Cache, CacheClient, MemoryCache};
//! use tower_failover::FailoverConfig;
//!
//! # async fn example() -> Result<(), tower_failover_core::Error> {
//! let config = FailoverConfig::builder()
//!     .name("cache")
//!     .recovery_probe_interval(Duration::from_secs(30))
//!     .build();
//!
//! // In production the primary is a networked cache client.
//! let cache = CacheClient::failover(MemoryCache::new(), MemoryCache::new(), config);
//!
//! cache.set("greeting", "hello".to_string(), None).await?;
//! assert_eq!(cache.get("greeting").await?, Some("hello".to_string()));
//! # Ok(())
//! # }
//! ```

mod client;
mod memory;
mod service;

pub use client::{CacheClient, FailoverCache};
pub use memory::MemoryCache;
pub use service::CacheService;

use crate::resolve::{Operation, OperationSignature};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tower_failover_core::Error;

/// Result of a cache operation.
pub type CacheResult<T> = Result<T, Error>;

/// Operations of a key-value cache.
///
/// Values are strings; counters are strings holding a decimal `i64`.
/// `ttl: None` keeps an entry until it is evicted.
pub trait Cache: Send + Sync + 'static {
    /// Returns the value stored under `key`.
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, CacheResult<Option<String>>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set<'a>(
        &'a self,
        key: &'a str,
        value: String,
        ttl: Option<Duration>,
    ) -> BoxFuture<'a, CacheResult<()>>;

    /// Stores `value` only if `key` is absent. Returns true if stored.
    fn set_if_absent<'a>(
        &'a self,
        key: &'a str,
        value: String,
        ttl: Option<Duration>,
    ) -> BoxFuture<'a, CacheResult<bool>>;

    /// Increments the counter under `key` by one, starting from zero.
    fn incr<'a>(&'a self, key: &'a str) -> BoxFuture<'a, CacheResult<i64>>;

    /// Decrements the counter under `key` by `delta`, starting from zero.
    fn decr_by<'a>(&'a self, key: &'a str, delta: i64) -> BoxFuture<'a, CacheResult<i64>>;

    /// Removes `key`. Returns true if it was present.
    fn evict<'a>(&'a self, key: &'a str) -> BoxFuture<'a, CacheResult<bool>>;

    /// Removes every key starting with `prefix`. Returns how many were removed.
    fn evict_by_prefix<'a>(&'a self, prefix: &'a str) -> BoxFuture<'a, CacheResult<u64>>;

    /// Returns the values for `keys`, in order.
    fn mget<'a>(&'a self, keys: &'a [String]) -> BoxFuture<'a, CacheResult<Vec<Option<String>>>>;

    /// Stores every `(key, value)` pair.
    fn mset<'a>(
        &'a self,
        entries: Vec<(String, String)>,
        ttl: Option<Duration>,
    ) -> BoxFuture<'a, CacheResult<()>>;
}

impl<C: Cache + ?Sized> Cache for Arc<C> {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, CacheResult<Option<String>>> {
        (**self).get(key)
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: String,
        ttl: Option<Duration>,
    ) -> BoxFuture<'a, CacheResult<()>> {
        (**self).set(key, value, ttl)
    }

    fn set_if_absent<'a>(
        &'a self,
        key: &'a str,
        value: String,
        ttl: Option<Duration>,
    ) -> BoxFuture<'a, CacheResult<bool>> {
        (**self).set_if_absent(key, value, ttl)
    }

    fn incr<'a>(&'a self, key: &'a str) -> BoxFuture<'a, CacheResult<i64>> {
        (**self).incr(key)
    }

    fn decr_by<'a>(&'a self, key: &'a str, delta: i64) -> BoxFuture<'a, CacheResult<i64>> {
        (**self).decr_by(key, delta)
    }

    fn evict<'a>(&'a self, key: &'a str) -> BoxFuture<'a, CacheResult<bool>> {
        (**self).evict(key)
    }

    fn evict_by_prefix<'a>(&'a self, prefix: &'a str) -> BoxFuture<'a, CacheResult<u64>> {
        (**self).evict_by_prefix(prefix)
    }

    fn mget<'a>(&'a self, keys: &'a [String]) -> BoxFuture<'a, CacheResult<Vec<Option<String>>>> {
        (**self).mget(keys)
    }

    fn mset<'a>(
        &'a self,
        entries: Vec<(String, String)>,
        ttl: Option<Duration>,
    ) -> BoxFuture<'a, CacheResult<()>> {
        (**self).mset(entries, ttl)
    }
}

/// One cache operation with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheRequest {
    /// See [`Cache::get`].
    Get { key: String },
    /// See [`Cache::set`].
    Set {
        key: String,
        value: String,
        ttl: Option<Duration>,
    },
    /// See [`Cache::set_if_absent`].
    SetIfAbsent {
        key: String,
        value: String,
        ttl: Option<Duration>,
    },
    /// See [`Cache::incr`].
    Incr { key: String },
    /// See [`Cache::decr_by`].
    DecrBy { key: String, delta: i64 },
    /// See [`Cache::evict`].
    Evict { key: String },
    /// See [`Cache::evict_by_prefix`].
    EvictByPrefix { prefix: String },
    /// See [`Cache::mget`].
    MGet { keys: Vec<String> },
    /// See [`Cache::mset`].
    MSet {
        entries: Vec<(String, String)>,
        ttl: Option<Duration>,
    },
}

impl Operation for CacheRequest {
    fn signature(&self) -> OperationSignature {
        match self {
            CacheRequest::Get { .. } => OperationSignature::new("get", &["String"]),
            CacheRequest::Set { .. } => {
                OperationSignature::new("set", &["String", "String", "Option<Duration>"])
            }
            CacheRequest::SetIfAbsent { .. } => OperationSignature::new(
                "set_if_absent",
                &["String", "String", "Option<Duration>"],
            ),
            CacheRequest::Incr { .. } => OperationSignature::new("incr", &["String"]),
            CacheRequest::DecrBy { .. } => OperationSignature::new("decr_by", &["String", "i64"]),
            CacheRequest::Evict { .. } => OperationSignature::new("evict", &["String"]),
            CacheRequest::EvictByPrefix { .. } => {
                OperationSignature::new("evict_by_prefix", &["String"])
            }
            CacheRequest::MGet { .. } => OperationSignature::new("mget", &["Vec<String>"]),
            CacheRequest::MSet { .. } => OperationSignature::new(
                "mset",
                &["Vec<(String, String)>", "Option<Duration>"],
            ),
        }
    }
}

/// Result of one cache operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheResponse {
    /// Answer to `get`.
    Value(Option<String>),
    /// Answer to `set` and `mset`.
    Stored,
    /// Answer to `set_if_absent` and `evict`.
    Applied(bool),
    /// Answer to `incr` and `decr_by`.
    Counter(i64),
    /// Answer to `evict_by_prefix`.
    Evicted(u64),
    /// Answer to `mget`.
    Values(Vec<Option<String>>),
}

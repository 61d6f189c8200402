//! In-process cache used as the fallback backend.

use super::{Cache, CacheResult};
use futures::future::{self, BoxFuture};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tower_failover_core::Error;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: String, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// A process-local [`Cache`] backed by a `HashMap`.
///
/// Every operation completes synchronously; the returned futures are
/// already resolved. Expired entries are dropped lazily when touched.
/// There is no capacity bound.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.lock().values().filter(|e| !e.is_expired(now)).count()
    }

    /// Returns true if no live entry exists.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self, key: &str) -> Option<String> {
        let mut entries = self.lock();
        let expired = match entries.get(key) {
            Some(entry) if !entry.is_expired(Instant::now()) => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        None
    }

    fn add(&self, key: &str, delta: i64) -> CacheResult<i64> {
        let mut entries = self.lock();
        let now = Instant::now();
        let current = match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => Some(entry),
            _ => None,
        };

        let (base, expires_at) = match current {
            Some(entry) => {
                let base = entry.value.parse::<i64>().map_err(|_| {
                    Error::invalid_argument(format!("value at '{key}' is not an integer"))
                })?;
                (base, entry.expires_at)
            }
            None => (0, None),
        };

        let next = base
            .checked_add(delta)
            .ok_or_else(|| Error::invalid_argument(format!("counter at '{key}' would overflow")))?;

        entries.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at,
            },
        );
        Ok(next)
    }
}

impl Cache for MemoryCache {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, CacheResult<Option<String>>> {
        Box::pin(future::ready(Ok(self.read(key))))
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: String,
        ttl: Option<Duration>,
    ) -> BoxFuture<'a, CacheResult<()>> {
        self.lock().insert(key.to_string(), Entry::new(value, ttl));
        Box::pin(future::ready(Ok(())))
    }

    fn set_if_absent<'a>(
        &'a self,
        key: &'a str,
        value: String,
        ttl: Option<Duration>,
    ) -> BoxFuture<'a, CacheResult<bool>> {
        let mut entries = self.lock();
        let occupied = entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired(Instant::now()));
        if !occupied {
            entries.insert(key.to_string(), Entry::new(value, ttl));
        }
        Box::pin(future::ready(Ok(!occupied)))
    }

    fn incr<'a>(&'a self, key: &'a str) -> BoxFuture<'a, CacheResult<i64>> {
        Box::pin(future::ready(self.add(key, 1)))
    }

    fn decr_by<'a>(&'a self, key: &'a str, delta: i64) -> BoxFuture<'a, CacheResult<i64>> {
        let result = delta
            .checked_neg()
            .ok_or_else(|| Error::invalid_argument("decrement out of range"))
            .and_then(|neg| self.add(key, neg));
        Box::pin(future::ready(result))
    }

    fn evict<'a>(&'a self, key: &'a str) -> BoxFuture<'a, CacheResult<bool>> {
        let now = Instant::now();
        let removed = self
            .lock()
            .remove(key)
            .is_some_and(|entry| !entry.is_expired(now));
        Box::pin(future::ready(Ok(removed)))
    }

    fn evict_by_prefix<'a>(&'a self, prefix: &'a str) -> BoxFuture<'a, CacheResult<u64>> {
        let now = Instant::now();
        let mut removed = 0;
        self.lock().retain(|key, entry| {
            if !key.starts_with(prefix) {
                return true;
            }
            if !entry.is_expired(now) {
                removed += 1;
            }
            false
        });
        Box::pin(future::ready(Ok(removed)))
    }

    fn mget<'a>(&'a self, keys: &'a [String]) -> BoxFuture<'a, CacheResult<Vec<Option<String>>>> {
        let values = keys.iter().map(|key| self.read(key)).collect();
        Box::pin(future::ready(Ok(values)))
    }

    fn mset<'a>(
        &'a self,
        entries: Vec<(String, String)>,
        ttl: Option<Duration>,
    ) -> BoxFuture<'a, CacheResult<()>> {
        let mut store = self.lock();
        for (key, value) in entries {
            store.insert(key, Entry::new(value, ttl));
        }
        Box::pin(future::ready(Ok(())))
    }
}

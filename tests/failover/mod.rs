//! Tests for the failover router, dispatcher and capability facades.
//!
//! - **scenarios**: the canonical cache walkthroughs (success, degrade, probe, double failure)
//! - **properties**: routing guarantees checked over every cache operation
//! - **lock**: lock capability failover
//! - **composition**: stacking with tower timeouts and error normalization
//! - **concurrency**: many callers sharing one router

mod concurrency;
mod scenarios;

use futures::future::{self, BoxFuture};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tower_failover::cache::{Cache, CacheClient, FailoverCache, MemoryCache};
use tower_failover::FailoverConfig;
use tower_failover_core::{Error, ErrorKind};
use tracing_subscriber::filter::LevelFilter;

/// Probe interval used by tests that sleep for real.
pub const PROBE_INTERVAL: Duration = Duration::from_millis(150);

static TRACING: Once = Once::new();

/// Routes `tracing` output to the test harness.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(LevelFilter::DEBUG)
            .try_init();
    });
}

/// A cache standing in for a networked one.
///
/// Backed by a [`MemoryCache`]. Every call is counted. `get` first serves
/// any queued outcomes; while an outage is set, every operation fails with
/// it.
#[derive(Debug, Default)]
pub struct ScriptedCache {
    calls: AtomicUsize,
    queued: Mutex<VecDeque<Result<Option<String>, Error>>>,
    outage: Mutex<Option<(ErrorKind, String)>>,
    store: MemoryCache,
}

impl ScriptedCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of operations invoked so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Queues the outcome of a future `get`.
    pub fn queue_get(&self, outcome: Result<Option<String>, Error>) {
        self.queued.lock().unwrap().push_back(outcome);
    }

    pub fn queue_value(&self, value: &str) {
        self.queue_get(Ok(Some(value.to_string())));
    }

    /// Makes every following operation fail with `kind`.
    pub fn go_down(&self, kind: ErrorKind, message: &str) {
        *self.outage.lock().unwrap() = Some((kind, message.to_string()));
    }

    pub fn come_back(&self) {
        *self.outage.lock().unwrap() = None;
    }

    fn enter(&self) -> Result<(), Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &*self.outage.lock().unwrap() {
            Some((kind, message)) => Err(Error::new(*kind, message.clone())),
            None => Ok(()),
        }
    }
}

impl Cache for ScriptedCache {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, Error>> {
        let queued = self.queued.lock().unwrap().pop_front();
        if let Some(outcome) = queued {
            self.calls.fetch_add(1, Ordering::SeqCst);
            return Box::pin(future::ready(outcome));
        }
        match self.enter() {
            Ok(()) => self.store.get(key),
            Err(e) => Box::pin(future::ready(Err(e))),
        }
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: String,
        ttl: Option<Duration>,
    ) -> BoxFuture<'a, Result<(), Error>> {
        match self.enter() {
            Ok(()) => self.store.set(key, value, ttl),
            Err(e) => Box::pin(future::ready(Err(e))),
        }
    }

    fn set_if_absent<'a>(
        &'a self,
        key: &'a str,
        value: String,
        ttl: Option<Duration>,
    ) -> BoxFuture<'a, Result<bool, Error>> {
        match self.enter() {
            Ok(()) => self.store.set_if_absent(key, value, ttl),
            Err(e) => Box::pin(future::ready(Err(e))),
        }
    }

    fn incr<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<i64, Error>> {
        match self.enter() {
            Ok(()) => self.store.incr(key),
            Err(e) => Box::pin(future::ready(Err(e))),
        }
    }

    fn decr_by<'a>(&'a self, key: &'a str, delta: i64) -> BoxFuture<'a, Result<i64, Error>> {
        match self.enter() {
            Ok(()) => self.store.decr_by(key, delta),
            Err(e) => Box::pin(future::ready(Err(e))),
        }
    }

    fn evict<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<bool, Error>> {
        match self.enter() {
            Ok(()) => self.store.evict(key),
            Err(e) => Box::pin(future::ready(Err(e))),
        }
    }

    fn evict_by_prefix<'a>(&'a self, prefix: &'a str) -> BoxFuture<'a, Result<u64, Error>> {
        match self.enter() {
            Ok(()) => self.store.evict_by_prefix(prefix),
            Err(e) => Box::pin(future::ready(Err(e))),
        }
    }

    fn mget<'a>(&'a self, keys: &'a [String]) -> BoxFuture<'a, Result<Vec<Option<String>>, Error>> {
        match self.enter() {
            Ok(()) => self.store.mget(keys),
            Err(e) => Box::pin(future::ready(Err(e))),
        }
    }

    fn mset<'a>(
        &'a self,
        entries: Vec<(String, String)>,
        ttl: Option<Duration>,
    ) -> BoxFuture<'a, Result<(), Error>> {
        match self.enter() {
            Ok(()) => self.store.mset(entries, ttl),
            Err(e) => Box::pin(future::ready(Err(e))),
        }
    }
}

/// A failover cache over two scripted backends.
pub type TestCache = FailoverCache<Arc<ScriptedCache>, Arc<ScriptedCache>>;

/// Builds a failover cache with the given probe interval, returning handles
/// to both backends.
pub fn wire(interval: Duration) -> (TestCache, Arc<ScriptedCache>, Arc<ScriptedCache>) {
    init_tracing();
    let primary = ScriptedCache::new();
    let fallback = ScriptedCache::new();
    let config = FailoverConfig::builder()
        .name("cache")
        .recovery_probe_interval(interval)
        .build();
    let cache = CacheClient::failover(Arc::clone(&primary), Arc::clone(&fallback), config);
    (cache, primary, fallback)
}

//! In-process lock used as the fallback backend.

use super::{Lock, LockTask};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tower_failover_core::Error;

type Slot = Arc<tokio::sync::Mutex<()>>;

/// A process-local [`Lock`].
///
/// Each key maps to its own async mutex, created on first use and dropped
/// once nobody holds or waits for it. The global lock is a separate mutex;
/// it excludes other global sections, not keyed ones.
#[derive(Debug, Default)]
pub struct LocalLock {
    slots: Mutex<HashMap<String, Slot>>,
    global: tokio::sync::Mutex<()>,
}

impl LocalLock {
    /// Creates a lock with no keys in use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held or awaited.
    pub fn keys_in_use(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn acquire_slot(&self, key: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key.to_string()).or_default())
    }

    fn release_slot(&self, key: &str, slot: &Slot) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one here: nobody else is waiting.
        if Arc::strong_count(slot) == 2 {
            slots.remove(key);
        }
    }
}

/// A claim on a key's slot, released when dropped.
///
/// Dropping covers cancellation too: a `with_lock` future dropped while
/// waiting or while its task runs still gives the key back.
struct SlotClaim<'a> {
    owner: &'a LocalLock,
    key: &'a str,
    slot: Slot,
}

impl<'a> SlotClaim<'a> {
    fn new(owner: &'a LocalLock, key: &'a str) -> Self {
        let slot = owner.acquire_slot(key);
        Self { owner, key, slot }
    }
}

impl Drop for SlotClaim<'_> {
    fn drop(&mut self) {
        self.owner.release_slot(self.key, &self.slot);
    }
}

impl Lock for LocalLock {
    fn with_lock<'a, T: Send + 'static>(
        &'a self,
        key: &'a str,
        task: LockTask<T>,
    ) -> BoxFuture<'a, Result<T, Error>> {
        Box::pin(async move {
            let claim = SlotClaim::new(self, key);
            let _held = claim.slot.lock().await;
            task().await
        })
    }

    fn with_global_lock<'a, T: Send + 'static>(
        &'a self,
        task: LockTask<T>,
    ) -> BoxFuture<'a, Result<T, Error>> {
        Box::pin(async move {
            let _held = self.global.lock().await;
            task().await
        })
    }
}

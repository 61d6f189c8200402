//! Mutual-exclusion capability.
//!
//! [`Lock`] runs a task while holding a named lock (or the single global
//! lock). Tasks are reference-counted closures so a request can be replayed
//! on the fallback when the primary cannot be reached.
//!
//! ```rust
//! use tower_failover::lock::{self, Lock, LockClient, LocalLock};
//! use tower_failover::FailoverConfig;
//!
//! # async fn example() -> Result<(), tower_failover_core::Error> {
//! // In production the primary is a distributed lock client.
//! let locks = LockClient::failover(LocalLock::new(), LocalLock::new(), FailoverConfig::default());
//!
//! let total = locks
//!     .with_lock("invoice:42", lock::task(|| async { Ok(40 + 2) }))
//!     .await?;
//! assert_eq!(total, 42);
//! # Ok(())
//! # }
//! ```

mod client;
mod local;
mod service;

pub use client::LockClient;
pub use local::LocalLock;
pub use service::LockService;

use crate::resolve::{Operation, OperationSignature};
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tower_failover_core::Error;

/// Work to run under a lock. May be invoked more than once if the call is
/// replayed on the fallback.
pub type LockTask<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, Error>> + Send + Sync>;

/// Builds a [`LockTask`] from an async closure.
pub fn task<T, F, Fut>(f: F) -> LockTask<T>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, Error>> + Send + 'static,
{
    Arc::new(move || Box::pin(f()))
}

/// Operations of a mutual-exclusion lock.
pub trait Lock: Send + Sync + 'static {
    /// Runs `task` while holding the lock named `key`, returning its result.
    fn with_lock<'a, T: Send + 'static>(
        &'a self,
        key: &'a str,
        task: LockTask<T>,
    ) -> BoxFuture<'a, Result<T, Error>>;

    /// Runs `task` while holding the global lock, returning its result.
    fn with_global_lock<'a, T: Send + 'static>(
        &'a self,
        task: LockTask<T>,
    ) -> BoxFuture<'a, Result<T, Error>>;
}

impl<L: Lock> Lock for Arc<L> {
    fn with_lock<'a, T: Send + 'static>(
        &'a self,
        key: &'a str,
        task: LockTask<T>,
    ) -> BoxFuture<'a, Result<T, Error>> {
        (**self).with_lock(key, task)
    }

    fn with_global_lock<'a, T: Send + 'static>(
        &'a self,
        task: LockTask<T>,
    ) -> BoxFuture<'a, Result<T, Error>> {
        (**self).with_global_lock(task)
    }
}

/// One lock operation with its task.
pub enum LockRequest<T> {
    /// See [`Lock::with_lock`].
    Key {
        /// Name of the lock.
        key: String,
        /// Work to run while holding it.
        task: LockTask<T>,
    },
    /// See [`Lock::with_global_lock`].
    Global {
        /// Work to run while holding the global lock.
        task: LockTask<T>,
    },
}

impl<T> Clone for LockRequest<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Key { key, task } => Self::Key {
                key: key.clone(),
                task: Arc::clone(task),
            },
            Self::Global { task } => Self::Global {
                task: Arc::clone(task),
            },
        }
    }
}

impl<T> fmt::Debug for LockRequest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key { key, .. } => f.debug_struct("Key").field("key", key).finish_non_exhaustive(),
            Self::Global { .. } => f.debug_struct("Global").finish_non_exhaustive(),
        }
    }
}

impl<T> Operation for LockRequest<T> {
    fn signature(&self) -> OperationSignature {
        match self {
            Self::Key { .. } => OperationSignature::new("with_lock", &["String", "LockTask"]),
            Self::Global { .. } => OperationSignature::new("with_global_lock", &["LockTask"]),
        }
    }
}

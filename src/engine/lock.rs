use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use ulid::Ulid;

use crate::config::LockScope;

use super::EngineError;

type LockMap = DashMap<Ulid, Arc<Mutex<()>>>;

/// Serializes booking creation. Keyed by resource, or a single key when the
/// scope is global. An entry lives only while someone holds or waits on it.
pub struct BookingLocks {
    scope: LockScope,
    timeout: Duration,
    locks: Arc<LockMap>,
}

/// Held lock. Dropping it releases the lock and prunes the idle entry.
pub struct BookingGuard {
    guard: Option<OwnedMutexGuard<()>>,
    key: Ulid,
    locks: Arc<LockMap>,
}

impl Drop for BookingGuard {
    fn drop(&mut self) {
        // Release first so our own Arc no longer counts.
        self.guard.take();
        prune(&self.locks, self.key);
    }
}

/// Remove `key` if the map holds the only reference. Runs under the shard
/// write lock, so a concurrent `acquire` either already cloned the Arc
/// (count > 1, kept) or will create a fresh entry.
fn prune(locks: &LockMap, key: Ulid) {
    locks.remove_if(&key, |_, lock| Arc::strong_count(lock) == 1);
}

impl BookingLocks {
    pub fn new(scope: LockScope, timeout: Duration) -> Self {
        Self {
            scope,
            timeout,
            locks: Arc::new(DashMap::new()),
        }
    }

    fn key(&self, resource_id: Ulid) -> Ulid {
        match self.scope {
            LockScope::Global => Ulid::nil(),
            LockScope::PerResource => resource_id,
        }
    }

    /// Wait at most the configured timeout for the lock covering `resource_id`.
    pub async fn acquire(&self, resource_id: Ulid) -> Result<BookingGuard, EngineError> {
        let key = self.key(resource_id);
        let lock = self.locks.entry(key).or_default().value().clone();
        let started = Instant::now();
        let acquired = tokio::time::timeout(self.timeout, lock.lock_owned()).await;
        metrics::histogram!(crate::observability::LOCK_WAIT_SECONDS)
            .record(started.elapsed().as_secs_f64());

        match acquired {
            Ok(guard) => Ok(BookingGuard {
                guard: Some(guard),
                key,
                locks: self.locks.clone(),
            }),
            Err(_) => {
                // The timed-out future dropped its Arc; the holder may be gone too.
                prune(&self.locks, key);
                Err(EngineError::LockTimeout)
            }
        }
    }
}

//! Logical reservation locks keyed by room type
//!
//! The lock only narrows contention; the ledger's conditional updates stay
//! the authority on correctness.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::{DomainError, DomainResult, RoomTypeKey};

/// Anything that releases a lock when dropped.
trait Held: Send {}
impl<T: Send> Held for T {}

/// RAII handle for an acquired lock; dropping it releases the lock.
pub struct LockGuard {
    key: RoomTypeKey,
    _held: Box<dyn Held>,
}

impl LockGuard {
    pub fn key(&self) -> RoomTypeKey {
        self.key
    }

    /// A guard that excludes nobody.
    #[cfg(test)]
    pub(crate) fn unguarded(key: RoomTypeKey) -> Self {
        Self {
            key,
            _held: Box::new(()),
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        debug!(scope = %self.key, "Reservation lock released");
    }
}

#[async_trait]
pub trait LockProvider: Send + Sync {
    /// Wait at most `timeout` for exclusive access to `key`.
    ///
    /// Fails with `ConcurrentBookingConflict` on timeout.
    async fn acquire(&self, key: RoomTypeKey, timeout: Duration) -> DomainResult<LockGuard>;
}

pub type SharedLockProvider = Arc<dyn LockProvider>;

/// Lock table for a single process.
///
/// One `tokio::sync::Mutex` per room type, created on first use. The table
/// never shrinks; it is bounded by the number of room types.
#[derive(Default)]
pub struct InProcessLockProvider {
    locks: DashMap<RoomTypeKey, Arc<Mutex<()>>>,
}

impl InProcessLockProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockProvider for InProcessLockProvider {
    async fn acquire(&self, key: RoomTypeKey, timeout: Duration) -> DomainResult<LockGuard> {
        // Clone the handle out so no DashMap shard lock is held while waiting.
        let mutex = self.locks.entry(key).or_default().clone();

        match tokio::time::timeout(timeout, mutex.lock_owned()).await {
            Ok(guard) => {
                debug!(scope = %key, "Reservation lock acquired");
                Ok(LockGuard {
                    key,
                    _held: Box::new(guard),
                })
            }
            Err(_) => {
                metrics::counter!("reservation_lock_timeouts_total").increment(1);
                warn!(scope = %key, timeout_ms = timeout.as_millis() as u64, "Reservation lock timed out");
                Err(DomainError::ConcurrentBookingConflict(format!(
                    "timed out after {:?} waiting for room type {}",
                    timeout, key
                )))
            }
        }
    }
}

//! Per-owner write locks.
//!
//! An owner's entry exists only while a writer holds or waits for it, so the
//! map stays bounded by the number of owners with writes in flight.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Async mutexes serializing writes to each owner's list.
#[derive(Debug, Default)]
pub struct OwnerLocks {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl OwnerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive write access to one owner's list.
    pub async fn acquire(&self, owner_id: Uuid) -> OwnerGuard<'_> {
        let lock = Arc::clone(&self.locks.entry(owner_id).or_default());
        let guard = lock.lock_owned().await;
        OwnerGuard {
            owner_id,
            locks: &self.locks,
            guard: Some(guard),
        }
    }

    /// Owners with a writer holding or waiting for their lock.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Held for the duration of a write. Dropping it releases the lock and
/// forgets the owner when no other writer is queued.
#[derive(Debug)]
pub struct OwnerGuard<'a> {
    owner_id: Uuid,
    locks: &'a DashMap<Uuid, Arc<Mutex<()>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for OwnerGuard<'_> {
    fn drop(&mut self) {
        // Releasing first drops the guard's own reference to the mutex.
        self.guard.take();
        // Waiters clone the Arc under the same shard lock, so a count of one
        // means the map holds the only reference.
        self.locks
            .remove_if(&self.owner_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

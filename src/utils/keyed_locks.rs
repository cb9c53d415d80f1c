//! Per-key async locks.
//!
//! Serializes read-modify-write cycles on a single entity (one lock per
//! cart id) while leaving unrelated entities free to proceed
//! concurrently. Locks are created lazily and kept for the lifetime of
//! the registry; repeated lookups for the same key return the same lock.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Registry of per-key async mutexes.
#[derive(Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `key`, waiting if another task holds it.
    /// The guard releases the lock on drop.
    pub async fn acquire(&self, key: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(key).or_default().clone()
        };
        lock.lock_owned().await
    }
}

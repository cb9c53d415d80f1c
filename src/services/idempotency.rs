//! Idempotency guard: at most one order per client-supplied key.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use super::Result;
use crate::cache::ProjectionCache;
use crate::storage::OrderStore;

/// Two-tier idempotency lookup: a fast cache pointer in front of the
/// durable key record.
///
/// The cache tier only saves a store round trip on the common "was this
/// already processed" check. It is never authoritative: entries expire
/// and evict, so a cache miss falls through to the durable record rather
/// than being read as "never processed".
pub struct IdempotencyGuard {
    store: Arc<dyn OrderStore>,
    cache: ProjectionCache,
}

impl IdempotencyGuard {
    pub fn new(store: Arc<dyn OrderStore>, cache: ProjectionCache) -> Self {
        Self { store, cache }
    }

    /// Resolve a key to the order it already produced, if any.
    ///
    /// Callers treat a `Some` as success (return the existing order id),
    /// never as an error.
    pub async fn resolve(&self, key: &str) -> Result<Option<Uuid>> {
        if let Some(order_id) = self.cache.order_for_key(key).await {
            debug!(key, %order_id, "idempotency key resolved from cache");
            return Ok(Some(order_id));
        }

        match self.store.find_idempotency_key(key).await? {
            Some(order_id) => {
                debug!(key, %order_id, "idempotency key resolved from store");
                self.cache.put_order_for_key(key, order_id).await;
                Ok(Some(order_id))
            }
            None => Ok(None),
        }
    }

    /// Populate the fast-path pointer after the durable record has been
    /// committed. Best-effort: the durable record remains authoritative.
    pub async fn record(&self, key: &str, order_id: Uuid) {
        self.cache.put_order_for_key(key, order_id).await;
    }
}

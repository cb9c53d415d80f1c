//! Cache-aside layer in front of the durable store.
//!
//! Entries here are disposable projections, never authoritative: on a
//! miss the durable store is consulted and the entry repopulated. A
//! cache failure degrades to the durable path and is logged, never
//! surfaced to the caller.
//!
//! Implementations:
//! - `InMemoryCache`: process-local TTL cache for standalone mode
//! - `RedisCache`: Redis backend (requires the `redis` feature)

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::config::CacheConfig;
use crate::domain::Cart;

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use memory::InMemoryCache;
#[cfg(feature = "redis")]
pub use redis::RedisCache;

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors that can occur during cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache encode error: {0}")]
    Encode(#[from] serde_json::Error),

    #[cfg(feature = "redis")]
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
}

/// Key/value cache with per-entry TTLs.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Fetch a value, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value with a bounded TTL.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Drop a value if present.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Narrow cache-aside interface for the two projections the order
/// pipeline keeps: cart bodies and idempotency pointers.
///
/// All degradation happens here: a backend failure logs and behaves like
/// a miss (reads) or a no-op (writes), so the durable store remains the
/// only component that defines correctness.
#[derive(Clone)]
pub struct ProjectionCache {
    inner: Arc<dyn Cache>,
    key_prefix: String,
    cart_ttl: Duration,
    idempotency_ttl: Duration,
}

impl ProjectionCache {
    pub fn new(inner: Arc<dyn Cache>, config: &CacheConfig) -> Self {
        Self {
            inner,
            key_prefix: config.key_prefix.clone(),
            cart_ttl: config.cart_ttl(),
            idempotency_ttl: config.idempotency_ttl(),
        }
    }

    fn cart_key(&self, cart_id: Uuid) -> String {
        format!("{}:cart:{}", self.key_prefix, cart_id)
    }

    fn idempotency_key(&self, token: &str) -> String {
        format!("{}:idem:{}", self.key_prefix, token)
    }

    /// Cached cart body, or `None` on miss, decode failure, or backend
    /// failure.
    pub async fn cart(&self, cart_id: Uuid) -> Option<Cart> {
        let key = self.cart_key(cart_id);
        match self.inner.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(cart) => Some(cart),
                Err(e) => {
                    warn!(%cart_id, error = %e, "dropping undecodable cached cart");
                    let _ = self.inner.delete(&key).await;
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(%cart_id, error = %e, "cart cache read failed, falling back to store");
                None
            }
        }
    }

    /// Refresh the cached cart body with a fresh TTL. Best-effort.
    pub async fn put_cart(&self, cart: &Cart) {
        let key = self.cart_key(cart.id);
        let raw = match serde_json::to_string(cart) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(cart_id = %cart.id, error = %e, "failed to encode cart for cache");
                return;
            }
        };
        if let Err(e) = self.inner.set(&key, &raw, self.cart_ttl).await {
            warn!(cart_id = %cart.id, error = %e, "cart cache write failed");
        } else {
            debug!(cart_id = %cart.id, "cart cache refreshed");
        }
    }

    /// Fast-path idempotency pointer. A `None` here means nothing: the
    /// durable record must still be consulted.
    pub async fn order_for_key(&self, token: &str) -> Option<Uuid> {
        let key = self.idempotency_key(token);
        match self.inner.get(&key).await {
            Ok(Some(raw)) => match raw.parse() {
                Ok(order_id) => Some(order_id),
                Err(e) => {
                    warn!(token, error = %e, "dropping undecodable idempotency pointer");
                    let _ = self.inner.delete(&key).await;
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(token, error = %e, "idempotency cache read failed, falling back to store");
                None
            }
        }
    }

    /// Populate the idempotency pointer. Best-effort.
    pub async fn put_order_for_key(&self, token: &str, order_id: Uuid) {
        let key = self.idempotency_key(token);
        if let Err(e) = self
            .inner
            .set(&key, &order_id.to_string(), self.idempotency_ttl)
            .await
        {
            warn!(token, %order_id, error = %e, "idempotency cache write failed");
        }
    }
}

/// Initialize the cache backend based on configuration.
pub async fn init_cache(
    config: &CacheConfig,
) -> std::result::Result<Arc<dyn Cache>, Box<dyn std::error::Error>> {
    match config.cache_type.as_str() {
        "memory" => Ok(Arc::new(InMemoryCache::new())),
        #[cfg(feature = "redis")]
        "redis" => {
            let cache = RedisCache::new(&config.url).await?;
            Ok(Arc::new(cache))
        }
        #[cfg(not(feature = "redis"))]
        "redis" => {
            error!("Redis cache requested but 'redis' feature is not enabled");
            Err("Redis feature not enabled".into())
        }
        other => {
            error!("Unknown cache type: {}", other);
            Err(format!("Unknown cache type: {}", other).into())
        }
    }
}

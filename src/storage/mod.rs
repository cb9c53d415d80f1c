//! Durable order storage.
//!
//! The relational store is the single writer-of-record for carts and
//! orders; the cache layer is never authoritative. Implementations:
//! - `SqliteOrderStore`: SQLite storage via sqlx + sea-query
//! - `MockOrderStore`: in-memory mock for testing

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Cart, IdempotencyRecord, Order, OrderStatus};

pub mod mock;
#[cfg(feature = "sqlite")]
pub mod schema;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use mock::MockOrderStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteOrderStore;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[cfg(feature = "sqlite")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Unique-constraint violation, e.g. a duplicate idempotency key.
    #[error("conflict on key: {key}")]
    Conflict { key: String },

    /// A stored row failed to decode (bad decimal, status, or JSON).
    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("invalid uuid: {0}")]
    InvalidUuid(#[from] uuid::Error),

    /// The store is unreachable; retryable by the caller.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Interface for cart and order persistence.
///
/// Write operations are transactional: either everything a call names is
/// recorded, or nothing is. No partial order (items without an
/// idempotency record, or vice versa) is ever observable.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist a new, empty cart.
    async fn insert_cart(&self, cart: &Cart) -> Result<()>;

    /// Fetch a cart with its items, or `None` if absent.
    async fn fetch_cart(&self, cart_id: Uuid) -> Result<Option<Cart>>;

    /// Replace a cart's row and item lines in a single transaction.
    async fn update_cart(&self, cart: &Cart) -> Result<()>;

    /// Persist an order, its item snapshots, its status history, and the
    /// idempotency record guarding it, all in one transaction.
    ///
    /// Returns [`StorageError::Conflict`] if the idempotency key already
    /// exists; callers treat that as losing a same-key race.
    async fn insert_order(&self, order: &Order, key: &IdempotencyRecord) -> Result<()>;

    /// Fetch an order with its items and full status history.
    async fn fetch_order(&self, order_id: Uuid) -> Result<Option<Order>>;

    /// Look up the order created under an idempotency key, if any.
    async fn find_idempotency_key(&self, key: &str) -> Result<Option<Uuid>>;

    /// Record a status transition: updates the order row and appends one
    /// history row in a single transaction.
    async fn append_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
        notes: Option<&str>,
        changed_at: DateTime<Utc>,
        delivered_at: Option<DateTime<Utc>>,
    ) -> Result<()>;
}

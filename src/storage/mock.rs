//! Mock OrderStore implementation for testing.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{Cart, IdempotencyRecord, Order, OrderStatus, StatusEntry};
use crate::storage::{OrderStore, Result, StorageError};

/// Mock order store that keeps everything in memory.
///
/// Failure switches simulate an unreachable store so callers' retry and
/// degradation paths can be exercised.
#[derive(Default)]
pub struct MockOrderStore {
    carts: RwLock<HashMap<Uuid, Cart>>,
    orders: RwLock<HashMap<Uuid, Order>>,
    keys: RwLock<HashMap<String, IdempotencyRecord>>,
    fail_on_read: RwLock<bool>,
    fail_on_write: RwLock<bool>,
}

impl MockOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_read(&self, fail: bool) {
        *self.fail_on_read.write().await = fail;
    }

    pub async fn set_fail_on_write(&self, fail: bool) {
        *self.fail_on_write.write().await = fail;
    }

    /// Number of orders currently stored.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Number of idempotency records currently stored.
    pub async fn key_count(&self) -> usize {
        self.keys.read().await.len()
    }

    async fn check_read(&self) -> Result<()> {
        if *self.fail_on_read.read().await {
            return Err(StorageError::Unavailable("injected read failure".into()));
        }
        Ok(())
    }

    async fn check_write(&self) -> Result<()> {
        if *self.fail_on_write.read().await {
            return Err(StorageError::Unavailable("injected write failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MockOrderStore {
    async fn insert_cart(&self, cart: &Cart) -> Result<()> {
        self.check_write().await?;
        self.carts.write().await.insert(cart.id, cart.clone());
        Ok(())
    }

    async fn fetch_cart(&self, cart_id: Uuid) -> Result<Option<Cart>> {
        self.check_read().await?;
        Ok(self.carts.read().await.get(&cart_id).cloned())
    }

    async fn update_cart(&self, cart: &Cart) -> Result<()> {
        self.check_write().await?;
        self.carts.write().await.insert(cart.id, cart.clone());
        Ok(())
    }

    async fn insert_order(&self, order: &Order, key: &IdempotencyRecord) -> Result<()> {
        self.check_write().await?;

        let mut keys = self.keys.write().await;
        if keys.contains_key(&key.key) {
            return Err(StorageError::Conflict {
                key: key.key.clone(),
            });
        }
        keys.insert(key.key.clone(), key.clone());
        self.orders.write().await.insert(order.id, order.clone());
        Ok(())
    }

    async fn fetch_order(&self, order_id: Uuid) -> Result<Option<Order>> {
        self.check_read().await?;
        Ok(self.orders.read().await.get(&order_id).cloned())
    }

    async fn find_idempotency_key(&self, key: &str) -> Result<Option<Uuid>> {
        self.check_read().await?;
        Ok(self.keys.read().await.get(key).map(|record| record.order_id))
    }

    async fn append_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
        notes: Option<&str>,
        changed_at: DateTime<Utc>,
        delivered_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.check_write().await?;

        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(&order_id)
            .ok_or(StorageError::Unavailable("order vanished".into()))?;

        order.status = status;
        if delivered_at.is_some() {
            order.delivered_at = delivered_at;
        }
        order.history.push(StatusEntry {
            status,
            notes: notes.map(|n| n.to_string()),
            changed_at,
        });
        Ok(())
    }
}

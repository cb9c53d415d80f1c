//! Order placement orchestrator: the idempotent cart-to-order
//! transition.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use super::{publish_best_effort, IdempotencyGuard, Result, ServiceError};
use crate::bus::EventBus;
use crate::config::{CacheConfig, PricingConfig};
use crate::domain::{DomainEvent, IdempotencyRecord, Order, OrderPlaced};
use crate::storage::{OrderStore, StorageError};

/// Input for placing an order.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub cart_id: Uuid,
    /// Authenticated customer, absent for guest checkout.
    pub customer_id: Option<Uuid>,
    pub delivery_address: String,
    pub special_instructions: Option<String>,
    /// Client-supplied retry token. Omitting it forfeits retry-safety:
    /// a server-generated token is used instead.
    pub idempotency_key: Option<String>,
}

/// Converts a priced cart into an order exactly once per idempotency
/// key.
pub struct OrderPlacement {
    store: Arc<dyn OrderStore>,
    guard: IdempotencyGuard,
    bus: Arc<dyn EventBus>,
    service_fee: Decimal,
    key_ttl: chrono::Duration,
    publish_timeout: Duration,
}

impl OrderPlacement {
    pub fn new(
        store: Arc<dyn OrderStore>,
        guard: IdempotencyGuard,
        bus: Arc<dyn EventBus>,
        pricing: &PricingConfig,
        cache: &CacheConfig,
        publish_timeout: Duration,
    ) -> Self {
        let key_ttl = chrono::Duration::seconds(cache.idempotency_ttl_secs as i64);
        Self {
            store,
            guard,
            bus,
            service_fee: pricing.service_fee,
            key_ttl,
            publish_timeout,
        }
    }

    /// Place an order from a cart.
    ///
    /// For a given idempotency key exactly one order is ever created;
    /// every caller using that key observes the same order id. The order,
    /// its item snapshots, its initial history row, and the idempotency
    /// record commit in a single transaction; the `OrderPlaced` event is
    /// published after commit, best-effort.
    pub async fn place(&self, request: PlaceOrder) -> Result<Uuid> {
        let key = request
            .idempotency_key
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        // Fast path: a retry of an already-processed request. The cart is
        // not touched and no event is emitted.
        if let Some(existing) = self.guard.resolve(&key).await? {
            info!(order_id = %existing, key = %key, "order already placed for key");
            return Ok(existing);
        }

        let cart = self
            .store
            .fetch_cart(request.cart_id)
            .await?
            .ok_or(ServiceError::CartNotFound(request.cart_id))?;
        if cart.is_empty() {
            return Err(ServiceError::CartEmpty(request.cart_id));
        }
        let restaurant_id = cart
            .restaurant_id
            .ok_or(ServiceError::RestaurantNotSet(request.cart_id))?;

        let now = Utc::now();
        let order = Order::from_cart(
            Uuid::new_v4(),
            &cart,
            request.customer_id,
            restaurant_id,
            request.delivery_address,
            request.special_instructions,
            key.clone(),
            self.service_fee,
            now,
        );
        let record = IdempotencyRecord {
            key: key.clone(),
            order_id: order.id,
            created_at: now,
            expires_at: now + self.key_ttl,
        };

        match self.store.insert_order(&order, &record).await {
            Ok(()) => {}
            Err(StorageError::Conflict { .. }) => {
                // Lost a same-key race; the winner's record is durable by
                // now. Hand back the winner's order id.
                return match self.guard.resolve(&key).await? {
                    Some(winner) => {
                        info!(order_id = %winner, key = %key, "concurrent placement won by another request");
                        Ok(winner)
                    }
                    None => Err(ServiceError::Conflict(key)),
                };
            }
            Err(e) => return Err(e.into()),
        }

        self.guard.record(&key, order.id).await;

        publish_best_effort(
            &self.bus,
            self.publish_timeout,
            DomainEvent::OrderPlaced(OrderPlaced::from_order(&order)),
        )
        .await;

        info!(
            order_id = %order.id,
            cart_id = %cart.id,
            restaurant = %restaurant_id,
            total = %order.total,
            "order placed"
        );
        Ok(order.id)
    }

    /// Fetch an order with its items and full status history.
    pub async fn get_order(&self, order_id: Uuid) -> Result<Order> {
        self.store
            .fetch_order(order_id)
            .await?
            .ok_or(ServiceError::OrderNotFound(order_id))
    }
}

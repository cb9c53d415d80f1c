//! Core order pipeline services.
//!
//! Each inbound request (cart mutation, order placement, status update)
//! is handled independently; the durable store and cache are the only
//! coordination points between concurrent requests.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::bus::EventBus;
use crate::domain::{DomainEvent, OrderStatus};
use crate::storage::StorageError;

pub mod carts;
pub mod idempotency;
pub mod placement;
pub mod status;

pub use carts::{CartManager, NewCartItem};
pub use idempotency::IdempotencyGuard;
pub use placement::{OrderPlacement, PlaceOrder};
pub use status::StatusTracker;

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Errors surfaced to callers of the order pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("cart not found: {0}")]
    CartNotFound(Uuid),

    #[error("cart is empty: {0}")]
    CartEmpty(Uuid),

    /// Should be impossible for a non-empty cart, checked defensively.
    #[error("cart has no restaurant bound: {0}")]
    RestaurantNotSet(Uuid),

    /// All items in a cart must come from one restaurant.
    #[error("cart {cart_id} is bound to restaurant {bound}, item belongs to {offered}")]
    RestaurantMismatch {
        cart_id: Uuid,
        bound: Uuid,
        offered: Uuid,
    },

    #[error("quantity must be positive")]
    InvalidQuantity,

    #[error("order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("illegal status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Lost a same-key placement race and the winner could not be
    /// resolved; safe to retry.
    #[error("idempotency conflict for key {0}")]
    Conflict(String),

    /// Store failure; retryable by the caller.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Publish a domain event without letting the outcome affect the
/// request. Failures and timeouts are logged; the preceding database
/// transaction stands either way.
pub(crate) async fn publish_best_effort(
    bus: &Arc<dyn EventBus>,
    bound: Duration,
    event: DomainEvent,
) {
    let topic = event.topic();
    let order_id = event.order_id();

    match tokio::time::timeout(bound, bus.publish(Arc::new(event))).await {
        Ok(Ok(())) => {
            debug!(topic, %order_id, "event published");
        }
        Ok(Err(e)) => {
            warn!(topic, %order_id, error = %e, "event publish failed, continuing");
        }
        Err(_) => {
            warn!(topic, %order_id, bound = ?bound, "event publish timed out, continuing");
        }
    }
}

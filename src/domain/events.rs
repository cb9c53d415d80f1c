//! Domain events published to the message bus.
//!
//! Consumers (delivery assignment, notifications, chat) receive these
//! asynchronously; payloads carry everything a consumer needs so it never
//! has to read back from the order store.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Order, OrderItem, OrderStatus};

/// Topic for order placement events.
pub const TOPIC_ORDER_PLACED: &str = "order.placed";
/// Topic for order status change events.
pub const TOPIC_ORDER_STATUS_CHANGED: &str = "order.status_changed";

/// Published once when a cart becomes an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub restaurant_id: Uuid,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    pub delivery_address: String,
    pub items: Vec<OrderItem>,
}

impl OrderPlaced {
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_id: order.id,
            customer_id: order.customer_id,
            restaurant_id: order.restaurant_id,
            total: order.total,
            created_at: order.created_at,
            delivery_address: order.delivery_address.clone(),
            items: order.items.clone(),
        }
    }
}

/// Published on every recorded status transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusChanged {
    pub order_id: Uuid,
    pub restaurant_id: Uuid,
    pub old_status: OrderStatus,
    pub new_status: OrderStatus,
    pub changed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Envelope for everything the order pipeline publishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    OrderPlaced(OrderPlaced),
    OrderStatusChanged(OrderStatusChanged),
}

impl DomainEvent {
    /// Routing key on the message bus.
    pub fn topic(&self) -> &'static str {
        match self {
            DomainEvent::OrderPlaced(_) => TOPIC_ORDER_PLACED,
            DomainEvent::OrderStatusChanged(_) => TOPIC_ORDER_STATUS_CHANGED,
        }
    }

    /// The order this event concerns.
    pub fn order_id(&self) -> Uuid {
        match self {
            DomainEvent::OrderPlaced(e) => e.order_id,
            DomainEvent::OrderStatusChanged(e) => e.order_id,
        }
    }
}

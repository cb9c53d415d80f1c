//! Order model: immutable snapshot of a cart plus an append-only status
//! history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{Cart, OrderStatus};

/// Immutable snapshot of a cart item at placement time. Catalog prices
/// can change after placement; the order stays historically accurate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub menu_item_id: Uuid,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub modifiers: Value,
}

/// One row of the append-only status audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub changed_at: DateTime<Utc>,
}

/// A placed order. Customer, restaurant, and item lines are immutable
/// after creation; only `status`, `delivered_at`, and the history grow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    /// Absent for guest checkouts.
    pub customer_id: Option<Uuid>,
    pub restaurant_id: Uuid,
    pub items: Vec<OrderItem>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub delivery_fee: Decimal,
    pub service_fee: Decimal,
    pub total: Decimal,
    pub status: OrderStatus,
    pub delivery_address: String,
    pub special_instructions: Option<String>,
    /// The token used to create this order, kept for audit. The
    /// authoritative idempotency record lives in its own table.
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub history: Vec<StatusEntry>,
}

impl Order {
    /// Construct a pending order from a priced cart: totals copied, every
    /// cart item snapshotted, and the initial `Pending` history row
    /// appended.
    #[allow(clippy::too_many_arguments)]
    pub fn from_cart(
        id: Uuid,
        cart: &Cart,
        customer_id: Option<Uuid>,
        restaurant_id: Uuid,
        delivery_address: String,
        special_instructions: Option<String>,
        idempotency_key: String,
        service_fee: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        let items = cart
            .items
            .iter()
            .map(|item| OrderItem {
                menu_item_id: item.menu_item_id,
                name: item.name.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                total_price: item.total_price,
                modifiers: item.modifiers.clone(),
            })
            .collect();

        Self {
            id,
            customer_id,
            restaurant_id,
            items,
            subtotal: cart.subtotal,
            tax: cart.tax,
            delivery_fee: cart.delivery_fee,
            service_fee,
            total: cart.subtotal + cart.tax + cart.delivery_fee + service_fee,
            status: OrderStatus::Pending,
            delivery_address,
            special_instructions,
            idempotency_key: Some(idempotency_key),
            created_at: now,
            delivered_at: None,
            history: vec![StatusEntry {
                status: OrderStatus::Pending,
                notes: None,
                changed_at: now,
            }],
        }
    }
}

/// Durable mapping from a client-supplied idempotency token to the order
/// it produced. Written in the same transaction as the order itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub key: String,
    pub order_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn priced_cart() -> Cart {
        let mut cart = Cart::new(Uuid::new_v4(), Some(Uuid::new_v4()), Utc::now());
        cart.restaurant_id = Some(Uuid::new_v4());
        cart.upsert_item(Uuid::new_v4(), "Bibimbap", dec("11.00"), 2, Value::Null);
        cart.recompute_totals(dec("0.08"), dec("2.99"));
        cart
    }

    #[test]
    fn test_from_cart_snapshots_items_and_totals() {
        let cart = priced_cart();
        let order = Order::from_cart(
            Uuid::new_v4(),
            &cart,
            cart.customer_id,
            cart.restaurant_id.unwrap(),
            "1 Main St".to_string(),
            None,
            "key-1".to_string(),
            dec("1.50"),
            Utc::now(),
        );

        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].total_price, dec("22.00"));
        assert_eq!(order.subtotal, cart.subtotal);
        assert_eq!(
            order.total,
            order.subtotal + order.tax + order.delivery_fee + order.service_fee
        );
    }

    #[test]
    fn test_from_cart_starts_pending_with_initial_history_row() {
        let cart = priced_cart();
        let order = Order::from_cart(
            Uuid::new_v4(),
            &cart,
            None,
            cart.restaurant_id.unwrap(),
            "1 Main St".to_string(),
            None,
            "key-2".to_string(),
            Decimal::ZERO,
            Utc::now(),
        );

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.history.len(), 1);
        assert_eq!(order.history[0].status, OrderStatus::Pending);
        assert!(order.delivered_at.is_none());
    }

    #[test]
    fn test_snapshot_is_independent_of_source_cart() {
        let mut cart = priced_cart();
        let order = Order::from_cart(
            Uuid::new_v4(),
            &cart,
            None,
            cart.restaurant_id.unwrap(),
            "1 Main St".to_string(),
            None,
            "key-3".to_string(),
            Decimal::ZERO,
            Utc::now(),
        );

        let menu_item = cart.items[0].menu_item_id;
        cart.upsert_item(menu_item, "Bibimbap", dec("11.00"), 5, Value::Null);
        cart.recompute_totals(dec("0.08"), dec("2.99"));

        assert_eq!(order.items[0].quantity, 2);
        assert_eq!(order.items[0].total_price, dec("22.00"));
    }
}

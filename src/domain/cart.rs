//! Cart and cart item model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A line in a cart. Unique per `(cart, menu_item_id)`: re-adding the same
/// menu item increments the quantity instead of appending a second line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub menu_item_id: Uuid,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    /// Opaque selected options/modifiers, carried through to the order.
    pub modifiers: Value,
}

/// A customer's (or guest's) in-progress selection against one restaurant.
///
/// The restaurant binding is set by the first item added and never changes
/// afterwards. Totals are derived and recomputed on every mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub id: Uuid,
    pub customer_id: Option<Uuid>,
    pub restaurant_id: Option<Uuid>,
    pub items: Vec<CartItem>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// A fresh empty cart with zeroed totals.
    pub fn new(id: Uuid, customer_id: Option<Uuid>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            customer_id,
            restaurant_id: None,
            items: Vec::new(),
            subtotal: Decimal::ZERO,
            tax: Decimal::ZERO,
            delivery_fee: Decimal::ZERO,
            total: Decimal::ZERO,
            updated_at: now,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add a menu item, merging with an existing line for the same
    /// `menu_item_id`. Merging is blind to the modifiers payload: the
    /// first add's modifiers win. Does not touch the derived totals;
    /// callers follow up with [`Cart::recompute_totals`].
    pub fn upsert_item(
        &mut self,
        menu_item_id: Uuid,
        name: &str,
        unit_price: Decimal,
        quantity: u32,
        modifiers: Value,
    ) {
        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|item| item.menu_item_id == menu_item_id)
        {
            existing.quantity += quantity;
            existing.total_price = existing.unit_price * Decimal::from(existing.quantity);
        } else {
            self.items.push(CartItem {
                menu_item_id,
                name: name.to_string(),
                quantity,
                unit_price,
                total_price: unit_price * Decimal::from(quantity),
                modifiers,
            });
        }
    }

    /// Recompute the derived totals from the item lines and the pricing
    /// policy. An empty cart carries no delivery fee.
    pub fn recompute_totals(&mut self, tax_rate: Decimal, delivery_fee: Decimal) {
        self.subtotal = self.items.iter().map(|item| item.total_price).sum();
        self.tax = (self.subtotal * tax_rate).round_dp(2);
        self.delivery_fee = if self.items.is_empty() {
            Decimal::ZERO
        } else {
            delivery_fee
        };
        self.total = self.subtotal + self.tax + self.delivery_fee;
    }
}

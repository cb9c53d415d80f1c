//! Cart manager: creation, cache-aside reads, and item merging.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use super::{Result, ServiceError};
use crate::cache::ProjectionCache;
use crate::config::PricingConfig;
use crate::domain::Cart;
use crate::storage::OrderStore;
use crate::utils::KeyedLocks;

/// Input for adding a menu item to a cart.
#[derive(Debug, Clone)]
pub struct NewCartItem {
    pub menu_item_id: Uuid,
    pub restaurant_id: Uuid,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub modifiers: Value,
}

/// Creates carts, merges items, and keeps totals consistent.
///
/// Mutations run under a per-cart lock so concurrent `add_item` calls on
/// the same cart serialize instead of silently dropping each other's
/// writes. Reads are cache-aside: cache first, durable store on miss,
/// repopulate after.
pub struct CartManager {
    store: Arc<dyn OrderStore>,
    cache: ProjectionCache,
    locks: KeyedLocks,
    pricing: PricingConfig,
}

impl CartManager {
    pub fn new(store: Arc<dyn OrderStore>, cache: ProjectionCache, pricing: PricingConfig) -> Self {
        Self {
            store,
            cache,
            locks: KeyedLocks::new(),
            pricing,
        }
    }

    /// Allocate and persist a new empty cart, seeding the cache entry.
    pub async fn create_cart(&self, customer_id: Option<Uuid>) -> Result<Uuid> {
        let cart = Cart::new(Uuid::new_v4(), customer_id, Utc::now());
        self.store.insert_cart(&cart).await?;
        self.cache.put_cart(&cart).await;

        info!(cart_id = %cart.id, customer = ?customer_id, "cart created");
        Ok(cart.id)
    }

    /// Cache-aside cart read.
    pub async fn get_cart(&self, cart_id: Uuid) -> Result<Cart> {
        self.load(cart_id).await
    }

    /// Add a menu item to a cart, merging quantity into an existing line
    /// for the same menu item, then recompute the derived totals and
    /// write through.
    pub async fn add_item(&self, cart_id: Uuid, item: NewCartItem) -> Result<Cart> {
        if item.quantity == 0 {
            return Err(ServiceError::InvalidQuantity);
        }

        // Hold the cart's lock across the whole read-modify-write.
        let _guard = self.locks.acquire(cart_id).await;

        let mut cart = self.load(cart_id).await?;

        match cart.restaurant_id {
            None => cart.restaurant_id = Some(item.restaurant_id),
            Some(bound) if bound != item.restaurant_id => {
                return Err(ServiceError::RestaurantMismatch {
                    cart_id,
                    bound,
                    offered: item.restaurant_id,
                });
            }
            Some(_) => {}
        }

        cart.upsert_item(
            item.menu_item_id,
            &item.name,
            item.unit_price,
            item.quantity,
            item.modifiers,
        );
        cart.recompute_totals(self.pricing.tax_rate, self.pricing.delivery_fee);
        cart.updated_at = Utc::now();

        self.store.update_cart(&cart).await?;
        self.cache.put_cart(&cart).await;

        debug!(
            cart_id = %cart.id,
            menu_item = %item.menu_item_id,
            lines = cart.items.len(),
            total = %cart.total,
            "cart item added"
        );
        Ok(cart)
    }

    async fn load(&self, cart_id: Uuid) -> Result<Cart> {
        if let Some(cart) = self.cache.cart(cart_id).await {
            return Ok(cart);
        }

        let cart = self
            .store
            .fetch_cart(cart_id)
            .await?
            .ok_or(ServiceError::CartNotFound(cart_id))?;
        self.cache.put_cart(&cart).await;
        Ok(cart)
    }
}

//! Shared test harness: pipeline services over in-memory backends.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde_json::Value;
use uuid::Uuid;

use expeditor::bus::MockEventBus;
use expeditor::cache::{InMemoryCache, ProjectionCache};
use expeditor::config::Config;
use expeditor::services::{
    CartManager, IdempotencyGuard, NewCartItem, OrderPlacement, PlaceOrder, StatusTracker,
};
use expeditor::storage::MockOrderStore;

pub const PUBLISH_TIMEOUT: Duration = Duration::from_secs(1);

pub fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

/// Everything a pipeline test needs, wired over mocks.
pub struct Harness {
    pub store: Arc<MockOrderStore>,
    pub bus: Arc<MockEventBus>,
    pub carts: CartManager,
    pub placement: OrderPlacement,
    pub tracker: StatusTracker,
    /// Restaurant all harness-built items belong to.
    pub restaurant: Uuid,
}

impl Harness {
    pub fn new() -> Self {
        let config = Config::default();
        let store = Arc::new(MockOrderStore::new());
        let cache = ProjectionCache::new(Arc::new(InMemoryCache::new()), &config.cache);
        let bus = Arc::new(MockEventBus::new());

        let carts = CartManager::new(store.clone(), cache.clone(), config.pricing.clone());
        let guard = IdempotencyGuard::new(store.clone(), cache.clone());
        let placement = OrderPlacement::new(
            store.clone(),
            guard,
            bus.clone(),
            &config.pricing,
            &config.cache,
            PUBLISH_TIMEOUT,
        );
        let tracker = StatusTracker::new(store.clone(), bus.clone(), PUBLISH_TIMEOUT);

        Self {
            store,
            bus,
            carts,
            placement,
            tracker,
            restaurant: Uuid::new_v4(),
        }
    }

    /// An item offered by the harness restaurant.
    pub fn item(&self, menu_item_id: Uuid, price: &str, quantity: u32) -> NewCartItem {
        NewCartItem {
            menu_item_id,
            restaurant_id: self.restaurant,
            name: "Test Item".to_string(),
            unit_price: dec(price),
            quantity,
            modifiers: Value::Null,
        }
    }

    pub fn place_request(&self, cart_id: Uuid, key: Option<&str>) -> PlaceOrder {
        PlaceOrder {
            cart_id,
            customer_id: None,
            delivery_address: "1 Main St".to_string(),
            special_instructions: None,
            idempotency_key: key.map(|k| k.to_string()),
        }
    }

    /// Create a cart holding one line of `quantity` x `price`.
    pub async fn cart_with_item(&self, price: &str, quantity: u32) -> Uuid {
        let cart_id = self.carts.create_cart(None).await.unwrap();
        self.carts
            .add_item(cart_id, self.item(Uuid::new_v4(), price, quantity))
            .await
            .unwrap();
        cart_id
    }

    /// Place an order for a fresh single-item cart.
    pub async fn placed_order(&self) -> Uuid {
        let cart_id = self.cart_with_item("10.00", 1).await;
        self.placement
            .place(self.place_request(cart_id, None))
            .await
            .unwrap()
    }
}

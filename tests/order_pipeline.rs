//! End-to-end pipeline behavior over in-memory backends: cart building,
//! idempotent placement, snapshots, and event emission.

mod common;

use uuid::Uuid;

use common::{dec, Harness};
use expeditor::domain::{DomainEvent, OrderStatus};
use expeditor::services::ServiceError;
use expeditor::storage::MockOrderStore;

#[tokio::test]
async fn test_end_to_end_scenario() {
    let h = Harness::new();
    let m1 = Uuid::new_v4();

    let cart_id = h.carts.create_cart(None).await.unwrap();
    h.carts
        .add_item(cart_id, h.item(m1, "10.00", 2))
        .await
        .unwrap();
    let cart = h
        .carts
        .add_item(cart_id, h.item(m1, "10.00", 1))
        .await
        .unwrap();

    // Same menu item merges into a single line.
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 3);
    assert_eq!(cart.items[0].total_price, dec("30.00"));
    assert_eq!(cart.subtotal, dec("30.00"));

    let order_id = h
        .placement
        .place(h.place_request(cart_id, Some("K1")))
        .await
        .unwrap();

    let order = h.placement.get_order(order_id).await.unwrap();
    assert_eq!(order.subtotal, dec("30.00"));
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].quantity, 3);
    assert_eq!(order.status, OrderStatus::Pending);

    // Replaying the same key returns the same order and creates nothing.
    let replay_id = h
        .placement
        .place(h.place_request(cart_id, Some("K1")))
        .await
        .unwrap();
    assert_eq!(replay_id, order_id);
    assert_eq!(h.store.order_count().await, 1);
    assert_eq!(h.store.key_count().await, 1);
}

#[tokio::test]
async fn test_idempotent_replay_after_cart_mutation() {
    let h = Harness::new();
    let cart_id = h.cart_with_item("10.00", 2).await;

    let order_id = h
        .placement
        .place(h.place_request(cart_id, Some("K2")))
        .await
        .unwrap();

    // The cart changes between the original call and the retry; the
    // retry must still observe the original order.
    h.carts
        .add_item(cart_id, h.item(Uuid::new_v4(), "99.00", 9))
        .await
        .unwrap();

    let replay_id = h
        .placement
        .place(h.place_request(cart_id, Some("K2")))
        .await
        .unwrap();
    assert_eq!(replay_id, order_id);
    assert_eq!(h.store.order_count().await, 1);

    let order = h.placement.get_order(order_id).await.unwrap();
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.subtotal, dec("20.00"));
}

#[tokio::test]
async fn test_omitted_key_creates_distinct_orders() {
    let h = Harness::new();
    let cart_id = h.cart_with_item("10.00", 1).await;

    let first = h
        .placement
        .place(h.place_request(cart_id, None))
        .await
        .unwrap();
    let second = h
        .placement
        .place(h.place_request(cart_id, None))
        .await
        .unwrap();

    // Omitting the key forfeits retry-safety.
    assert_ne!(first, second);
    assert_eq!(h.store.order_count().await, 2);
}

#[tokio::test]
async fn test_order_snapshot_survives_cart_mutation() {
    let h = Harness::new();
    let m1 = Uuid::new_v4();

    let cart_id = h.carts.create_cart(None).await.unwrap();
    h.carts
        .add_item(cart_id, h.item(m1, "10.00", 2))
        .await
        .unwrap();

    let order_id = h
        .placement
        .place(h.place_request(cart_id, Some("K3")))
        .await
        .unwrap();

    // The source cart is still reachable; mutating it must not leak into
    // the snapshot.
    h.carts
        .add_item(cart_id, h.item(m1, "10.00", 5))
        .await
        .unwrap();

    let order = h.placement.get_order(order_id).await.unwrap();
    assert_eq!(order.items[0].quantity, 2);
    assert_eq!(order.items[0].total_price, dec("20.00"));
    assert_eq!(order.subtotal, dec("20.00"));
}

#[tokio::test]
async fn test_cart_totals_follow_pricing_policy() {
    let h = Harness::new();
    let cart_id = h.carts.create_cart(None).await.unwrap();

    let cart = h
        .carts
        .add_item(cart_id, h.item(Uuid::new_v4(), "10.00", 3))
        .await
        .unwrap();

    // Defaults: 8% tax, 2.99 delivery.
    assert_eq!(cart.subtotal, dec("30.00"));
    assert_eq!(cart.tax, dec("2.40"));
    assert_eq!(cart.delivery_fee, dec("2.99"));
    assert_eq!(cart.total, dec("35.39"));
}

#[tokio::test]
async fn test_place_fails_on_missing_cart() {
    let h = Harness::new();
    let missing = Uuid::new_v4();

    let err = h
        .placement
        .place(h.place_request(missing, Some("K4")))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::CartNotFound(id) if id == missing));
}

#[tokio::test]
async fn test_place_fails_on_empty_cart() {
    let h = Harness::new();
    let cart_id = h.carts.create_cart(None).await.unwrap();

    let err = h
        .placement
        .place(h.place_request(cart_id, Some("K5")))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::CartEmpty(id) if id == cart_id));
    assert_eq!(h.store.order_count().await, 0);
}

#[tokio::test]
async fn test_add_item_fails_on_missing_cart() {
    let h = Harness::new();
    let missing = Uuid::new_v4();

    let err = h
        .carts
        .add_item(missing, h.item(Uuid::new_v4(), "5.00", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::CartNotFound(id) if id == missing));
}

#[tokio::test]
async fn test_add_item_rejects_second_restaurant() {
    let h = Harness::new();
    let cart_id = h.cart_with_item("10.00", 1).await;

    let mut foreign = h.item(Uuid::new_v4(), "7.00", 1);
    foreign.restaurant_id = Uuid::new_v4();

    let err = h.carts.add_item(cart_id, foreign).await.unwrap_err();
    assert!(matches!(err, ServiceError::RestaurantMismatch { .. }));
}

#[tokio::test]
async fn test_add_item_rejects_zero_quantity() {
    let h = Harness::new();
    let cart_id = h.carts.create_cart(None).await.unwrap();

    let err = h
        .carts
        .add_item(cart_id, h.item(Uuid::new_v4(), "5.00", 0))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidQuantity));
}

#[tokio::test]
async fn test_placement_emits_order_placed_event() {
    let h = Harness::new();
    let cart_id = h.cart_with_item("10.00", 2).await;

    let order_id = h
        .placement
        .place(h.place_request(cart_id, Some("K6")))
        .await
        .unwrap();

    let published = h.bus.published().await;
    assert_eq!(published.len(), 1);
    match published[0].as_ref() {
        DomainEvent::OrderPlaced(event) => {
            assert_eq!(event.order_id, order_id);
            assert_eq!(event.restaurant_id, h.restaurant);
            assert_eq!(event.items.len(), 1);
            assert_eq!(event.total, dec("24.59"));
        }
        other => panic!("expected OrderPlaced, got {:?}", other),
    }

    // A key replay emits nothing further.
    h.placement
        .place(h.place_request(cart_id, Some("K6")))
        .await
        .unwrap();
    assert_eq!(h.bus.published_count().await, 1);
}

#[tokio::test]
async fn test_publish_failure_does_not_fail_placement() {
    let h = Harness::new();
    let cart_id = h.cart_with_item("10.00", 1).await;
    h.bus.set_fail_on_publish(true).await;

    let order_id = h
        .placement
        .place(h.place_request(cart_id, Some("K7")))
        .await
        .unwrap();

    // Order exists even though no consumer was notified.
    let order = h.placement.get_order(order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(h.bus.published_count().await, 0);
}

#[tokio::test]
async fn test_store_failure_surfaces_as_retryable() {
    let h = Harness::new();
    let cart_id = h.cart_with_item("10.00", 1).await;
    h.store.set_fail_on_write(true).await;

    let err = h
        .placement
        .place(h.place_request(cart_id, Some("K8")))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Storage(_)));

    // The same key succeeds once the store recovers.
    h.store.set_fail_on_write(false).await;
    let order_id = h
        .placement
        .place(h.place_request(cart_id, Some("K8")))
        .await
        .unwrap();
    assert_eq!(h.store.order_count().await, 1);
    h.placement.get_order(order_id).await.unwrap();
}

#[tokio::test]
async fn test_cached_cart_serves_reads_when_store_is_down() {
    let h = Harness::new();
    let cart_id = h.cart_with_item("10.00", 1).await;

    // Warm from the mutation above; the store going away must not break
    // the read path.
    h.store.set_fail_on_read(true).await;
    let cart = h.carts.get_cart(cart_id).await.unwrap();
    assert_eq!(cart.id, cart_id);
}

#[tokio::test]
async fn test_idempotency_survives_cold_cache() {
    // A fresh harness sharing only the durable store simulates a process
    // whose cache pointer expired or evicted.
    let h = Harness::new();
    let cart_id = h.cart_with_item("10.00", 1).await;
    let order_id = h
        .placement
        .place(h.place_request(cart_id, Some("K9")))
        .await
        .unwrap();

    let cold = harness_sharing_store(&h);
    let replay_id = cold
        .placement
        .place(cold.place_request(cart_id, Some("K9")))
        .await
        .unwrap();
    assert_eq!(replay_id, order_id);
    assert_eq!(h.store.order_count().await, 1);
}

/// A second harness over the same durable store but fresh cache and bus.
fn harness_sharing_store(original: &Harness) -> Harness {
    use expeditor::cache::{InMemoryCache, ProjectionCache};
    use expeditor::config::Config;
    use expeditor::services::{CartManager, IdempotencyGuard, OrderPlacement, StatusTracker};
    use std::sync::Arc;

    let config = Config::default();
    let store: Arc<MockOrderStore> = original.store.clone();
    let cache = ProjectionCache::new(Arc::new(InMemoryCache::new()), &config.cache);
    let bus = Arc::new(expeditor::bus::MockEventBus::new());

    Harness {
        carts: CartManager::new(store.clone(), cache.clone(), config.pricing.clone()),
        placement: OrderPlacement::new(
            store.clone(),
            IdempotencyGuard::new(store.clone(), cache.clone()),
            bus.clone(),
            &config.pricing,
            &config.cache,
            common::PUBLISH_TIMEOUT,
        ),
        tracker: StatusTracker::new(store.clone(), bus.clone(), common::PUBLISH_TIMEOUT),
        store,
        bus,
        restaurant: original.restaurant,
    }
}

//! Status tracker behavior: validated transitions, append-only history,
//! terminal finality, and change events.

mod common;

use uuid::Uuid;

use common::Harness;
use expeditor::domain::{DomainEvent, OrderStatus};
use expeditor::services::ServiceError;

#[tokio::test]
async fn test_full_delivery_sequence() {
    let h = Harness::new();
    let order_id = h.placed_order().await;

    for status in [
        OrderStatus::Accepted,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::PickedUp,
        OrderStatus::InTransit,
        OrderStatus::Delivered,
    ] {
        h.tracker.update_status(order_id, status, None).await.unwrap();
    }

    let order = h.placement.get_order(order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Delivered);
    assert!(order.delivered_at.is_some());

    // Initial Pending row plus one row per transition, in call order.
    let statuses: Vec<OrderStatus> = order.history.iter().map(|entry| entry.status).collect();
    assert_eq!(
        statuses,
        vec![
            OrderStatus::Pending,
            OrderStatus::Accepted,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::PickedUp,
            OrderStatus::InTransit,
            OrderStatus::Delivered,
        ]
    );
}

#[tokio::test]
async fn test_each_update_appends_exactly_one_row() {
    let h = Harness::new();
    let order_id = h.placed_order().await;

    let before = h.placement.get_order(order_id).await.unwrap().history;
    h.tracker
        .update_status(order_id, OrderStatus::Accepted, Some("vendor ok".to_string()))
        .await
        .unwrap();
    let after = h.placement.get_order(order_id).await.unwrap().history;

    assert_eq!(after.len(), before.len() + 1);
    // Prior rows are untouched.
    assert_eq!(&after[..before.len()], &before[..]);
    assert_eq!(after.last().unwrap().notes.as_deref(), Some("vendor ok"));
}

#[tokio::test]
async fn test_skipping_stages_forward_is_allowed() {
    let h = Harness::new();
    let order_id = h.placed_order().await;

    h.tracker
        .update_status(order_id, OrderStatus::Ready, None)
        .await
        .unwrap();
    // Pickup order: no courier leg.
    h.tracker
        .update_status(order_id, OrderStatus::Delivered, None)
        .await
        .unwrap();

    let order = h.placement.get_order(order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Delivered);
}

#[tokio::test]
async fn test_backward_move_is_rejected() {
    let h = Harness::new();
    let order_id = h.placed_order().await;

    h.tracker
        .update_status(order_id, OrderStatus::Ready, None)
        .await
        .unwrap();

    let err = h
        .tracker
        .update_status(order_id, OrderStatus::Preparing, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::InvalidTransition {
            from: OrderStatus::Ready,
            to: OrderStatus::Preparing,
        }
    ));

    // The rejected call left no trace.
    let order = h.placement.get_order(order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Ready);
    assert_eq!(order.history.len(), 2);
}

#[tokio::test]
async fn test_terminal_states_are_final() {
    for terminal in [
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Refunded,
    ] {
        let h = Harness::new();
        let order_id = h.placed_order().await;
        h.tracker.update_status(order_id, terminal, None).await.unwrap();

        let err = h
            .tracker
            .update_status(order_id, OrderStatus::Preparing, None)
            .await
            .unwrap_err();
        assert!(
            matches!(err, ServiceError::InvalidTransition { .. }),
            "expected finality for {terminal}"
        );
    }
}

#[tokio::test]
async fn test_cancel_from_mid_pipeline() {
    let h = Harness::new();
    let order_id = h.placed_order().await;

    h.tracker
        .update_status(order_id, OrderStatus::Preparing, None)
        .await
        .unwrap();
    h.tracker
        .update_status(
            order_id,
            OrderStatus::Cancelled,
            Some("customer called".to_string()),
        )
        .await
        .unwrap();

    let order = h.placement.get_order(order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert!(order.delivered_at.is_none());
}

#[tokio::test]
async fn test_delivered_at_only_stamped_on_delivery() {
    let h = Harness::new();
    let order_id = h.placed_order().await;

    h.tracker
        .update_status(order_id, OrderStatus::InTransit, None)
        .await
        .unwrap();
    assert!(h
        .placement
        .get_order(order_id)
        .await
        .unwrap()
        .delivered_at
        .is_none());

    h.tracker
        .update_status(order_id, OrderStatus::Delivered, None)
        .await
        .unwrap();
    assert!(h
        .placement
        .get_order(order_id)
        .await
        .unwrap()
        .delivered_at
        .is_some());
}

#[tokio::test]
async fn test_update_on_missing_order_is_not_found() {
    let h = Harness::new();
    let missing = Uuid::new_v4();

    let err = h
        .tracker
        .update_status(missing, OrderStatus::Accepted, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::OrderNotFound(id) if id == missing));
}

#[tokio::test]
async fn test_status_change_event_carries_old_and_new() {
    let h = Harness::new();
    let order_id = h.placed_order().await;
    let placed_events = h.bus.published_count().await;

    h.tracker
        .update_status(order_id, OrderStatus::Accepted, Some("on it".to_string()))
        .await
        .unwrap();

    let published = h.bus.published().await;
    assert_eq!(published.len(), placed_events + 1);
    match published.last().unwrap().as_ref() {
        DomainEvent::OrderStatusChanged(event) => {
            assert_eq!(event.order_id, order_id);
            assert_eq!(event.old_status, OrderStatus::Pending);
            assert_eq!(event.new_status, OrderStatus::Accepted);
            assert_eq!(event.restaurant_id, h.restaurant);
            assert_eq!(event.notes.as_deref(), Some("on it"));
        }
        other => panic!("expected OrderStatusChanged, got {:?}", other),
    }
}

#[tokio::test]
async fn test_publish_failure_does_not_block_status_update() {
    let h = Harness::new();
    let order_id = h.placed_order().await;
    h.bus.set_fail_on_publish(true).await;

    h.tracker
        .update_status(order_id, OrderStatus::Accepted, None)
        .await
        .unwrap();

    let order = h.placement.get_order(order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Accepted);
}

#[tokio::test]
async fn test_rejected_transition_emits_no_event() {
    let h = Harness::new();
    let order_id = h.placed_order().await;
    h.tracker
        .update_status(order_id, OrderStatus::Delivered, None)
        .await
        .unwrap();
    let count = h.bus.published_count().await;

    let _ = h
        .tracker
        .update_status(order_id, OrderStatus::Accepted, None)
        .await
        .unwrap_err();
    assert_eq!(h.bus.published_count().await, count);
}

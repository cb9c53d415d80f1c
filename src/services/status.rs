//! Status tracker: validated transitions over the order state machine.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::{publish_best_effort, Result, ServiceError};
use crate::bus::EventBus;
use crate::domain::{DomainEvent, OrderStatus, OrderStatusChanged};
use crate::storage::OrderStore;

/// Records order status transitions and notifies downstream consumers.
pub struct StatusTracker {
    store: Arc<dyn OrderStore>,
    bus: Arc<dyn EventBus>,
    publish_timeout: Duration,
}

impl StatusTracker {
    pub fn new(
        store: Arc<dyn OrderStore>,
        bus: Arc<dyn EventBus>,
        publish_timeout: Duration,
    ) -> Self {
        Self {
            store,
            bus,
            publish_timeout,
        }
    }

    /// Move an order to a new status.
    ///
    /// Transitions are validated against the state machine: forward moves
    /// along the fulfillment chain, aborts from any non-terminal state,
    /// nothing out of a terminal state. One history row is appended per
    /// accepted call; `delivered_at` is stamped on the move to
    /// `Delivered`. Downstream consumers learn about the change via an
    /// `order.status_changed` event, published best-effort after commit.
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
        notes: Option<String>,
    ) -> Result<()> {
        let order = self
            .store
            .fetch_order(order_id)
            .await?
            .ok_or(ServiceError::OrderNotFound(order_id))?;

        let old_status = order.status;
        if !old_status.can_transition_to(new_status) {
            return Err(ServiceError::InvalidTransition {
                from: old_status,
                to: new_status,
            });
        }

        let now = Utc::now();
        let delivered_at = (new_status == OrderStatus::Delivered).then_some(now);

        self.store
            .append_status(order_id, new_status, notes.as_deref(), now, delivered_at)
            .await?;

        publish_best_effort(
            &self.bus,
            self.publish_timeout,
            DomainEvent::OrderStatusChanged(OrderStatusChanged {
                order_id,
                restaurant_id: order.restaurant_id,
                old_status,
                new_status,
                changed_at: now,
                notes,
            }),
        )
        .await;

        info!(
            %order_id,
            from = %old_status,
            to = %new_status,
            "order status updated"
        );
        Ok(())
    }
}

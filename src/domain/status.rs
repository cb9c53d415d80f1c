//! Order status state machine.
//!
//! Fulfillment progresses forward along
//! `Pending -> Accepted -> Preparing -> Ready -> PickedUp -> InTransit -> Delivered`;
//! skipping stages is legal (a pickup order may go straight from `Ready`
//! to `Delivered`). `Cancelled` and `Refunded` are reachable from any
//! non-terminal state. Terminal states accept no further transitions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Status of an order within the fulfillment pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Accepted,
    Preparing,
    Ready,
    PickedUp,
    /// Courier is en route. Accepts the wire spelling `out_for_delivery`.
    #[serde(alias = "out_for_delivery")]
    InTransit,
    /// Order reached the customer. Accepts the wire spelling `completed`.
    #[serde(alias = "completed")]
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    /// Canonical snake_case spelling, as stored and published.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::PickedUp => "picked_up",
            OrderStatus::InTransit => "in_transit",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    /// True once no further transitions are recorded.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Refunded
        )
    }

    /// Position along the fulfillment chain. `None` for the abort states,
    /// which sit outside the chain.
    fn stage(&self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::Accepted => Some(1),
            OrderStatus::Preparing => Some(2),
            OrderStatus::Ready => Some(3),
            OrderStatus::PickedUp => Some(4),
            OrderStatus::InTransit => Some(5),
            OrderStatus::Delivered => Some(6),
            OrderStatus::Cancelled | OrderStatus::Refunded => None,
        }
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next.stage() {
            // Cancelled/Refunded are reachable from any non-terminal state.
            None => true,
            Some(n) => self.stage().is_some_and(|current| n > current),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "accepted" => Ok(OrderStatus::Accepted),
            "preparing" => Ok(OrderStatus::Preparing),
            "ready" => Ok(OrderStatus::Ready),
            "picked_up" => Ok(OrderStatus::PickedUp),
            "in_transit" | "out_for_delivery" => Ok(OrderStatus::InTransit),
            "delivered" | "completed" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "refunded" => Ok(OrderStatus::Refunded),
            other => Err(format!("unknown order status: {}", other)),
        }
    }
}

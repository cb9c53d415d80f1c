//! Domain model for the order pipeline.
//!
//! Carts are mutable until placement; orders are immutable snapshots with
//! an append-only status history. Money is `rust_decimal::Decimal`
//! throughout, timestamps are UTC.

mod cart;
mod events;
mod order;
mod status;

pub use cart::{Cart, CartItem};
pub use events::{DomainEvent, OrderPlaced, OrderStatusChanged};
pub use order::{IdempotencyRecord, Order, OrderItem, StatusEntry};
pub use status::OrderStatus;

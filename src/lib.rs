//! Expeditor - order placement and fulfillment pipeline.
//!
//! The core of a multi-tenant food-ordering platform: carts, the
//! idempotent cart-to-order transition, the order status state machine,
//! and domain event publication for downstream consumers (delivery,
//! notification, chat).

pub mod bus;
pub mod cache;
pub mod config;
pub mod domain;
pub mod services;
#[cfg(feature = "standalone")]
pub mod standalone;
pub mod storage;
pub mod transport;
pub mod utils;

//! Event bus for async delivery of domain events.
//!
//! This module contains:
//! - `EventBus` trait: event delivery to downstream consumers
//! - `EventHandler` trait: for processing events
//! - Implementations: in-process channel bus, outbox wrapper, mock
//!
//! Publication is best-effort from the caller's point of view: a failed
//! publish never rolls back the database transaction that preceded it.
//! The outbox wrapper upgrades delivery to at-least-once.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::domain::DomainEvent;

#[cfg(feature = "channel")]
pub mod channel;
pub mod mock;
#[cfg(feature = "sqlite")]
pub mod outbox;

#[cfg(feature = "channel")]
pub use channel::ChannelEventBus;
pub use mock::MockEventBus;
#[cfg(feature = "sqlite")]
pub use outbox::{spawn_recovery_task, OutboxConfig, RecoveryTaskHandle, SqliteOutboxEventBus};

/// Result type for bus operations.
pub type Result<T> = std::result::Result<T, BusError>;

/// Errors that can occur during bus operations.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("publish failed: {0}")]
    Publish(String),

    #[error("subscribe failed: {0}")]
    Subscribe(String),

    #[error("publish timed out after {0:?}")]
    Timeout(Duration),

    #[error("event encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Handler for processing events from the bus.
pub trait EventHandler: Send + Sync {
    /// Process a domain event.
    fn handle(&self, event: Arc<DomainEvent>)
        -> BoxFuture<'static, std::result::Result<(), BusError>>;
}

/// Interface for event delivery to downstream consumers (delivery
/// assignment, notifications, chat).
///
/// Events are wrapped in `Arc` to enforce immutability during
/// distribution; all consumers receive a reference to the same payload.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish an event to consumers.
    async fn publish(&self, event: Arc<DomainEvent>) -> Result<()>;

    /// Register a handler for events (consumer side).
    async fn subscribe(&self, handler: Box<dyn EventHandler>) -> Result<()>;

    /// Start delivering events to registered handlers.
    async fn start_consuming(&self) -> Result<()>;
}

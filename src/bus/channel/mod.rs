//! In-memory channel-based event bus for standalone mode.
//!
//! Uses tokio broadcast channels for pub/sub within a single process.
//! Ideal for local development and testing without external dependencies.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info};

use super::{EventBus, EventHandler, Result};
use crate::domain::DomainEvent;

/// Channel capacity for broadcast.
const CHANNEL_CAPACITY: usize = 1024;

/// Configuration for channel event bus.
#[derive(Clone, Debug, Default)]
pub struct ChannelConfig {
    /// Topic filter for subscribers.
    /// - `None` or `Some("#")` matches all topics
    /// - `Some("order")` matches "order" and "order.placed"
    pub topic_filter: Option<String>,
}

impl ChannelConfig {
    /// Create config for publishing only.
    pub fn publisher() -> Self {
        Self { topic_filter: None }
    }

    /// Create config for subscribing to a specific topic.
    pub fn subscriber(topic: impl Into<String>) -> Self {
        Self {
            topic_filter: Some(topic.into()),
        }
    }

    /// Create config for subscribing to all topics.
    pub fn subscriber_all() -> Self {
        Self {
            topic_filter: Some("#".to_string()),
        }
    }
}

/// Check if a topic matches a filter pattern.
///
/// Matching rules:
/// - "#" matches all topics
/// - Exact match: "order.placed" matches "order.placed"
/// - Hierarchical: "order" matches "order.placed" (prefix match with dot
///   separator)
fn topic_matches(topic: &str, filter: &str) -> bool {
    if filter == "#" {
        return true;
    }
    if topic == filter {
        return true;
    }
    topic.starts_with(filter) && topic[filter.len()..].starts_with('.')
}

/// In-memory event bus using tokio broadcast channels.
///
/// Events are published to a broadcast channel and received by all
/// subscribers. Topic filtering is done on the subscriber side.
pub struct ChannelEventBus {
    /// Broadcast sender for publishing events.
    sender: broadcast::Sender<Arc<DomainEvent>>,
    /// Configuration including topic filter.
    config: ChannelConfig,
    /// Registered event handlers.
    handlers: Arc<RwLock<Vec<Box<dyn EventHandler>>>>,
    /// Flag indicating if consumer task is running.
    consuming: Arc<RwLock<bool>>,
}

impl ChannelEventBus {
    /// Create a new channel event bus.
    pub fn new(config: ChannelConfig) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);

        info!(
            topic_filter = ?config.topic_filter,
            "Channel event bus initialized"
        );

        Self {
            sender,
            config,
            handlers: Arc::new(RwLock::new(Vec::new())),
            consuming: Arc::new(RwLock::new(false)),
        }
    }

    /// Create a publisher-only bus instance.
    pub fn publisher() -> Self {
        Self::new(ChannelConfig::publisher())
    }

    /// Create a subscriber bus for a specific topic.
    pub fn subscriber(topic: impl Into<String>) -> Self {
        Self::new(ChannelConfig::subscriber(topic))
    }

    /// Create a new bus that shares the same channel but has different
    /// config, e.g. a subscriber linked to an existing publisher.
    pub fn with_config(&self, config: ChannelConfig) -> Self {
        Self {
            sender: self.sender.clone(),
            config,
            handlers: Arc::new(RwLock::new(Vec::new())),
            consuming: Arc::new(RwLock::new(false)),
        }
    }
}

#[async_trait]
impl EventBus for ChannelEventBus {
    async fn publish(&self, event: Arc<DomainEvent>) -> Result<()> {
        let topic = event.topic();

        // A send error only means there are no receivers right now;
        // publishing into the void is not a failure.
        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(topic, receivers, "event broadcast");
            }
            Err(_) => {
                debug!(topic, "event broadcast with no receivers");
            }
        }
        Ok(())
    }

    async fn subscribe(&self, handler: Box<dyn EventHandler>) -> Result<()> {
        self.handlers.write().await.push(handler);
        Ok(())
    }

    async fn start_consuming(&self) -> Result<()> {
        {
            let mut consuming = self.consuming.write().await;
            if *consuming {
                return Ok(());
            }
            *consuming = true;
        }

        let mut receiver = self.sender.subscribe();
        let handlers = self.handlers.clone();
        let topic_filter = self.config.topic_filter.clone();

        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        if let Some(ref filter) = topic_filter {
                            if !topic_matches(event.topic(), filter) {
                                continue;
                            }
                        }
                        let handlers = handlers.read().await;
                        for handler in handlers.iter() {
                            if let Err(e) = handler.handle(event.clone()).await {
                                error!(topic = event.topic(), error = %e, "event handler failed");
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        error!(skipped, "event consumer lagged, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("event channel closed, consumer stopping");
                        break;
                    }
                }
            }
        });

        Ok(())
    }
}

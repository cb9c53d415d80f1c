//! Mock EventBus implementation for testing.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{BusError, EventBus, EventHandler, Result};
use crate::domain::DomainEvent;

/// Mock event bus that records published events in memory.
#[derive(Default)]
pub struct MockEventBus {
    published: RwLock<Vec<Arc<DomainEvent>>>,
    fail_on_publish: RwLock<bool>,
}

impl MockEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_publish(&self, fail: bool) {
        *self.fail_on_publish.write().await = fail;
    }

    /// Everything published so far, in order.
    pub async fn published(&self) -> Vec<Arc<DomainEvent>> {
        self.published.read().await.clone()
    }

    pub async fn published_count(&self) -> usize {
        self.published.read().await.len()
    }
}

#[async_trait]
impl EventBus for MockEventBus {
    async fn publish(&self, event: Arc<DomainEvent>) -> Result<()> {
        if *self.fail_on_publish.read().await {
            return Err(BusError::Publish("injected publish failure".into()));
        }
        self.published.write().await.push(event);
        Ok(())
    }

    async fn subscribe(&self, _handler: Box<dyn EventHandler>) -> Result<()> {
        Ok(())
    }

    async fn start_consuming(&self) -> Result<()> {
        Ok(())
    }
}

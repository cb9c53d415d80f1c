//! Standalone wiring: config to running application in one process.
//!
//! Builds the storage, cache, and bus backends named by the
//! configuration, assembles the pipeline services over them, and returns
//! the HTTP router ready to serve.

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::info;

use crate::bus::{self, ChannelEventBus, EventBus, SqliteOutboxEventBus};
use crate::cache::{init_cache, ProjectionCache};
use crate::config::Config;
use crate::services::{CartManager, IdempotencyGuard, OrderPlacement, StatusTracker};
use crate::storage::SqliteOrderStore;
use crate::transport::{router, AppState};

/// A wired application.
pub struct App {
    /// HTTP router over the pipeline services.
    pub router: axum::Router,
    /// Handle to the outbox recovery task, when the outbox is enabled.
    pub outbox_recovery: Option<bus::RecoveryTaskHandle>,
}

/// Build the application from configuration.
pub async fn build(config: &Config) -> Result<App, Box<dyn std::error::Error>> {
    // Storage
    if config.storage.storage_type != "sqlite" {
        return Err(format!("Unknown storage type: {}", config.storage.storage_type).into());
    }
    if let Some(parent) = std::path::Path::new(&config.storage.path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let pool = SqlitePool::connect(&format!("sqlite:{}?mode=rwc", config.storage.path)).await?;

    let store = Arc::new(SqliteOrderStore::new(pool.clone()));
    store.init().await?;
    info!(path = %config.storage.path, "Storage: sqlite");

    // Cache
    let cache_backend = init_cache(&config.cache).await?;
    let cache = ProjectionCache::new(cache_backend, &config.cache);
    info!(cache_type = %config.cache.cache_type, "Cache initialized");

    // Event bus, optionally wrapped in the transactional outbox.
    if config.messaging.messaging_type != "channel" {
        return Err(format!("Unknown messaging type: {}", config.messaging.messaging_type).into());
    }
    let inner: Arc<dyn EventBus> = Arc::new(ChannelEventBus::publisher());

    let (event_bus, outbox_recovery): (Arc<dyn EventBus>, Option<bus::RecoveryTaskHandle>) =
        if config.messaging.outbox.is_enabled() {
            let outbox = Arc::new(SqliteOutboxEventBus::new(
                inner,
                pool.clone(),
                config.messaging.outbox.clone(),
            ));
            outbox.init().await?;
            let handle = bus::spawn_recovery_task(
                outbox.clone(),
                config.messaging.outbox.recovery_interval_secs,
            );
            info!("Outbox enabled");
            (outbox, Some(handle))
        } else {
            (inner, None)
        };

    // Services
    let publish_timeout = config.messaging.publish_timeout();
    let carts = Arc::new(CartManager::new(
        store.clone(),
        cache.clone(),
        config.pricing.clone(),
    ));
    let guard = IdempotencyGuard::new(store.clone(), cache.clone());
    let placement = Arc::new(OrderPlacement::new(
        store.clone(),
        guard,
        event_bus.clone(),
        &config.pricing,
        &config.cache,
        publish_timeout,
    ));
    let tracker = Arc::new(StatusTracker::new(
        store.clone(),
        event_bus,
        publish_timeout,
    ));

    let router = router(AppState {
        carts,
        placement,
        tracker,
    });

    Ok(App {
        router,
        outbox_recovery,
    })
}

//! Outbox pattern wrapper for guaranteed event delivery.
//!
//! `SqliteOutboxEventBus` wraps any `EventBus` implementation and ensures
//! events are persisted before publishing. The flow:
//!
//! 1. Write event to the SQL outbox table
//! 2. Publish to inner bus
//! 3. Delete from outbox on success
//!
//! If step 2 fails, the event remains in the outbox for retry by the
//! background recovery task, closing the gap where an order exists but no
//! consumer ever learns about it.
//!
//! Enable via config or environment: `EXPEDITOR_OUTBOX_ENABLED=true`.

use std::sync::Arc;

use async_trait::async_trait;
use sea_query::{ColumnDef, Expr, Iden, Index, Query, SqliteQueryBuilder, Table};
use sqlx::Row;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{BusError, EventBus, EventHandler, Result};
use crate::domain::DomainEvent;

pub use crate::config::OutboxConfig;

// ============================================================================
// Schema
// ============================================================================

/// Outbox table schema.
#[derive(Iden)]
enum Outbox {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "topic"]
    Topic,
    #[iden = "event_data"]
    EventData,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "retry_count"]
    RetryCount,
}

// ============================================================================
// SQLite Implementation
// ============================================================================

/// Outbox wrapper for SQLite.
pub struct SqliteOutboxEventBus {
    inner: Arc<dyn EventBus>,
    pool: sqlx::SqlitePool,
    config: OutboxConfig,
}

impl SqliteOutboxEventBus {
    /// Create a new outbox-wrapped event bus.
    pub fn new(inner: Arc<dyn EventBus>, pool: sqlx::SqlitePool, config: OutboxConfig) -> Self {
        Self {
            inner,
            pool,
            config,
        }
    }

    /// Initialize the outbox table schema.
    pub async fn init(&self) -> std::result::Result<(), sqlx::Error> {
        let create_table = Table::create()
            .table(Outbox::Table)
            .if_not_exists()
            .col(ColumnDef::new(Outbox::Id).text().primary_key())
            .col(ColumnDef::new(Outbox::Topic).text().not_null())
            .col(ColumnDef::new(Outbox::EventData).text().not_null())
            .col(
                ColumnDef::new(Outbox::CreatedAt)
                    .text()
                    .not_null()
                    .default(Expr::cust("(datetime('now'))")),
            )
            .col(
                ColumnDef::new(Outbox::RetryCount)
                    .integer()
                    .not_null()
                    .default(0),
            )
            .to_string(SqliteQueryBuilder);

        sqlx::query(&create_table).execute(&self.pool).await?;

        // Index for recovery queries
        let create_index = Index::create()
            .if_not_exists()
            .name("idx_outbox_created_at")
            .table(Outbox::Table)
            .col(Outbox::CreatedAt)
            .to_string(SqliteQueryBuilder);

        sqlx::query(&create_index).execute(&self.pool).await?;

        info!("Outbox table initialized (SQLite)");
        Ok(())
    }

    /// Number of events waiting in the outbox.
    pub async fn pending(&self) -> std::result::Result<u32, sqlx::Error> {
        let select = Query::select()
            .expr(Expr::col(Outbox::Id).count())
            .from(Outbox::Table)
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&select).fetch_one(&self.pool).await?;
        let count: i64 = row.get(0);
        Ok(count as u32)
    }

    /// Recover orphaned events (events that were written but not
    /// published). Call this periodically from a background task.
    pub async fn recover_orphaned(&self) -> std::result::Result<u32, sqlx::Error> {
        // Publish normally takes well under a second; anything older than
        // 30 seconds is an orphan.
        let select = Query::select()
            .columns([Outbox::Id, Outbox::EventData, Outbox::RetryCount])
            .from(Outbox::Table)
            .and_where(
                Expr::col(Outbox::CreatedAt).lt(Expr::cust("datetime('now', '-30 seconds')")),
            )
            .and_where(Expr::col(Outbox::RetryCount).lt(self.config.max_retries as i32))
            .limit(100)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&select).fetch_all(&self.pool).await?;

        let mut recovered = 0u32;
        for row in rows {
            let id: String = row.get("id");
            let event_data: String = row.get("event_data");
            let retry_count: i32 = row.get("retry_count");

            match serde_json::from_str::<DomainEvent>(&event_data) {
                Ok(event) => match self.inner.publish(Arc::new(event)).await {
                    Ok(()) => {
                        let delete = Query::delete()
                            .from_table(Outbox::Table)
                            .and_where(Expr::col(Outbox::Id).eq(id.clone()))
                            .to_string(SqliteQueryBuilder);

                        if let Err(e) = sqlx::query(&delete).execute(&self.pool).await {
                            error!(id = %id, error = %e, "Failed to delete recovered event from outbox");
                        } else {
                            recovered += 1;
                            debug!(id = %id, "Recovered orphaned event");
                        }
                    }
                    Err(e) => {
                        warn!(id = %id, retry_count = retry_count + 1, error = %e, "Failed to recover event");
                        let update = Query::update()
                            .table(Outbox::Table)
                            .value(Outbox::RetryCount, retry_count + 1)
                            .and_where(Expr::col(Outbox::Id).eq(id))
                            .to_string(SqliteQueryBuilder);

                        let _ = sqlx::query(&update).execute(&self.pool).await;
                    }
                },
                Err(e) => {
                    error!(id = %id, error = %e, "Failed to decode orphaned event, removing from outbox");
                    let delete = Query::delete()
                        .from_table(Outbox::Table)
                        .and_where(Expr::col(Outbox::Id).eq(id))
                        .to_string(SqliteQueryBuilder);

                    let _ = sqlx::query(&delete).execute(&self.pool).await;
                }
            }
        }

        if recovered > 0 {
            info!(recovered, "Recovered orphaned events from outbox");
        }

        Ok(recovered)
    }
}

#[async_trait]
impl EventBus for SqliteOutboxEventBus {
    async fn publish(&self, event: Arc<DomainEvent>) -> Result<()> {
        let id = Uuid::new_v4();
        let topic = event.topic();
        let event_data = serde_json::to_string(&*event)?;

        // Step 1: Write to outbox
        let insert = Query::insert()
            .into_table(Outbox::Table)
            .columns([Outbox::Id, Outbox::Topic, Outbox::EventData])
            .values_panic([id.to_string().into(), topic.into(), event_data.into()])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&insert)
            .execute(&self.pool)
            .await
            .map_err(|e| BusError::Publish(format!("Outbox insert failed: {}", e)))?;

        debug!(id = %id, topic, "Event written to outbox");

        // Step 2: Publish to inner bus
        let result = self.inner.publish(event).await;

        // Step 3: Delete from outbox on success
        if result.is_ok() {
            let delete = Query::delete()
                .from_table(Outbox::Table)
                .and_where(Expr::col(Outbox::Id).eq(id.to_string()))
                .to_string(SqliteQueryBuilder);

            if let Err(e) = sqlx::query(&delete).execute(&self.pool).await {
                // Event was published; recovery will clean the row up.
                warn!(id = %id, error = %e, "Failed to delete from outbox after successful publish");
            } else {
                debug!(id = %id, "Event removed from outbox after successful publish");
            }
        } else {
            debug!(id = %id, "Publish failed, event remains in outbox for recovery");
        }

        result
    }

    async fn subscribe(&self, handler: Box<dyn EventHandler>) -> Result<()> {
        self.inner.subscribe(handler).await
    }

    async fn start_consuming(&self) -> Result<()> {
        self.inner.start_consuming().await
    }
}

// ============================================================================
// Background Recovery Task
// ============================================================================

/// Handle to a running recovery task.
pub struct RecoveryTaskHandle {
    cancel: tokio::sync::watch::Sender<bool>,
}

impl RecoveryTaskHandle {
    /// Signal the recovery task to stop.
    pub fn stop(&self) {
        let _ = self.cancel.send(true);
    }
}

/// Spawn a background task that periodically recovers orphaned events.
///
/// Returns a handle that can be used to stop the task.
pub fn spawn_recovery_task(
    outbox: Arc<SqliteOutboxEventBus>,
    interval_secs: u64,
) -> RecoveryTaskHandle {
    let (cancel_tx, mut cancel_rx) = tokio::sync::watch::channel(false);

    tokio::spawn(async move {
        let interval = std::time::Duration::from_secs(interval_secs);
        info!(interval_secs, "Outbox recovery task started");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    if let Err(e) = outbox.recover_orphaned().await {
                        error!(error = %e, "Outbox recovery failed");
                    }
                }
                _ = cancel_rx.changed() => {
                    if *cancel_rx.borrow() {
                        info!("Outbox recovery task stopped");
                        break;
                    }
                }
            }
        }
    });

    RecoveryTaskHandle { cancel: cancel_tx }
}

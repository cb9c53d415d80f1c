//! SQLite OrderStore implementation.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_query::{Expr, Order as SortOrder, Query, SqliteQueryBuilder};
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::domain::{Cart, CartItem, IdempotencyRecord, Order, OrderItem, OrderStatus, StatusEntry};
use crate::storage::schema::{
    CartItems, Carts, OrderIdempotencyKeys, OrderItems, OrderStatusHistory, Orders, CREATE_TABLES,
};
use crate::storage::{OrderStore, Result, StorageError};

/// SQLite implementation of OrderStore.
pub struct SqliteOrderStore {
    pool: SqlitePool,
}

impl SqliteOrderStore {
    /// Create a new SQLite order store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the schema.
    pub async fn init(&self) -> Result<()> {
        for statement in CREATE_TABLES {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn insert_cart_items(
        conn: &mut SqliteConnection,
        cart_id: &str,
        items: &[CartItem],
    ) -> Result<()> {
        for item in items {
            let query = Query::insert()
                .into_table(CartItems::Table)
                .columns([
                    CartItems::CartId,
                    CartItems::MenuItemId,
                    CartItems::Name,
                    CartItems::Quantity,
                    CartItems::UnitPrice,
                    CartItems::TotalPrice,
                    CartItems::Modifiers,
                ])
                .values_panic([
                    cart_id.into(),
                    item.menu_item_id.to_string().into(),
                    item.name.clone().into(),
                    (item.quantity as i64).into(),
                    item.unit_price.to_string().into(),
                    item.total_price.to_string().into(),
                    item.modifiers.to_string().into(),
                ])
                .to_string(SqliteQueryBuilder);

            sqlx::query(&query).execute(&mut *conn).await?;
        }
        Ok(())
    }

    async fn insert_order_tx(
        conn: &mut SqliteConnection,
        order: &Order,
        key: &IdempotencyRecord,
    ) -> Result<()> {
        let query = Query::insert()
            .into_table(Orders::Table)
            .columns([
                Orders::Id,
                Orders::CustomerId,
                Orders::RestaurantId,
                Orders::Subtotal,
                Orders::Tax,
                Orders::DeliveryFee,
                Orders::ServiceFee,
                Orders::Total,
                Orders::Status,
                Orders::DeliveryAddress,
                Orders::SpecialInstructions,
                Orders::IdempotencyKey,
                Orders::CreatedAt,
                Orders::DeliveredAt,
            ])
            .values_panic([
                order.id.to_string().into(),
                order.customer_id.map(|id| id.to_string()).into(),
                order.restaurant_id.to_string().into(),
                order.subtotal.to_string().into(),
                order.tax.to_string().into(),
                order.delivery_fee.to_string().into(),
                order.service_fee.to_string().into(),
                order.total.to_string().into(),
                order.status.as_str().into(),
                order.delivery_address.clone().into(),
                order.special_instructions.clone().into(),
                order.idempotency_key.clone().into(),
                order.created_at.to_rfc3339().into(),
                order.delivered_at.map(|t| t.to_rfc3339()).into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&mut *conn).await?;

        for (position, item) in order.items.iter().enumerate() {
            let query = Query::insert()
                .into_table(OrderItems::Table)
                .columns([
                    OrderItems::OrderId,
                    OrderItems::Position,
                    OrderItems::MenuItemId,
                    OrderItems::Name,
                    OrderItems::Quantity,
                    OrderItems::UnitPrice,
                    OrderItems::TotalPrice,
                    OrderItems::Modifiers,
                ])
                .values_panic([
                    order.id.to_string().into(),
                    (position as i64).into(),
                    item.menu_item_id.to_string().into(),
                    item.name.clone().into(),
                    (item.quantity as i64).into(),
                    item.unit_price.to_string().into(),
                    item.total_price.to_string().into(),
                    item.modifiers.to_string().into(),
                ])
                .to_string(SqliteQueryBuilder);

            sqlx::query(&query).execute(&mut *conn).await?;
        }

        for entry in &order.history {
            Self::insert_history_row(
                conn,
                order.id,
                entry.status,
                entry.notes.as_deref(),
                entry.changed_at,
            )
            .await?;
        }

        let query = Query::insert()
            .into_table(OrderIdempotencyKeys::Table)
            .columns([
                OrderIdempotencyKeys::Key,
                OrderIdempotencyKeys::OrderId,
                OrderIdempotencyKeys::CreatedAt,
                OrderIdempotencyKeys::ExpiresAt,
            ])
            .values_panic([
                key.key.clone().into(),
                key.order_id.to_string().into(),
                key.created_at.to_rfc3339().into(),
                key.expires_at.to_rfc3339().into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query)
            .execute(&mut *conn)
            .await
            .map_err(|e| conflict_on_unique(e, &key.key))?;

        Ok(())
    }

    async fn insert_history_row(
        conn: &mut SqliteConnection,
        order_id: Uuid,
        status: OrderStatus,
        notes: Option<&str>,
        changed_at: DateTime<Utc>,
    ) -> Result<()> {
        let query = Query::insert()
            .into_table(OrderStatusHistory::Table)
            .columns([
                OrderStatusHistory::OrderId,
                OrderStatusHistory::Status,
                OrderStatusHistory::Notes,
                OrderStatusHistory::ChangedAt,
            ])
            .values_panic([
                order_id.to_string().into(),
                status.as_str().into(),
                notes.map(|n| n.to_string()).into(),
                changed_at.to_rfc3339().into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&mut *conn).await?;
        Ok(())
    }

    async fn fetch_cart_items(&self, cart_id: &str) -> Result<Vec<CartItem>> {
        let query = Query::select()
            .columns([
                CartItems::MenuItemId,
                CartItems::Name,
                CartItems::Quantity,
                CartItems::UnitPrice,
                CartItems::TotalPrice,
                CartItems::Modifiers,
            ])
            .from(CartItems::Table)
            .and_where(Expr::col(CartItems::CartId).eq(cart_id))
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let menu_item_id: String = row.get("menu_item_id");
            let quantity: i64 = row.get("quantity");
            items.push(CartItem {
                menu_item_id: Uuid::parse_str(&menu_item_id)?,
                name: row.get("name"),
                quantity: quantity as u32,
                unit_price: parse_decimal(&row.get::<String, _>("unit_price"), "unit_price")?,
                total_price: parse_decimal(&row.get::<String, _>("total_price"), "total_price")?,
                modifiers: parse_json(&row.get::<String, _>("modifiers"), "modifiers")?,
            });
        }
        Ok(items)
    }
}

#[async_trait]
impl OrderStore for SqliteOrderStore {
    async fn insert_cart(&self, cart: &Cart) -> Result<()> {
        let query = Query::insert()
            .into_table(Carts::Table)
            .columns([
                Carts::Id,
                Carts::CustomerId,
                Carts::RestaurantId,
                Carts::Subtotal,
                Carts::Tax,
                Carts::DeliveryFee,
                Carts::Total,
                Carts::UpdatedAt,
            ])
            .values_panic([
                cart.id.to_string().into(),
                cart.customer_id.map(|id| id.to_string()).into(),
                cart.restaurant_id.map(|id| id.to_string()).into(),
                cart.subtotal.to_string().into(),
                cart.tax.to_string().into(),
                cart.delivery_fee.to_string().into(),
                cart.total.to_string().into(),
                cart.updated_at.to_rfc3339().into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn fetch_cart(&self, cart_id: Uuid) -> Result<Option<Cart>> {
        let cart_id_str = cart_id.to_string();

        let query = Query::select()
            .columns([
                Carts::CustomerId,
                Carts::RestaurantId,
                Carts::Subtotal,
                Carts::Tax,
                Carts::DeliveryFee,
                Carts::Total,
                Carts::UpdatedAt,
            ])
            .from(Carts::Table)
            .and_where(Expr::col(Carts::Id).eq(&cart_id_str))
            .to_string(SqliteQueryBuilder);

        let row = match sqlx::query(&query).fetch_optional(&self.pool).await? {
            Some(row) => row,
            None => return Ok(None),
        };

        let customer_id: Option<String> = row.get("customer_id");
        let restaurant_id: Option<String> = row.get("restaurant_id");

        Ok(Some(Cart {
            id: cart_id,
            customer_id: customer_id.map(|s| Uuid::parse_str(&s)).transpose()?,
            restaurant_id: restaurant_id.map(|s| Uuid::parse_str(&s)).transpose()?,
            items: self.fetch_cart_items(&cart_id_str).await?,
            subtotal: parse_decimal(&row.get::<String, _>("subtotal"), "subtotal")?,
            tax: parse_decimal(&row.get::<String, _>("tax"), "tax")?,
            delivery_fee: parse_decimal(&row.get::<String, _>("delivery_fee"), "delivery_fee")?,
            total: parse_decimal(&row.get::<String, _>("total"), "total")?,
            updated_at: parse_timestamp(&row.get::<String, _>("updated_at"), "updated_at")?,
        }))
    }

    async fn update_cart(&self, cart: &Cart) -> Result<()> {
        let cart_id_str = cart.id.to_string();

        // BEGIN IMMEDIATE acquires the write lock upfront, preventing
        // deadlocks when concurrent DEFERRED transactions race to upgrade
        // from shared to exclusive.
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let result = async {
            let query = Query::update()
                .table(Carts::Table)
                .value(Carts::CustomerId, cart.customer_id.map(|id| id.to_string()))
                .value(
                    Carts::RestaurantId,
                    cart.restaurant_id.map(|id| id.to_string()),
                )
                .value(Carts::Subtotal, cart.subtotal.to_string())
                .value(Carts::Tax, cart.tax.to_string())
                .value(Carts::DeliveryFee, cart.delivery_fee.to_string())
                .value(Carts::Total, cart.total.to_string())
                .value(Carts::UpdatedAt, cart.updated_at.to_rfc3339())
                .and_where(Expr::col(Carts::Id).eq(&cart_id_str))
                .to_string(SqliteQueryBuilder);

            sqlx::query(&query).execute(&mut *conn).await?;

            // Replace the item lines wholesale; the (cart_id, menu_item_id)
            // uniqueness falls out of the in-memory merge.
            let delete = Query::delete()
                .from_table(CartItems::Table)
                .and_where(Expr::col(CartItems::CartId).eq(&cart_id_str))
                .to_string(SqliteQueryBuilder);

            sqlx::query(&delete).execute(&mut *conn).await?;

            Self::insert_cart_items(&mut conn, &cart_id_str, &cart.items).await
        }
        .await;

        match result {
            Ok(()) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
                Ok(())
            }
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                Err(e)
            }
        }
    }

    async fn insert_order(&self, order: &Order, key: &IdempotencyRecord) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let result = Self::insert_order_tx(&mut conn, order, key).await;

        match result {
            Ok(()) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
                Ok(())
            }
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                Err(e)
            }
        }
    }

    async fn fetch_order(&self, order_id: Uuid) -> Result<Option<Order>> {
        let order_id_str = order_id.to_string();

        let query = Query::select()
            .columns([
                Orders::CustomerId,
                Orders::RestaurantId,
                Orders::Subtotal,
                Orders::Tax,
                Orders::DeliveryFee,
                Orders::ServiceFee,
                Orders::Total,
                Orders::Status,
                Orders::DeliveryAddress,
                Orders::SpecialInstructions,
                Orders::IdempotencyKey,
                Orders::CreatedAt,
                Orders::DeliveredAt,
            ])
            .from(Orders::Table)
            .and_where(Expr::col(Orders::Id).eq(&order_id_str))
            .to_string(SqliteQueryBuilder);

        let row = match sqlx::query(&query).fetch_optional(&self.pool).await? {
            Some(row) => row,
            None => return Ok(None),
        };

        let items_query = Query::select()
            .columns([
                OrderItems::MenuItemId,
                OrderItems::Name,
                OrderItems::Quantity,
                OrderItems::UnitPrice,
                OrderItems::TotalPrice,
                OrderItems::Modifiers,
            ])
            .from(OrderItems::Table)
            .and_where(Expr::col(OrderItems::OrderId).eq(&order_id_str))
            .order_by(OrderItems::Position, SortOrder::Asc)
            .to_string(SqliteQueryBuilder);

        let item_rows = sqlx::query(&items_query).fetch_all(&self.pool).await?;

        let mut items = Vec::with_capacity(item_rows.len());
        for item_row in item_rows {
            let menu_item_id: String = item_row.get("menu_item_id");
            let quantity: i64 = item_row.get("quantity");
            items.push(OrderItem {
                menu_item_id: Uuid::parse_str(&menu_item_id)?,
                name: item_row.get("name"),
                quantity: quantity as u32,
                unit_price: parse_decimal(&item_row.get::<String, _>("unit_price"), "unit_price")?,
                total_price: parse_decimal(
                    &item_row.get::<String, _>("total_price"),
                    "total_price",
                )?,
                modifiers: parse_json(&item_row.get::<String, _>("modifiers"), "modifiers")?,
            });
        }

        let history_query = Query::select()
            .columns([
                OrderStatusHistory::Status,
                OrderStatusHistory::Notes,
                OrderStatusHistory::ChangedAt,
            ])
            .from(OrderStatusHistory::Table)
            .and_where(Expr::col(OrderStatusHistory::OrderId).eq(&order_id_str))
            .order_by(OrderStatusHistory::Id, SortOrder::Asc)
            .to_string(SqliteQueryBuilder);

        let history_rows = sqlx::query(&history_query).fetch_all(&self.pool).await?;

        let mut history = Vec::with_capacity(history_rows.len());
        for history_row in history_rows {
            history.push(StatusEntry {
                status: parse_status(&history_row.get::<String, _>("status"))?,
                notes: history_row.get("notes"),
                changed_at: parse_timestamp(
                    &history_row.get::<String, _>("changed_at"),
                    "changed_at",
                )?,
            });
        }

        let customer_id: Option<String> = row.get("customer_id");
        let restaurant_id: String = row.get("restaurant_id");
        let delivered_at: Option<String> = row.get("delivered_at");

        Ok(Some(Order {
            id: order_id,
            customer_id: customer_id.map(|s| Uuid::parse_str(&s)).transpose()?,
            restaurant_id: Uuid::parse_str(&restaurant_id)?,
            items,
            subtotal: parse_decimal(&row.get::<String, _>("subtotal"), "subtotal")?,
            tax: parse_decimal(&row.get::<String, _>("tax"), "tax")?,
            delivery_fee: parse_decimal(&row.get::<String, _>("delivery_fee"), "delivery_fee")?,
            service_fee: parse_decimal(&row.get::<String, _>("service_fee"), "service_fee")?,
            total: parse_decimal(&row.get::<String, _>("total"), "total")?,
            status: parse_status(&row.get::<String, _>("status"))?,
            delivery_address: row.get("delivery_address"),
            special_instructions: row.get("special_instructions"),
            idempotency_key: row.get("idempotency_key"),
            created_at: parse_timestamp(&row.get::<String, _>("created_at"), "created_at")?,
            delivered_at: delivered_at
                .map(|s| parse_timestamp(&s, "delivered_at"))
                .transpose()?,
            history,
        }))
    }

    async fn find_idempotency_key(&self, key: &str) -> Result<Option<Uuid>> {
        let query = Query::select()
            .column(OrderIdempotencyKeys::OrderId)
            .from(OrderIdempotencyKeys::Table)
            .and_where(Expr::col(OrderIdempotencyKeys::Key).eq(key))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;

        match row {
            Some(row) => {
                let order_id: String = row.get("order_id");
                Ok(Some(Uuid::parse_str(&order_id)?))
            }
            None => Ok(None),
        }
    }

    async fn append_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
        notes: Option<&str>,
        changed_at: DateTime<Utc>,
        delivered_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let result = async {
            let mut update = Query::update();
            update
                .table(Orders::Table)
                .value(Orders::Status, status.as_str())
                .and_where(Expr::col(Orders::Id).eq(order_id.to_string()));
            if let Some(delivered) = delivered_at {
                update.value(Orders::DeliveredAt, delivered.to_rfc3339());
            }
            let query = update.to_string(SqliteQueryBuilder);

            sqlx::query(&query).execute(&mut *conn).await?;

            Self::insert_history_row(&mut conn, order_id, status, notes, changed_at).await
        }
        .await;

        match result {
            Ok(()) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
                Ok(())
            }
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                Err(e)
            }
        }
    }
}

fn conflict_on_unique(err: sqlx::Error, key: &str) -> StorageError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict {
            key: key.to_string(),
        },
        _ => StorageError::Database(err),
    }
}

fn parse_decimal(raw: &str, column: &str) -> Result<Decimal> {
    Decimal::from_str(raw)
        .map_err(|e| StorageError::Corrupt(format!("column {}: {}", column, e)))
}

fn parse_timestamp(raw: &str, column: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupt(format!("column {}: {}", column, e)))
}

fn parse_status(raw: &str) -> Result<OrderStatus> {
    raw.parse().map_err(StorageError::Corrupt)
}

fn parse_json(raw: &str, column: &str) -> Result<serde_json::Value> {
    serde_json::from_str(raw)
        .map_err(|e| StorageError::Corrupt(format!("column {}: {}", column, e)))
}

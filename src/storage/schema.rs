//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query
//! building. Money columns are stored as decimal strings, timestamps as
//! RFC 3339 text, and modifiers as serialized JSON.

use sea_query::Iden;

/// Carts table schema.
#[derive(Iden)]
pub enum Carts {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "customer_id"]
    CustomerId,
    #[iden = "restaurant_id"]
    RestaurantId,
    #[iden = "subtotal"]
    Subtotal,
    #[iden = "tax"]
    Tax,
    #[iden = "delivery_fee"]
    DeliveryFee,
    #[iden = "total"]
    Total,
    #[iden = "updated_at"]
    UpdatedAt,
}

/// Cart items table schema. Unique per `(cart_id, menu_item_id)`.
#[derive(Iden)]
pub enum CartItems {
    Table,
    #[iden = "cart_id"]
    CartId,
    #[iden = "menu_item_id"]
    MenuItemId,
    #[iden = "name"]
    Name,
    #[iden = "quantity"]
    Quantity,
    #[iden = "unit_price"]
    UnitPrice,
    #[iden = "total_price"]
    TotalPrice,
    #[iden = "modifiers"]
    Modifiers,
}

/// Orders table schema.
#[derive(Iden)]
pub enum Orders {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "customer_id"]
    CustomerId,
    #[iden = "restaurant_id"]
    RestaurantId,
    #[iden = "subtotal"]
    Subtotal,
    #[iden = "tax"]
    Tax,
    #[iden = "delivery_fee"]
    DeliveryFee,
    #[iden = "service_fee"]
    ServiceFee,
    #[iden = "total"]
    Total,
    #[iden = "status"]
    Status,
    #[iden = "delivery_address"]
    DeliveryAddress,
    #[iden = "special_instructions"]
    SpecialInstructions,
    #[iden = "idempotency_key"]
    IdempotencyKey,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "delivered_at"]
    DeliveredAt,
}

/// Order items table schema. `position` preserves the snapshot order.
#[derive(Iden)]
pub enum OrderItems {
    Table,
    #[iden = "order_id"]
    OrderId,
    #[iden = "position"]
    Position,
    #[iden = "menu_item_id"]
    MenuItemId,
    #[iden = "name"]
    Name,
    #[iden = "quantity"]
    Quantity,
    #[iden = "unit_price"]
    UnitPrice,
    #[iden = "total_price"]
    TotalPrice,
    #[iden = "modifiers"]
    Modifiers,
}

/// Append-only status history table schema.
#[derive(Iden)]
pub enum OrderStatusHistory {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "order_id"]
    OrderId,
    #[iden = "status"]
    Status,
    #[iden = "notes"]
    Notes,
    #[iden = "changed_at"]
    ChangedAt,
}

/// Idempotency key table schema. `key` is globally unique.
#[derive(Iden)]
pub enum OrderIdempotencyKeys {
    Table,
    #[iden = "key"]
    Key,
    #[iden = "order_id"]
    OrderId,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "expires_at"]
    ExpiresAt,
}

/// SQL statements for creating the order pipeline tables.
pub const CREATE_TABLES: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS carts (
    id TEXT PRIMARY KEY,
    customer_id TEXT,
    restaurant_id TEXT,
    subtotal TEXT NOT NULL,
    tax TEXT NOT NULL,
    delivery_fee TEXT NOT NULL,
    total TEXT NOT NULL,
    updated_at TEXT NOT NULL
)"#,
    r#"
CREATE TABLE IF NOT EXISTS cart_items (
    cart_id TEXT NOT NULL,
    menu_item_id TEXT NOT NULL,
    name TEXT NOT NULL,
    quantity INTEGER NOT NULL,
    unit_price TEXT NOT NULL,
    total_price TEXT NOT NULL,
    modifiers TEXT NOT NULL,
    PRIMARY KEY (cart_id, menu_item_id)
)"#,
    r#"
CREATE TABLE IF NOT EXISTS orders (
    id TEXT PRIMARY KEY,
    customer_id TEXT,
    restaurant_id TEXT NOT NULL,
    subtotal TEXT NOT NULL,
    tax TEXT NOT NULL,
    delivery_fee TEXT NOT NULL,
    service_fee TEXT NOT NULL,
    total TEXT NOT NULL,
    status TEXT NOT NULL,
    delivery_address TEXT NOT NULL,
    special_instructions TEXT,
    idempotency_key TEXT,
    created_at TEXT NOT NULL,
    delivered_at TEXT
)"#,
    r#"
CREATE TABLE IF NOT EXISTS order_items (
    order_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    menu_item_id TEXT NOT NULL,
    name TEXT NOT NULL,
    quantity INTEGER NOT NULL,
    unit_price TEXT NOT NULL,
    total_price TEXT NOT NULL,
    modifiers TEXT NOT NULL,
    PRIMARY KEY (order_id, position)
)"#,
    r#"
CREATE TABLE IF NOT EXISTS order_status_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    order_id TEXT NOT NULL,
    status TEXT NOT NULL,
    notes TEXT,
    changed_at TEXT NOT NULL
)"#,
    r#"
CREATE INDEX IF NOT EXISTS idx_status_history_order ON order_status_history(order_id)"#,
    r#"
CREATE TABLE IF NOT EXISTS order_idempotency_keys (
    key TEXT PRIMARY KEY,
    order_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL
)"#,
];

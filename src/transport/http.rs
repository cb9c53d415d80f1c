//! Request handlers and wire types.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::AppState;
use crate::domain::{Cart, Order, OrderStatus};
use crate::services::{NewCartItem, PlaceOrder, ServiceError};

#[derive(Debug, Default, Deserialize)]
pub struct CreateCartRequest {
    pub customer_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct CreateCartResponse {
    pub cart_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub menu_item_id: Uuid,
    pub restaurant_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub options: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub cart_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub delivery_address: String,
    pub special_instructions: Option<String>,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlaceOrderResponse {
    pub order_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

pub async fn create_cart(
    State(state): State<AppState>,
    body: Option<Json<CreateCartRequest>>,
) -> Result<Json<CreateCartResponse>, ServiceError> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let cart_id = state.carts.create_cart(request.customer_id).await?;
    Ok(Json(CreateCartResponse { cart_id }))
}

pub async fn get_cart(
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
) -> Result<Json<Cart>, ServiceError> {
    let cart = state.carts.get_cart(cart_id).await?;
    Ok(Json(cart))
}

pub async fn add_item(
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<Cart>, ServiceError> {
    let cart = state
        .carts
        .add_item(
            cart_id,
            NewCartItem {
                menu_item_id: request.menu_item_id,
                restaurant_id: request.restaurant_id,
                name: request.name,
                unit_price: request.price,
                quantity: request.quantity,
                modifiers: request.options.unwrap_or(Value::Null),
            },
        )
        .await?;
    Ok(Json(cart))
}

pub async fn place_order(
    State(state): State<AppState>,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<Json<PlaceOrderResponse>, ServiceError> {
    let order_id = state
        .placement
        .place(PlaceOrder {
            cart_id: request.cart_id,
            customer_id: request.customer_id,
            delivery_address: request.delivery_address,
            special_instructions: request.special_instructions,
            idempotency_key: request.idempotency_key,
        })
        .await?;
    Ok(Json(PlaceOrderResponse { order_id }))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, ServiceError> {
    let order = state.placement.get_order(order_id).await?;
    Ok(Json(order))
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<StatusCode, ServiceError> {
    state
        .tracker
        .update_status(order_id, request.status, request.notes)
        .await?;
    Ok(StatusCode::OK)
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            ServiceError::CartNotFound(_) | ServiceError::OrderNotFound(_) => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            ServiceError::CartEmpty(_)
            | ServiceError::RestaurantNotSet(_)
            | ServiceError::InvalidQuantity => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_state"),
            ServiceError::RestaurantMismatch { .. }
            | ServiceError::InvalidTransition { .. }
            | ServiceError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            ServiceError::Storage(_) => (StatusCode::SERVICE_UNAVAILABLE, "upstream_unavailable"),
        };

        let body = ErrorBody {
            error,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

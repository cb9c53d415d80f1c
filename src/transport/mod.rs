//! HTTP transport for the order pipeline.

mod http;

use std::sync::Arc;

use axum::routing::{get, patch, post};
use axum::Router;

use crate::services::{CartManager, OrderPlacement, StatusTracker};

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub carts: Arc<CartManager>,
    pub placement: Arc<OrderPlacement>,
    pub tracker: Arc<StatusTracker>,
}

/// Build the HTTP router over the pipeline services.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/carts", post(http::create_cart))
        .route("/carts/:cart_id", get(http::get_cart))
        .route("/carts/:cart_id/items", post(http::add_item))
        .route("/orders", post(http::place_order))
        .route("/orders/:order_id", get(http::get_order))
        .route("/orders/:order_id/status", patch(http::update_status))
        .with_state(state)
}

//! Route definitions for the parking API

use axum::{
    routing::{get, post},
    Router,
};

use crate::app_state::AppState;
use crate::handlers::*;
use crate::stream::stream_feed;

/// Assemble the full application router
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(lot_routes())
        .merge(payment_routes())
        .merge(reservation_routes())
        .merge(telemetry_routes())
        .with_state(state)
}

// Lot routes
pub fn lot_routes() -> Router<AppState> {
    Router::new()
        .route("/api/lots", get(list_lots))
        .route("/api/lots/:lot_id/spots", get(list_spots))
        .route("/api/lots/:lot_id/metrics", get(lot_metrics))
}

// Payment routes
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/api/pay/upi-intent", post(create_upi_intent))
        .route("/api/pay/intent/:id", get(get_intent_status))
}

// Reservation routes
pub fn reservation_routes() -> Router<AppState> {
    Router::new()
        .route("/api/reserve", post(reserve))
        .route("/api/release", post(release))
        .route("/api/reservations", get(list_reservations))
        .route("/api/history", get(reservation_history))
}

// Telemetry routes
pub fn telemetry_routes() -> Router<AppState> {
    Router::new()
        .route("/api/status", get(fleet_status))
        .route("/api/stream", get(stream_feed))
}

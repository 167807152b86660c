//! API handlers for the parking backend

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::{
    ActiveReservation, ApiResponse, CompletedReservation, CreateIntentRequest,
    CreateIntentResponse, FleetStatus, IntentStatusResponse, LotAvailability, LotMetrics,
    ReleaseRequest, Reservation, ReserveRequest, Spot,
};

pub async fn root() -> &'static str {
    "Parkstation API Server"
}

pub async fn health_check() -> &'static str {
    "OK"
}

/// List lots with live availability
pub async fn list_lots(State(state): State<AppState>) -> Json<ApiResponse<Vec<LotAvailability>>> {
    let inner = state.store.lock().await;
    Json(ApiResponse::ok(inner.lots_with_availability()))
}

/// List spots of a lot
pub async fn list_spots(
    State(state): State<AppState>,
    Path(lot_id): Path<u32>,
) -> Json<ApiResponse<Vec<Spot>>> {
    let inner = state.store.lock().await;
    Json(ApiResponse::ok(inner.spots_for_lot(lot_id)))
}

/// Create a UPI payment intent
pub async fn create_upi_intent(
    State(state): State<AppState>,
    Json(request): Json<CreateIntentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreateIntentResponse>>), ApiError> {
    let response = state.payment_service.create_intent(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(response))))
}

/// Poll a payment intent's status
pub async fn get_intent_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<IntentStatusResponse>>, ApiError> {
    let status = state.payment_service.intent_status(id).await?;
    Ok(Json(ApiResponse::ok(status)))
}

/// Reserve a spot with advance payment
pub async fn reserve(
    State(state): State<AppState>,
    Json(request): Json<ReserveRequest>,
) -> Result<Json<ApiResponse<Reservation>>, ApiError> {
    let reservation = state.reservation_service.reserve(request).await?;
    Ok(Json(ApiResponse::ok(reservation)))
}

/// Release a spot (checkout)
pub async fn release(
    State(state): State<AppState>,
    Json(request): Json<ReleaseRequest>,
) -> Result<Json<ApiResponse<Reservation>>, ApiError> {
    let reservation = state
        .reservation_service
        .release(request.reservation_id)
        .await?;
    Ok(Json(ApiResponse::ok(reservation)))
}

/// All active reservations
pub async fn list_reservations(
    State(state): State<AppState>,
) -> Json<ApiResponse<Vec<ActiveReservation>>> {
    Json(ApiResponse::ok(state.reservation_service.list_active().await))
}

/// Completed reservation history
pub async fn reservation_history(
    State(state): State<AppState>,
) -> Json<ApiResponse<Vec<CompletedReservation>>> {
    Json(ApiResponse::ok(state.reservation_service.history().await))
}

/// Fleet-wide sensor status
pub async fn fleet_status(State(state): State<AppState>) -> Json<ApiResponse<FleetStatus>> {
    let inner = state.store.lock().await;
    Json(ApiResponse::ok(inner.fleet_status()))
}

/// Per-lot sensor aggregates
pub async fn lot_metrics(
    State(state): State<AppState>,
    Path(lot_id): Path<u32>,
) -> Result<Json<ApiResponse<LotMetrics>>, ApiError> {
    let inner = state.store.lock().await;
    let metrics = inner
        .lot_metrics(lot_id)
        .ok_or_else(|| ApiError::NotFound("Lot".to_string()))?;
    Ok(Json(ApiResponse::ok(metrics)))
}

//! Data models for the parking backend

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Parking lot, immutable after startup
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lot {
    pub id: u32,
    pub name: String,
    pub total_spots: u32,
    pub price_per_hour: i64,
    pub icon: String,
}

/// Lot joined with live occupancy counts
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LotAvailability {
    #[serde(flatten)]
    pub lot: Lot,
    pub available_spots: u32,
    pub occupied_spots: u32,
}

/// One physical parking spot with its sensor telemetry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Spot {
    pub id: String, // "{lot_id}-{spot_number}"
    pub lot_id: u32,
    pub spot_number: u32,
    pub is_occupied: bool,
    pub battery: f64,
    pub signal: f64,
    pub temp_c: f64,
    pub distance_cm: f64,
    pub sensor_healthy: bool,
    /// Debounce flag for the low-battery alert; not part of the wire format
    #[serde(skip)]
    pub low_battery_warned: bool,
    pub last_seen: DateTime<Utc>,
}

/// Payment intent status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IntentStatus {
    Pending,
    Paid,
    Expired,
}

/// Advance-payment intent preceding a UPI reservation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub id: Uuid,
    pub method: String,
    pub status: IntentStatus,
    pub lot_id: u32,
    pub vehicle_number: String,
    pub reserved_hours: u32,
    pub amount: i64,
    pub upi_uri: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Settled payment attached to a reservation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub method: String,
    pub status: String,
    pub amount: i64,
    pub paid_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent_id: Option<Uuid>,
}

/// Reservation status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Active,
    Completed,
}

/// Reservation binding a vehicle to a spot for a paid duration
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: Uuid,
    pub spot_id: String,
    pub lot_id: u32,
    pub spot_number: u32,
    pub vehicle_number: String,
    pub check_in_time: DateTime<Utc>,
    pub check_out_time: Option<DateTime<Utc>>,
    pub status: ReservationStatus,
    pub fee: i64,
    pub prepaid_amount: i64,
    pub reserved_hours: u32,
    pub extra_due: i64,
    pub refund_due: i64,
    pub payment: Payment,
}

/// Active reservation joined with lot name and rate
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveReservation {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub lot_name: String,
    pub price_per_hour: i64,
}

/// Completed reservation joined with lot name
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedReservation {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub lot_name: String,
}

/// Domain event emitted by the telemetry simulator
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEvent {
    pub id: u64,
    pub ts: DateTime<Utc>,
    pub lot_id: u32,
    pub spot_number: u32,
    #[serde(flatten)]
    pub kind: EventKind,
}

/// Event payload variants; the tag matches the original feed's `type` field
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    #[serde(rename_all = "camelCase")]
    Occupancy { is_occupied: bool },
    BatteryLow { battery: i64 },
    Sensor { healthy: bool },
}

/// Fleet-wide sensor status
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetStatus {
    pub last_update_at: DateTime<Utc>,
    pub total_spots: usize,
    pub occupied_spots: usize,
    pub avg_battery: f64,
    pub unhealthy_sensors: usize,
}

/// Per-lot sensor aggregates
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LotMetrics {
    pub total: usize,
    pub occupied: usize,
    pub unhealthy: usize,
    pub avg_battery: f64,
    pub avg_signal: f64,
    pub avg_temp: f64,
}

/// Per-lot summary row pushed on the live stream
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LotSummary {
    pub id: u32,
    pub name: String,
    #[serde(flatten)]
    pub metrics: LotMetrics,
}

/// Payload of one `iot` stream message
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamPayload {
    pub last_update_at: DateTime<Utc>,
    pub lots: Vec<LotSummary>,
    pub events: Vec<TelemetryEvent>,
}

// ===== Request / response DTOs =====

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentRequest {
    pub lot_id: u32,
    #[validate(length(min = 1, message = "vehicle number required"))]
    pub vehicle_number: String,
    #[validate(range(min = 1, message = "reserved hours must be >= 1"))]
    pub reserved_hours: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentResponse {
    pub intent_id: Uuid,
    pub upi_uri: String,
    pub amount: i64,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentStatusResponse {
    pub id: Uuid,
    pub status: IntentStatus,
    pub method: String,
    pub amount: i64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReserveRequest {
    pub lot_id: u32,
    #[validate(length(min = 1, message = "vehicle number required"))]
    pub vehicle_number: String,
    #[validate(range(min = 1, message = "reserved hours must be >= 1"))]
    pub reserved_hours: u32,
    pub payment_method: Option<String>,
    pub intent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseRequest {
    pub reservation_id: Uuid,
}

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

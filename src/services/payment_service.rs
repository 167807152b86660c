//! Payment intent ledger - UPI advance payments
//!
//! Intents settle on a fixed timer as a demo stand-in for a gateway
//! webhook; settlement is idempotent and never touches a non-pending
//! intent.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use tokio::time::{sleep, Duration};
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::models::{
    CreateIntentRequest, CreateIntentResponse, IntentStatus, IntentStatusResponse, PaymentIntent,
};
use crate::store::ParkingStore;

const AUTO_SETTLE_DELAY: Duration = Duration::from_secs(8);
const INTENT_TTL_MINUTES: i64 = 10;

pub struct PaymentService {
    store: Arc<ParkingStore>,
}

impl PaymentService {
    pub fn new(store: Arc<ParkingStore>) -> Self {
        Self { store }
    }

    /// Create a pending UPI intent and schedule its auto-settlement
    pub async fn create_intent(
        &self,
        request: CreateIntentRequest,
    ) -> Result<CreateIntentResponse, ApiError> {
        request
            .validate()
            .map_err(|e| ApiError::InvalidInput(format!("Validation error: {}", e)))?;

        let mut inner = self.store.lock().await;
        let lot = inner
            .lot(request.lot_id)
            .ok_or_else(|| ApiError::InvalidInput("Invalid lot or hours".to_string()))?;

        // Amount is fixed here and never recomputed (price-lock)
        let amount = request.reserved_hours as i64 * lot.price_per_hour;
        let note = format!("{} • {}", lot.name, request.vehicle_number);
        let now = Utc::now();
        let intent = PaymentIntent {
            id: Uuid::new_v4(),
            method: "upi".to_string(),
            status: IntentStatus::Pending,
            lot_id: request.lot_id,
            vehicle_number: request.vehicle_number,
            reserved_hours: request.reserved_hours,
            amount,
            upi_uri: upi_pay_uri(amount, &note),
            created_at: now,
            expires_at: now + ChronoDuration::minutes(INTENT_TTL_MINUTES),
        };

        let response = CreateIntentResponse {
            intent_id: intent.id,
            upi_uri: intent.upi_uri.clone(),
            amount: intent.amount,
            expires_at: intent.expires_at,
        };
        let intent_id = intent.id;
        inner.intents.insert(intent_id, intent);
        drop(inner);

        self.schedule_auto_settle(intent_id);
        tracing::info!(%intent_id, amount, "created UPI payment intent");

        Ok(response)
    }

    /// Status snapshot of an intent
    pub async fn intent_status(&self, id: Uuid) -> Result<IntentStatusResponse, ApiError> {
        let inner = self.store.lock().await;
        let intent = inner
            .intents
            .get(&id)
            .ok_or_else(|| ApiError::NotFound("Payment intent".to_string()))?;
        Ok(IntentStatusResponse {
            id: intent.id,
            status: intent.status,
            method: intent.method.clone(),
            amount: intent.amount,
        })
    }

    /// Flip pending -> paid after the demo delay, only if still pending
    fn schedule_auto_settle(&self, intent_id: Uuid) {
        let store = self.store.clone();
        tokio::spawn(async move {
            sleep(AUTO_SETTLE_DELAY).await;
            let mut inner = store.lock().await;
            if let Some(intent) = inner.intents.get_mut(&intent_id) {
                if intent.status == IntentStatus::Pending {
                    intent.status = IntentStatus::Paid;
                    tracing::info!(%intent_id, "payment intent auto-settled");
                }
            }
        });
    }
}

fn upi_pay_uri(amount: i64, note: &str) -> String {
    format!(
        "upi://pay?pa=smartparking@upi&pn=Smart%20Parking&am={}&cu=INR&tn={}",
        amount,
        urlencoding::encode(note)
    )
}

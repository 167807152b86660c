//! Reservation engine - spot allocation, payment verification and
//! checkout settlement
//!
//! Validation always precedes mutation: the spot is claimed and the
//! reservation recorded only in the terminal step, under the same lock,
//! so a failed reserve never leaves state behind.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::models::{
    ActiveReservation, CompletedReservation, IntentStatus, Payment, Reservation,
    ReservationStatus, ReserveRequest,
};
use crate::store::ParkingStore;

pub struct ReservationService {
    store: Arc<ParkingStore>,
}

impl ReservationService {
    pub fn new(store: Arc<ParkingStore>) -> Self {
        Self { store }
    }

    /// Allocate a free spot against a settled payment
    pub async fn reserve(&self, request: ReserveRequest) -> Result<Reservation, ApiError> {
        request
            .validate()
            .map_err(|e| ApiError::InvalidInput(format!("Validation error: {}", e)))?;

        let mut inner = self.store.lock().await;
        let lot = inner
            .lot(request.lot_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound("Lot".to_string()))?;
        let spot_idx = inner
            .find_free_spot(request.lot_id)
            .ok_or(ApiError::NoAvailability)?;

        let method = request
            .payment_method
            .clone()
            .unwrap_or_else(|| "upi".to_string());
        let now = Utc::now();

        let (prepaid_amount, payment, consumed_intent) = if method == "upi" {
            let intent_id = request
                .intent_id
                .ok_or_else(|| ApiError::InvalidPayment("Invalid payment intent".to_string()))?;
            let intent = inner
                .intents
                .get(&intent_id)
                .filter(|i| i.method == "upi")
                .ok_or_else(|| ApiError::InvalidPayment("Invalid payment intent".to_string()))?;
            match intent.status {
                IntentStatus::Pending => {
                    return Err(ApiError::InvalidPayment(
                        "Payment not completed yet".to_string(),
                    ))
                }
                IntentStatus::Expired => {
                    return Err(ApiError::InvalidPayment(
                        "Payment intent already used or expired".to_string(),
                    ))
                }
                IntentStatus::Paid => {}
            }
            // Price-lock: the settled intent amount wins over a fee
            // recomputed at reservation time
            (
                intent.amount,
                Payment {
                    method: "upi".to_string(),
                    status: "paid".to_string(),
                    amount: intent.amount,
                    paid_at: now,
                    intent_id: Some(intent_id),
                },
                Some(intent_id),
            )
        } else {
            // Non-UPI methods settle immediately
            let amount = request.reserved_hours as i64 * lot.price_per_hour;
            (
                amount,
                Payment {
                    method: method.clone(),
                    status: "paid".to_string(),
                    amount,
                    paid_at: now,
                    intent_id: None,
                },
                None,
            )
        };

        // Terminal step: consume the intent, claim the spot and record the
        // reservation under one lock
        if let Some(id) = consumed_intent {
            if let Some(intent) = inner.intents.get_mut(&id) {
                intent.status = IntentStatus::Expired;
            }
        }
        let spot = &mut inner.spots[spot_idx];
        spot.is_occupied = true;
        let reservation = Reservation {
            id: Uuid::new_v4(),
            spot_id: spot.id.clone(),
            lot_id: lot.id,
            spot_number: spot.spot_number,
            vehicle_number: request.vehicle_number,
            check_in_time: now,
            check_out_time: None,
            status: ReservationStatus::Active,
            fee: prepaid_amount,
            prepaid_amount,
            reserved_hours: request.reserved_hours,
            extra_due: 0,
            refund_due: 0,
            payment,
        };
        inner.reservations.push(reservation.clone());

        tracing::info!(
            reservation_id = %reservation.id,
            lot_id = lot.id,
            spot_id = %reservation.spot_id,
            prepaid_amount,
            "spot reserved"
        );

        Ok(reservation)
    }

    /// Checkout: settle the final fee and free the spot
    pub async fn release(&self, reservation_id: Uuid) -> Result<Reservation, ApiError> {
        let mut inner = self.store.lock().await;
        let idx = inner
            .reservations
            .iter()
            .position(|r| r.id == reservation_id && r.status == ReservationStatus::Active)
            .ok_or_else(|| ApiError::NotFound("Active reservation".to_string()))?;

        let lot_rate = {
            let lot_id = inner.reservations[idx].lot_id;
            inner
                .lot(lot_id)
                .map(|l| l.price_per_hour)
                .ok_or_else(|| ApiError::NotFound("Lot".to_string()))?
        };

        let spot_id = inner.reservations[idx].spot_id.clone();
        if let Some(spot_idx) = inner.spot_index(&spot_id) {
            inner.spots[spot_idx].is_occupied = false;
        }

        let now = Utc::now();
        let reservation = &mut inner.reservations[idx];
        reservation.check_out_time = Some(now);
        reservation.status = ReservationStatus::Completed;

        // Billed hours are the elapsed time rounded up to the next whole hour
        let elapsed_secs = (now - reservation.check_in_time).num_seconds().max(0);
        let hours = (elapsed_secs + 3599) / 3600;
        let final_fee = hours * lot_rate;
        reservation.extra_due = (final_fee - reservation.prepaid_amount).max(0);
        reservation.refund_due = (reservation.prepaid_amount - final_fee).max(0);
        reservation.fee = final_fee;

        tracing::info!(
            %reservation_id,
            final_fee,
            extra_due = reservation.extra_due,
            refund_due = reservation.refund_due,
            "reservation checked out"
        );

        Ok(reservation.clone())
    }

    /// Active reservations joined with lot name and rate
    pub async fn list_active(&self) -> Vec<ActiveReservation> {
        let inner = self.store.lock().await;
        inner
            .reservations
            .iter()
            .filter(|r| r.status == ReservationStatus::Active)
            .filter_map(|r| {
                inner.lot(r.lot_id).map(|lot| ActiveReservation {
                    reservation: r.clone(),
                    lot_name: lot.name.clone(),
                    price_per_hour: lot.price_per_hour,
                })
            })
            .collect()
    }

    /// Completed reservations joined with lot name
    pub async fn history(&self) -> Vec<CompletedReservation> {
        let inner = self.store.lock().await;
        inner
            .reservations
            .iter()
            .filter(|r| r.status == ReservationStatus::Completed)
            .filter_map(|r| {
                inner.lot(r.lot_id).map(|lot| CompletedReservation {
                    reservation: r.clone(),
                    lot_name: lot.name.clone(),
                })
            })
            .collect()
    }
}

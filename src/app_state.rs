//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;

use crate::services::{PaymentService, ReservationService};
use crate::store::ParkingStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ParkingStore>,
    pub reservation_service: Arc<ReservationService>,
    pub payment_service: Arc<PaymentService>,
}

impl AppState {
    pub fn new(store: Arc<ParkingStore>) -> Self {
        Self {
            reservation_service: Arc::new(ReservationService::new(store.clone())),
            payment_service: Arc::new(PaymentService::new(store.clone())),
            store,
        }
    }
}

impl FromRef<AppState> for Arc<ParkingStore> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.store.clone()
    }
}

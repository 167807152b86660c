//! Service layer for the parking backend

pub mod payment_service;
pub mod reservation_service;
pub mod telemetry_simulator;

pub use payment_service::PaymentService;
pub use reservation_service::ReservationService;
pub use telemetry_simulator::TelemetrySimulator;

//! Parkstation Backend Library
//!
//! This library exports the core modules for the smart parking backend
//! server: spot inventory, UPI advance payments, reservations and the
//! live IoT telemetry feed.

pub mod app_state;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
pub mod stream;

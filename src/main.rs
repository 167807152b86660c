//! Parkstation Backend Server
//!
//! Rust backend for a smart parking station: lot inventory, UPI advance
//! payments, spot reservations and a live IoT telemetry feed simulated
//! in-process.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use tokio::time::{sleep, Duration};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use parkstation_server::app_state::AppState;
use parkstation_server::routes;
use parkstation_server::services::TelemetrySimulator;
use parkstation_server::store::ParkingStore;

const SIMULATOR_SUPERVISOR_MAX_BACKOFF_SECONDS: u64 = 30;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let store = Arc::new(ParkingStore::new());
    let state = AppState::new(store.clone());

    // Create the app router
    let app = routes::app(state)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer());

    // Start and supervise the background telemetry simulator.
    tokio::spawn(async move {
        let mut restart_count: u32 = 0;
        loop {
            let simulator = TelemetrySimulator::new(store.clone());
            let handle = tokio::spawn(async move { simulator.start().await });

            match handle.await {
                Ok(()) => {
                    info!("telemetry simulator exited cleanly; stopping supervisor");
                    break;
                }
                Err(join_error) => {
                    if join_error.is_panic() {
                        error!("telemetry simulator panicked; restarting");
                    } else {
                        error!(error = %join_error, "telemetry simulator task failed; restarting");
                    }
                }
            }

            restart_count = restart_count.saturating_add(1);
            let backoff_seconds = (2u64.saturating_pow(restart_count.min(5)))
                .min(SIMULATOR_SUPERVISOR_MAX_BACKOFF_SECONDS);
            warn!(restart_count, backoff_seconds, "telemetry simulator restart backoff");
            sleep(Duration::from_secs(backoff_seconds)).await;
        }
    });

    // Get port from environment or default to 3000
    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .expect("PORT must be a number");

    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    tracing::info!("Server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

fn build_cors_layer() -> CorsLayer {
    let allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000".to_string())
        .split(',')
        .filter_map(|origin| origin.trim().parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(false)
}

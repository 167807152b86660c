//! Telemetry simulator - background mutator for spot sensors
//!
//! Perturbs a random sample of spots each tick and emits domain events
//! only on real transitions; per-tick emission without debouncing would
//! flood the event feed.

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use tokio::time::{sleep, Duration};
use tracing::info;

use crate::models::{EventKind, Spot};
use crate::store::{occupied_distance, round1, ParkingStore, StoreInner};

pub const TICK_INTERVAL: Duration = Duration::from_secs(5);

/// Share of the fleet touched per tick
const SAMPLE_RATIO: f64 = 0.08;
const OCCUPANCY_FLIP_PROBABILITY: f64 = 0.3;
const SENSOR_FAILURE_PROBABILITY: f64 = 0.03;
const SENSOR_RECOVERY_PROBABILITY: f64 = 0.2;
const LOW_BATTERY_THRESHOLD: f64 = 15.0;
const LOW_BATTERY_REARM: f64 = 25.0;

pub struct TelemetrySimulator {
    store: Arc<ParkingStore>,
}

impl TelemetrySimulator {
    pub fn new(store: Arc<ParkingStore>) -> Self {
        Self { store }
    }

    pub async fn start(self) {
        info!("telemetry simulator started");
        loop {
            {
                let mut inner = self.store.lock().await;
                tick_once(&mut inner, &mut rand::thread_rng());
            }
            sleep(TICK_INTERVAL).await;
        }
    }
}

/// One simulation tick over a random sample of spots.
/// `last_update_at` advances once per tick whether or not anything changed.
pub fn tick_once(inner: &mut StoreInner, rng: &mut impl Rng) {
    if !inner.spots.is_empty() {
        let sample = ((inner.spots.len() as f64 * SAMPLE_RATIO) as usize).max(1);
        for _ in 0..sample {
            let idx = rng.gen_range(0..inner.spots.len());
            let (lot_id, spot_number, emitted) = perturb_spot(&mut inner.spots[idx], rng);
            for kind in emitted {
                inner.push_event(lot_id, spot_number, kind);
            }
        }
    }
    inner.last_update_at = Utc::now();
}

fn perturb_spot(spot: &mut Spot, rng: &mut impl Rng) -> (u32, u32, Vec<EventKind>) {
    let mut emitted = Vec::new();

    if rng.gen_bool(OCCUPANCY_FLIP_PROBABILITY) {
        spot.is_occupied = !spot.is_occupied;
        emitted.push(EventKind::Occupancy {
            is_occupied: spot.is_occupied,
        });
    }

    spot.battery = (spot.battery - rng.gen_range(0.0..0.5)).clamp(5.0, 100.0);
    spot.signal = (spot.signal + rng.gen_range(-5.0..5.0)).clamp(5.0, 100.0);
    spot.distance_cm = round1(occupied_distance(spot.is_occupied, rng));
    spot.temp_c = round1(spot.temp_c + rng.gen_range(-1.0..1.0));

    if let Some(alert) = battery_alert(spot) {
        emitted.push(alert);
    }
    if let Some(change) = sensor_health_change(spot, rng) {
        emitted.push(change);
    }

    spot.last_seen = Utc::now();
    (spot.lot_id, spot.spot_number, emitted)
}

/// Fires once when battery drops below the threshold; the warning re-arms
/// only after the battery recovers above the re-arm level
fn battery_alert(spot: &mut Spot) -> Option<EventKind> {
    if spot.battery < LOW_BATTERY_THRESHOLD && !spot.low_battery_warned {
        spot.low_battery_warned = true;
        return Some(EventKind::BatteryLow {
            battery: spot.battery.round() as i64,
        });
    }
    if spot.battery > LOW_BATTERY_REARM && spot.low_battery_warned {
        spot.low_battery_warned = false;
    }
    None
}

/// Glitch or recovery; emits only on an actual transition
fn sensor_health_change(spot: &mut Spot, rng: &mut impl Rng) -> Option<EventKind> {
    let prev = spot.sensor_healthy;
    let next = if rng.gen_bool(SENSOR_FAILURE_PROBABILITY) {
        false
    } else if rng.gen_bool(SENSOR_RECOVERY_PROBABILITY) {
        true
    } else {
        prev
    };
    if next == prev {
        return None;
    }
    spot.sensor_healthy = next;
    Some(EventKind::Sensor { healthy: next })
}

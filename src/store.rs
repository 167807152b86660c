//! In-memory parking store
//!
//! Single owned state root shared by every service and handler. All
//! mutation goes through one mutex so reservation-driven transitions,
//! simulator ticks and stream reads are serialized with each other.
//! Nothing here is persisted; state lives for the process lifetime.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::models::{
    EventKind, FleetStatus, Lot, LotAvailability, LotMetrics, LotSummary, PaymentIntent,
    Reservation, Spot, TelemetryEvent,
};

/// Event log is a bounded ring; oldest entries are dropped silently.
/// Slow stream consumers may miss truncated history - accepted tradeoff,
/// the feed only guarantees recent events.
pub const EVENT_LOG_CAPACITY: usize = 500;

/// Lots seeded at startup
pub fn default_lots() -> Vec<Lot> {
    vec![
        Lot {
            id: 1,
            name: "Gwalior Fort Parking".to_string(),
            total_spots: 60,
            price_per_hour: 50,
            icon: "🏰".to_string(),
        },
        Lot {
            id: 2,
            name: "DD Mall Parking".to_string(),
            total_spots: 80,
            price_per_hour: 40,
            icon: "🛍️".to_string(),
        },
        Lot {
            id: 3,
            name: "Railway Station Parking".to_string(),
            total_spots: 70,
            price_per_hour: 35,
            icon: "🏛️".to_string(),
        },
    ]
}

pub struct ParkingStore {
    inner: Mutex<StoreInner>,
}

pub struct StoreInner {
    pub lots: Vec<Lot>,
    pub spots: Vec<Spot>,
    pub reservations: Vec<Reservation>,
    pub intents: HashMap<Uuid, PaymentIntent>,
    pub events: VecDeque<TelemetryEvent>,
    next_event_id: u64,
    pub last_update_at: DateTime<Utc>,
}

impl ParkingStore {
    pub fn new() -> Self {
        Self::seeded(default_lots(), &mut rand::thread_rng())
    }

    /// Seed one spot per (lot, spot number) with randomized initial telemetry
    pub fn seeded(lots: Vec<Lot>, rng: &mut impl Rng) -> Self {
        let now = Utc::now();
        let mut spots = Vec::new();
        for lot in &lots {
            for number in 1..=lot.total_spots {
                let occupied = rng.gen_bool(0.3);
                spots.push(Spot {
                    id: format!("{}-{}", lot.id, number),
                    lot_id: lot.id,
                    spot_number: number,
                    is_occupied: occupied,
                    battery: (70.0 + rng.gen_range(0.0..30.0f64)).floor(),
                    signal: (60.0 + rng.gen_range(0.0..40.0f64)).floor(),
                    temp_c: round1(28.0 + rng.gen_range(0.0..6.0)),
                    distance_cm: round1(occupied_distance(occupied, rng)),
                    sensor_healthy: true,
                    low_battery_warned: false,
                    last_seen: now,
                });
            }
        }

        Self {
            inner: Mutex::new(StoreInner {
                lots,
                spots,
                reservations: Vec::new(),
                intents: HashMap::new(),
                events: VecDeque::new(),
                next_event_id: 1,
                last_update_at: now,
            }),
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().await
    }
}

impl Default for ParkingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreInner {
    pub fn lot(&self, lot_id: u32) -> Option<&Lot> {
        self.lots.iter().find(|l| l.id == lot_id)
    }

    pub fn lots_with_availability(&self) -> Vec<LotAvailability> {
        self.lots
            .iter()
            .map(|lot| {
                let available = self
                    .spots
                    .iter()
                    .filter(|s| s.lot_id == lot.id && !s.is_occupied)
                    .count() as u32;
                LotAvailability {
                    lot: lot.clone(),
                    available_spots: available,
                    occupied_spots: lot.total_spots - available,
                }
            })
            .collect()
    }

    pub fn spots_for_lot(&self, lot_id: u32) -> Vec<Spot> {
        self.spots
            .iter()
            .filter(|s| s.lot_id == lot_id)
            .cloned()
            .collect()
    }

    /// First free spot in the lot by scan order
    pub fn find_free_spot(&self, lot_id: u32) -> Option<usize> {
        self.spots
            .iter()
            .position(|s| s.lot_id == lot_id && !s.is_occupied)
    }

    pub fn spot_index(&self, spot_id: &str) -> Option<usize> {
        self.spots.iter().position(|s| s.id == spot_id)
    }

    pub fn fleet_status(&self) -> FleetStatus {
        let total = self.spots.len();
        let occupied = self.spots.iter().filter(|s| s.is_occupied).count();
        let avg_battery = if total > 0 {
            round1(self.spots.iter().map(|s| s.battery).sum::<f64>() / total as f64)
        } else {
            0.0
        };
        let unhealthy = self.spots.iter().filter(|s| !s.sensor_healthy).count();
        FleetStatus {
            last_update_at: self.last_update_at,
            total_spots: total,
            occupied_spots: occupied,
            avg_battery,
            unhealthy_sensors: unhealthy,
        }
    }

    pub fn lot_metrics(&self, lot_id: u32) -> Option<LotMetrics> {
        let spots: Vec<&Spot> = self.spots.iter().filter(|s| s.lot_id == lot_id).collect();
        if spots.is_empty() {
            return None;
        }
        let total = spots.len();
        Some(LotMetrics {
            total,
            occupied: spots.iter().filter(|s| s.is_occupied).count(),
            unhealthy: spots.iter().filter(|s| !s.sensor_healthy).count(),
            avg_battery: round1(spots.iter().map(|s| s.battery).sum::<f64>() / total as f64),
            avg_signal: round1(spots.iter().map(|s| s.signal).sum::<f64>() / total as f64),
            avg_temp: round1(spots.iter().map(|s| s.temp_c).sum::<f64>() / total as f64),
        })
    }

    pub fn lot_summaries(&self) -> Vec<LotSummary> {
        self.lots
            .iter()
            .filter_map(|lot| {
                self.lot_metrics(lot.id).map(|metrics| LotSummary {
                    id: lot.id,
                    name: lot.name.clone(),
                    metrics,
                })
            })
            .collect()
    }

    /// Append an event with the next monotonic id and truncate old history
    pub fn push_event(&mut self, lot_id: u32, spot_number: u32, kind: EventKind) -> u64 {
        let id = self.next_event_id;
        self.next_event_id += 1;
        self.events.push_back(TelemetryEvent {
            id,
            ts: Utc::now(),
            lot_id,
            spot_number,
            kind,
        });
        while self.events.len() > EVENT_LOG_CAPACITY {
            self.events.pop_front();
        }
        id
    }

    /// Events with id strictly greater than `last_id`, in id order,
    /// keeping only the most recent `cap` entries
    pub fn events_since(&self, last_id: u64, cap: usize) -> Vec<TelemetryEvent> {
        let mut out: Vec<TelemetryEvent> = self
            .events
            .iter()
            .filter(|e| e.id > last_id)
            .cloned()
            .collect();
        if out.len() > cap {
            out.drain(..out.len() - cap);
        }
        out
    }
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Distance bands are disjoint: an occupied spot reads short range,
/// a vacant one long range
pub fn occupied_distance(occupied: bool, rng: &mut impl Rng) -> f64 {
    if occupied {
        20.0 + rng.gen_range(0.0..80.0)
    } else {
        150.0 + rng.gen_range(0.0..150.0)
    }
}

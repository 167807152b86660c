//! Live telemetry feed (SSE) with a resumable cursor
//!
//! Transport is push (SSE) but the data path is pull: each session keeps
//! a last-delivered event id and polls the store's event log, so a
//! reconnecting client can resume from its `Last-Event-ID`. History older
//! than the log capacity is gone; resumption never re-delivers or
//! reorders what is still retained.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use chrono::Utc;
use futures_util::stream::{self, Stream};
use serde::Deserialize;
use tokio::time::{sleep, Duration};
use tracing::{error, info};

use crate::models::StreamPayload;
use crate::store::ParkingStore;

pub const PUBLISH_INTERVAL: Duration = Duration::from_secs(2);

/// Largest batch delivered in one message; a far-behind cursor catches up
/// from the most recent events only
pub const MAX_EVENTS_PER_MESSAGE: usize = 50;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamQuery {
    pub last_event_id: Option<u64>,
}

/// GET /api/stream - periodic `iot` messages with per-lot summaries and
/// new events, `ping` heartbeats when there is nothing new
pub async fn stream_feed(
    State(store): State<Arc<ParkingStore>>,
    Query(query): Query<StreamQuery>,
    headers: HeaderMap,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let cursor = headers
        .get("last-event-id")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
        .or(query.last_event_id)
        .unwrap_or(0);
    info!(cursor, "stream session started");

    let stream = stream::unfold(cursor, move |last_delivered| {
        let store = store.clone();
        async move {
            sleep(PUBLISH_INTERVAL).await;
            let inner = store.lock().await;
            let events = inner.events_since(last_delivered, MAX_EVENTS_PER_MESSAGE);
            if events.is_empty() {
                // heartbeat keeps the session alive without moving the cursor
                let ping = SseEvent::default()
                    .event("ping")
                    .data(Utc::now().timestamp_millis().to_string());
                return Some((Ok(ping), last_delivered));
            }

            let next_cursor = events.last().map(|e| e.id).unwrap_or(last_delivered);
            let payload = StreamPayload {
                last_update_at: inner.last_update_at,
                lots: inner.lot_summaries(),
                events,
            };
            let data = match serde_json::to_string(&payload) {
                Ok(data) => data,
                Err(serialize_error) => {
                    error!(error = %serialize_error, "failed to serialize stream payload");
                    "{}".to_string()
                }
            };
            let message = SseEvent::default()
                .event("iot")
                .id(next_cursor.to_string())
                .data(data);
            Some((Ok(message), next_cursor))
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

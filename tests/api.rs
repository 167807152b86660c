//! Integration tests driving the full API router

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};
use tower::ServiceExt;

use parkstation_server::app_state::AppState;
use parkstation_server::models::EventKind;
use parkstation_server::routes;
use parkstation_server::store::{default_lots, ParkingStore};

fn test_state() -> (Arc<ParkingStore>, AppState) {
    let store = Arc::new(ParkingStore::seeded(
        default_lots(),
        &mut StdRng::seed_from_u64(7),
    ));
    (store.clone(), AppState::new(store))
}

async fn clear_occupancy(store: &ParkingStore) {
    let mut inner = store.lock().await;
    for spot in inner.spots.iter_mut() {
        spot.is_occupied = false;
    }
}

async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Value) {
    let response = routes::app(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

#[tokio::test]
async fn lots_report_consistent_availability() {
    let (_store, state) = test_state();
    let (status, body) = send(&state, get("/api/lots")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    let lots = body["data"].as_array().unwrap();
    assert_eq!(lots.len(), 3);
    for lot in lots {
        let total = lot["totalSpots"].as_u64().unwrap();
        let available = lot["availableSpots"].as_u64().unwrap();
        let occupied = lot["occupiedSpots"].as_u64().unwrap();
        assert_eq!(available + occupied, total);
    }
}

#[tokio::test]
async fn spots_endpoint_lists_lot_spots() {
    let (_store, state) = test_state();
    let (status, body) = send(&state, get("/api/lots/2/spots")).await;

    assert_eq!(status, StatusCode::OK);
    let spots = body["data"].as_array().unwrap();
    assert_eq!(spots.len(), 80);
    assert_eq!(spots[0]["id"], json!("2-1"));
    assert!(spots[0]["battery"].as_f64().unwrap() >= 5.0);
}

#[tokio::test]
async fn card_reserve_then_release_round_trip() {
    let (store, state) = test_state();
    clear_occupancy(&store).await;

    let (status, body) = send(
        &state,
        post_json(
            "/api/reserve",
            json!({
                "lotId": 1,
                "vehicleNumber": "MP07AB1234",
                "reservedHours": 2,
                "paymentMethod": "card"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], json!("active"));
    assert_eq!(body["data"]["prepaidAmount"], json!(100));
    let reservation_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(&state, get("/api/reservations")).await;
    assert_eq!(status, StatusCode::OK);
    let active = body["data"].as_array().unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["lotName"], json!("Gwalior Fort Parking"));
    assert_eq!(active[0]["pricePerHour"], json!(50));

    // immediate checkout bills zero hours and refunds the advance
    let (status, body) = send(
        &state,
        post_json("/api/release", json!({ "reservationId": reservation_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], json!("completed"));
    assert_eq!(body["data"]["fee"], json!(0));
    assert_eq!(body["data"]["refundDue"], json!(100));
    assert_eq!(body["data"]["extraDue"], json!(0));

    // releasing twice fails
    let (status, body) = send(
        &state,
        post_json("/api/release", json!({ "reservationId": reservation_id })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], json!(false));

    let (_, body) = send(&state, get("/api/history")).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn reserve_rejects_bad_input_and_unknown_lot() {
    let (_store, state) = test_state();

    let (status, body) = send(
        &state,
        post_json(
            "/api/reserve",
            json!({
                "lotId": 1,
                "vehicleNumber": "MP07AB1234",
                "reservedHours": 0,
                "paymentMethod": "card"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));

    let (status, _) = send(
        &state,
        post_json(
            "/api/reserve",
            json!({
                "lotId": 99,
                "vehicleNumber": "MP07AB1234",
                "reservedHours": 1,
                "paymentMethod": "card"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn full_lot_returns_no_availability() {
    let (store, state) = test_state();
    {
        let mut inner = store.lock().await;
        for spot in inner.spots.iter_mut().filter(|s| s.lot_id == 3) {
            spot.is_occupied = true;
        }
    }

    let (status, body) = send(
        &state,
        post_json(
            "/api/reserve",
            json!({
                "lotId": 3,
                "vehicleNumber": "MP07AB1234",
                "reservedHours": 1,
                "paymentMethod": "card"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("No available spots in this lot"));
}

#[tokio::test(start_paused = true)]
async fn upi_intent_settles_and_reserves_once() {
    let (store, state) = test_state();
    clear_occupancy(&store).await;

    let (status, body) = send(
        &state,
        post_json(
            "/api/pay/upi-intent",
            json!({
                "lotId": 2,
                "vehicleNumber": "MP07AB1234",
                "reservedHours": 2
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["amount"], json!(80));
    let upi_uri = body["data"]["upiUri"].as_str().unwrap();
    assert!(upi_uri.starts_with("upi://pay?"));
    let intent_id = body["data"]["intentId"].as_str().unwrap().to_string();

    let (status, body) = send(&state, get(&format!("/api/pay/intent/{}", intent_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], json!("pending"));

    let reserve_payload = json!({
        "lotId": 2,
        "vehicleNumber": "MP07AB1234",
        "reservedHours": 2,
        "paymentMethod": "upi",
        "intentId": intent_id
    });

    // payment not settled yet
    let (status, _) = send(&state, post_json("/api/reserve", reserve_payload.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // let the auto-settle timer fire
    tokio::time::sleep(std::time::Duration::from_secs(9)).await;
    let (_, body) = send(&state, get(&format!("/api/pay/intent/{}", intent_id))).await;
    assert_eq!(body["data"]["status"], json!("paid"));

    let (status, body) = send(&state, post_json("/api/reserve", reserve_payload.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["prepaidAmount"], json!(80));

    // a settled intent is consumed by exactly one reservation
    let (status, _) = send(&state, post_json("/api/reserve", reserve_payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_intent_is_not_found() {
    let (_store, state) = test_state();
    let (status, _) = send(
        &state,
        get("/api/pay/intent/00000000-0000-0000-0000-000000000000"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn fleet_status_and_lot_metrics() {
    let (_store, state) = test_state();

    let (status, body) = send(&state, get("/api/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalSpots"], json!(210));
    assert!(body["data"]["avgBattery"].as_f64().unwrap() > 0.0);

    let (status, body) = send(&state, get("/api/lots/1/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], json!(60));

    let (status, _) = send(&state, get("/api/lots/99/metrics")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stream_endpoint_is_server_sent_events() {
    let (_store, state) = test_state();
    let response = routes::app(state.clone())
        .oneshot(get("/api/stream"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(content_type.starts_with("text/event-stream"));
}

async fn next_frame(body: &mut Body) -> String {
    let frame = body.frame().await.unwrap().unwrap();
    String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap()
}

fn sse_field<'a>(frame: &'a str, field: &str) -> Option<&'a str> {
    frame.lines().find_map(|line| {
        line.strip_prefix(field)
            .map(|rest| rest.strip_prefix(':').unwrap_or(rest).trim_start())
    })
}

fn delivered_ids(frame: &str) -> Vec<u64> {
    let payload: Value = serde_json::from_str(sse_field(frame, "data").unwrap()).unwrap();
    payload["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|event| event["id"].as_u64().unwrap())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn stream_delivers_each_event_once_in_id_order() {
    let (store, state) = test_state();
    {
        let mut inner = store.lock().await;
        for _ in 0..3 {
            inner.push_event(1, 1, EventKind::Sensor { healthy: false });
        }
    }

    let response = routes::app(state.clone())
        .oneshot(get("/api/stream"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let mut body = response.into_body();

    // first publish tick flushes the backlog under the latest id
    let frame = next_frame(&mut body).await;
    assert_eq!(sse_field(&frame, "event"), Some("iot"));
    assert_eq!(sse_field(&frame, "id"), Some("3"));
    assert_eq!(delivered_ids(&frame), vec![1, 2, 3]);

    // events pushed between ticks arrive exactly once, ids advancing
    {
        let mut inner = store.lock().await;
        inner.push_event(1, 2, EventKind::Occupancy { is_occupied: true });
        inner.push_event(2, 5, EventKind::BatteryLow { battery: 12 });
    }
    let frame = next_frame(&mut body).await;
    assert_eq!(sse_field(&frame, "id"), Some("5"));
    assert_eq!(delivered_ids(&frame), vec![4, 5]);

    // idle tick heartbeats without an id, leaving the cursor in place
    let frame = next_frame(&mut body).await;
    assert_eq!(sse_field(&frame, "event"), Some("ping"));
    assert_eq!(sse_field(&frame, "id"), None);

    {
        let mut inner = store.lock().await;
        inner.push_event(3, 9, EventKind::Sensor { healthy: true });
    }
    let frame = next_frame(&mut body).await;
    assert_eq!(sse_field(&frame, "id"), Some("6"));
    assert_eq!(delivered_ids(&frame), vec![6]);
}

#[tokio::test]
async fn health_endpoints_respond() {
    let (_store, state) = test_state();
    let response = routes::app(state.clone())
        .oneshot(get("/health"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

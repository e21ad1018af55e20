use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

use marquee_api::state::{AppState, AuthConfig};
use marquee_api::{app, auth};
use marquee_booking::{BookingManager, PaymentStatusGate};
use marquee_core::{
    EventPublisher, ExpireOutcome, ExpiryScheduler, PublishError, SeatLedger,
};
use marquee_ledger::MemoryLedger;
use marquee_shared::{DomainEvent, EmailNotification};
use marquee_store::app_config::BusinessRules;
use marquee_store::RedisClient;

const SECRET: &str = "integration-secret";

#[derive(Default)]
struct RecordingPublisher {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingPublisher {
    fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: &DomainEvent) -> Result<(), PublishError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn publish_email(&self, _notification: &EmailNotification) -> Result<(), PublishError> {
        Ok(())
    }
}

struct Harness {
    state: AppState,
    ledger: Arc<MemoryLedger>,
    gate: Arc<PaymentStatusGate>,
    publisher: Arc<RecordingPublisher>,
}

async fn harness() -> Harness {
    let ledger = Arc::new(MemoryLedger::new());
    let publisher = Arc::new(RecordingPublisher::default());

    let manager = Arc::new(BookingManager::new(
        ledger.clone(),
        ledger.clone(),
        ledger.clone(),
        ledger.clone(),
        publisher.clone(),
        600,
    ));
    let gate = Arc::new(PaymentStatusGate::new(ledger.clone(), publisher.clone()));

    // Nothing listens on this port; cache and rate limiting fail open.
    let redis = Arc::new(
        RedisClient::new("redis://127.0.0.1:1")
            .await
            .expect("redis url parses"),
    );
    let (sse_tx, _) = tokio::sync::broadcast::channel(16);
    let metrics = Arc::new(marquee_api::metrics::Metrics::new().unwrap());

    let state = AppState {
        redis,
        shows: ledger.clone(),
        ledger: ledger.clone(),
        bookings: ledger.clone(),
        users: ledger.clone(),
        manager,
        gate: gate.clone(),
        sse_tx,
        auth: AuthConfig {
            secret: SECRET.to_string(),
            expiration: 3600,
        },
        business_rules: BusinessRules {
            hold_window_seconds: 600,
            expiry_poll_seconds: 15,
            expiry_batch_size: 50,
            seat_cache_ttl_seconds: 30,
        },
        metrics,
    };

    Harness {
        state,
        ledger,
        gate,
        publisher,
    }
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<serde_json::Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .extension(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn create_show(harness: &Harness, admin_token: &str) -> Uuid {
    let response = app(harness.state.clone())
        .oneshot(request(
            "POST",
            "/v1/shows",
            Some(admin_token),
            Some(serde_json::json!({
                "movie_title": "Night Train",
                "starts_at": (Utc::now() + Duration::hours(5)).to_rfc3339(),
                "price_cents": 1400
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    body["show_id"].as_str().unwrap().parse().unwrap()
}

async fn create_booking(
    harness: &Harness,
    token: &str,
    show_id: Uuid,
    seats: &[&str],
) -> axum::response::Response {
    app(harness.state.clone())
        .oneshot(request(
            "POST",
            "/v1/bookings",
            Some(token),
            Some(serde_json::json!({
                "show_id": show_id,
                "seats": seats,
            })),
        ))
        .await
        .unwrap()
}

#[tokio::test]
async fn booking_flow_holds_seats_and_rejects_overlap() {
    let harness = harness().await;
    let admin = auth::issue_token("user_admin", "admin", SECRET, 600).unwrap();
    let guest = auth::issue_token("user_guest", "guest", SECRET, 600).unwrap();
    let show_id = create_show(&harness, &admin).await;

    let response = create_booking(&harness, &guest, show_id, &["A1", "A2"]).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "PENDING");
    assert_eq!(body["amount_cents"], 2800);
    let booking_id: Uuid = body["booking_id"].as_str().unwrap().parse().unwrap();

    // Overlap is rejected wholesale, leaving the show untouched.
    let conflict = create_booking(&harness, &guest, show_id, &["A2", "A3"]).await;
    assert_eq!(conflict.status(), StatusCode::CONFLICT);

    let seats = app(harness.state.clone())
        .oneshot(request(
            "GET",
            &format!("/v1/shows/{show_id}/seats"),
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(seats.status(), StatusCode::OK);
    let seat_map = json_body(seats).await;
    let occupied = seat_map["occupied"].as_object().unwrap();
    assert_eq!(occupied.len(), 2);
    assert_eq!(occupied["A1"], booking_id.to_string());
    assert!(!occupied.contains_key("A3"));

    assert!(matches!(
        harness.publisher.events().as_slice(),
        [DomainEvent::BookingCreated { .. }]
    ));
}

#[tokio::test]
async fn paid_booking_survives_the_expiry_firing() {
    let harness = harness().await;
    let admin = auth::issue_token("user_admin", "admin", SECRET, 600).unwrap();
    let guest = auth::issue_token("user_guest", "guest", SECRET, 600).unwrap();
    let show_id = create_show(&harness, &admin).await;

    let response = create_booking(&harness, &guest, show_id, &["B7"]).await;
    let booking_id: Uuid = json_body(response).await["booking_id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();

    // Payment provider reports success.
    let webhook = app(harness.state.clone())
        .oneshot(request(
            "POST",
            "/v1/webhooks/payments",
            None,
            Some(serde_json::json!({
                "id": "evt_1",
                "type": "payment_intent.succeeded",
                "data": {
                    "object": {
                        "id": "pi_9",
                        "status": "succeeded",
                        "metadata": {"booking_id": booking_id.to_string()}
                    }
                }
            })),
        ))
        .await
        .unwrap();
    assert_eq!(webhook.status(), StatusCode::OK);

    // The scheduled check still fires later and must no-op.
    let due = harness
        .ledger
        .due(Utc::now() + Duration::seconds(601), 10)
        .await
        .unwrap();
    assert_eq!(due.len(), 1);
    let outcome = harness.gate.expire(due[0].booking_id).await.unwrap();
    assert_eq!(outcome, ExpireOutcome::Retained);

    let details = app(harness.state.clone())
        .oneshot(request(
            "GET",
            &format!("/v1/bookings/{booking_id}"),
            Some(&guest),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(details.status(), StatusCode::OK);
    assert_eq!(json_body(details).await["status"], "PAID");

    let occupied = harness.ledger.occupants(show_id).await.unwrap();
    assert_eq!(occupied.get("B7"), Some(&booking_id));
}

#[tokio::test]
async fn unpaid_booking_is_released_after_the_hold_window() {
    let harness = harness().await;
    let admin = auth::issue_token("user_admin", "admin", SECRET, 600).unwrap();
    let guest = auth::issue_token("user_guest", "guest", SECRET, 600).unwrap();
    let show_id = create_show(&harness, &admin).await;

    let response = create_booking(&harness, &guest, show_id, &["A1", "A2"]).await;
    let booking_id: Uuid = json_body(response).await["booking_id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();

    // Ten minutes later, still unpaid: the firing tears the hold down.
    let due = harness
        .ledger
        .due(Utc::now() + Duration::minutes(10), 10)
        .await
        .unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].booking_id, booking_id);
    let outcome = harness.gate.expire(booking_id).await.unwrap();
    assert!(matches!(outcome, ExpireOutcome::Released { .. }));
    harness.ledger.complete(booking_id).await.unwrap();

    assert!(harness.ledger.occupants(show_id).await.unwrap().is_empty());

    let details = app(harness.state.clone())
        .oneshot(request(
            "GET",
            &format!("/v1/bookings/{booking_id}"),
            Some(&guest),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(details.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn booking_requires_a_bearer_token() {
    let harness = harness().await;
    let response = create_booking_without_token(&harness).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

async fn create_booking_without_token(harness: &Harness) -> axum::response::Response {
    app(harness.state.clone())
        .oneshot(request(
            "POST",
            "/v1/bookings",
            None,
            Some(serde_json::json!({
                "show_id": Uuid::new_v4(),
                "seats": ["A1"],
            })),
        ))
        .await
        .unwrap()
}

#[tokio::test]
async fn identity_webhooks_mirror_users() {
    let harness = harness().await;

    let created = app(harness.state.clone())
        .oneshot(request(
            "POST",
            "/v1/webhooks/identity",
            None,
            Some(serde_json::json!({
                "type": "user.created",
                "data": {
                    "id": "user_31",
                    "first_name": "Iris",
                    "last_name": "Malek",
                    "email_addresses": [{"email_address": "iris@example.com"}],
                    "image_url": null
                }
            })),
        ))
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::OK);

    let mirrored = marquee_core::UserStore::get(harness.ledger.as_ref(), "user_31")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(mirrored.name, "Iris Malek");

    let deleted = app(harness.state.clone())
        .oneshot(request(
            "POST",
            "/v1/webhooks/identity",
            None,
            Some(serde_json::json!({
                "type": "user.deleted",
                "data": {"id": "user_31"}
            })),
        ))
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::OK);
    assert!(marquee_core::UserStore::get(harness.ledger.as_ref(), "user_31")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn metrics_endpoint_exposes_counters() {
    let harness = harness().await;
    let response = app(harness.state.clone())
        .oneshot(request("GET", "/metrics", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("marquee_bookings_created_total"));
}

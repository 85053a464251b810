use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use lastmile_ops::api::router;
use lastmile_ops::auth::issue_token;
use lastmile_ops::config::Config;
use lastmile_ops::models::order::{Order, OrderStatus, PaymentStatus, RefundStatus};
use lastmile_ops::models::snapshot::SignalSnapshot;
use lastmile_ops::models::user::Role;
use lastmile_ops::providers::{RouteSignal, TrafficLevel};
use lastmile_ops::queue::{ImportJob, Job, RiskJob};
use lastmile_ops::realtime::relay::HubSink;
use lastmile_ops::realtime::OPS_ROOM;
use lastmile_ops::state::AppState;
use lastmile_ops::workers::imports::process_import_job;
use lastmile_ops::workers::risk::run_risk_worker;

const JWT_SECRET: &str = "test_secret";
const INTERNAL_SECRET: &str = "internal_secret";

fn test_config() -> Config {
    Config {
        http_port: 0,
        log_level: "info".to_string(),
        risk_queue_size: 64,
        import_queue_size: 16,
        event_buffer_size: 64,
        jwt_secret: JWT_SECRET.to_string(),
        internal_secret: INTERNAL_SECRET.to_string(),
        relay_base_url: None,
        heartbeat_interval_secs: 10,
        heartbeat_ttl_secs: 20,
    }
}

fn setup() -> (
    axum::Router,
    Arc<AppState>,
    tokio::sync::mpsc::Receiver<Job<RiskJob>>,
    tokio::sync::mpsc::Receiver<Job<ImportJob>>,
) {
    let (state, risk_rx, import_rx) = AppState::new(&test_config());
    let shared = Arc::new(state);
    (router(shared.clone()), shared, risk_rx, import_rx)
}

fn token_for(user_id: Uuid, role: Role) -> String {
    issue_token(JWT_SECRET, user_id, role).unwrap()
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn seed_order(state: &AppState, customer_id: Uuid, promised_eta: i64) -> Order {
    let order = Order {
        id: Uuid::new_v4(),
        customer_id,
        status: OrderStatus::Created,
        promised_eta,
        current_eta: promised_eta,
        eta_delta_minutes: 0,
        risk_score: 0.0,
        risk_reasons: json!({}),
        payment_status: PaymentStatus::Pending,
        refund_status: RefundStatus::None,
        customer_zone: "zone-b".to_string(),
        restaurant_zone: "zone-a".to_string(),
        address_lat: 41.03,
        address_lon: 29.01,
        external_id: None,
        delay_reason: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    state.orders.insert(order.clone());
    order
}

#[tokio::test]
async fn health_returns_ok() {
    let (app, _state, _risk_rx, _import_rx) = setup();
    let response = app.oneshot(get_request("/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["workers_alive"], false);
    assert_eq!(body["orders"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let (app, _state, _risk_rx, _import_rx) = setup();
    let response = app.oneshot(get_request("/metrics", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("jobs_in_queue"));
}

#[tokio::test]
async fn missing_token_returns_401() {
    let (app, _state, _risk_rx, _import_rx) = setup();
    let response = app.oneshot(get_request("/orders", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_role_returns_403() {
    let (app, _state, _risk_rx, _import_rx) = setup();
    let courier_token = token_for(Uuid::new_v4(), Role::Courier);

    let response = app
        .oneshot(get_request("/ops/dashboard", Some(&courier_token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn create_order_enqueues_a_risk_job() {
    let (app, _state, mut risk_rx, _import_rx) = setup();
    let customer = Uuid::new_v4();
    let token = token_for(customer, Role::Customer);

    let response = app
        .oneshot(json_request(
            "POST",
            "/orders",
            Some(&token),
            json!({
                "address_lat": 41.03,
                "address_lon": 29.01,
                "customer_zone": "zone-b",
                "items": [{ "name": "Noodles", "quantity": 2, "unit_price": 8.5 }]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "CREATED");
    assert_eq!(body["payment_status"], "PENDING");
    assert_eq!(body["promised_eta"], 25);
    assert_eq!(body["restaurant_zone"], "zone-a");
    assert_eq!(body["items"][0]["name"], "Noodles");

    let job = risk_rx.try_recv().unwrap();
    assert_eq!(job.payload.order_id.to_string(), body["id"].as_str().unwrap());
}

#[tokio::test]
async fn non_finite_coordinates_are_rejected() {
    let (app, _state, _risk_rx, _import_rx) = setup();
    let token = token_for(Uuid::new_v4(), Role::Customer);

    let response = app
        .oneshot(json_request(
            "POST",
            "/orders",
            Some(&token),
            json!({
                "address_lat": "not-a-number",
                "address_lon": 29.01,
                "customer_zone": "zone-b"
            }),
        ))
        .await
        .unwrap();

    // Type mismatch is rejected at deserialization.
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn customers_cannot_read_foreign_orders() {
    let (app, state, _risk_rx, _import_rx) = setup();
    let owner = Uuid::new_v4();
    let order = seed_order(&state, owner, 25);
    let stranger_token = token_for(Uuid::new_v4(), Role::Customer);

    let response = app
        .oneshot(get_request(
            &format!("/orders/{}", order.id),
            Some(&stranger_token),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancelling_a_paid_order_marks_the_refund() {
    let (app, state, _risk_rx, _import_rx) = setup();
    let customer = Uuid::new_v4();
    let token = token_for(customer, Role::Customer);
    let order = seed_order(&state, customer, 25);
    state
        .orders
        .update(order.id, |o| o.payment_status = PaymentStatus::Paid);

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/orders/{}/cancel", order.id),
            Some(&token),
            json!({}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "CANCELLED");
    assert_eq!(body["payment_status"], "REFUNDED");
    assert_eq!(body["refund_status"], "PENDING");
}

#[tokio::test]
async fn declined_payment_is_recorded_and_retryable() {
    let (app, state, mut risk_rx, _import_rx) = setup();
    let customer = Uuid::new_v4();
    let token = token_for(customer, Role::Customer);
    let order = seed_order(&state, customer, 25);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{}/pay", order.id),
            Some(&token),
            json!({ "success": false }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["payment_status"], "FAILED");
    assert_eq!(body["status"], "CREATED");
    assert!(risk_rx.try_recv().is_err());

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/orders/{}/pay", order.id),
            Some(&token),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["payment_status"], "PAID");
    assert_eq!(body["status"], "PREPARING");
    assert!(risk_rx.try_recv().is_ok());
}

#[tokio::test]
async fn delivered_orders_cannot_be_cancelled() {
    let (app, state, _risk_rx, _import_rx) = setup();
    let customer = Uuid::new_v4();
    let token = token_for(customer, Role::Customer);
    let order = seed_order(&state, customer, 25);
    state
        .orders
        .update(order.id, |o| o.status = OrderStatus::Delivered);

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/orders/{}/cancel", order.id),
            Some(&token),
            json!({}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn ops_rejects_unknown_status_values() {
    let (app, state, _risk_rx, _import_rx) = setup();
    let ops_token = token_for(Uuid::new_v4(), Role::Ops);
    let order = seed_order(&state, Uuid::new_v4(), 25);

    let response = app
        .oneshot(json_request(
            "PATCH",
            &format!("/ops/orders/{}/status", order.id),
            Some(&ops_token),
            json!({ "status": "TELEPORTED" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ops_status_update_on_unknown_order_returns_404() {
    let (app, _state, _risk_rx, _import_rx) = setup();
    let ops_token = token_for(Uuid::new_v4(), Role::Ops);

    let response = app
        .oneshot(json_request(
            "PATCH",
            &format!("/ops/orders/{}/status", Uuid::new_v4()),
            Some(&ops_token),
            json!({ "status": "PREPARING" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn assign_then_courier_walks_the_delivery_statuses() {
    let (app, state, mut risk_rx, _import_rx) = setup();
    let ops_token = token_for(Uuid::new_v4(), Role::Ops);
    let courier_id = Uuid::new_v4();
    let courier_token = token_for(courier_id, Role::Courier);
    let order = seed_order(&state, Uuid::new_v4(), 25);
    state.couriers.ensure(courier_id, "Ada");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/ops/orders/{}/assign", order.id),
            Some(&ops_token),
            json!({ "courier_id": courier_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["order"]["status"], "ASSIGNED");
    assert_eq!(body["assignment"]["courier_id"], courier_id.to_string());
    assert!(risk_rx.try_recv().is_ok());

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/courier/orders/{}/status", order.id),
            Some(&courier_token),
            json!({ "status": "PICKED_UP" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!state.couriers.get(courier_id).unwrap().is_available);
    assert!(risk_rx.try_recv().is_ok());

    let response = app
        .oneshot(json_request(
            "PATCH",
            &format!("/courier/orders/{}/status", order.id),
            Some(&courier_token),
            json!({ "status": "DELIVERED" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "DELIVERED");

    // Delivery frees the courier, ends the assignment, and still queues a
    // recompute like every other status write.
    assert!(state.couriers.get(courier_id).unwrap().is_available);
    assert!(state.couriers.active_assignment_for_order(order.id).is_none());
    assert!(risk_rx.try_recv().is_ok());
}

#[tokio::test]
async fn terminal_status_changes_still_queue_a_recompute() {
    let (app, state, mut risk_rx, _import_rx) = setup();
    let ops_token = token_for(Uuid::new_v4(), Role::Ops);
    let order = seed_order(&state, Uuid::new_v4(), 25);

    let response = app
        .oneshot(json_request(
            "PATCH",
            &format!("/ops/orders/{}/status", order.id),
            Some(&ops_token),
            json!({ "status": "CANCELLED" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let job = risk_rx.try_recv().unwrap();
    assert_eq!(job.payload.order_id, order.id);
}

#[tokio::test]
async fn unassigned_courier_cannot_touch_the_order() {
    let (app, state, _risk_rx, _import_rx) = setup();
    let courier_token = token_for(Uuid::new_v4(), Role::Courier);
    let order = seed_order(&state, Uuid::new_v4(), 25);

    let response = app
        .oneshot(json_request(
            "PATCH",
            &format!("/courier/orders/{}/status", order.id),
            Some(&courier_token),
            json!({ "status": "PICKED_UP" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn couriers_cannot_set_ops_statuses() {
    let (app, state, _risk_rx, _import_rx) = setup();
    let courier_id = Uuid::new_v4();
    let courier_token = token_for(courier_id, Role::Courier);
    let order = seed_order(&state, Uuid::new_v4(), 25);
    state.couriers.ensure(courier_id, "Ada");
    state.couriers.create_assignment(order.id, courier_id);

    let response = app
        .oneshot(json_request(
            "PATCH",
            &format!("/courier/orders/{}/status", order.id),
            Some(&courier_token),
            json!({ "status": "CANCELLED" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn internal_emit_requires_the_shared_secret() {
    let (app, _state, _risk_rx, _import_rx) = setup();

    let request = Request::builder()
        .method("POST")
        .uri("/internal/realtime/emit")
        .header("content-type", "application/json")
        .header("x-internal-secret", "wrong")
        .body(Body::from(
            json!({ "room": "ops", "event": "ops.alerts.new", "payload": {} }).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn internal_emit_reaches_room_subscribers() {
    let (app, state, _risk_rx, _import_rx) = setup();
    let mut rx = state.hub.subscribe(OPS_ROOM);

    let request = Request::builder()
        .method("POST")
        .uri("/internal/realtime/emit")
        .header("content-type", "application/json")
        .header("x-internal-secret", INTERNAL_SECRET)
        .body(Body::from(
            json!({ "room": "ops", "event": "ops.alerts.new", "payload": { "n": 1 } }).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["delivered"], 1);

    let envelope = rx.recv().await.unwrap();
    assert_eq!(envelope.event, "ops.alerts.new");
    assert_eq!(envelope.payload["n"], 1);
}

#[tokio::test]
async fn upload_endpoint_queues_and_import_settles_the_batch() {
    let (app, state, mut risk_rx, mut import_rx) = setup();
    let ops_token = token_for(Uuid::new_v4(), Role::Ops);
    state.users.insert(lastmile_ops::models::user::User {
        id: Uuid::new_v4(),
        email: "customer@example.com".to_string(),
        role: Role::Customer,
        created_at: Utc::now(),
    });

    let csv = "order_external_id,address_lat,address_lon,customer_zone,restaurant_zone,items_json\n\
               ext-1,41.02,29.00,zone-b,zone-a,[]\n\
               ext-1,41.03,29.01,zone-b,zone-a,[]\n\
               ext-2,not-a-number,29.02,zone-c,zone-a,[]\n";
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/uploads",
            Some(&ops_token),
            json!({ "filename": "orders.csv", "content": csv }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let batch = body_json(response).await;
    assert_eq!(batch["status"], "QUEUED");
    let batch_id: Uuid = batch["id"].as_str().unwrap().parse().unwrap();

    let job = import_rx.try_recv().unwrap();
    assert_eq!(job.payload.batch_id, batch_id);
    process_import_job(&state, batch_id).await.unwrap();

    let response = app
        .oneshot(get_request(
            &format!("/uploads/{batch_id}"),
            Some(&ops_token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "COMPLETED");
    assert_eq!(body["total_rows"], 3);
    assert_eq!(body["success_rows"], 1);
    assert_eq!(body["failed_rows"], 2);
    assert_eq!(body["rows"][1]["error"], "duplicate_order_external_id");
    assert_eq!(body["rows"][2]["error"], "missing_required_fields");

    assert!(risk_rx.try_recv().is_ok());
    assert!(risk_rx.try_recv().is_err());
    assert!(state.orders.external_id_exists("ext-1"));
}

/// The upgrade handshake needs a live connection, so this test serves the
/// router on an ephemeral port instead of driving it with oneshot.
#[tokio::test]
async fn socket_handshake_rejects_bad_tokens_before_upgrade() {
    let (app, state, _risk_rx, _import_rx) = setup();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::new();
    let handshake = |token: Option<String>| {
        let url = match token {
            Some(token) => format!("http://{addr}/ws?token={token}"),
            None => format!("http://{addr}/ws"),
        };
        client
            .get(url)
            .header("connection", "upgrade")
            .header("upgrade", "websocket")
            .header("sec-websocket-version", "13")
            .header("sec-websocket-key", "dGhlIHNhbXBsZSBub25jZQ==")
            .send()
    };

    let response = handshake(None).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);

    let forged = issue_token("other_secret", Uuid::new_v4(), Role::Customer).unwrap();
    let response = handshake(Some(forged)).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);

    // Rejected handshakes never open a socket or join a room.
    assert_eq!(state.metrics.ws_connections.get(), 0);

    let valid = token_for(Uuid::new_v4(), Role::Customer);
    let response = handshake(Some(valid)).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::SWITCHING_PROTOCOLS);
}

#[tokio::test]
async fn map_without_traffic_snapshots_reports_unavailable() {
    let (app, _state, _risk_rx, _import_rx) = setup();
    let ops_token = token_for(Uuid::new_v4(), Role::Ops);

    let response = app
        .oneshot(get_request("/ops/map", Some(&ops_token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["traffic_status"], "UNAVAILABLE");
    assert!(body["last_snapshot_age_min"].is_null());
}

#[tokio::test]
async fn risk_worker_escalates_a_breaching_order_end_to_end() {
    let (state, risk_rx, _import_rx) = AppState::new(&test_config());
    let shared = Arc::new(state);
    let app = router(shared.clone());
    let sink = Arc::new(HubSink::new(shared.hub.clone()));
    tokio::spawn(run_risk_worker(shared.clone(), sink, risk_rx));

    let mut ops_rx = shared.hub.subscribe(OPS_ROOM);
    let order = seed_order(&shared, Uuid::new_v4(), 20);
    let signal = RouteSignal {
        eta_normal_min: 20,
        eta_with_traffic_min: Some(55),
        level: TrafficLevel::Heavy,
        source: "mock-traffic".to_string(),
        expires_at: Utc::now() + Duration::minutes(5),
    };
    shared.snapshots.put_traffic(SignalSnapshot {
        geo_scope: order.id.to_string(),
        payload: serde_json::to_value(&signal).unwrap(),
        source: signal.source.clone(),
        expires_at: signal.expires_at,
    });

    shared
        .risk_queue
        .enqueue(RiskJob { order_id: order.id })
        .await
        .unwrap();
    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    let mut events = Vec::new();
    while let Ok(envelope) = ops_rx.try_recv() {
        events.push(envelope.event);
    }
    assert!(events.contains(&"ops.alerts.new".to_string()));
    assert!(events.contains(&"ops.alerts.escalated".to_string()));
    assert!(events.contains(&"ops.orders.updated".to_string()));

    let ops_token = token_for(Uuid::new_v4(), Role::Ops);
    let response = app
        .oneshot(get_request(
            &format!("/ops/orders/{}", order.id),
            Some(&ops_token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["current_eta"], 55);
    assert_eq!(body["eta_delta_minutes"], 35);
    assert_eq!(body["risk_score"], 1.0);
    assert_eq!(body["alerts"][0]["severity"], "HIGH");
}

#[tokio::test]
async fn integrations_traffic_is_cached_on_second_read() {
    let (app, _state, _risk_rx, _import_rx) = setup();
    let token = token_for(Uuid::new_v4(), Role::Ops);
    let uri = "/integrations/traffic?origin=zone-a&destination=zone-b";

    let first = app
        .clone()
        .oneshot(get_request(uri, Some(&token)))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let first = body_json(first).await;
    assert_eq!(first["cache_hit"], false);
    assert_eq!(first["eta_normal_min"], 20);

    let second = app.oneshot(get_request(uri, Some(&token))).await.unwrap();
    let second = body_json(second).await;
    assert_eq!(second["cache_hit"], true);
    assert_eq!(second["eta_with_traffic_min"], first["eta_with_traffic_min"]);
}

#[tokio::test]
async fn ops_alert_acknowledgement_round_trip() {
    let (app, state, _risk_rx, _import_rx) = setup();
    let ops_id = Uuid::new_v4();
    let ops_token = token_for(ops_id, Role::Ops);
    let order = seed_order(&state, Uuid::new_v4(), 25);
    state.alerts.insert(lastmile_ops::models::alert::Alert {
        id: Uuid::new_v4(),
        order_id: order.id,
        alert_type: lastmile_ops::models::alert::AlertType::DelayRisk,
        severity: lastmile_ops::models::alert::AlertSeverity::Medium,
        is_new: true,
        acknowledged_by: None,
        created_at: Utc::now(),
    });

    let response = app
        .clone()
        .oneshot(get_request("/ops/alerts?is_new=true", Some(&ops_token)))
        .await
        .unwrap();
    let alerts = body_json(response).await;
    let alert_id = alerts[0]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/ops/alerts/{alert_id}/ack"),
            Some(&ops_token),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["is_new"], false);
    assert_eq!(body["acknowledged_by"], ops_id.to_string());

    let response = app
        .oneshot(get_request("/ops/alerts?is_new=true", Some(&ops_token)))
        .await
        .unwrap();
    let remaining = body_json(response).await;
    assert_eq!(remaining.as_array().unwrap().len(), 0);
}

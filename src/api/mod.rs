pub mod alerts;
pub mod couriers;
pub mod integrations;
pub mod internal;
pub mod ops;
pub mod orders;
pub mod uploads;
pub mod ws;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::models::order::Order;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(orders::router())
        .merge(couriers::router())
        .merge(ops::router())
        .merge(alerts::router())
        .merge(uploads::router())
        .merge(integrations::router())
        .merge(internal::router())
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/ws", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    workers_alive: bool,
    last_heartbeat: Option<chrono::DateTime<Utc>>,
    orders: usize,
    couriers: usize,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        workers_alive: state.heartbeat.is_alive(Utc::now()),
        last_heartbeat: state.heartbeat.last_beat(),
        orders: state.orders.count_where(|_| true),
        couriers: state.couriers.list().len(),
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err).into_response(),
    }
}

/// Pushes the two per-order update events every state change broadcasts:
/// one to the owning customer's room, one to the shared ops room.
pub(crate) fn broadcast_order_update(state: &AppState, order: &Order) {
    state.hub.emit_to_customer(
        order.customer_id,
        "customer.order.updated",
        json!({
            "order_id": order.id,
            "status": order.status,
            "current_eta": order.current_eta,
            "eta_delta_minutes": order.eta_delta_minutes,
        }),
    );
    state.hub.emit_to_ops(
        "ops.orders.updated",
        json!({
            "order_id": order.id,
            "status": order.status,
            "risk_score": order.risk_score,
        }),
    );
}

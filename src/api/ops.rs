use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::broadcast_order_update;
use crate::auth::AuthUser;
use crate::engine::map::{build_map_snapshot, MapSnapshot};
use crate::engine::risk::{compute_risk, ALERT_DELTA_MIN, SLA_BREACH_DELTA_MIN};
use crate::error::AppError;
use crate::models::alert::{
    Alert, NotificationChannel, NotificationLog, NotificationStatus,
};
use crate::models::audit::AuditLog;
use crate::models::courier::{Courier, CourierAssignment, GeoPoint};
use crate::models::order::{Order, OrderItem, OrderStatus, OrderStatusEvent};
use crate::models::user::Role;
use crate::queue::RiskJob;
use crate::state::AppState;

const OPS_ROLES: [Role; 2] = [Role::Ops, Role::Admin];
const OPS_LIST_LIMIT: usize = 200;

/// Statuses counted as "active" on the dashboard: accepted work that has
/// not yet left the kitchen-to-door pipeline.
const ACTIVE_STATUSES: [OrderStatus; 5] = [
    OrderStatus::Created,
    OrderStatus::Preparing,
    OrderStatus::Ready,
    OrderStatus::Assigned,
    OrderStatus::OnRoute,
];

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ops/dashboard", get(dashboard))
        .route("/ops/orders", get(list_orders))
        .route("/ops/orders/:id", get(get_order))
        .route("/ops/orders/:id/status", patch(set_order_status))
        .route("/ops/orders/:id/assign", post(assign_courier))
        .route("/ops/orders/:id/notify", post(notify_customer))
        .route("/ops/orders/:id/eta-override", post(override_eta))
        .route("/ops/map", get(live_map))
        .route("/ops/couriers", get(list_couriers))
        .route("/ops/couriers/:id/location", patch(set_courier_location))
        .route("/ops/audit-logs", get(audit_logs))
}

#[derive(Serialize)]
pub struct DashboardResponse {
    pub active_orders: usize,
    pub delayed_orders: usize,
    pub sla_breaches: usize,
    pub new_alerts: usize,
    pub available_couriers: usize,
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<DashboardResponse>, AppError> {
    claims.require_role(&OPS_ROLES)?;

    let active_orders = state
        .orders
        .count_where(|order| ACTIVE_STATUSES.contains(&order.status));
    let delayed_orders = state.orders.count_where(|order| {
        !order.status.is_terminal() && order.eta_delta_minutes >= ALERT_DELTA_MIN
    });
    let sla_breaches = state.orders.count_where(|order| {
        !order.status.is_terminal() && order.eta_delta_minutes >= SLA_BREACH_DELTA_MIN
    });
    let new_alerts = state.alerts.list_filtered(None, None, Some(true)).len();
    let available_couriers = state
        .couriers
        .list()
        .into_iter()
        .filter(|courier| courier.is_available)
        .count();

    Ok(Json(DashboardResponse {
        active_orders,
        delayed_orders,
        sla_breaches,
        new_alerts,
        available_couriers,
    }))
}

#[derive(Deserialize)]
pub struct OrderFilters {
    pub status: Option<String>,
    pub min_risk: Option<f64>,
    pub zone: Option<String>,
    pub limit: Option<usize>,
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Query(filters): Query<OrderFilters>,
) -> Result<Json<Vec<Order>>, AppError> {
    claims.require_role(&OPS_ROLES)?;

    let status = filters
        .status
        .map(|raw| parse_status(&raw))
        .transpose()?;

    Ok(Json(state.orders.list_filtered(
        status,
        filters.min_risk,
        filters.zone.as_deref(),
        filters.limit.unwrap_or(OPS_LIST_LIMIT),
    )))
}

#[derive(Serialize)]
pub struct OpsOrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub alerts: Vec<Alert>,
    pub history: Vec<OrderStatusEvent>,
    pub assignment: Option<CourierAssignment>,
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OpsOrderDetail>, AppError> {
    claims.require_role(&OPS_ROLES)?;
    let order = find_order(&state, id)?;

    Ok(Json(OpsOrderDetail {
        items: state.orders.items_for_order(id),
        alerts: state.alerts.list_for_order(id),
        history: state.orders.status_history(id),
        assignment: state.couriers.active_assignment_for_order(id),
        order,
    }))
}

#[derive(Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

async fn set_order_status(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetStatusRequest>,
) -> Result<Json<Order>, AppError> {
    claims.require_role(&OPS_ROLES)?;

    let status = parse_status(&payload.status)?;
    find_order(&state, id)?;

    let updated = state
        .orders
        .update(id, |o| o.status = status)
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;
    state
        .orders
        .record_status_event(id, status, Some(claims.sub));
    state
        .audit
        .record(claims.sub, "SET_STATUS", "order", &id.to_string());
    // Every status write queues a recompute, terminal ones included.
    state.risk_queue.enqueue(RiskJob { order_id: id }).await?;
    broadcast_order_update(&state, &updated);

    Ok(Json(updated))
}

#[derive(Deserialize)]
pub struct AssignRequest {
    pub courier_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct AssignResponse {
    pub assignment: CourierAssignment,
    pub order: Order,
}

async fn assign_courier(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignRequest>,
) -> Result<Json<AssignResponse>, AppError> {
    claims.require_role(&OPS_ROLES)?;
    let order = find_order(&state, id)?;
    if order.status.is_terminal() {
        return Err(AppError::Conflict(format!(
            "order {id} is already {}",
            serde_json::to_string(&order.status).unwrap_or_default()
        )));
    }

    // Manual assignment to a known courier, or a lazily created demo
    // courier when the console asks for "anyone".
    let courier_id = match payload.courier_id {
        Some(courier_id) => {
            state
                .couriers
                .get(courier_id)
                .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))?;
            courier_id
        }
        None => state.couriers.ensure(Uuid::new_v4(), "demo-courier").id,
    };

    let assignment = state.couriers.create_assignment(id, courier_id);
    state.couriers.set_availability(courier_id, false);

    let updated = state
        .orders
        .update(id, |o| o.status = OrderStatus::Assigned)
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;
    state
        .orders
        .record_status_event(id, OrderStatus::Assigned, Some(claims.sub));
    state
        .audit
        .record(claims.sub, "ASSIGN_COURIER", "order", &id.to_string());

    state.risk_queue.enqueue(RiskJob { order_id: id }).await?;
    broadcast_order_update(&state, &updated);

    Ok(Json(AssignResponse {
        assignment,
        order: updated,
    }))
}

#[derive(Deserialize)]
pub struct NotifyRequest {
    pub message: String,
}

async fn notify_customer(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<NotifyRequest>,
) -> Result<Json<NotificationLog>, AppError> {
    claims.require_role(&OPS_ROLES)?;
    let order = find_order(&state, id)?;

    if payload.message.trim().is_empty() {
        return Err(AppError::BadRequest("message is required".to_string()));
    }

    let log = NotificationLog {
        id: Uuid::new_v4(),
        user_id: order.customer_id,
        order_id: id,
        alert_type: None,
        channel: NotificationChannel::InApp,
        status: NotificationStatus::Sent,
        created_at: Utc::now(),
    };
    state.notifications.insert(log.clone());
    state.hub.emit_to_customer(
        order.customer_id,
        "customer.notifications.new",
        json!({
            "order_id": id,
            "message": payload.message.trim(),
        }),
    );

    Ok(Json(log))
}

#[derive(Deserialize)]
pub struct OverrideEtaRequest {
    pub current_eta: i64,
    pub delay_reason: Option<String>,
}

async fn override_eta(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<OverrideEtaRequest>,
) -> Result<Json<Order>, AppError> {
    claims.require_role(&OPS_ROLES)?;
    let order = find_order(&state, id)?;

    if payload.current_eta <= 0 {
        return Err(AppError::BadRequest(
            "current_eta must be positive".to_string(),
        ));
    }

    let risk = compute_risk(order.promised_eta, payload.current_eta);
    let updated = state
        .orders
        .update(id, |o| {
            o.current_eta = payload.current_eta;
            o.eta_delta_minutes = risk.delta;
            o.risk_score = risk.risk_score;
            o.risk_reasons = risk.reasons.clone();
            if let Some(reason) = &payload.delay_reason {
                o.delay_reason = Some(reason.clone());
            }
        })
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;
    state
        .audit
        .record(claims.sub, "OVERRIDE_ETA", "order", &id.to_string());
    broadcast_order_update(&state, &updated);

    Ok(Json(updated))
}

async fn live_map(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<MapSnapshot>, AppError> {
    claims.require_role(&OPS_ROLES)?;
    Ok(Json(build_map_snapshot(
        &state.orders,
        &state.couriers,
        &state.snapshots,
        Utc::now(),
    )))
}

async fn list_couriers(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<Vec<Courier>>, AppError> {
    claims.require_role(&OPS_ROLES)?;
    Ok(Json(state.couriers.list()))
}

#[derive(Deserialize)]
pub struct CourierLocationRequest {
    pub lat: f64,
    pub lon: f64,
}

async fn set_courier_location(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CourierLocationRequest>,
) -> Result<Json<Courier>, AppError> {
    claims.require_role(&OPS_ROLES)?;

    if !payload.lat.is_finite() || !payload.lon.is_finite() {
        return Err(AppError::BadRequest(
            "coordinates must be finite numbers".to_string(),
        ));
    }

    let courier = state
        .couriers
        .set_location(
            id,
            GeoPoint {
                lat: payload.lat,
                lon: payload.lon,
            },
        )
        .ok_or_else(|| AppError::NotFound(format!("courier {id} not found")))?;

    Ok(Json(courier))
}

#[derive(Deserialize)]
pub struct AuditFilters {
    pub entity_id: Option<String>,
}

async fn audit_logs(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Query(filters): Query<AuditFilters>,
) -> Result<Json<Vec<AuditLog>>, AppError> {
    claims.require_role(&OPS_ROLES)?;
    Ok(Json(state.audit.list(filters.entity_id.as_deref())))
}

fn parse_status(raw: &str) -> Result<OrderStatus, AppError> {
    serde_json::from_value(Value::String(raw.to_string()))
        .map_err(|_| AppError::BadRequest(format!("unknown status: {raw}")))
}

fn find_order(state: &AppState, id: Uuid) -> Result<Order, AppError> {
    state
        .orders
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))
}

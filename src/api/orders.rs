use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::broadcast_order_update;
use crate::auth::AuthUser;
use crate::engine::map::expiry_distance_min;
use crate::engine::risk::{compute_risk, delay_level, DelayLevel};
use crate::error::AppError;
use crate::geo::FALLBACK_ZONE;
use crate::models::alert::{
    Alert, AlertSeverity, AlertType, NotificationChannel, NotificationLog, NotificationStatus,
};
use crate::models::courier::GeoPoint;
use crate::models::order::{
    IssueTicket, Order, OrderItem, OrderStatus, OrderStatusEvent, PaymentStatus, RefundStatus,
};
use crate::models::user::Role;
use crate::queue::RiskJob;
use crate::state::AppState;

const DEFAULT_PROMISED_ETA_MIN: i64 = 25;
const CUSTOMER_LIST_LIMIT: usize = 50;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/tracking", get(get_tracking))
        .route("/orders/:id/pay", post(pay_order))
        .route("/orders/:id/cancel", post(cancel_order))
        .route("/orders/:id/issues", post(create_issue).get(list_issues))
}

#[derive(Deserialize)]
pub struct CreateOrderItem {
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default = "default_unit_price")]
    pub unit_price: f64,
}

fn default_quantity() -> u32 {
    1
}

fn default_unit_price() -> f64 {
    10.0
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub address_lat: f64,
    pub address_lon: f64,
    pub customer_zone: String,
    pub restaurant_zone: Option<String>,
    pub promised_eta: Option<i64>,
    #[serde(default)]
    pub items: Vec<CreateOrderItem>,
}

#[derive(Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<OrderDetail>, AppError> {
    claims.require_role(&[Role::Customer])?;

    if !payload.address_lat.is_finite() || !payload.address_lon.is_finite() {
        return Err(AppError::BadRequest(
            "address coordinates must be finite numbers".to_string(),
        ));
    }
    if payload.customer_zone.trim().is_empty() {
        return Err(AppError::BadRequest("customer_zone is required".to_string()));
    }
    let promised_eta = payload.promised_eta.unwrap_or(DEFAULT_PROMISED_ETA_MIN);
    if promised_eta <= 0 {
        return Err(AppError::BadRequest(
            "promised_eta must be positive".to_string(),
        ));
    }

    let risk = compute_risk(promised_eta, promised_eta);
    let order = Order {
        id: Uuid::new_v4(),
        customer_id: claims.sub,
        status: OrderStatus::Created,
        promised_eta,
        current_eta: promised_eta,
        eta_delta_minutes: risk.delta,
        risk_score: risk.risk_score,
        risk_reasons: risk.reasons,
        payment_status: PaymentStatus::Pending,
        refund_status: RefundStatus::None,
        customer_zone: payload.customer_zone.trim().to_string(),
        restaurant_zone: payload
            .restaurant_zone
            .as_deref()
            .map(str::trim)
            .filter(|zone| !zone.is_empty())
            .unwrap_or(FALLBACK_ZONE)
            .to_string(),
        address_lat: payload.address_lat,
        address_lon: payload.address_lon,
        external_id: None,
        delay_reason: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    let order_id = order.id;
    state.orders.insert(order.clone());

    let items: Vec<OrderItem> = payload
        .items
        .into_iter()
        .map(|item| OrderItem {
            id: Uuid::new_v4(),
            order_id,
            name: item.name,
            quantity: item.quantity,
            unit_price: item.unit_price,
        })
        .collect();
    state.orders.insert_items(items.clone());
    state
        .orders
        .record_status_event(order_id, OrderStatus::Created, Some(claims.sub));

    state.risk_queue.enqueue(RiskJob { order_id }).await?;
    broadcast_order_update(&state, &order);

    Ok(Json(OrderDetail { order, items }))
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<Vec<Order>>, AppError> {
    claims.require_role(&[Role::Customer])?;
    Ok(Json(
        state
            .orders
            .list_for_customer(claims.sub, CUSTOMER_LIST_LIMIT),
    ))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderDetail>, AppError> {
    claims.require_role(&[Role::Customer])?;
    let order = owned_order(&state, id, claims.sub)?;
    let items = state.orders.items_for_order(id);
    Ok(Json(OrderDetail { order, items }))
}

#[derive(Serialize)]
pub struct TrackingResponse {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub current_eta: i64,
    pub eta_delta_minutes: i64,
    pub delay_level: DelayLevel,
    pub delay_reason: Option<String>,
    pub courier_location: Option<GeoPoint>,
    pub history: Vec<OrderStatusEvent>,
    pub traffic_snapshot_age_min: Option<i64>,
    pub weather_snapshot_age_min: Option<i64>,
}

async fn get_tracking(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<TrackingResponse>, AppError> {
    claims.require_role(&[Role::Customer])?;
    let order = owned_order(&state, id, claims.sub)?;

    let courier_location = state
        .couriers
        .active_assignment_for_order(id)
        .and_then(|assignment| state.couriers.get(assignment.courier_id))
        .map(|courier| courier.location);

    let now = Utc::now();
    let scope = id.to_string();
    let traffic_snapshot_age_min = state
        .snapshots
        .latest_traffic(&scope)
        .map(|snapshot| expiry_distance_min(now, snapshot.expires_at));
    let weather_snapshot_age_min = state
        .snapshots
        .latest_weather(&scope)
        .map(|snapshot| expiry_distance_min(now, snapshot.expires_at));

    Ok(Json(TrackingResponse {
        order_id: order.id,
        status: order.status,
        current_eta: order.current_eta,
        eta_delta_minutes: order.eta_delta_minutes,
        delay_level: delay_level(order.eta_delta_minutes),
        delay_reason: order.delay_reason,
        courier_location,
        history: state.orders.status_history(id),
        traffic_snapshot_age_min,
        weather_snapshot_age_min,
    }))
}

#[derive(Deserialize)]
pub struct PayRequest {
    #[serde(default = "default_payment_success")]
    pub success: bool,
}

fn default_payment_success() -> bool {
    true
}

async fn pay_order(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<PayRequest>,
) -> Result<Json<Order>, AppError> {
    claims.require_role(&[Role::Customer])?;
    let order = owned_order(&state, id, claims.sub)?;

    // A failed capture stays retryable.
    let payable = matches!(
        order.payment_status,
        PaymentStatus::Pending | PaymentStatus::Failed
    );
    if !payable {
        return Err(AppError::Conflict(format!(
            "order {id} is not awaiting payment"
        )));
    }

    if !payload.success {
        let updated = state
            .orders
            .update(id, |o| o.payment_status = PaymentStatus::Failed)
            .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;
        state
            .audit
            .record(claims.sub, "PAY_ORDER", "order", &id.to_string());
        broadcast_order_update(&state, &updated);
        return Ok(Json(updated));
    }

    // Successful payment moves a freshly created order into preparation.
    let advance = order.status == OrderStatus::Created;
    let updated = state
        .orders
        .update(id, |o| {
            o.payment_status = PaymentStatus::Paid;
            if advance {
                o.status = OrderStatus::Preparing;
            }
        })
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;
    if advance {
        state
            .orders
            .record_status_event(id, OrderStatus::Preparing, Some(claims.sub));
    }
    state
        .audit
        .record(claims.sub, "PAY_ORDER", "order", &id.to_string());

    state.risk_queue.enqueue(RiskJob { order_id: id }).await?;
    broadcast_order_update(&state, &updated);

    Ok(Json(updated))
}

async fn cancel_order(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    claims.require_role(&[Role::Customer])?;
    let order = owned_order(&state, id, claims.sub)?;

    if !order.status.cancellable() {
        return Err(AppError::Conflict(format!(
            "order {id} can no longer be cancelled"
        )));
    }

    let updated = state
        .orders
        .update(id, |o| {
            o.status = OrderStatus::Cancelled;
            if o.payment_status == PaymentStatus::Paid {
                o.payment_status = PaymentStatus::Refunded;
                o.refund_status = RefundStatus::Pending;
            }
        })
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;
    state
        .orders
        .record_status_event(id, OrderStatus::Cancelled, Some(claims.sub));
    state
        .audit
        .record(claims.sub, "CANCEL_ORDER", "order", &id.to_string());
    broadcast_order_update(&state, &updated);

    Ok(Json(updated))
}

#[derive(Deserialize)]
pub struct CreateIssueRequest {
    pub issue_type: String,
}

async fn create_issue(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateIssueRequest>,
) -> Result<Json<IssueTicket>, AppError> {
    claims.require_role(&[Role::Customer])?;
    owned_order(&state, id, claims.sub)?;

    if payload.issue_type.trim().is_empty() {
        return Err(AppError::BadRequest("issue_type is required".to_string()));
    }

    let now = Utc::now();
    let issue = IssueTicket {
        id: Uuid::new_v4(),
        order_id: id,
        customer_id: claims.sub,
        issue_type: payload.issue_type.trim().to_string(),
        status: "OPEN".to_string(),
        created_at: now,
    };
    state.orders.insert_issue(issue.clone());

    // A reported issue surfaces on the ops console as a low-severity alert.
    state.alerts.insert(Alert {
        id: Uuid::new_v4(),
        order_id: id,
        alert_type: AlertType::StockRisk,
        severity: AlertSeverity::Low,
        is_new: true,
        acknowledged_by: None,
        created_at: now,
    });
    state.notifications.insert(NotificationLog {
        id: Uuid::new_v4(),
        user_id: claims.sub,
        order_id: id,
        alert_type: Some(AlertType::StockRisk),
        channel: NotificationChannel::InApp,
        status: NotificationStatus::Queued,
        created_at: now,
    });

    Ok(Json(issue))
}

async fn list_issues(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<IssueTicket>>, AppError> {
    claims.require_role(&[Role::Customer])?;
    owned_order(&state, id, claims.sub)?;
    Ok(Json(state.orders.issues_for(id, claims.sub)))
}

/// Customers only ever see their own orders; a foreign id reads as absent.
fn owned_order(state: &AppState, id: Uuid, customer_id: Uuid) -> Result<Order, AppError> {
    state
        .orders
        .get_for_customer(id, customer_id)
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))
}

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::api::broadcast_order_update;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::courier::{Courier, GeoPoint};
use crate::models::order::{Order, OrderStatus};
use crate::models::user::Role;
use crate::queue::RiskJob;
use crate::state::AppState;

/// The only transitions a courier may record. Everything else belongs to
/// the ops console.
const COURIER_STATUSES: [OrderStatus; 3] = [
    OrderStatus::PickedUp,
    OrderStatus::OnRoute,
    OrderStatus::Delivered,
];

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/courier/orders", get(list_assigned_orders))
        .route("/courier/orders/:id/status", patch(set_order_status))
        .route("/courier/location", patch(set_location))
}

async fn list_assigned_orders(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<Vec<Order>>, AppError> {
    claims.require_role(&[Role::Courier])?;
    state.couriers.ensure(claims.sub, "courier");

    let orders = state
        .couriers
        .active_assignments_for_courier(claims.sub)
        .into_iter()
        .filter_map(|assignment| state.orders.get(assignment.order_id))
        .collect();

    Ok(Json(orders))
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
    claims.require_role(&[Role::Courier])?;

    let status: OrderStatus = serde_json::from_value(Value::String(payload.status.clone()))
        .map_err(|_| AppError::BadRequest(format!("unknown status: {}", payload.status)))?;
    if !COURIER_STATUSES.contains(&status) {
        return Err(AppError::BadRequest(format!(
            "couriers cannot set status {}",
            payload.status
        )));
    }

    state
        .orders
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;
    let assignment = state
        .couriers
        .active_assignment(claims.sub, id)
        .ok_or_else(|| AppError::Forbidden("order is not assigned to you".to_string()))?;

    let updated = state
        .orders
        .update(id, |o| o.status = status)
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;
    state
        .orders
        .record_status_event(id, status, Some(claims.sub));

    if status == OrderStatus::Delivered {
        state.couriers.end_assignment(assignment.id);
        state.couriers.set_availability(claims.sub, true);
    } else {
        state.couriers.set_availability(claims.sub, false);
    }
    state.risk_queue.enqueue(RiskJob { order_id: id }).await?;

    broadcast_order_update(&state, &updated);

    Ok(Json(updated))
}

#[derive(Deserialize)]
pub struct SetLocationRequest {
    pub lat: f64,
    pub lon: f64,
}

async fn set_location(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<SetLocationRequest>,
) -> Result<Json<Courier>, AppError> {
    claims.require_role(&[Role::Courier])?;

    if !payload.lat.is_finite() || !payload.lon.is_finite() {
        return Err(AppError::BadRequest(
            "coordinates must be finite numbers".to_string(),
        ));
    }

    state.couriers.ensure(claims.sub, "courier");
    let courier = state
        .couriers
        .set_location(
            claims.sub,
            GeoPoint {
                lat: payload.lat,
                lon: payload.lon,
            },
        )
        .ok_or_else(|| AppError::NotFound("courier not found".to_string()))?;

    Ok(Json(courier))
}

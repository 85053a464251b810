use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::alert::{Alert, AlertSeverity, AlertType};
use crate::models::user::Role;
use crate::state::AppState;

const OPS_ROLES: [Role; 2] = [Role::Ops, Role::Admin];

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/alerts", get(list_my_alerts))
        .route("/ops/alerts", get(list_ops_alerts))
        .route("/ops/alerts/:id/ack", post(acknowledge_alert))
}

async fn list_my_alerts(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<Vec<Alert>>, AppError> {
    claims.require_role(&[Role::Customer])?;

    let order_ids: Vec<Uuid> = state
        .orders
        .list_for_customer(claims.sub, usize::MAX)
        .into_iter()
        .map(|order| order.id)
        .collect();

    Ok(Json(state.alerts.list_for_orders(&order_ids)))
}

#[derive(Deserialize)]
pub struct AlertFilters {
    #[serde(rename = "type")]
    pub alert_type: Option<String>,
    pub severity: Option<String>,
    pub is_new: Option<bool>,
}

async fn list_ops_alerts(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Query(filters): Query<AlertFilters>,
) -> Result<Json<Vec<Alert>>, AppError> {
    claims.require_role(&OPS_ROLES)?;

    let alert_type: Option<AlertType> = filters
        .alert_type
        .map(|raw| {
            serde_json::from_value(Value::String(raw.clone()))
                .map_err(|_| AppError::BadRequest(format!("unknown alert type: {raw}")))
        })
        .transpose()?;
    let severity: Option<AlertSeverity> = filters
        .severity
        .map(|raw| {
            serde_json::from_value(Value::String(raw.clone()))
                .map_err(|_| AppError::BadRequest(format!("unknown severity: {raw}")))
        })
        .transpose()?;

    Ok(Json(
        state.alerts.list_filtered(alert_type, severity, filters.is_new),
    ))
}

async fn acknowledge_alert(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Alert>, AppError> {
    claims.require_role(&OPS_ROLES)?;

    let alert = state
        .alerts
        .acknowledge(id, claims.sub)
        .ok_or_else(|| AppError::NotFound(format!("alert {id} not found")))?;
    state
        .audit
        .record(claims.sub, "ACK_ALERT", "alert", &id.to_string());

    Ok(Json(alert))
}

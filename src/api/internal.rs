use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::AppError;
use crate::realtime::relay::INTERNAL_SECRET_HEADER;
use crate::realtime::resolve_room;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/internal/realtime/emit", post(emit))
}

#[derive(Deserialize)]
pub struct EmitRequest {
    pub room: String,
    pub event: String,
    pub payload: Value,
}

#[derive(Serialize)]
pub struct EmitResponse {
    pub ok: bool,
    pub delivered: usize,
}

/// Worker-facing bridge into the room fan-out. Authenticated by shared
/// secret, not by user token; never exposed beyond the service network.
async fn emit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<EmitRequest>,
) -> Result<Json<EmitResponse>, AppError> {
    let provided = headers
        .get(INTERNAL_SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing internal secret".to_string()))?;
    if provided != state.internal_secret {
        return Err(AppError::Unauthorized("invalid internal secret".to_string()));
    }

    let delivered = match resolve_room(&payload.room) {
        Some(room) => state.hub.emit(&room, &payload.event, payload.payload),
        None => {
            debug!(room = %payload.room, "dropping emit into unroutable room");
            0
        }
    };

    Ok(Json(EmitResponse {
        ok: true,
        delivered,
    }))
}

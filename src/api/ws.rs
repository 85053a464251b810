use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};

use crate::auth::{bearer_from_headers, verify_token};
use crate::error::AppError;
use crate::models::user::Role;
use crate::realtime::{customer_room, OPS_ROOM};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// Browser clients cannot set headers on the upgrade request, so the token
/// also rides in the query string. Authentication happens before the
/// upgrade; a bad token never gets a socket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let token = query
        .token
        .or_else(|| bearer_from_headers(&headers))
        .ok_or_else(|| AppError::Unauthorized("missing token".to_string()))?;
    let claims = verify_token(&state.jwt_secret, &token)?;

    // Customers get exactly their own room; every other role shares ops.
    let room = match claims.role {
        Role::Customer => customer_room(claims.sub),
        Role::Courier | Role::Ops | Role::Admin => OPS_ROOM.to_string(),
    };

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, room)))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, room: String) {
    let (mut sender, mut receiver) = socket.split();
    let rx = state.hub.subscribe(&room);

    state.metrics.ws_connections.inc();
    info!(room = %room, "websocket client connected");

    let send_task = tokio::spawn(async move {
        let mut events = BroadcastStream::new(rx);
        while let Some(result) = events.next().await {
            let envelope = match result {
                Ok(envelope) => envelope,
                // Lagged receiver: skip the dropped events and keep going.
                Err(_) => continue,
            };

            let json = match serde_json::to_string(&envelope) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize event for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    state.metrics.ws_connections.dec();
    info!(room = %room, "websocket client disconnected");
}

use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::realtime::{resolve_room, RealtimeHub};

pub const INTERNAL_SECRET_HEADER: &str = "x-internal-secret";

/// Boundary between "who computes an event" (the workers) and "who owns the
/// transport" (the API process holding the sockets). Workers only ever emit
/// through this trait.
pub trait EventSink: Send + Sync {
    fn emit(
        &self,
        room: String,
        event: String,
        payload: Value,
    ) -> BoxFuture<'static, Result<(), AppError>>;
}

/// Production sink: an authenticated one-shot POST to the API process's
/// internal emit endpoint. Stateless per call.
pub struct HttpRelay {
    client: reqwest::Client,
    base_url: String,
    secret: String,
}

impl HttpRelay {
    pub fn new(base_url: String, secret: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            secret,
        }
    }
}

impl EventSink for HttpRelay {
    fn emit(
        &self,
        room: String,
        event: String,
        payload: Value,
    ) -> BoxFuture<'static, Result<(), AppError>> {
        let client = self.client.clone();
        let url = format!("{}/internal/realtime/emit", self.base_url);
        let secret = self.secret.clone();

        Box::pin(async move {
            client
                .post(&url)
                .header(INTERNAL_SECRET_HEADER, secret)
                .json(&json!({
                    "room": room,
                    "event": event,
                    "payload": payload,
                }))
                .send()
                .await
                .map_err(|err| AppError::Internal(format!("realtime relay failed: {err}")))?
                .error_for_status()
                .map_err(|err| AppError::Internal(format!("realtime relay rejected: {err}")))?;
            Ok(())
        })
    }
}

/// Single-process sink: collapses the relay onto the in-process hub while
/// keeping the trait boundary and the room-name resolution identical to the
/// HTTP path.
pub struct HubSink {
    hub: Arc<RealtimeHub>,
}

impl HubSink {
    pub fn new(hub: Arc<RealtimeHub>) -> Self {
        Self { hub }
    }
}

impl EventSink for HubSink {
    fn emit(
        &self,
        room: String,
        event: String,
        payload: Value,
    ) -> BoxFuture<'static, Result<(), AppError>> {
        let hub = self.hub.clone();
        Box::pin(async move {
            if let Some(resolved) = resolve_room(&room) {
                hub.emit(&resolved, &event, payload);
            }
            Ok(())
        })
    }
}

pub mod relay;

use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Shared room for all operations staff.
pub const OPS_ROOM: &str = "ops:global";

pub fn customer_room(user_id: Uuid) -> String {
    format!("customer:{user_id}")
}

/// Maps a caller-supplied room name onto an actual room. `"ops"` is the
/// wire-level alias workers use for the shared room; anything that is not
/// the ops alias or a customer room is dropped rather than broadcast.
pub fn resolve_room(room: &str) -> Option<String> {
    if room == "ops" || room == OPS_ROOM {
        Some(OPS_ROOM.to_string())
    } else if room.starts_with("customer:") {
        Some(room.to_string())
    } else {
        None
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    pub event: String,
    pub payload: Value,
}

/// Per-room broadcast fan-out. Rooms are created lazily on first subscribe
/// or emit; an emit into a room with no subscribers is a no-op.
pub struct RealtimeHub {
    rooms: DashMap<String, broadcast::Sender<EventEnvelope>>,
    buffer: usize,
}

impl RealtimeHub {
    pub fn new(buffer: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            buffer,
        }
    }

    fn sender(&self, room: &str) -> broadcast::Sender<EventEnvelope> {
        self.rooms
            .entry(room.to_string())
            .or_insert_with(|| broadcast::channel(self.buffer).0)
            .value()
            .clone()
    }

    pub fn subscribe(&self, room: &str) -> broadcast::Receiver<EventEnvelope> {
        self.sender(room).subscribe()
    }

    /// Returns the number of subscribers the event reached.
    pub fn emit(&self, room: &str, event: &str, payload: Value) -> usize {
        let envelope = EventEnvelope {
            event: event.to_string(),
            payload,
        };
        self.sender(room).send(envelope).unwrap_or(0)
    }

    pub fn emit_to_customer(&self, user_id: Uuid, event: &str, payload: Value) -> usize {
        self.emit(&customer_room(user_id), event, payload)
    }

    pub fn emit_to_ops(&self, event: &str, payload: Value) -> usize {
        self.emit(OPS_ROOM, event, payload)
    }
}

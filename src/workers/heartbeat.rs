use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::state::AppState;

/// Liveness stamp with a short expiry. External health checks detect a
/// stalled worker pool by the stamp's absence or staleness.
#[derive(Default)]
pub struct WorkerHeartbeat {
    inner: RwLock<Option<HeartbeatStamp>>,
}

#[derive(Debug, Clone, Copy)]
struct HeartbeatStamp {
    beaten_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl WorkerHeartbeat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn beat(&self, ttl: Duration) {
        let now = Utc::now();
        let mut stamp = self.inner.write().expect("heartbeat lock poisoned");
        *stamp = Some(HeartbeatStamp {
            beaten_at: now,
            expires_at: now + ttl,
        });
    }

    pub fn is_alive(&self, now: DateTime<Utc>) -> bool {
        let stamp = self.inner.read().expect("heartbeat lock poisoned");
        stamp.map(|s| s.expires_at >= now).unwrap_or(false)
    }

    pub fn last_beat(&self) -> Option<DateTime<Utc>> {
        let stamp = self.inner.read().expect("heartbeat lock poisoned");
        stamp.map(|s| s.beaten_at)
    }
}

pub async fn run_heartbeat(state: Arc<AppState>, interval_secs: u64, ttl_secs: i64) {
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
    loop {
        ticker.tick().await;
        state.heartbeat.beat(Duration::seconds(ttl_secs));
        debug!("worker heartbeat written");
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::WorkerHeartbeat;

    #[test]
    fn missing_heartbeat_is_not_alive() {
        let heartbeat = WorkerHeartbeat::new();
        assert!(!heartbeat.is_alive(Utc::now()));
    }

    #[test]
    fn fresh_heartbeat_is_alive_until_ttl_passes() {
        let heartbeat = WorkerHeartbeat::new();
        heartbeat.beat(Duration::seconds(20));

        let now = Utc::now();
        assert!(heartbeat.is_alive(now));
        assert!(!heartbeat.is_alive(now + Duration::seconds(21)));
    }
}

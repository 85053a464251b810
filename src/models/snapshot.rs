use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Cached external-signal response. `geo_scope` is either an order id
/// (fine-grained) or a named zone (coarse). Staleness is detected lazily on
/// read by comparing `expires_at` against now; nothing evicts in the
/// background.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalSnapshot {
    pub geo_scope: String,
    pub payload: Value,
    pub source: String,
    pub expires_at: DateTime<Utc>,
}

impl SignalSnapshot {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at >= now
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Queued,
    Running,
    Completed,
}

/// One batch per uploaded file. Status only moves forward; row counters are
/// written once, when processing finishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadBatch {
    pub id: Uuid,
    pub file_url: String,
    pub status: BatchStatus,
    pub total_rows: u64,
    pub success_rows: u64,
    pub failed_rows: u64,
    pub created_at: DateTime<Utc>,
}

/// One per CSV line. Immutable once written: an audit trail, not a retry
/// queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRow {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub raw_row: Value,
    pub normalized_row: Value,
    pub error: Option<String>,
    pub order_external_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

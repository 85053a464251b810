use std::sync::RwLock;

use dashmap::DashMap;
use uuid::Uuid;

use crate::models::import::{BatchStatus, UploadBatch, UploadRow};

#[derive(Default)]
pub struct UploadRepository {
    batches: DashMap<Uuid, UploadBatch>,
    rows: RwLock<Vec<UploadRow>>,
}

impl UploadRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_batch(&self, batch: UploadBatch) {
        self.batches.insert(batch.id, batch);
    }

    pub fn get_batch(&self, id: Uuid) -> Option<UploadBatch> {
        self.batches.get(&id).map(|entry| entry.value().clone())
    }

    /// QUEUED → RUNNING. Progression is monotonic; a completed batch never
    /// reverts.
    pub fn mark_running(&self, id: Uuid) -> Option<UploadBatch> {
        let mut batch = self.batches.get_mut(&id)?;
        if batch.status == BatchStatus::Queued {
            batch.status = BatchStatus::Running;
        }
        Some(batch.value().clone())
    }

    /// Writes the final counters in one step so partial counts are never
    /// visible during processing.
    pub fn complete(&self, id: Uuid, success_rows: u64, failed_rows: u64) -> Option<UploadBatch> {
        let mut batch = self.batches.get_mut(&id)?;
        batch.status = BatchStatus::Completed;
        batch.total_rows = success_rows + failed_rows;
        batch.success_rows = success_rows;
        batch.failed_rows = failed_rows;
        Some(batch.value().clone())
    }

    pub fn insert_row(&self, row: UploadRow) {
        let mut rows = self.rows.write().expect("upload rows lock poisoned");
        rows.push(row);
    }

    /// Covers rows written earlier in the same batch as well as prior
    /// batches; in-batch duplicate detection depends on this.
    pub fn row_external_id_exists(&self, external_id: &str) -> bool {
        let rows = self.rows.read().expect("upload rows lock poisoned");
        rows.iter()
            .any(|row| row.order_external_id.as_deref() == Some(external_id))
    }

    pub fn rows_for_batch(&self, batch_id: Uuid) -> Vec<UploadRow> {
        let rows = self.rows.read().expect("upload rows lock poisoned");
        let mut matching: Vec<UploadRow> = rows
            .iter()
            .filter(|row| row.batch_id == batch_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        matching
    }
}

use prometheus::IntGauge;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::AppError;

/// Redelivery cap for failed handlers. Stands in for the broker-side retry
/// policy; handlers stay idempotent either way since delivery is
/// at-least-once.
pub const MAX_ATTEMPTS: u32 = 3;

pub const RISK_QUEUE: &str = "risk";
pub const IMPORT_QUEUE: &str = "imports";

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiskJob {
    pub order_id: Uuid,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ImportJob {
    pub batch_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct Job<T> {
    pub payload: T,
    pub attempt: u32,
}

/// Producer half of a named durable-contract queue. Jobs carry only entity
/// ids; handlers re-read current state so a redelivered or reordered job is
/// harmless.
#[derive(Clone)]
pub struct JobQueue<T> {
    name: &'static str,
    tx: mpsc::Sender<Job<T>>,
    depth: IntGauge,
}

impl<T: Send + 'static> JobQueue<T> {
    pub fn new(
        name: &'static str,
        capacity: usize,
        depth: IntGauge,
    ) -> (Self, mpsc::Receiver<Job<T>>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { name, tx, depth }, rx)
    }

    pub async fn enqueue(&self, payload: T) -> Result<(), AppError> {
        self.enqueue_job(Job {
            payload,
            attempt: 0,
        })
        .await
    }

    pub async fn enqueue_job(&self, job: Job<T>) -> Result<(), AppError> {
        self.tx
            .send(job)
            .await
            .map_err(|err| AppError::Internal(format!("{} queue send failed: {err}", self.name)))?;

        self.depth.inc();
        Ok(())
    }
}

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::{json, Map, Value};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::blob::object_name_from_url;
use crate::engine::risk::compute_risk;
use crate::error::AppError;
use crate::geo::FALLBACK_ZONE;
use crate::models::import::UploadRow;
use crate::models::order::{Order, OrderItem, OrderStatus, PaymentStatus, RefundStatus};
use crate::queue::{ImportJob, Job, RiskJob, IMPORT_QUEUE, MAX_ATTEMPTS};
use crate::state::AppState;

const DEFAULT_PROMISED_ETA_MIN: i64 = 25;
const DEFAULT_ITEM_NAME: &str = "Item";
const DEFAULT_ITEM_QUANTITY: u32 = 1;
const DEFAULT_ITEM_UNIT_PRICE: f64 = 10.0;

pub async fn run_import_worker(state: Arc<AppState>, mut rx: mpsc::Receiver<Job<ImportJob>>) {
    info!("import worker started");

    while let Some(job) = rx.recv().await {
        state
            .metrics
            .jobs_in_queue
            .with_label_values(&[IMPORT_QUEUE])
            .dec();

        let start = Instant::now();
        match process_import_job(&state, job.payload.batch_id).await {
            Ok(()) => {
                let elapsed = start.elapsed().as_secs_f64();
                state
                    .metrics
                    .job_latency_seconds
                    .with_label_values(&[IMPORT_QUEUE, "success"])
                    .observe(elapsed);
                state
                    .metrics
                    .jobs_total
                    .with_label_values(&[IMPORT_QUEUE, "success"])
                    .inc();
            }
            Err(err) => {
                let elapsed = start.elapsed().as_secs_f64();
                state
                    .metrics
                    .job_latency_seconds
                    .with_label_values(&[IMPORT_QUEUE, "error"])
                    .observe(elapsed);
                state
                    .metrics
                    .jobs_total
                    .with_label_values(&[IMPORT_QUEUE, "error"])
                    .inc();
                error!(error = %err, batch_id = %job.payload.batch_id, "import job failed");

                if job.attempt + 1 < MAX_ATTEMPTS {
                    let retry = Job {
                        payload: job.payload,
                        attempt: job.attempt + 1,
                    };
                    if let Err(err) = state.import_queue.enqueue_job(retry).await {
                        error!(error = %err, "failed to re-enqueue import job");
                    }
                }
            }
        }
    }

    warn!("import worker stopped: queue channel closed");
}

/// Processes one uploaded CSV batch. Every data line produces exactly one
/// persisted row, valid or not, and the batch counters are written once at
/// the end.
pub async fn process_import_job(state: &AppState, batch_id: Uuid) -> Result<(), AppError> {
    let Some(batch) = state.uploads.get_batch(batch_id) else {
        return Ok(());
    };
    state.uploads.mark_running(batch_id);

    let object_name = object_name_from_url(&batch.file_url)
        .ok_or_else(|| AppError::Internal(format!("unparseable file url: {}", batch.file_url)))?;
    let bytes = state
        .blobs
        .get(object_name)
        .ok_or_else(|| AppError::Internal(format!("upload object missing: {object_name}")))?;
    let content = String::from_utf8(bytes)
        .map_err(|err| AppError::Internal(format!("upload is not valid utf8: {err}")))?;

    let mut lines = content.lines().filter(|line| !line.trim().is_empty());
    let header: Vec<String> = match lines.next() {
        Some(line) => line.split(',').map(|col| col.trim().to_string()).collect(),
        None => {
            state.uploads.complete(batch_id, 0, 0);
            return Ok(());
        }
    };

    let mut success_rows = 0u64;
    let mut failed_rows = 0u64;

    for line in lines {
        // Field values never contain commas here; items_json in practice is
        // a bare `[]` or a quoted-key-free array.
        let cols: Vec<&str> = line.split(',').map(str::trim).collect();
        let mut raw = Map::new();
        for (idx, name) in header.iter().enumerate() {
            let value = cols.get(idx).copied().unwrap_or_default();
            raw.insert(name.clone(), Value::String(value.to_string()));
        }
        let raw_row = Value::Object(raw.clone());

        let field = |name: &str| -> Option<String> {
            raw.get(name)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        let lat = field("address_lat").and_then(|v| v.parse::<f64>().ok());
        let lon = field("address_lon").and_then(|v| v.parse::<f64>().ok());
        let customer_zone = field("customer_zone");
        let items_json = field("items_json");
        let external_id = field("order_external_id");

        let mut error: Option<&str> = None;
        let mut items_value = Value::Array(Vec::new());

        if lat.is_none_or(|v| !v.is_finite())
            || lon.is_none_or(|v| !v.is_finite())
            || customer_zone.is_none()
            || items_json.is_none()
        {
            error = Some("missing_required_fields");
        }
        if let Some(ref raw_items) = items_json {
            match serde_json::from_str::<Value>(raw_items) {
                Ok(parsed) if parsed.is_array() => items_value = parsed,
                _ => error = Some("invalid_items_json"),
            }
        }
        if let Some(ref ext) = external_id {
            if state.orders.external_id_exists(ext) || state.uploads.row_external_id_exists(ext) {
                error = Some("duplicate_order_external_id");
            }
        }

        let customer = if error.is_none() {
            match state.users.first_customer() {
                Some(user) => Some(user),
                None => {
                    error = Some("no_customer_account");
                    None
                }
            }
        } else {
            None
        };

        if let Some(reason) = error {
            state.uploads.insert_row(UploadRow {
                id: Uuid::new_v4(),
                batch_id,
                raw_row: raw_row.clone(),
                normalized_row: raw_row,
                error: Some(reason.to_string()),
                order_external_id: None,
                created_at: Utc::now(),
            });
            failed_rows += 1;
            state
                .metrics
                .import_rows_total
                .with_label_values(&["failed"])
                .inc();
            continue;
        }

        let customer = customer.expect("customer resolved for valid row");
        let customer_zone = customer_zone.expect("customer_zone present for valid row");
        let restaurant_zone =
            field("restaurant_zone").unwrap_or_else(|| FALLBACK_ZONE.to_string());
        let risk = compute_risk(DEFAULT_PROMISED_ETA_MIN, DEFAULT_PROMISED_ETA_MIN);
        let order = Order {
            id: Uuid::new_v4(),
            customer_id: customer.id,
            status: OrderStatus::Created,
            promised_eta: DEFAULT_PROMISED_ETA_MIN,
            current_eta: DEFAULT_PROMISED_ETA_MIN,
            eta_delta_minutes: risk.delta,
            risk_score: risk.risk_score,
            risk_reasons: risk.reasons,
            payment_status: PaymentStatus::Pending,
            refund_status: RefundStatus::None,
            customer_zone: customer_zone.clone(),
            restaurant_zone: restaurant_zone.clone(),
            address_lat: lat.expect("lat parsed for valid row"),
            address_lon: lon.expect("lon parsed for valid row"),
            external_id: external_id.clone(),
            delay_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let order_id = order.id;
        state.orders.insert(order);

        let items: Vec<OrderItem> = items_value
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| OrderItem {
                        id: Uuid::new_v4(),
                        order_id,
                        name: entry
                            .get("name")
                            .and_then(Value::as_str)
                            .unwrap_or(DEFAULT_ITEM_NAME)
                            .to_string(),
                        quantity: entry
                            .get("quantity")
                            .and_then(Value::as_u64)
                            .map(|qty| qty as u32)
                            .unwrap_or(DEFAULT_ITEM_QUANTITY),
                        unit_price: entry
                            .get("unit_price")
                            .and_then(Value::as_f64)
                            .unwrap_or(DEFAULT_ITEM_UNIT_PRICE),
                    })
                    .collect()
            })
            .unwrap_or_default();
        state.orders.insert_items(items);
        state
            .orders
            .record_status_event(order_id, OrderStatus::Created, None);

        state.uploads.insert_row(UploadRow {
            id: Uuid::new_v4(),
            batch_id,
            raw_row,
            normalized_row: json!({
                "external_id": external_id,
                "address_lat": lat,
                "address_lon": lon,
                "customer_zone": customer_zone,
                "restaurant_zone": restaurant_zone,
                "items": items_value,
            }),
            error: None,
            order_external_id: external_id,
            created_at: Utc::now(),
        });
        success_rows += 1;
        state
            .metrics
            .import_rows_total
            .with_label_values(&["success"])
            .inc();

        state.risk_queue.enqueue(RiskJob { order_id }).await?;
    }

    state.uploads.complete(batch_id, success_rows, failed_rows);
    info!(
        batch_id = %batch_id,
        success = success_rows,
        failed = failed_rows,
        "import batch completed"
    );
    Ok(())
}

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::blob::object_url;
use crate::error::AppError;
use crate::models::import::{BatchStatus, UploadBatch, UploadRow};
use crate::models::user::Role;
use crate::queue::ImportJob;
use crate::state::AppState;

const OPS_ROLES: [Role; 2] = [Role::Ops, Role::Admin];

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/uploads", post(create_upload))
        .route("/uploads/:id", get(get_upload))
}

#[derive(Deserialize)]
pub struct CreateUploadRequest {
    pub filename: Option<String>,
    /// Raw CSV content. The file never passes through the queue; only the
    /// batch id does.
    pub content: String,
}

async fn create_upload(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<CreateUploadRequest>,
) -> Result<Json<UploadBatch>, AppError> {
    claims.require_role(&OPS_ROLES)?;

    if payload.content.trim().is_empty() {
        return Err(AppError::BadRequest("content is required".to_string()));
    }

    let filename = payload
        .filename
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or("orders.csv");
    let object_name = format!("{}-{filename}", Utc::now().timestamp_millis());
    state.blobs.put(&object_name, payload.content.into_bytes());

    let batch = UploadBatch {
        id: Uuid::new_v4(),
        file_url: object_url(&object_name),
        status: BatchStatus::Queued,
        total_rows: 0,
        success_rows: 0,
        failed_rows: 0,
        created_at: Utc::now(),
    };
    state.uploads.insert_batch(batch.clone());
    state
        .import_queue
        .enqueue(ImportJob { batch_id: batch.id })
        .await?;
    state
        .audit
        .record(claims.sub, "CREATE_UPLOAD", "upload_batch", &batch.id.to_string());

    Ok(Json(batch))
}

#[derive(Serialize)]
pub struct UploadDetail {
    #[serde(flatten)]
    pub batch: UploadBatch,
    pub rows: Vec<UploadRow>,
}

async fn get_upload(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<UploadDetail>, AppError> {
    claims.require_role(&OPS_ROLES)?;

    let batch = state
        .uploads
        .get_batch(id)
        .ok_or_else(|| AppError::NotFound(format!("upload batch {id} not found")))?;

    Ok(Json(UploadDetail {
        rows: state.uploads.rows_for_batch(id),
        batch,
    }))
}

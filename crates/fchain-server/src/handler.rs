use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::rejection::PathRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use fchain_ingest::{
    Block, IngestError, PendingUpload, StagedFile, SyncStatus, ValidationReport,
};
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// Multipart field carrying the file content.
pub const FILE_FIELD: &str = "file";

/// Accepted spellings of the external reference field.
pub const EXTERNAL_REF_FIELDS: [&str; 3] = ["iscsi", "externalRef", "external_ref"];

/// `POST /upload`
///
/// The file is streamed to a staged temp file as it arrives, so the
/// external reference may come before or after it in the form.
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Block>, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let limit = state.service.store().max_upload_bytes();

    let mut staged = None;
    let mut external_ref: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == FILE_FIELD {
            if staged.is_some() {
                return Err(ApiError::BadRequest("duplicate file field".into()));
            }
            let file_name = field
                .file_name()
                .map(str::to_owned)
                .filter(|n| !n.trim().is_empty())
                .ok_or_else(|| ApiError::BadRequest("file field must carry a filename".into()))?;
            let pending = state
                .service
                .store()
                .begin(&file_name)
                .await
                .map_err(IngestError::from)?;
            staged = Some(stream_field(field, pending, limit).await?);
        } else if EXTERNAL_REF_FIELDS.contains(&name.as_str()) {
            if external_ref.is_some() {
                return Err(ApiError::BadRequest("duplicate external reference field".into()));
            }
            external_ref = Some(field.text().await.map_err(|e| multipart_error(e, limit))?);
        } else {
            debug!(field = %name, "ignoring unknown form field");
        }
    }

    let staged = staged.ok_or_else(|| ApiError::BadRequest("missing file field".into()))?;
    let block = state.service.ingest_staged(staged, external_ref).await?;
    Ok(Json(block))
}

async fn stream_field(
    mut field: Field<'_>,
    mut pending: PendingUpload,
    limit: u64,
) -> Result<StagedFile, ApiError> {
    while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, limit))? {
        pending.write(&chunk).await.map_err(IngestError::from)?;
    }
    Ok(pending.finish().await.map_err(IngestError::from)?)
}

fn multipart_error(err: MultipartError, limit: u64) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        IngestError::TooLarge { limit }.into()
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

/// `GET /chain`
pub async fn chain(State(state): State<AppState>) -> Result<Json<Vec<Block>>, ApiError> {
    Ok(Json(state.service.chain()?))
}

/// `GET /chain/:index`
pub async fn block(
    State(state): State<AppState>,
    index: Result<Path<u64>, PathRejection>,
) -> Result<Json<Block>, ApiError> {
    let Path(index) = index.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    state
        .service
        .block(index)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("block {index}")))
}

/// `GET /chain/verify`
pub async fn verify(State(state): State<AppState>) -> Result<Json<ValidationReport>, ApiError> {
    Ok(Json(state.service.verify()?))
}

/// `GET /chain/status`
pub async fn status(State(state): State<AppState>) -> Result<Json<SyncStatus>, ApiError> {
    Ok(Json(state.service.status()?))
}

/// `POST /chain/sync`
pub async fn sync(State(state): State<AppState>) -> Result<Json<SyncStatus>, ApiError> {
    Ok(Json(state.service.reconcile().await?))
}

/// `GET /health`
pub async fn health() -> &'static str {
    "ok"
}

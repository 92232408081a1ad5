//! File ingestion HTTP handlers.
//!
//! Endpoints:
//! - POST   /api/v1/files?name=...  - Enqueue a document (raw body, mime from Content-Type)
//! - GET    /api/v1/files           - List files in enqueue order (optional ?status=)
//! - GET    /api/v1/files/{id}      - Get a single file
//! - DELETE /api/v1/files/{id}      - Remove a file, cancelling its processing

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ragdesk_types::error::IngestError;
use ragdesk_types::file::{FileDescriptor, FileStatus, IngestFile};

use crate::http::error::AppError;
use crate::http::handlers::parse_uuid;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RemoveResult {
    pub id: Uuid,
    pub removed: bool,
}

/// POST /api/v1/files - Enqueue one document for ingestion.
///
/// Responds 202 with the queued file; progress is observed by polling.
pub async fn upload_file(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<ApiResponse<IngestFile>, AppError> {
    let timer = RequestTimer::start();

    let mime_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
        .ok_or_else(|| AppError::Validation("Content-Type header is required".to_string()))?;

    let descriptor = FileDescriptor::new(query.name, mime_type, body.to_vec());
    let ids = state.pipeline.enqueue(vec![descriptor])?;
    let id = ids
        .first()
        .copied()
        .ok_or_else(|| AppError::Internal("enqueue returned no id".to_string()))?;
    let file = state
        .pipeline
        .get(&id)
        .ok_or(AppError::Ingest(IngestError::NotFound(id)))?;

    Ok(timer
        .finish(file)
        .with_status(StatusCode::ACCEPTED)
        .with_link("self", &format!("/api/v1/files/{id}")))
}

/// GET /api/v1/files - List files with their current status.
///
/// `?status=completed` keeps only files in that status.
pub async fn list_files(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<ApiResponse<Vec<IngestFile>>, AppError> {
    let timer = RequestTimer::start();
    let status = query
        .status
        .as_deref()
        .map(str::parse::<FileStatus>)
        .transpose()
        .map_err(AppError::Validation)?;

    let files = state
        .pipeline
        .list()
        .into_iter()
        .filter(|file| status.is_none_or(|s| file.status == s))
        .collect();

    Ok(timer.finish(files).with_link("self", "/api/v1/files"))
}

/// GET /api/v1/files/{id}
pub async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<IngestFile>, AppError> {
    let timer = RequestTimer::start();
    let id = parse_uuid(&id)?;
    let file = state
        .pipeline
        .get(&id)
        .ok_or(AppError::Ingest(IngestError::NotFound(id)))?;

    Ok(timer
        .finish(file)
        .with_link("self", &format!("/api/v1/files/{id}")))
}

/// DELETE /api/v1/files/{id} - Idempotent; `removed` is false if nothing was there.
pub async fn delete_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<RemoveResult>, AppError> {
    let timer = RequestTimer::start();
    let id = parse_uuid(&id)?;
    let removed = state.pipeline.remove(&id);
    Ok(timer.finish(RemoveResult { id, removed }))
}

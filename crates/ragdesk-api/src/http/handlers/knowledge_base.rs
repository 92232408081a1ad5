//! Knowledge-base HTTP handlers.
//!
//! Endpoints:
//! - POST /api/v1/knowledge-bases       - Create from ingested files
//! - GET  /api/v1/knowledge-bases       - List in creation order
//! - GET  /api/v1/knowledge-bases/{id}  - Get one

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use ragdesk_types::knowledge_base::KnowledgeBase;

use crate::http::error::AppError;
use crate::http::handlers::parse_uuid;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateKnowledgeBaseRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub file_ids: Vec<Uuid>,
}

/// POST /api/v1/knowledge-bases
pub async fn create_knowledge_base(
    State(state): State<AppState>,
    Json(req): Json<CreateKnowledgeBaseRequest>,
) -> Result<ApiResponse<KnowledgeBase>, AppError> {
    let timer = RequestTimer::start();
    let kb = state
        .knowledge_bases
        .create(&*state.pipeline, &req.name, &req.description, req.file_ids)?;
    let link = format!("/api/v1/knowledge-bases/{}", kb.id);

    Ok(timer
        .finish(kb)
        .with_status(StatusCode::CREATED)
        .with_link("self", &link))
}

/// GET /api/v1/knowledge-bases
pub async fn list_knowledge_bases(State(state): State<AppState>) -> ApiResponse<Vec<KnowledgeBase>> {
    RequestTimer::start()
        .finish(state.knowledge_bases.list())
        .with_link("self", "/api/v1/knowledge-bases")
}

/// GET /api/v1/knowledge-bases/{id}
pub async fn get_knowledge_base(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<KnowledgeBase>, AppError> {
    let timer = RequestTimer::start();
    let id = parse_uuid(&id)?;
    let kb = state.knowledge_bases.get(&id)?;
    Ok(timer.finish(kb))
}

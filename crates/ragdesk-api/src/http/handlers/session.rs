//! Chat session HTTP handlers.
//!
//! Endpoints:
//! - POST /api/v1/sessions                - Create a session
//! - GET  /api/v1/sessions                - Session summaries, most recent first
//! - GET  /api/v1/sessions/{id}           - Get a single session
//! - GET  /api/v1/sessions/{id}/messages  - Transcript in timestamp order
//! - POST /api/v1/sessions/{id}/messages  - Send a user message (reply arrives asynchronously)
//! - GET  /api/v1/sessions/{id}/pending   - Whether a reply is outstanding
//! - POST /api/v1/sessions/{id}/abandon   - Cancel the outstanding reply

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ragdesk_types::chat::{ChatMessage, ChatSession, SessionSummary};
use ragdesk_types::error::SessionError;

use crate::http::error::AppError;
use crate::http::handlers::parse_uuid;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResult {
    pub session_id: Uuid,
    pub message_id: Uuid,
    pub awaiting_reply: bool,
}

#[derive(Debug, Serialize)]
pub struct PendingStatus {
    pub session_id: Uuid,
    pub awaiting_reply: bool,
}

#[derive(Debug, Serialize)]
pub struct AbandonResult {
    pub session_id: Uuid,
    pub cancelled: bool,
}

fn session_links<T: Serialize>(resp: ApiResponse<T>, id: &Uuid) -> ApiResponse<T> {
    resp.with_link("self", &format!("/api/v1/sessions/{id}"))
        .with_link("messages", &format!("/api/v1/sessions/{id}/messages"))
}

/// POST /api/v1/sessions
pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<ApiResponse<ChatSession>, AppError> {
    let timer = RequestTimer::start();
    let session = state.sessions.create_session(req.name).await?;
    let id = session.id;
    Ok(session_links(timer.finish(session).with_status(StatusCode::CREATED), &id))
}

/// GET /api/v1/sessions
pub async fn list_sessions(State(state): State<AppState>) -> ApiResponse<Vec<SessionSummary>> {
    RequestTimer::start()
        .finish(state.sessions.summaries().await)
        .with_link("self", "/api/v1/sessions")
}

/// GET /api/v1/sessions/{id}
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<ChatSession>, AppError> {
    let timer = RequestTimer::start();
    let id = parse_uuid(&id)?;
    let session = state.sessions.get_session(&id).await?;
    Ok(session_links(timer.finish(session), &id))
}

/// GET /api/v1/sessions/{id}/messages
pub async fn get_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Vec<ChatMessage>>, AppError> {
    let timer = RequestTimer::start();
    let id = parse_uuid(&id)?;
    let messages = state.sessions.messages(&id).await?;
    Ok(timer
        .finish(messages)
        .with_link("self", &format!("/api/v1/sessions/{id}/messages"))
        .with_link("session", &format!("/api/v1/sessions/{id}")))
}

/// POST /api/v1/sessions/{id}/messages
///
/// Responds 202 once the user message is stored. Poll `/pending` or the
/// transcript for the assistant's reply.
pub async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> Result<ApiResponse<SendMessageResult>, AppError> {
    let timer = RequestTimer::start();
    let id = parse_uuid(&id)?;
    let message_id = state.engine.send_user_message(id, &req.content).await?;
    let result = SendMessageResult {
        session_id: id,
        message_id,
        awaiting_reply: state.engine.is_awaiting_reply(&id),
    };
    Ok(timer
        .finish(result)
        .with_status(StatusCode::ACCEPTED)
        .with_link("pending", &format!("/api/v1/sessions/{id}/pending"))
        .with_link("messages", &format!("/api/v1/sessions/{id}/messages")))
}

/// GET /api/v1/sessions/{id}/pending
pub async fn get_pending(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<PendingStatus>, AppError> {
    let timer = RequestTimer::start();
    let id = parse_uuid(&id)?;
    if !state.sessions.contains(&id) {
        return Err(SessionError::NotFound(id).into());
    }
    Ok(timer.finish(PendingStatus {
        session_id: id,
        awaiting_reply: state.engine.is_awaiting_reply(&id),
    }))
}

/// POST /api/v1/sessions/{id}/abandon
pub async fn abandon(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<AbandonResult>, AppError> {
    let timer = RequestTimer::start();
    let id = parse_uuid(&id)?;
    if !state.sessions.contains(&id) {
        return Err(SessionError::NotFound(id).into());
    }
    let cancelled = state.engine.abandon_session(&id);
    Ok(timer.finish(AbandonResult {
        session_id: id,
        cancelled,
    }))
}

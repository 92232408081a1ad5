//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use ragdesk_types::error::{
    ChatError, IngestError, KnowledgeBaseError, SessionError, ValidationError,
};

use crate::http::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    Ingest(IngestError),
    KnowledgeBase(KnowledgeBaseError),
    Session(SessionError),
    Chat(ChatError),
    /// Malformed request (bad UUID, missing header).
    Validation(String),
    Internal(String),
}

impl From<IngestError> for AppError {
    fn from(e: IngestError) -> Self {
        AppError::Ingest(e)
    }
}

impl From<KnowledgeBaseError> for AppError {
    fn from(e: KnowledgeBaseError) -> Self {
        AppError::KnowledgeBase(e)
    }
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        AppError::Session(e)
    }
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        AppError::Chat(e)
    }
}

fn validation(e: &ValidationError) -> (StatusCode, &'static str, String) {
    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
}

fn session(e: &SessionError) -> (StatusCode, &'static str, String) {
    match e {
        SessionError::NotFound(_) => (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND", e.to_string()),
        SessionError::Validation(v) => validation(v),
        SessionError::Persistence(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "PERSISTENCE_ERROR",
            e.to_string(),
        ),
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Ingest(IngestError::Validation(v)) => validation(v),
            AppError::Ingest(e @ IngestError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "FILE_NOT_FOUND", e.to_string())
            }
            AppError::KnowledgeBase(KnowledgeBaseError::Validation(v)) => validation(v),
            AppError::KnowledgeBase(e @ KnowledgeBaseError::UnknownFile(_)) => {
                (StatusCode::BAD_REQUEST, "UNKNOWN_FILE", e.to_string())
            }
            AppError::KnowledgeBase(e @ KnowledgeBaseError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "KNOWLEDGE_BASE_NOT_FOUND", e.to_string())
            }
            AppError::Session(e) => session(e),
            AppError::Chat(ChatError::Validation(v)) => validation(v),
            AppError::Chat(e @ ChatError::ReplyPending(_)) => {
                (StatusCode::CONFLICT, "REPLY_PENDING", e.to_string())
            }
            AppError::Chat(ChatError::Session(e)) => session(e),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.clone())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(code, %message, "Request failed");
        }
        ApiResponse::error(status, code, &message).into_response()
    }
}

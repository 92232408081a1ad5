use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

/// Input rejected at the boundary, before any state is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("message must not be empty")]
    EmptyMessage,

    #[error("at least one file is required")]
    NoFiles,

    #[error("file '{0}' is empty")]
    EmptyFile(String),

    #[error("file '{name}' has unsupported type '{mime_type}'")]
    UnsupportedType { name: String, mime_type: String },
}

/// Errors from ingestion pipeline operations.
///
/// Backend failures during progression are not surfaced here; they are
/// recorded on the file itself as `FileStatus::Error`.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("file {0} not found")]
    NotFound(Uuid),
}

/// Errors from knowledge base creation.
#[derive(Debug, Error)]
pub enum KnowledgeBaseError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("file {0} is not in the ingestion listing")]
    UnknownFile(Uuid),

    #[error("knowledge base {0} not found")]
    NotFound(Uuid),
}

/// Errors from session store operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("persistence error: {0}")]
    Persistence(#[from] RepositoryError),
}

/// Errors from the conversation engine's send path.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("session {0} is already awaiting a reply")]
    ReplyPending(Uuid),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Failures from the storage service's upload call.
#[derive(Debug, Clone, Error)]
pub enum UploadError {
    #[error("upload rejected: {0}")]
    Rejected(String),

    #[error("file too large: {size} bytes exceeds limit of {max} bytes")]
    TooLarge { size: u64, max: u64 },

    #[error("unsupported file type: {0}")]
    UnsupportedType(String),
}

/// Failures from the storage service's processing call.
#[derive(Debug, Clone, Error)]
pub enum ProcessingError {
    #[error("processing failed: {0}")]
    ProcessingFailed(String),
}

/// Failures from the external answer service.
#[derive(Debug, Clone, Error)]
pub enum AnswerError {
    #[error("answer service unavailable: {0}")]
    Unavailable(String),

    #[error("answer service timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors from repository operations (used by trait definitions in ragdesk-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

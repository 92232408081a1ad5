//! Event types for the ragdesk event bus.
//!
//! `CoreEvent` carries entity snapshots from the core components to the
//! presentation layer. All variants are Clone + Send + Sync for use with
//! tokio broadcast channels.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chat::{ChatMessage, ChatSession};
use crate::file::{FileStatus, IngestFile};
use crate::knowledge_base::KnowledgeBase;

/// Events emitted by the ingestion pipeline, session store, and
/// conversation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoreEvent {
    /// A file was registered at `Queued`.
    FileQueued { file: IngestFile },

    /// A file's progress advanced within its current stage.
    FileProgress {
        file_id: Uuid,
        status: FileStatus,
        progress: u8,
    },

    /// A file moved to a new stage (progress reset) or a terminal status.
    FileStatusChanged {
        file_id: Uuid,
        from: FileStatus,
        to: FileStatus,
        file: IngestFile,
    },

    /// A file was removed from the listing. No further events follow for it.
    FileRemoved { file_id: Uuid },

    KnowledgeBaseCreated { knowledge_base: KnowledgeBase },

    SessionCreated { session: ChatSession },

    /// A message was appended to a session transcript.
    MessageAppended { message: ChatMessage },

    /// A reply request was issued for a session.
    ReplyPending { session_id: Uuid, request_id: Uuid },

    /// A reply request resolved (appended, failed, or cancelled).
    ReplyResolved {
        session_id: Uuid,
        request_id: Uuid,
        outcome: ReplyOutcome,
    },
}

impl CoreEvent {
    /// Stable snake_case label, matching the serialized `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreEvent::FileQueued { .. } => "file_queued",
            CoreEvent::FileProgress { .. } => "file_progress",
            CoreEvent::FileStatusChanged { .. } => "file_status_changed",
            CoreEvent::FileRemoved { .. } => "file_removed",
            CoreEvent::KnowledgeBaseCreated { .. } => "knowledge_base_created",
            CoreEvent::SessionCreated { .. } => "session_created",
            CoreEvent::MessageAppended { .. } => "message_appended",
            CoreEvent::ReplyPending { .. } => "reply_pending",
            CoreEvent::ReplyResolved { .. } => "reply_resolved",
        }
    }
}

/// How a pending reply ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyOutcome {
    Answered,
    Failed,
    TimedOut,
    Cancelled,
}

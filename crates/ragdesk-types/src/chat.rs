//! Chat session, message, and citation types for ragdesk.
//!
//! These types model conversations between a user and the document-grounded
//! assistant: sessions, the ordered messages within them, and the source
//! citations attached to assistant replies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Maximum length of the last-message preview in a [`SessionSummary`].
pub const PREVIEW_CHARS: usize = 60;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::User => write!(f, "user"),
            Sender::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for Sender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Sender::User),
            "assistant" => Ok(Sender::Assistant),
            other => Err(format!("invalid sender: '{other}'")),
        }
    }
}

/// Distinguishes regular transcript entries from visible failure notices.
///
/// A failed or timed-out reply is still recorded as an `Assistant` message so
/// the user sees it, but with kind `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Normal,
    Error,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::Normal => write!(f, "normal"),
            MessageKind::Error => write!(f, "error"),
        }
    }
}

impl FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(MessageKind::Normal),
            "error" => Ok(MessageKind::Error),
            other => Err(format!("invalid message kind: '{other}'")),
        }
    }
}

/// A reference to the document backing part of an assistant reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub document_name: String,
}

impl Citation {
    pub fn new(document_name: impl Into<String>) -> Self {
        Self {
            document_name: document_name.into(),
        }
    }
}

/// One ordered conversation thread.
///
/// `message_ids` is ordered by append time; message timestamps are strictly
/// increasing along it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub message_ids: Vec<Uuid>,
}

impl ChatSession {
    pub fn message_count(&self) -> usize {
        self.message_ids.len()
    }
}

/// A single message within a chat session. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub session_id: Uuid,
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Citation>,
    #[serde(default)]
    pub kind: MessageKind,
}

/// A message as submitted to the session store, before it receives an id
/// and its final (monotonic) timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub content: String,
    pub sender: Sender,
    pub sources: Vec<Citation>,
    pub kind: MessageKind,
    /// Caller-supplied timestamp; the store may move it forward.
    pub timestamp: DateTime<Utc>,
}

impl NewMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sender: Sender::User,
            sources: Vec::new(),
            kind: MessageKind::Normal,
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>, sources: Vec<Citation>) -> Self {
        Self {
            content: content.into(),
            sender: Sender::Assistant,
            sources,
            kind: MessageKind::Normal,
            timestamp: Utc::now(),
        }
    }

    /// A visible failure notice in the transcript.
    pub fn error_notice(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sender: Sender::Assistant,
            sources: Vec::new(),
            kind: MessageKind::Error,
            timestamp: Utc::now(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// A session together with its full transcript, as loaded from persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub session: ChatSession,
    pub messages: Vec<ChatMessage>,
}

/// Sidebar-style overview of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub name: String,
    pub last_activity_at: DateTime<Utc>,
    pub message_count: usize,
    pub last_message_preview: String,
}

impl SessionSummary {
    pub fn from_parts(session: &ChatSession, last_message: Option<&ChatMessage>) -> Self {
        let last_message_preview = last_message
            .map(|m| preview(&m.content))
            .unwrap_or_default();
        Self {
            id: session.id,
            name: session.name.clone(),
            last_activity_at: session.last_activity_at,
            message_count: session.message_count(),
            last_message_preview,
        }
    }
}

fn preview(content: &str) -> String {
    let single_line = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= PREVIEW_CHARS {
        single_line
    } else {
        let cut: String = single_line.chars().take(PREVIEW_CHARS - 3).collect();
        format!("{cut}...")
    }
}

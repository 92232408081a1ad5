//! Non-durable session repository. Contents are lost on restart.

use dashmap::DashMap;
use ragdesk_core::chat::repository::SessionRepository;
use ragdesk_types::chat::{ChatMessage, ChatSession, StoredSession};
use ragdesk_types::error::RepositoryError;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: DashMap<Uuid, StoredSession>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionRepository for InMemorySessionRepository {
    async fn load_sessions(&self) -> Result<Vec<StoredSession>, RepositoryError> {
        let mut sessions: Vec<StoredSession> =
            self.sessions.iter().map(|e| e.value().clone()).collect();
        sessions.sort_by_key(|s| s.session.created_at);
        Ok(sessions)
    }

    async fn save_session(&self, session: &ChatSession) -> Result<(), RepositoryError> {
        self.sessions
            .entry(session.id)
            .and_modify(|stored| stored.session = session.clone())
            .or_insert_with(|| StoredSession {
                session: session.clone(),
                messages: Vec::new(),
            });
        Ok(())
    }

    async fn save_message(&self, message: &ChatMessage) -> Result<(), RepositoryError> {
        let mut stored = self
            .sessions
            .get_mut(&message.session_id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.messages.iter().any(|m| m.id == message.id) {
            return Err(RepositoryError::Conflict(format!(
                "message {} already saved",
                message.id
            )));
        }
        if !stored.session.message_ids.contains(&message.id) {
            stored.session.message_ids.push(message.id);
        }
        stored.session.last_activity_at = stored.session.last_activity_at.max(message.timestamp);
        stored.messages.push(message.clone());
        Ok(())
    }
}

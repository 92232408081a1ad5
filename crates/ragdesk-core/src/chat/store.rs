//! Session store: owns every chat session and its transcript.
//!
//! Each session sits behind its own `tokio::sync::Mutex`, so appends to one
//! session are serialized while different sessions proceed independently.
//! An append persists through the repository first and only then becomes
//! visible in memory.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use ragdesk_types::chat::{
    ChatMessage, ChatSession, MessageKind, NewMessage, Sender, SessionSummary, StoredSession,
};
use ragdesk_types::config::ChatSettings;
use ragdesk_types::error::{SessionError, ValidationError};
use ragdesk_types::event::CoreEvent;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use super::repository::SessionRepository;
use crate::event::EventBus;

/// Smallest gap between consecutive message timestamps in one session.
const TIMESTAMP_TICK_MS: i64 = 1;

struct SessionRecord {
    session: ChatSession,
    messages: Vec<ChatMessage>,
}

pub struct SessionStore<R> {
    sessions: DashMap<Uuid, Arc<Mutex<SessionRecord>>>,
    repo: R,
    settings: ChatSettings,
    events: EventBus,
}

impl<R: SessionRepository> SessionStore<R> {
    /// Load persisted sessions, creating a default one if there are none.
    pub async fn open(
        repo: R,
        settings: ChatSettings,
        events: EventBus,
    ) -> Result<Self, SessionError> {
        let stored = repo.load_sessions().await?;
        let store = Self {
            sessions: DashMap::new(),
            repo,
            settings,
            events,
        };

        for StoredSession {
            session,
            mut messages,
        } in stored
        {
            messages.sort_by_key(|m| m.timestamp);
            store.sessions.insert(
                session.id,
                Arc::new(Mutex::new(SessionRecord { session, messages })),
            );
        }

        if store.sessions.is_empty() {
            store.create_session(None).await?;
        }
        info!(sessions = store.sessions.len(), "Session store opened");
        Ok(store)
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    /// Create a session seeded with one assistant welcome message.
    ///
    /// `None` uses the configured default name; a blank name is rejected.
    pub async fn create_session(&self, name: Option<String>) -> Result<ChatSession, SessionError> {
        let name = match name {
            Some(name) => {
                let trimmed = name.trim();
                if trimmed.is_empty() {
                    return Err(ValidationError::EmptyName.into());
                }
                trimmed.to_string()
            }
            None => self.settings.default_session_name.clone(),
        };

        let now = Utc::now();
        let session_id = Uuid::now_v7();
        let welcome = ChatMessage {
            id: Uuid::now_v7(),
            session_id,
            content: self.settings.welcome_message.clone(),
            sender: Sender::Assistant,
            timestamp: now,
            sources: Vec::new(),
            kind: MessageKind::Normal,
        };
        let session = ChatSession {
            id: session_id,
            name,
            created_at: now,
            last_activity_at: now,
            message_ids: vec![welcome.id],
        };

        self.repo.save_session(&session).await?;
        self.repo.save_message(&welcome).await?;

        self.sessions.insert(
            session_id,
            Arc::new(Mutex::new(SessionRecord {
                session: session.clone(),
                messages: vec![welcome],
            })),
        );
        info!(session_id = %session_id, name = %session.name, "Session created");
        self.events.publish(CoreEvent::SessionCreated {
            session: session.clone(),
        });
        Ok(session)
    }

    pub fn contains(&self, session_id: &Uuid) -> bool {
        self.sessions.contains_key(session_id)
    }

    fn record(&self, session_id: &Uuid) -> Result<Arc<Mutex<SessionRecord>>, SessionError> {
        self.sessions
            .get(session_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(SessionError::NotFound(*session_id))
    }

    fn records(&self) -> Vec<Arc<Mutex<SessionRecord>>> {
        self.sessions
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// All sessions, most recently active first.
    pub async fn list_sessions(&self) -> Vec<ChatSession> {
        let mut sessions = Vec::with_capacity(self.sessions.len());
        for record in self.records() {
            sessions.push(record.lock().await.session.clone());
        }
        sessions.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));
        sessions
    }

    pub async fn get_session(&self, session_id: &Uuid) -> Result<ChatSession, SessionError> {
        let record = self.record(session_id)?;
        let guard = record.lock().await;
        Ok(guard.session.clone())
    }

    /// Transcript of a session, oldest first.
    pub async fn messages(&self, session_id: &Uuid) -> Result<Vec<ChatMessage>, SessionError> {
        let record = self.record(session_id)?;
        let guard = record.lock().await;
        Ok(guard.messages.clone())
    }

    /// Sidebar summaries, most recently active first.
    pub async fn summaries(&self) -> Vec<SessionSummary> {
        let mut summaries = Vec::with_capacity(self.sessions.len());
        for record in self.records() {
            let guard = record.lock().await;
            summaries.push(SessionSummary::from_parts(
                &guard.session,
                guard.messages.last(),
            ));
        }
        summaries.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));
        summaries
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub async fn message_count(&self) -> usize {
        let mut total = 0;
        for record in self.records() {
            total += record.lock().await.messages.len();
        }
        total
    }

    /// Append a message, moving its timestamp forward if needed so
    /// timestamps stay strictly increasing within the session.
    pub async fn append_message(
        &self,
        session_id: Uuid,
        message: NewMessage,
    ) -> Result<ChatMessage, SessionError> {
        self.append_message_if(session_id, message, || true)
            .await?
            .ok_or(SessionError::NotFound(session_id))
    }

    /// Like [`append_message`](Self::append_message), but `proceed` is
    /// evaluated under the session lock and the append is skipped (returning
    /// `Ok(None)`) when it yields `false`.
    pub async fn append_message_if<F>(
        &self,
        session_id: Uuid,
        message: NewMessage,
        proceed: F,
    ) -> Result<Option<ChatMessage>, SessionError>
    where
        F: FnOnce() -> bool,
    {
        let record = self.record(&session_id)?;
        let mut guard = record.lock().await;
        if !proceed() {
            debug!(session_id = %session_id, "Append skipped");
            return Ok(None);
        }

        let timestamp = next_timestamp(guard.messages.last(), message.timestamp);
        let message = ChatMessage {
            id: Uuid::now_v7(),
            session_id,
            content: message.content,
            sender: message.sender,
            timestamp,
            sources: message.sources,
            kind: message.kind,
        };

        self.repo.save_message(&message).await?;

        guard.session.message_ids.push(message.id);
        guard.session.last_activity_at = timestamp;
        guard.messages.push(message.clone());
        debug!(
            session_id = %session_id,
            message_id = %message.id,
            sender = %message.sender,
            "Message appended"
        );
        self.events.publish(CoreEvent::MessageAppended {
            message: message.clone(),
        });
        Ok(Some(message))
    }
}

fn next_timestamp(previous: Option<&ChatMessage>, requested: DateTime<Utc>) -> DateTime<Utc> {
    match previous {
        Some(prev) => {
            let floor = prev.timestamp + chrono::Duration::milliseconds(TIMESTAMP_TICK_MS);
            requested.max(floor)
        }
        None => requested,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragdesk_types::chat::Citation;
    use ragdesk_types::error::RepositoryError;
    use std::sync::Mutex as StdMutex;

    /// Records what the store persisted; optionally preloaded.
    #[derive(Default)]
    struct RecordingRepo {
        preload: Vec<StoredSession>,
        saved_messages: StdMutex<Vec<ChatMessage>>,
        fail_messages: bool,
    }

    impl SessionRepository for RecordingRepo {
        async fn load_sessions(&self) -> Result<Vec<StoredSession>, RepositoryError> {
            Ok(self.preload.clone())
        }

        async fn save_session(&self, _session: &ChatSession) -> Result<(), RepositoryError> {
            Ok(())
        }

        async fn save_message(&self, message: &ChatMessage) -> Result<(), RepositoryError> {
            if self.fail_messages {
                return Err(RepositoryError::Query("disk full".to_string()));
            }
            self.saved_messages.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    async fn open(repo: RecordingRepo) -> SessionStore<RecordingRepo> {
        SessionStore::open(repo, ChatSettings::default(), EventBus::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_open_seeds_default_session_when_empty() {
        let store = open(RecordingRepo::default()).await;
        let sessions = store.list_sessions().await;
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].name, "New Session");
        assert_eq!(sessions[0].message_count(), 1);
    }

    #[tokio::test]
    async fn test_open_loads_persisted_sessions_without_seeding() {
        let seed = open(RecordingRepo::default()).await;
        let session = seed.list_sessions().await.remove(0);
        let messages = seed.messages(&session.id).await.unwrap();

        let store = open(RecordingRepo {
            preload: vec![StoredSession {
                session: session.clone(),
                messages,
            }],
            ..Default::default()
        })
        .await;
        assert_eq!(store.session_count(), 1);
        assert_eq!(store.get_session(&session.id).await.unwrap(), session);
    }

    #[tokio::test]
    async fn test_create_session_seeds_one_assistant_message() {
        let store = open(RecordingRepo::default()).await;
        let session = store
            .create_session(Some("Policy Questions".to_string()))
            .await
            .unwrap();

        assert_eq!(session.message_ids.len(), 1);
        let messages = store.messages(&session.id).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender, Sender::Assistant);
        assert_eq!(messages[0].content, ChatSettings::default().welcome_message);
    }

    #[tokio::test]
    async fn test_create_session_rejects_blank_name() {
        let store = open(RecordingRepo::default()).await;
        let err = store.create_session(Some("  ".to_string())).await.unwrap_err();
        assert!(matches!(err, SessionError::Validation(ValidationError::EmptyName)));
        assert_eq!(store.session_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let store = open(RecordingRepo::default()).await;
        let id = Uuid::now_v7();
        assert!(matches!(
            store.get_session(&id).await.unwrap_err(),
            SessionError::NotFound(missing) if missing == id
        ));
        assert!(matches!(
            store.append_message(id, NewMessage::user("hi")).await.unwrap_err(),
            SessionError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_timestamps_are_strictly_increasing() {
        let store = open(RecordingRepo::default()).await;
        let session = store.create_session(None).await.unwrap();
        let stale = session.created_at - chrono::Duration::seconds(10);

        for i in 0..5 {
            store
                .append_message(session.id, NewMessage::user(format!("q{i}")).with_timestamp(stale))
                .await
                .unwrap();
        }

        let messages = store.messages(&session.id).await.unwrap();
        assert_eq!(messages.len(), 6);
        for pair in messages.windows(2) {
            assert!(pair[1].timestamp > pair[0].timestamp);
        }
        let updated = store.get_session(&session.id).await.unwrap();
        assert_eq!(updated.last_activity_at, messages[5].timestamp);
        assert_eq!(
            updated.message_ids,
            messages.iter().map(|m| m.id).collect::<Vec<_>>()
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_keep_order() {
        let store = Arc::new(open(RecordingRepo::default()).await);
        let session = store.create_session(None).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..32 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .append_message(session.id, NewMessage::user(format!("m{i}")))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let messages = store.messages(&session.id).await.unwrap();
        assert_eq!(messages.len(), 33);
        for pair in messages.windows(2) {
            assert!(pair[1].timestamp > pair[0].timestamp);
        }
    }

    #[tokio::test]
    async fn test_list_orders_by_last_activity_desc() {
        let store = open(RecordingRepo::default()).await;
        let older = store.create_session(Some("Older".to_string())).await.unwrap();
        let newer = store.create_session(Some("Newer".to_string())).await.unwrap();

        store
            .append_message(
                older.id,
                NewMessage::assistant("See section 4", vec![Citation::new("manual.docx")])
                    .with_timestamp(Utc::now() + chrono::Duration::seconds(5)),
            )
            .await
            .unwrap();

        let sessions = store.list_sessions().await;
        assert_eq!(sessions[0].id, older.id);
        assert!(sessions.iter().any(|s| s.id == newer.id));

        let summaries = store.summaries().await;
        assert_eq!(summaries[0].id, older.id);
        assert_eq!(summaries[0].message_count, 2);
        assert_eq!(summaries[0].last_message_preview, "See section 4");
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_memory_untouched() {
        let store = open(RecordingRepo::default()).await;
        let session = store.list_sessions().await.remove(0);

        // Swap in a failing repo by reopening over the same data.
        let failing = SessionStore::open(
            RecordingRepo {
                preload: vec![StoredSession {
                    session: session.clone(),
                    messages: store.messages(&session.id).await.unwrap(),
                }],
                fail_messages: true,
                ..Default::default()
            },
            ChatSettings::default(),
            EventBus::default(),
        )
        .await
        .unwrap();

        let err = failing
            .append_message(session.id, NewMessage::user("hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Persistence(_)));
        assert_eq!(failing.messages(&session.id).await.unwrap().len(), 1);
        assert_eq!(failing.message_count().await, 1);
    }

    #[tokio::test]
    async fn test_append_if_skips_when_guard_fails() {
        let store = open(RecordingRepo::default()).await;
        let session = store.list_sessions().await.remove(0);

        let skipped = store
            .append_message_if(session.id, NewMessage::assistant("late", vec![]), || false)
            .await
            .unwrap();
        assert!(skipped.is_none());
        assert_eq!(store.messages(&session.id).await.unwrap().len(), 1);
        assert_eq!(store.repo.saved_messages.lock().unwrap().len(), 1);
    }
}

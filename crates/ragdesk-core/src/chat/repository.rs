//! SessionRepository trait definition.
//!
//! The persistence boundary of the session store. Implementations live in
//! ragdesk-infra (`InMemorySessionRepository`, `SqliteSessionRepository`).

use std::future::Future;
use std::pin::Pin;

use ragdesk_types::chat::{ChatMessage, ChatSession, StoredSession};
use ragdesk_types::error::RepositoryError;

/// Repository trait for chat session and message persistence.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait SessionRepository: Send + Sync {
    /// Load every session with its messages ordered by timestamp.
    fn load_sessions(
        &self,
    ) -> impl Future<Output = Result<Vec<StoredSession>, RepositoryError>> + Send;

    /// Insert or replace a session row.
    fn save_session(
        &self,
        session: &ChatSession,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Append a message. Also moves the owning session's `last_activity_at`
    /// to the message timestamp.
    fn save_message(
        &self,
        message: &ChatMessage,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RepositoryError>> + Send + 'a>>;

/// Object-safe version of [`SessionRepository`] with boxed futures.
pub trait SessionRepositoryDyn: Send + Sync {
    fn load_sessions_boxed(&self) -> BoxFuture<'_, Vec<StoredSession>>;
    fn save_session_boxed<'a>(&'a self, session: &'a ChatSession) -> BoxFuture<'a, ()>;
    fn save_message_boxed<'a>(&'a self, message: &'a ChatMessage) -> BoxFuture<'a, ()>;
}

impl<T: SessionRepository> SessionRepositoryDyn for T {
    fn load_sessions_boxed(&self) -> BoxFuture<'_, Vec<StoredSession>> {
        Box::pin(self.load_sessions())
    }

    fn save_session_boxed<'a>(&'a self, session: &'a ChatSession) -> BoxFuture<'a, ()> {
        Box::pin(self.save_session(session))
    }

    fn save_message_boxed<'a>(&'a self, message: &'a ChatMessage) -> BoxFuture<'a, ()> {
        Box::pin(self.save_message(message))
    }
}

/// Type-erased repository for runtime backend selection (memory or SQLite).
pub struct BoxSessionRepository {
    inner: Box<dyn SessionRepositoryDyn>,
}

impl BoxSessionRepository {
    pub fn new<T: SessionRepository + 'static>(repo: T) -> Self {
        Self {
            inner: Box::new(repo),
        }
    }
}

impl SessionRepository for BoxSessionRepository {
    async fn load_sessions(&self) -> Result<Vec<StoredSession>, RepositoryError> {
        self.inner.load_sessions_boxed().await
    }

    async fn save_session(&self, session: &ChatSession) -> Result<(), RepositoryError> {
        self.inner.save_session_boxed(session).await
    }

    async fn save_message(&self, message: &ChatMessage) -> Result<(), RepositoryError> {
        self.inner.save_message_boxed(message).await
    }
}

//! SQLite session repository implementation.
//!
//! Implements `SessionRepository` from `ragdesk-core` using sqlx with split
//! read/write pools, raw queries, and private row structs.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use ragdesk_core::chat::repository::SessionRepository;
use ragdesk_types::chat::{ChatMessage, ChatSession, Citation, MessageKind, Sender, StoredSession};
use ragdesk_types::error::RepositoryError;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

pub struct SqliteSessionRepository {
    pool: DatabasePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct SessionRow {
    id: String,
    name: String,
    created_at: String,
    last_activity_at: String,
}

impl SessionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            created_at: row.try_get("created_at")?,
            last_activity_at: row.try_get("last_activity_at")?,
        })
    }

    fn into_session(self) -> Result<ChatSession, RepositoryError> {
        Ok(ChatSession {
            id: parse_uuid(&self.id, "session id")?,
            name: self.name,
            created_at: parse_datetime(&self.created_at)?,
            last_activity_at: parse_datetime(&self.last_activity_at)?,
            message_ids: Vec::new(),
        })
    }
}

struct MessageRow {
    id: String,
    session_id: String,
    sender: String,
    kind: String,
    content: String,
    sources: String,
    timestamp: String,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            session_id: row.try_get("session_id")?,
            sender: row.try_get("sender")?,
            kind: row.try_get("kind")?,
            content: row.try_get("content")?,
            sources: row.try_get("sources")?,
            timestamp: row.try_get("timestamp")?,
        })
    }

    fn into_message(self) -> Result<ChatMessage, RepositoryError> {
        let sender: Sender = self.sender.parse().map_err(RepositoryError::Query)?;
        let kind: MessageKind = self.kind.parse().map_err(RepositoryError::Query)?;
        let sources: Vec<Citation> = serde_json::from_str(&self.sources)
            .map_err(|e| RepositoryError::Query(format!("invalid sources: {e}")))?;

        Ok(ChatMessage {
            id: parse_uuid(&self.id, "message id")?,
            session_id: parse_uuid(&self.session_id, "session_id")?,
            content: self.content,
            sender,
            timestamp: parse_datetime(&self.timestamp)?,
            sources,
            kind,
        })
    }
}

fn parse_uuid(s: &str, what: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(s).map_err(|e| RepositoryError::Query(format!("invalid {what}: {e}")))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

/// Fixed-width so that text comparison in SQL matches time order.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

impl SessionRepository for SqliteSessionRepository {
    async fn load_sessions(&self) -> Result<Vec<StoredSession>, RepositoryError> {
        let session_rows = sqlx::query("SELECT * FROM chat_sessions ORDER BY created_at ASC")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let message_rows =
            sqlx::query("SELECT * FROM chat_messages ORDER BY session_id, timestamp ASC")
                .fetch_all(&self.pool.reader)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut transcripts: HashMap<Uuid, Vec<ChatMessage>> = HashMap::new();
        for row in &message_rows {
            let message = MessageRow::from_row(row)
                .map_err(|e| RepositoryError::Query(e.to_string()))?
                .into_message()?;
            transcripts.entry(message.session_id).or_default().push(message);
        }

        let mut sessions = Vec::with_capacity(session_rows.len());
        for row in &session_rows {
            let mut session = SessionRow::from_row(row)
                .map_err(|e| RepositoryError::Query(e.to_string()))?
                .into_session()?;
            let messages = transcripts.remove(&session.id).unwrap_or_default();
            session.message_ids = messages.iter().map(|m| m.id).collect();
            sessions.push(StoredSession { session, messages });
        }

        Ok(sessions)
    }

    async fn save_session(&self, session: &ChatSession) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO chat_sessions (id, name, created_at, last_activity_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET
                   name = excluded.name,
                   last_activity_at = excluded.last_activity_at"#,
        )
        .bind(session.id.to_string())
        .bind(&session.name)
        .bind(format_datetime(&session.created_at))
        .bind(format_datetime(&session.last_activity_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn save_message(&self, message: &ChatMessage) -> Result<(), RepositoryError> {
        let sources = serde_json::to_string(&message.sources)
            .map_err(|e| RepositoryError::Query(format!("failed to encode sources: {e}")))?;
        let timestamp = format_datetime(&message.timestamp);

        // INSERT message + bump session activity atomically
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO chat_messages (id, session_id, sender, kind, content, sources, timestamp)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(message.id.to_string())
        .bind(message.session_id.to_string())
        .bind(message.sender.to_string())
        .bind(message.kind.to_string())
        .bind(&message.content)
        .bind(&sources)
        .bind(&timestamp)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.message().contains("UNIQUE") {
                    return RepositoryError::Conflict(format!(
                        "message {} already saved",
                        message.id
                    ));
                }
            }
            RepositoryError::Query(e.to_string())
        })?;

        let result = sqlx::query(
            "UPDATE chat_sessions SET last_activity_at = MAX(last_activity_at, ?) WHERE id = ?",
        )
        .bind(&timestamp)
        .bind(message.session_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_repo() -> (SqliteSessionRepository, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let pool = DatabasePool::new(&url).await.unwrap();
        (SqliteSessionRepository::new(pool), dir)
    }

    fn make_session(name: &str) -> ChatSession {
        let now = Utc::now();
        ChatSession {
            id: Uuid::now_v7(),
            name: name.to_string(),
            created_at: now,
            last_activity_at: now,
            message_ids: Vec::new(),
        }
    }

    fn make_message(session_id: Uuid, sender: Sender, content: &str, offset_ms: i64) -> ChatMessage {
        ChatMessage {
            id: Uuid::now_v7(),
            session_id,
            content: content.to_string(),
            sender,
            timestamp: Utc::now() + chrono::Duration::milliseconds(offset_ms),
            sources: Vec::new(),
            kind: MessageKind::Normal,
        }
    }

    #[tokio::test]
    async fn test_save_and_load_transcript() {
        let (repo, _dir) = test_repo().await;
        let session = make_session("Policy Questions");
        repo.save_session(&session).await.unwrap();

        let welcome = make_message(session.id, Sender::Assistant, "Hello!", 0);
        let question = make_message(session.id, Sender::User, "Refunds?", 5);
        let mut answer = make_message(session.id, Sender::Assistant, "30 days.", 10);
        answer.sources = vec![Citation::new("policy_guide.txt"), Citation::new("manual.docx")];

        // Insert out of order; load orders by timestamp.
        repo.save_message(&welcome).await.unwrap();
        repo.save_message(&answer).await.unwrap();
        repo.save_message(&question).await.unwrap();

        let loaded = repo.load_sessions().await.unwrap();
        assert_eq!(loaded.len(), 1);
        let stored = &loaded[0];
        assert_eq!(stored.session.name, "Policy Questions");
        assert_eq!(
            stored.session.message_ids,
            vec![welcome.id, question.id, answer.id]
        );
        assert_eq!(stored.messages[2], answer);
        assert_eq!(stored.session.last_activity_at, answer.timestamp);
    }

    #[tokio::test]
    async fn test_error_kind_roundtrips() {
        let (repo, _dir) = test_repo().await;
        let session = make_session("Errors");
        repo.save_session(&session).await.unwrap();

        let mut notice = make_message(session.id, Sender::Assistant, "timed out", 1);
        notice.kind = MessageKind::Error;
        repo.save_message(&notice).await.unwrap();

        let loaded = repo.load_sessions().await.unwrap();
        assert_eq!(loaded[0].messages[0].kind, MessageKind::Error);
    }

    #[tokio::test]
    async fn test_message_for_unknown_session_fails() {
        let (repo, _dir) = test_repo().await;
        let orphan = make_message(Uuid::now_v7(), Sender::User, "hi", 0);
        assert!(repo.save_message(&orphan).await.is_err());
        assert!(repo.load_sessions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_message_conflicts() {
        let (repo, _dir) = test_repo().await;
        let session = make_session("Dup");
        repo.save_session(&session).await.unwrap();
        let msg = make_message(session.id, Sender::User, "once", 0);
        repo.save_message(&msg).await.unwrap();

        let err = repo.save_message(&msg).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_save_session_upserts() {
        let (repo, _dir) = test_repo().await;
        let mut session = make_session("Draft");
        repo.save_session(&session).await.unwrap();
        session.name = "Final".to_string();
        repo.save_session(&session).await.unwrap();

        let loaded = repo.load_sessions().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].session.name, "Final");
    }
}

//! Application state wiring all services together.
//!
//! AppState holds the concrete component instances used by both the CLI and
//! the REST API. Core components are generic over their service ports;
//! AppState pins them to the boxed adapters chosen from configuration.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use secrecy::SecretString;
use serde::Serialize;

use ragdesk_core::chat::{BoxAnswerService, BoxSessionRepository, ConversationEngine, SessionStore};
use ragdesk_core::event::EventBus;
use ragdesk_core::ingest::{BoxStorageService, IngestPipeline, KnowledgeBaseRegistry};
use ragdesk_infra::answer::{HttpAnswerService, SimulatedAnswerService};
use ragdesk_infra::config::load_config;
use ragdesk_infra::filesystem::{database_url, resolve_data_dir};
use ragdesk_infra::memory::InMemorySessionRepository;
use ragdesk_infra::sqlite::{DatabasePool, SqliteSessionRepository};
use ragdesk_infra::storage::{HttpStorageService, SimulatedStorageService};
use ragdesk_types::config::{AnswerSettings, AppConfig, ChatSettings, PersistenceBackend, ServiceBackend};
use ragdesk_types::file::FileStatusCounts;

/// Concrete type aliases for the component generics pinned to boxed adapters.
pub type ConcretePipeline = IngestPipeline<BoxStorageService>;
pub type ConcreteSessionStore = SessionStore<BoxSessionRepository>;
pub type ConcreteEngine = ConversationEngine<BoxSessionRepository, BoxAnswerService>;

/// Aggregate counts for the status dashboard.
#[derive(Debug, Serialize)]
pub struct Stats {
    pub files: FileStatusCounts,
    pub total_files: usize,
    pub knowledge_bases: usize,
    pub sessions: usize,
    pub messages: usize,
    pub pending_replies: usize,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub data_dir: PathBuf,
    pub events: EventBus,
    pub pipeline: Arc<ConcretePipeline>,
    pub knowledge_bases: Arc<KnowledgeBaseRegistry>,
    pub sessions: Arc<ConcreteSessionStore>,
    pub engine: Arc<ConcreteEngine>,
    db_pool: Option<DatabasePool>,
}

impl AppState {
    /// Resolve the data directory, load `config.toml`, and wire components.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;

        let config = load_config(&data_dir).await;
        Self::from_config(data_dir, config).await
    }

    /// Wire components from an already loaded configuration.
    pub async fn from_config(data_dir: PathBuf, config: AppConfig) -> anyhow::Result<Self> {
        let events = EventBus::default();

        let storage = build_storage(&config)?;
        let pipeline = IngestPipeline::new(storage, config.ingest.clone(), events.clone());
        let knowledge_bases = KnowledgeBaseRegistry::new(events.clone());

        let (repo, db_pool) = build_repository(&data_dir, &config).await?;
        let sessions = SessionStore::open(repo, config.chat.clone(), events.clone())
            .await
            .context("failed to open session store")?;
        let sessions = Arc::new(sessions);

        let answers = build_answers(&config.answer, &config.chat)?;
        let engine = ConversationEngine::new(sessions.clone(), answers, events.clone());

        tracing::info!(
            data_dir = %data_dir.display(),
            storage = ?config.storage.backend,
            answer = ?config.answer.backend,
            persistence = ?config.persistence.backend,
            "Application state ready"
        );

        Ok(Self {
            config: Arc::new(config),
            data_dir,
            events,
            pipeline: Arc::new(pipeline),
            knowledge_bases: Arc::new(knowledge_bases),
            sessions,
            engine: Arc::new(engine),
            db_pool,
        })
    }

    /// Cancel in-flight ingestion and replies, then close the database.
    pub async fn shutdown(&self) {
        self.pipeline.shutdown();
        self.engine.shutdown();
        if let Some(pool) = &self.db_pool {
            pool.close().await;
        }
        tracing::debug!("Application state shut down");
    }

    pub async fn stats(&self) -> Stats {
        let files = self.pipeline.status_counts();
        Stats {
            files,
            total_files: files.total(),
            knowledge_bases: self.knowledge_bases.len(),
            sessions: self.sessions.session_count(),
            messages: self.sessions.message_count().await,
            pending_replies: self.engine.pending_count(),
        }
    }

    pub fn persistence_label(&self) -> &'static str {
        match self.config.persistence.backend {
            PersistenceBackend::Memory => "in-memory",
            PersistenceBackend::Sqlite => "SQLite (WAL mode)",
        }
    }
}

fn build_storage(config: &AppConfig) -> anyhow::Result<BoxStorageService> {
    let storage = match config.storage.backend {
        ServiceBackend::Simulated => BoxStorageService::new(SimulatedStorageService::new(
            &config.storage,
            &config.ingest,
        )),
        ServiceBackend::Http => {
            let base_url = config
                .storage
                .base_url
                .as_deref()
                .context("[storage] backend = \"http\" requires base_url")?;
            let service = HttpStorageService::new(base_url, config.ingest.max_file_size_bytes)
                .context("failed to build storage HTTP client")?;
            BoxStorageService::new(service)
        }
    };
    Ok(storage)
}

fn build_answers(answer: &AnswerSettings, chat: &ChatSettings) -> anyhow::Result<BoxAnswerService> {
    let service = match answer.backend {
        ServiceBackend::Simulated => BoxAnswerService::new(SimulatedAnswerService::new(answer)),
        ServiceBackend::Http => {
            let base_url = answer
                .base_url
                .as_deref()
                .context("[answer] backend = \"http\" requires base_url")?;
            let api_key = std::env::var(&answer.api_key_env)
                .ok()
                .filter(|k| !k.is_empty())
                .map(SecretString::from);
            if api_key.is_none() {
                tracing::warn!(env = %answer.api_key_env, "No answer service API key set");
            }
            let service = HttpAnswerService::new(base_url, api_key, chat.reply_timeout())
                .context("failed to build answer HTTP client")?;
            BoxAnswerService::new(service)
        }
    };
    Ok(service)
}

async fn build_repository(
    data_dir: &Path,
    config: &AppConfig,
) -> anyhow::Result<(BoxSessionRepository, Option<DatabasePool>)> {
    match config.persistence.backend {
        PersistenceBackend::Memory => Ok((
            BoxSessionRepository::new(InMemorySessionRepository::new()),
            None,
        )),
        PersistenceBackend::Sqlite => {
            let pool = DatabasePool::new(&database_url(data_dir))
                .await
                .context("failed to open session database")?;
            let repo = BoxSessionRepository::new(SqliteSessionRepository::new(pool.clone()));
            Ok((repo, Some(pool)))
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Simulated adapters with timings short enough for tests.
    pub(crate) fn fast_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.ingest.upload_tick_ms = 10;
        config.ingest.process_tick_ms = 10;
        config.ingest.stage_pause_ms = 10;
        config.answer.simulated_delay_ms = 20;
        config
    }

    pub(crate) async fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::from_config(dir.path().to_path_buf(), fast_config())
            .await
            .unwrap();
        (state, dir)
    }

    #[tokio::test]
    async fn test_state_seeds_default_session() {
        let (state, _dir) = test_state().await;
        assert_eq!(state.sessions.session_count(), 1);
        assert_eq!(state.persistence_label(), "in-memory");
        state.shutdown().await;
    }

    #[tokio::test]
    async fn test_sqlite_state_persists_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = fast_config();
        config.persistence.backend = PersistenceBackend::Sqlite;

        let first = AppState::from_config(dir.path().to_path_buf(), config.clone())
            .await
            .unwrap();
        first.sessions.create_session(Some("Kept".to_string())).await.unwrap();
        first.shutdown().await;

        let second = AppState::from_config(dir.path().to_path_buf(), config)
            .await
            .unwrap();
        let names: Vec<String> = second
            .sessions
            .list_sessions()
            .await
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"Kept".to_string()));
        second.shutdown().await;
    }

    #[tokio::test]
    async fn test_http_backend_requires_base_url() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = fast_config();
        config.storage.backend = ServiceBackend::Http;
        let err = AppState::from_config(dir.path().to_path_buf(), config)
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("base_url"));
    }
}

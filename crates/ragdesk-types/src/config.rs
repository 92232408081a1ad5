//! Configuration types for ragdesk.
//!
//! `AppConfig` represents the top-level `config.toml`. Every field has a
//! default, so an empty file (or no file at all) yields a working setup
//! backed by the simulated services.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Mime types accepted for ingestion by default (PDF, TXT, DOC, DOCX).
pub const DEFAULT_ALLOWED_MIME_TYPES: [&str; 4] = [
    "application/pdf",
    "text/plain",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// Maximum file size accepted by the simulated storage service (50 MB).
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 50 * 1024 * 1024;

/// Top-level configuration.
///
/// Loaded from `~/.ragdesk/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub ingest: IngestSettings,
    #[serde(default)]
    pub chat: ChatSettings,
    #[serde(default)]
    pub answer: AnswerSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub persistence: PersistenceSettings,
}

/// Timing and acceptance rules for the ingestion pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSettings {
    /// Progress added per tick, in percent.
    #[serde(default = "default_progress_step")]
    pub progress_step: u8,
    /// Tick interval while `Uploading`.
    #[serde(default = "default_upload_tick_ms")]
    pub upload_tick_ms: u64,
    /// Tick interval while `Processing`.
    #[serde(default = "default_process_tick_ms")]
    pub process_tick_ms: u64,
    /// Pause between the end of one stage and the start of the next.
    #[serde(default = "default_stage_pause_ms")]
    pub stage_pause_ms: u64,
    #[serde(default = "default_max_file_size_bytes")]
    pub max_file_size_bytes: u64,
    #[serde(default = "default_allowed_mime_types")]
    pub allowed_mime_types: Vec<String>,
}

/// Floor for progress tick periods; a zero period cannot drive a timer.
const MIN_TICK_MS: u64 = 1;

fn default_progress_step() -> u8 {
    10
}

fn default_upload_tick_ms() -> u64 {
    200
}

fn default_process_tick_ms() -> u64 {
    300
}

fn default_stage_pause_ms() -> u64 {
    500
}

fn default_max_file_size_bytes() -> u64 {
    DEFAULT_MAX_FILE_SIZE_BYTES
}

fn default_allowed_mime_types() -> Vec<String> {
    DEFAULT_ALLOWED_MIME_TYPES
        .iter()
        .map(|m| m.to_string())
        .collect()
}

impl IngestSettings {
    /// Upload tick, at least 1ms.
    pub fn upload_tick(&self) -> Duration {
        Duration::from_millis(self.upload_tick_ms.max(MIN_TICK_MS))
    }

    /// Processing tick, at least 1ms.
    pub fn process_tick(&self) -> Duration {
        Duration::from_millis(self.process_tick_ms.max(MIN_TICK_MS))
    }

    pub fn stage_pause(&self) -> Duration {
        Duration::from_millis(self.stage_pause_ms)
    }

    /// Progress step clamped to `1..=100` so a stage always terminates.
    pub fn step(&self) -> u8 {
        self.progress_step.clamp(1, 100)
    }

    pub fn is_allowed_mime(&self, mime_type: &str) -> bool {
        self.allowed_mime_types
            .iter()
            .any(|m| m.eq_ignore_ascii_case(mime_type))
    }
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            progress_step: default_progress_step(),
            upload_tick_ms: default_upload_tick_ms(),
            process_tick_ms: default_process_tick_ms(),
            stage_pause_ms: default_stage_pause_ms(),
            max_file_size_bytes: default_max_file_size_bytes(),
            allowed_mime_types: default_allowed_mime_types(),
        }
    }
}

/// Session and reply settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSettings {
    /// Upper bound on one answer-service call.
    #[serde(default = "default_reply_timeout_secs")]
    pub reply_timeout_secs: u64,
    /// Content of the assistant message seeded into every new session.
    #[serde(default = "default_welcome_message")]
    pub welcome_message: String,
    #[serde(default = "default_session_name")]
    pub default_session_name: String,
}

fn default_reply_timeout_secs() -> u64 {
    30
}

fn default_welcome_message() -> String {
    "Hello! I'm your document assistant. I can help you find information in your \
     uploaded documents. What would you like to know?"
        .to_string()
}

fn default_session_name() -> String {
    "New Session".to_string()
}

impl ChatSettings {
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_secs(self.reply_timeout_secs)
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            reply_timeout_secs: default_reply_timeout_secs(),
            welcome_message: default_welcome_message(),
            default_session_name: default_session_name(),
        }
    }
}

/// Which implementation backs an external service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceBackend {
    #[default]
    Simulated,
    Http,
}

/// Answer service selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerSettings {
    #[serde(default)]
    pub backend: ServiceBackend,
    #[serde(default)]
    pub base_url: Option<String>,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_answer_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_simulated_delay_ms")]
    pub simulated_delay_ms: u64,
    #[serde(default = "default_simulated_sources")]
    pub simulated_sources: Vec<String>,
}

fn default_answer_api_key_env() -> String {
    "RAGDESK_ANSWER_API_KEY".to_string()
}

fn default_simulated_delay_ms() -> u64 {
    2000
}

fn default_simulated_sources() -> Vec<String> {
    vec![
        "document1.pdf".to_string(),
        "policy_guide.txt".to_string(),
        "manual.docx".to_string(),
    ]
}

impl Default for AnswerSettings {
    fn default() -> Self {
        Self {
            backend: ServiceBackend::default(),
            base_url: None,
            api_key_env: default_answer_api_key_env(),
            simulated_delay_ms: default_simulated_delay_ms(),
            simulated_sources: default_simulated_sources(),
        }
    }
}

/// Storage/embedding service selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: ServiceBackend,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub simulated_latency_ms: u64,
}

/// Where chat sessions are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistenceSettings {
    #[serde(default)]
    pub backend: PersistenceBackend,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_default_values() {
        let config = AppConfig::default();
        assert_eq!(config.ingest.progress_step, 10);
        assert_eq!(config.ingest.upload_tick_ms, 200);
        assert_eq!(config.ingest.process_tick_ms, 300);
        assert_eq!(config.chat.reply_timeout_secs, 30);
        assert_eq!(config.answer.backend, ServiceBackend::Simulated);
        assert_eq!(config.persistence.backend, PersistenceBackend::Memory);
        assert_eq!(config.answer.simulated_sources.len(), 3);
    }

    #[test]
    fn test_app_config_deserialize_empty() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.ingest.stage_pause_ms, 500);
        assert_eq!(config.ingest.allowed_mime_types.len(), 4);
        assert_eq!(config.chat.default_session_name, "New Session");
    }

    #[test]
    fn test_app_config_deserialize_with_values() {
        let toml_str = r#"
[ingest]
progress_step = 25
allowed_mime_types = ["text/plain"]

[chat]
reply_timeout_secs = 5

[answer]
backend = "http"
base_url = "http://localhost:8080"

[persistence]
backend = "sqlite"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.ingest.progress_step, 25);
        assert_eq!(config.ingest.upload_tick_ms, 200);
        assert!(config.ingest.is_allowed_mime("TEXT/PLAIN"));
        assert!(!config.ingest.is_allowed_mime("application/pdf"));
        assert_eq!(config.chat.reply_timeout(), Duration::from_secs(5));
        assert_eq!(config.answer.backend, ServiceBackend::Http);
        assert_eq!(config.answer.base_url.as_deref(), Some("http://localhost:8080"));
        assert_eq!(config.persistence.backend, PersistenceBackend::Sqlite);
    }

    #[test]
    fn test_step_is_clamped() {
        let mut settings = IngestSettings::default();
        settings.progress_step = 0;
        assert_eq!(settings.step(), 1);
        settings.progress_step = 250;
        assert_eq!(settings.step(), 100);
    }

    #[test]
    fn test_zero_ticks_are_floored() {
        let mut settings = IngestSettings::default();
        settings.upload_tick_ms = 0;
        settings.process_tick_ms = 0;
        assert_eq!(settings.upload_tick(), Duration::from_millis(1));
        assert_eq!(settings.process_tick(), Duration::from_millis(1));
        assert_eq!(settings.stage_pause(), Duration::from_millis(500));
    }
}

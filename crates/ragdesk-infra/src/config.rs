//! Configuration loader for ragdesk.
//!
//! Reads `config.toml` from the data directory (`~/.ragdesk/` in production)
//! and deserializes it into [`AppConfig`]. Falls back to defaults when the
//! file is missing or malformed.

use std::path::Path;

use ragdesk_types::config::AppConfig;

pub const CONFIG_FILE: &str = "config.toml";

/// Load configuration from `{data_dir}/config.toml`.
///
/// - Missing file: [`AppConfig::default()`].
/// - Unreadable or unparsable file: logs a warning and returns the default.
pub async fn load_config(data_dir: &Path) -> AppConfig {
    let config_path = data_dir.join(CONFIG_FILE);

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return AppConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return AppConfig::default();
        }
    };

    match toml::from_str::<AppConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragdesk_types::config::{PersistenceBackend, ServiceBackend};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).await;
        assert_eq!(config.ingest.progress_step, 10);
        assert_eq!(config.answer.backend, ServiceBackend::Simulated);
    }

    #[tokio::test]
    async fn test_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join(CONFIG_FILE),
            r#"
[ingest]
upload_tick_ms = 50

[chat]
welcome_message = "Hi there"

[storage]
backend = "http"
base_url = "http://localhost:9000"

[persistence]
backend = "sqlite"
"#,
        )
        .await
        .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.ingest.upload_tick_ms, 50);
        assert_eq!(config.ingest.process_tick_ms, 300);
        assert_eq!(config.chat.welcome_message, "Hi there");
        assert_eq!(config.storage.backend, ServiceBackend::Http);
        assert_eq!(config.persistence.backend, PersistenceBackend::Sqlite);
    }

    #[tokio::test]
    async fn test_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join(CONFIG_FILE), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.chat.reply_timeout_secs, 30);
        assert_eq!(config.persistence.backend, PersistenceBackend::Memory);
    }
}

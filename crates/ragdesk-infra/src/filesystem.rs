//! Filesystem helpers: data directory layout and document loading.

use std::path::{Path, PathBuf};

use ragdesk_types::file::FileDescriptor;

pub const DATA_DIR_ENV: &str = "RAGDESK_DATA_DIR";
pub const DATABASE_FILE: &str = "ragdesk.db";

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `RAGDESK_DATA_DIR` environment variable
/// 2. `~/.ragdesk`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".ragdesk");
    }

    PathBuf::from(".ragdesk")
}

/// SQLite URL for the session database inside `data_dir`.
pub fn database_url(data_dir: &Path) -> String {
    format!("sqlite://{}?mode=rwc", data_dir.join(DATABASE_FILE).display())
}

/// Guess a mime type from the file extension.
///
/// Unknown extensions map to `application/octet-stream`, which the default
/// ingest settings reject.
pub fn detect_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("txt") | Some("text") => "text/plain",
        Some("md") | Some("markdown") => "text/markdown",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some("html") | Some("htm") => "text/html",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// Read a file from disk into a descriptor ready for ingestion.
pub async fn read_descriptor(path: &Path) -> Result<FileDescriptor, std::io::Error> {
    let bytes = tokio::fs::read(path).await?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(FileDescriptor::new(name, detect_mime(path), bytes))
}

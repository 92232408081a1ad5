//! Ingested file types for ragdesk.
//!
//! An `IngestFile` is the pipeline's view of one uploaded document: its
//! metadata plus the staged status/progress pair that the ingestion task
//! advances over time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Progress value of a finished stage.
pub const PROGRESS_COMPLETE: u8 = 100;

/// Lifecycle status of an ingested file.
///
/// Valid transitions: `Queued -> Uploading -> Processing -> Completed`, with
/// `Error` reachable from `Uploading` or `Processing`. `Completed` and `Error`
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Queued,
    Uploading,
    Processing,
    Completed,
    Error,
}

impl FileStatus {
    /// Whether the file can never change status again.
    pub fn is_terminal(self) -> bool {
        matches!(self, FileStatus::Completed | FileStatus::Error)
    }

    /// Whether progress ticks apply to this status.
    pub fn is_active_stage(self) -> bool {
        matches!(self, FileStatus::Uploading | FileStatus::Processing)
    }

    /// Whether `self -> next` is a legal forward transition.
    pub fn can_transition_to(self, next: FileStatus) -> bool {
        matches!(
            (self, next),
            (FileStatus::Queued, FileStatus::Uploading)
                | (FileStatus::Uploading, FileStatus::Processing)
                | (FileStatus::Processing, FileStatus::Completed)
                | (FileStatus::Uploading, FileStatus::Error)
                | (FileStatus::Processing, FileStatus::Error)
        )
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStatus::Queued => write!(f, "queued"),
            FileStatus::Uploading => write!(f, "uploading"),
            FileStatus::Processing => write!(f, "processing"),
            FileStatus::Completed => write!(f, "completed"),
            FileStatus::Error => write!(f, "error"),
        }
    }
}

impl FromStr for FileStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "queued" => Ok(FileStatus::Queued),
            "uploading" => Ok(FileStatus::Uploading),
            "processing" => Ok(FileStatus::Processing),
            "completed" => Ok(FileStatus::Completed),
            "error" => Ok(FileStatus::Error),
            other => Err(format!("invalid file status: '{other}'")),
        }
    }
}

/// Raw bytes submitted by a caller for ingestion.
#[derive(Debug, Clone)]
pub struct FileDescriptor {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl FileDescriptor {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Snapshot of a file tracked by the ingestion pipeline.
///
/// `progress` is only meaningful within the current `status`; it restarts
/// at 0 on every stage transition and stays at 100 once `Completed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestFile {
    pub id: Uuid,
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub status: FileStatus,
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    /// Reference returned by the storage service after upload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_ref: Option<String>,
    /// Index entry returned by the storage service after processing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed_entry_id: Option<String>,
    /// Failure reason when `status == Error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IngestFile {
    /// Register a new file at `Queued` with zero progress.
    pub fn queued(descriptor: &FileDescriptor) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: descriptor.name.clone(),
            size_bytes: descriptor.size_bytes(),
            mime_type: descriptor.mime_type.clone(),
            status: FileStatus::Queued,
            progress: 0,
            created_at: Utc::now(),
            storage_ref: None,
            indexed_entry_id: None,
            error: None,
        }
    }
}

/// Number of files per status, for dashboards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStatusCounts {
    pub queued: usize,
    pub uploading: usize,
    pub processing: usize,
    pub completed: usize,
    pub error: usize,
}

impl FileStatusCounts {
    pub fn record(&mut self, status: FileStatus) {
        match status {
            FileStatus::Queued => self.queued += 1,
            FileStatus::Uploading => self.uploading += 1,
            FileStatus::Processing => self.processing += 1,
            FileStatus::Completed => self.completed += 1,
            FileStatus::Error => self.error += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.queued + self.uploading + self.processing + self.completed + self.error
    }

    /// Files still moving through the pipeline.
    pub fn in_flight(&self) -> usize {
        self.queued + self.uploading + self.processing
    }
}

/// Format a byte count for display, e.g. `"1.5 KB"` or `"0 Bytes"`.
///
/// Uses base 1024 and caps the unit at GB. Values are rounded to two
/// decimals with trailing zeros dropped.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[unit])
}

//! Document ingestion: per-file staged upload/processing and knowledge bases.
//!
//! The `IngestPipeline` registers submitted files and drives each one
//! through `Uploading` and `Processing` on its own cancellable task. The
//! `StorageService` port is the external storage/embedding backend those
//! stages call into.

pub mod knowledge_base;
pub mod pipeline;
pub mod progress;
pub mod storage;

pub use knowledge_base::KnowledgeBaseRegistry;
pub use pipeline::IngestPipeline;
pub use storage::{BoxStorageService, StorageService, UploadMetadata};

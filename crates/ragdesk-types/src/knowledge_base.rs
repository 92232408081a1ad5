//! Knowledge base types.
//!
//! A knowledge base is a named set of ingested files. It is immutable once
//! created.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named collection of ingested documents available for retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub file_ids: BTreeSet<Uuid>,
    pub created_at: DateTime<Utc>,
}

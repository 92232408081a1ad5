//! Shared domain types for ragdesk.
//!
//! This crate contains the domain types used across the ragdesk workspace:
//! ingested files, knowledge bases, chat sessions and messages, the event
//! stream, configuration, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod event;
pub mod file;
pub mod knowledge_base;

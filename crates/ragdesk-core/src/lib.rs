//! Core logic and port trait definitions for ragdesk.
//!
//! This crate owns the three stateful components -- the ingestion pipeline,
//! the session store, and the conversation engine -- and defines the
//! "ports" (storage, answer, and persistence traits) that the
//! infrastructure layer implements. It depends only on `ragdesk-types`,
//! never on `ragdesk-infra` or any network/database crate.

pub mod chat;
pub mod event;
pub mod ingest;

//! Infrastructure layer for ragdesk.
//!
//! Contains implementations of the port traits defined in `ragdesk-core`:
//! simulated and HTTP-backed storage/answer services, in-memory and SQLite
//! session repositories, plus the config loader and data-dir helpers.

pub mod answer;
pub mod config;
pub mod filesystem;
pub mod memory;
pub mod sqlite;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_server;

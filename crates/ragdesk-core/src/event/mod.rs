//! Event bus for core-to-presentation snapshots.
//!
//! Provides an `EventBus` that distributes `CoreEvent` messages to all
//! subscribers via a `tokio::sync::broadcast` channel.

pub mod bus;

pub use bus::EventBus;

//! Storage/embedding service adapters.
//!
//! `SimulatedStorageService` stands in for a real backend with fixed latency
//! and local acceptance rules; `HttpStorageService` talks to a remote one.

pub mod http;
pub mod simulated;

pub use http::HttpStorageService;
pub use simulated::SimulatedStorageService;

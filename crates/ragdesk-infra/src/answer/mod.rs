//! Answer service adapters.

pub mod http;
pub mod simulated;

pub use http::HttpAnswerService;
pub use simulated::SimulatedAnswerService;

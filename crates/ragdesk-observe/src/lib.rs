//! Observability setup for ragdesk: structured logging with optional
//! OpenTelemetry span export.

pub mod tracing_setup;

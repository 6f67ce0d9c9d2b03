//! Observability setup for gymcount: tracing subscriber and optional
//! OpenTelemetry span export.

pub mod tracing_setup;

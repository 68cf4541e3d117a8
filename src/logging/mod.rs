//! Structured logging setup and ndjson anomaly lines.

mod format;

pub use format::{AnomalyLine, StructuredLogger};

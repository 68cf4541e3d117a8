//! Footprint analyzer — directly-follows footprints, KPIs and anomaly signals
//! from manufacturing event logs.
//!
//! Modular structure:
//! - [`eventlog`] — Validated events, traces, raw record ingestion
//! - [`footprints`] — Directly-follows pair extraction
//! - [`kpi`] — Duration statistics, frequency, throughput, attribute KPIs
//! - [`aggregate`] — Grouping by activity pair (and resource / time bucket)
//! - [`anomaly`] — IQR fences and anomaly flags
//! - [`views`] — Graph and scatter projections for external renderers
//! - [`pipeline`] — Stage wiring; [`cache`] — snapshot-keyed report cache
//! - [`logging`] — Structured JSON logging

pub mod config;
pub mod error;
pub mod eventlog;
pub mod footprints;
pub mod kpi;
pub mod aggregate;
pub mod anomaly;
pub mod views;
pub mod pipeline;
pub mod cache;
pub mod logging;

pub use config::{AnalysisConfig, AnalyzerConfig, IngestConfig};
pub use error::{AnalysisError, ConfigError, MalformedEventError};
pub use eventlog::{Event, EventLog, RawRecord};
pub use footprints::{Footprint, FootprintExtractor};
pub use kpi::{KpiCalculator, KpiField};
pub use aggregate::{AggregatedFootprint, Aggregator, GroupBy};
pub use anomaly::{AnomalyDetector, AnomalyFlag};
pub use views::{GraphView, ScatterPoint};
pub use pipeline::{AnalysisReport, Pipeline};
pub use cache::PipelineCache;
pub use logging::StructuredLogger;

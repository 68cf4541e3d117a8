//! JSON log lines: one JSON object per line (ndjson) for downstream ingestion.

use crate::aggregate::AggregatedFootprint;
use crate::anomaly::{AnomalyFlag, Severity};
use crate::kpi::KpiField;
use crate::pipeline::AnalysisReport;
use serde::Serialize;
use std::io::Write;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// One anomalous aggregated footprint.
#[derive(Debug, Serialize)]
pub struct AnomalyLine<'a> {
    pub run_id: &'a str,
    pub footprint: String,
    pub count: usize,
    pub metric: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    pub score: f64,
    pub reason: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

impl<'a> AnomalyLine<'a> {
    pub fn new(run_id: &'a str, metric: &KpiField, aggregate: &AggregatedFootprint, flag: &AnomalyFlag) -> Self {
        Self {
            run_id,
            footprint: aggregate.label(),
            count: aggregate.count(),
            metric: metric.to_string(),
            value: aggregate.metric(metric),
            score: flag.score,
            reason: flag.reason.as_str(),
            severity: flag.severity,
        }
    }
}

pub struct StructuredLogger;

impl StructuredLogger {
    /// Install global subscriber: JSON lines to stderr, level from RUST_LOG or default.
    /// stdout is left for the report itself.
    pub fn init(json: bool, default_level: &str) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
        if json {
            let fmt = tracing_subscriber::fmt::layer()
                .json()
                .with_span_events(FmtSpan::NONE)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry().with(filter).with(fmt).init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    /// Emit a single structured line without going through tracing.
    pub fn emit_json(event: &impl Serialize, w: &mut impl Write) {
        if let Ok(line) = serde_json::to_string(event) {
            let _ = writeln!(w, "{}", line);
        }
    }

    /// Report output as ndjson: one `AnomalyLine` per anomalous aggregate, then
    /// the whole report as the last line.
    pub fn emit_report(
        run_id: &str,
        metric: &KpiField,
        report: &AnalysisReport,
        w: &mut impl Write,
    ) -> std::io::Result<()> {
        for (aggregate, flag) in report.anomalous_aggregates() {
            Self::emit_json(&AnomalyLine::new(run_id, metric, aggregate, flag), w);
        }
        serde_json::to_writer(&mut *w, report)?;
        writeln!(w)?;
        w.flush()
    }
}

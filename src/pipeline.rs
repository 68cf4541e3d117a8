//! End-to-end analysis: records → footprints → aggregates → flags → views.
//! Each stage takes the previous stage's finished output and builds a fresh one.

use crate::aggregate::{AggregatedFootprint, Aggregator};
use crate::anomaly::{AnomalyDetector, Detection};
use crate::config::{AnalysisConfig, IngestConfig};
use crate::error::{AnalysisError, MalformedEventError, Result};
use crate::eventlog::RawRecord;
use crate::footprints::{Footprint, FootprintExtractor};
use crate::kpi::{ActivityKpi, KpiCalculator};
use crate::views::{GraphView, GraphViewBuilder, ScatterView, ScatterViewBuilder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Log-level counters, including the data-quality exceptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSummary {
    pub event_count: usize,
    pub case_count: usize,
    pub footprint_count: usize,
    pub rejected_count: usize,
    pub filtered_count: usize,
    /// Footprints with non-positive duration
    pub duration_exceptions: usize,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub summary: LogSummary,
    pub rejected: Vec<MalformedEventError>,
    pub footprints: Vec<Footprint>,
    pub aggregates: Vec<AggregatedFootprint>,
    pub activities: Vec<ActivityKpi>,
    /// Mean of each numeric attribute over all events
    pub attribute_baseline: BTreeMap<String, f64>,
    pub detection: Detection,
    pub graph: GraphView,
    pub scatter: ScatterView,
}

impl AnalysisReport {
    /// Aggregated footprint attribute means minus the log-wide baseline.
    pub fn attribute_deltas(&self, aggregate: &AggregatedFootprint) -> BTreeMap<String, f64> {
        aggregate
            .kpis
            .attributes
            .iter()
            .filter_map(|(k, v)| self.attribute_baseline.get(k).map(|b| (k.clone(), v - b)))
            .collect()
    }

    pub fn anomalous_aggregates(&self) -> impl Iterator<Item = (&AggregatedFootprint, &crate::anomaly::AnomalyFlag)> {
        self.aggregates.iter().filter_map(|a| {
            self.detection
                .flag(&a.key)
                .filter(|f| f.is_anomalous)
                .map(|f| (a, f))
        })
    }
}

pub struct Pipeline {
    ingest: IngestConfig,
    analysis: AnalysisConfig,
}

impl Pipeline {
    /// Rejects invalid analysis options up front.
    pub fn new(ingest: IngestConfig, analysis: AnalysisConfig) -> Result<Self> {
        analysis.validate()?;
        Ok(Self { ingest, analysis })
    }

    pub fn analysis(&self) -> &AnalysisConfig {
        &self.analysis
    }

    pub fn ingest(&self) -> &IngestConfig {
        &self.ingest
    }

    pub fn run(&self, records: &[RawRecord]) -> Result<AnalysisReport> {
        let extraction = FootprintExtractor::new(self.ingest.clone()).extract_records(records);
        let Some((start, end)) = extraction.time_range() else {
            return Err(AnalysisError::EmptyLog {
                rejected: extraction.rejected.len(),
                filtered: extraction.filtered,
            });
        };

        let calculator = KpiCalculator::new(&extraction.log);
        let aggregates = Aggregator::new(self.analysis.group_by, self.analysis.time_bucket_secs)
            .aggregate(&extraction.footprints, &calculator);

        let detector = AnomalyDetector::from_config(&self.analysis);
        let instances = self
            .analysis
            .instance_detection
            .then_some(extraction.footprints.as_slice());
        let detection = detector.detect(&aggregates, instances)?;

        let graph = GraphViewBuilder::build(
            &aggregates,
            &detection,
            &extraction.start_activities,
            &extraction.end_activities,
        );
        let scatter = ScatterViewBuilder::new(self.analysis.scatter_x.clone(), self.analysis.scatter_y.clone())
            .build(&aggregates, &detection, detector.metric())?;

        let summary = LogSummary {
            event_count: extraction.event_count(),
            case_count: extraction.case_count(),
            footprint_count: extraction.footprints.len(),
            rejected_count: extraction.rejected.len(),
            filtered_count: extraction.filtered,
            duration_exceptions: aggregates.iter().map(|a| a.kpis.duration_exceptions).sum(),
            start,
            end,
        };
        info!(
            events = summary.event_count,
            cases = summary.case_count,
            footprints = summary.footprint_count,
            rejected = summary.rejected_count,
            aggregates = aggregates.len(),
            anomalous = detection.anomalous_count(),
            "analysis complete"
        );

        Ok(AnalysisReport {
            activities: calculator.activity_kpis(&extraction.log),
            attribute_baseline: calculator.baseline().clone(),
            summary,
            rejected: extraction.rejected,
            footprints: extraction.footprints,
            aggregates,
            detection,
            graph,
            scatter,
        })
    }
}

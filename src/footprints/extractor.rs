//! Footprint extraction: raw records → event log → traces → adjacent pairs.

use super::Footprint;
use crate::config::IngestConfig;
use crate::error::MalformedEventError;
use crate::eventlog::{EventLog, RawRecord};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use tracing::debug;

/// Everything extraction learned about one log snapshot.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub log: EventLog,
    pub footprints: Vec<Footprint>,
    pub rejected: Vec<MalformedEventError>,
    pub filtered: usize,
    /// Activities that open a trace
    pub start_activities: BTreeSet<String>,
    /// Activities that close a trace
    pub end_activities: BTreeSet<String>,
}

impl Extraction {
    pub fn case_count(&self) -> usize {
        self.log.case_count()
    }

    pub fn event_count(&self) -> usize {
        self.log.len()
    }

    pub fn time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        self.log.time_range()
    }
}

pub struct FootprintExtractor {
    config: IngestConfig,
}

impl FootprintExtractor {
    pub fn new(config: IngestConfig) -> Self {
        Self { config }
    }

    /// Ingest raw records and extract footprints from the surviving events.
    pub fn extract_records(&self, records: &[RawRecord]) -> Extraction {
        let ingested = EventLog::ingest(records, &self.config);
        let mut out = Self::extract(ingested.log);
        out.rejected = ingested.rejected;
        out.filtered = ingested.filtered;
        out
    }

    /// One footprint per adjacent event pair of each trace. Cases appear in order
    /// of first occurrence, so identical logs give identical sequences.
    pub fn extract(log: EventLog) -> Extraction {
        let mut footprints = Vec::with_capacity(log.len());
        let mut start_activities = BTreeSet::new();
        let mut end_activities = BTreeSet::new();

        for trace in log.traces() {
            if let (Some(first), Some(last)) = (trace.events.first(), trace.events.last()) {
                start_activities.insert(first.activity.clone());
                end_activities.insert(last.activity.clone());
            }
            for pair in trace.events.windows(2) {
                let (from, to) = (pair[0], pair[1]);
                footprints.push(Footprint {
                    from_activity: from.activity.clone(),
                    to_activity: to.activity.clone(),
                    duration_secs: (to.ts - from.ts).num_milliseconds() as f64 / 1000.0,
                    case_id: trace.case_id.to_string(),
                    start: from.ts,
                    resource: to.resource.clone(),
                });
            }
        }
        debug!(footprints = footprints.len(), "extracted footprints");

        Extraction {
            log,
            footprints,
            rejected: Vec::new(),
            filtered: 0,
            start_activities,
            end_activities,
        }
    }
}

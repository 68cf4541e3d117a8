//! Report cache for repeated invocations. Lives outside the pipeline and is keyed
//! by snapshot content plus configuration, so different logs or settings never
//! share an entry.

use crate::config::{AnalysisConfig, IngestConfig};
use crate::error::Result;
use crate::eventlog::RawRecord;
use crate::pipeline::{AnalysisReport, Pipeline};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// SHA-256 over the canonical JSON of the records and both config sections.
pub fn snapshot_key(
    records: &[RawRecord],
    ingest: &IngestConfig,
    analysis: &AnalysisConfig,
) -> Result<String> {
    let mut h = Sha256::new();
    h.update(serde_json::to_vec(records)?);
    h.update(b"\x00");
    h.update(serde_json::to_vec(ingest)?);
    h.update(b"\x00");
    h.update(serde_json::to_vec(analysis)?);
    Ok(format!("{:x}", h.finalize()))
}

struct Entries {
    reports: HashMap<String, Arc<AnalysisReport>>,
    order: VecDeque<String>,
}

pub struct PipelineCache {
    capacity: usize,
    entries: Mutex<Entries>,
}

impl PipelineCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(Entries {
                reports: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.reports.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached report for this snapshot, or run the pipeline and remember the result.
    /// Failed runs are not cached. The lock is not held while the pipeline runs.
    pub fn get_or_run(&self, pipeline: &Pipeline, records: &[RawRecord]) -> Result<Arc<AnalysisReport>> {
        let key = snapshot_key(records, pipeline.ingest(), pipeline.analysis())?;
        if let Some(hit) = self
            .entries
            .lock()
            .ok()
            .and_then(|e| e.reports.get(&key).cloned())
        {
            debug!(key = %&key[..12], "pipeline cache hit");
            return Ok(hit);
        }

        let report = Arc::new(pipeline.run(records)?);
        if let Ok(mut e) = self.entries.lock() {
            if !e.reports.contains_key(&key) {
                e.order.push_back(key.clone());
            }
            e.reports.insert(key, Arc::clone(&report));
            while e.order.len() > self.capacity {
                if let Some(old) = e.order.pop_front() {
                    e.reports.remove(&old);
                }
            }
        }
        Ok(report)
    }
}

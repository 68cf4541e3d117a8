//! Normalized in-memory event log: events, traces, and record ingestion.

mod ingest;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub use ingest::{parse_timestamp, Ingested};

/// Raw record as handed over by the external loader.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// One validated production event. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Position in the raw input; tie-break for equal timestamps
    pub seq: usize,
    pub case_id: String,
    pub activity: String,
    pub ts: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl Event {
    /// Numeric attributes only, for KPI averaging.
    pub fn numeric_attributes(&self) -> impl Iterator<Item = (&str, f64)> {
        self.attributes
            .iter()
            .filter_map(|(k, v)| v.as_f64().filter(|x| x.is_finite()).map(|x| (k.as_str(), x)))
    }
}

/// Events of one case, ascending by timestamp, ties in ingestion order.
#[derive(Debug, Clone)]
pub struct Trace<'a> {
    pub case_id: &'a str,
    pub events: Vec<&'a Event>,
}

impl Trace<'_> {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Validated events in ingestion order.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new(mut events: Vec<Event>) -> Self {
        events.sort_by_key(|e| e.seq);
        Self { events }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Group by case (first-appearance order) and sort each trace by timestamp.
    /// The sort is stable, so simultaneous events keep ingestion order.
    pub fn traces(&self) -> Vec<Trace<'_>> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut traces: Vec<Trace<'_>> = Vec::new();
        for e in &self.events {
            let slot = *index.entry(e.case_id.as_str()).or_insert_with(|| {
                traces.push(Trace {
                    case_id: e.case_id.as_str(),
                    events: Vec::new(),
                });
                traces.len() - 1
            });
            traces[slot].events.push(e);
        }
        for t in &mut traces {
            t.events.sort_by_key(|e| e.ts);
        }
        traces
    }

    pub fn case_count(&self) -> usize {
        let mut seen = std::collections::HashSet::new();
        self.events.iter().filter(|e| seen.insert(e.case_id.as_str())).count()
    }

    /// Earliest and latest timestamp in the log.
    pub fn time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let min = self.events.iter().map(|e| e.ts).min()?;
        let max = self.events.iter().map(|e| e.ts).max()?;
        Some((min, max))
    }

    /// Observed span of the log in seconds (0 for an empty or instantaneous log).
    pub fn span_secs(&self) -> f64 {
        self.time_range()
            .map(|(a, b)| (b - a).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ev(seq: usize, case: &str, act: &str, secs: i64) -> Event {
        Event {
            seq,
            case_id: case.into(),
            activity: act.into(),
            ts: Utc.timestamp_opt(secs, 0).unwrap(),
            resource: None,
            attributes: BTreeMap::new(),
        }
    }

    #[test]
    fn traces_group_by_first_appearance_and_sort() {
        let log = EventLog::new(vec![
            ev(0, "c2", "X", 50),
            ev(1, "c1", "B", 20),
            ev(2, "c1", "A", 10),
            ev(3, "c2", "Y", 40),
        ]);
        let traces = log.traces();
        assert_eq!(traces.len(), 2);
        assert_eq!(traces[0].case_id, "c2");
        let acts: Vec<_> = traces[0].events.iter().map(|e| e.activity.as_str()).collect();
        assert_eq!(acts, ["Y", "X"]);
        let acts: Vec<_> = traces[1].events.iter().map(|e| e.activity.as_str()).collect();
        assert_eq!(acts, ["A", "B"]);
    }

    #[test]
    fn simultaneous_events_keep_ingestion_order() {
        let log = EventLog::new(vec![
            ev(0, "c", "first", 10),
            ev(1, "c", "second", 10),
            ev(2, "c", "zeroth", 5),
        ]);
        let traces = log.traces();
        let acts: Vec<_> = traces[0].events.iter().map(|e| e.activity.as_str()).collect();
        assert_eq!(acts, ["zeroth", "first", "second"]);
    }

    #[test]
    fn span_and_case_count() {
        let log = EventLog::new(vec![ev(0, "a", "X", 100), ev(1, "b", "X", 3700)]);
        assert_eq!(log.case_count(), 2);
        assert_eq!(log.span_secs(), 3600.0);
        assert_eq!(EventLog::default().span_secs(), 0.0);
    }
}

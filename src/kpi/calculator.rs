//! KPI calculation over footprint groups and activities.

use super::{DurationStats, GroupKpis};
use crate::eventlog::EventLog;
use crate::footprints::Footprint;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Per-activity occurrence metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityKpi {
    pub activity: String,
    pub event_count: usize,
    pub case_count: usize,
    /// case_count / total case count
    pub frequency: f64,
}

#[derive(Default)]
struct Mean {
    sum: f64,
    n: usize,
}

impl Mean {
    fn add(&mut self, x: f64) {
        self.sum += x;
        self.n += 1;
    }

    fn get(&self) -> f64 {
        self.sum / self.n as f64
    }
}

/// Log-wide context for KPI normalization, built once per snapshot.
#[derive(Debug, Clone, Default)]
pub struct KpiCalculator {
    total_cases: usize,
    span_hours: f64,
    /// case id → mean of each numeric attribute over the case's events
    case_attributes: HashMap<String, BTreeMap<String, f64>>,
    /// Mean of each numeric attribute over all events
    baseline: BTreeMap<String, f64>,
}

impl KpiCalculator {
    pub fn new(log: &EventLog) -> Self {
        let mut per_case: HashMap<&str, BTreeMap<&str, Mean>> = HashMap::new();
        let mut overall: BTreeMap<&str, Mean> = BTreeMap::new();
        for e in log.events() {
            let case = per_case.entry(e.case_id.as_str()).or_default();
            for (name, x) in e.numeric_attributes() {
                case.entry(name).or_default().add(x);
                overall.entry(name).or_default().add(x);
            }
        }
        let case_attributes = per_case
            .into_iter()
            .map(|(case, attrs)| {
                let means = attrs.into_iter().map(|(k, m)| (k.to_string(), m.get())).collect();
                (case.to_string(), means)
            })
            .collect();
        let baseline = overall.into_iter().map(|(k, m)| (k.to_string(), m.get())).collect();

        Self {
            total_cases: log.case_count(),
            span_hours: log.span_secs() / 3600.0,
            case_attributes,
            baseline,
        }
    }

    pub fn total_cases(&self) -> usize {
        self.total_cases
    }

    pub fn baseline(&self) -> &BTreeMap<String, f64> {
        &self.baseline
    }

    /// Metrics for one group. Non-positive durations count toward `count` but
    /// stay out of the duration statistics.
    pub fn compute(&self, group: &[&Footprint]) -> GroupKpis {
        let durations: Vec<f64> = group
            .iter()
            .filter(|f| f.has_valid_duration())
            .map(|f| f.duration_secs)
            .collect();
        let duration_exceptions = group.len() - durations.len();
        let cases: BTreeSet<&str> = group.iter().map(|f| f.case_id.as_str()).collect();

        let mut attr_means: BTreeMap<&str, Mean> = BTreeMap::new();
        for case in &cases {
            if let Some(attrs) = self.case_attributes.get(*case) {
                for (name, x) in attrs {
                    attr_means.entry(name.as_str()).or_default().add(*x);
                }
            }
        }

        let count = group.len();
        GroupKpis {
            count,
            duration_exceptions,
            duration: DurationStats::from_samples(&durations),
            frequency: if self.total_cases == 0 {
                0.0
            } else {
                count as f64 / self.total_cases as f64
            },
            throughput: (self.span_hours > 0.0).then(|| count as f64 / self.span_hours),
            cases: cases.into_iter().map(str::to_string).collect(),
            attributes: attr_means.into_iter().map(|(k, m)| (k.to_string(), m.get())).collect(),
        }
    }

    /// Event and case counts per activity, sorted by activity.
    pub fn activity_kpis(&self, log: &EventLog) -> Vec<ActivityKpi> {
        let mut acc: BTreeMap<&str, (usize, BTreeSet<&str>)> = BTreeMap::new();
        for e in log.events() {
            let slot = acc.entry(e.activity.as_str()).or_default();
            slot.0 += 1;
            slot.1.insert(e.case_id.as_str());
        }
        acc.into_iter()
            .map(|(activity, (event_count, cases))| ActivityKpi {
                activity: activity.to_string(),
                event_count,
                case_count: cases.len(),
                frequency: if self.total_cases == 0 {
                    0.0
                } else {
                    cases.len() as f64 / self.total_cases as f64
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IngestConfig;
    use crate::footprints::FootprintExtractor;
    use serde_json::json;

    fn records() -> Vec<crate::eventlog::RawRecord> {
        [
            json!({"case_id": "c1", "activity": "A", "timestamp": 0, "OEE": 0.5}),
            json!({"case_id": "c1", "activity": "B", "timestamp": 3_600_000, "OEE": 0.7}),
            json!({"case_id": "c2", "activity": "A", "timestamp": 0, "OEE": 0.9}),
            json!({"case_id": "c2", "activity": "B", "timestamp": 0, "OEE": 0.9}),
            json!({"case_id": "c3", "activity": "A", "timestamp": 7_200_000}),
        ]
        .iter()
        .map(|v| v.as_object().cloned().unwrap())
        .collect()
    }

    #[test]
    fn group_metrics() {
        let ex = FootprintExtractor::new(IngestConfig::default()).extract_records(&records());
        let calc = KpiCalculator::new(&ex.log);
        let group: Vec<&Footprint> = ex.footprints.iter().collect();
        let k = calc.compute(&group);

        assert_eq!(k.count, 2);
        assert_eq!(k.duration_exceptions, 1);
        let d = k.duration.unwrap();
        assert_eq!(d.samples, 1);
        assert_eq!(d.mean, 3600.0);
        assert_eq!(d.std, 0.0);
        assert_eq!(k.frequency, 2.0 / 3.0);
        assert_eq!(k.throughput, Some(1.0));
        assert_eq!(k.cases, vec!["c1".to_string(), "c2".to_string()]);
        // c1 mean 0.6, c2 mean 0.9
        assert!((k.attributes["OEE"] - 0.75).abs() < 1e-12);
        // baseline over events: (0.5 + 0.7 + 0.9 + 0.9) / 4
        assert!((calc.baseline()["OEE"] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn all_exceptions_leave_duration_absent() {
        let ex = FootprintExtractor::new(IngestConfig::default()).extract_records(&records());
        let calc = KpiCalculator::new(&ex.log);
        let zero: Vec<&Footprint> = ex.footprints.iter().filter(|f| !f.has_valid_duration()).collect();
        let k = calc.compute(&zero);
        assert_eq!(k.count, 1);
        assert!(k.duration.is_none());
        assert_eq!(k.value(&crate::kpi::KpiField::DurationMean), None);
    }

    #[test]
    fn activity_metrics() {
        let ex = FootprintExtractor::new(IngestConfig::default()).extract_records(&records());
        let calc = KpiCalculator::new(&ex.log);
        let acts = calc.activity_kpis(&ex.log);
        assert_eq!(acts.len(), 2);
        assert_eq!(acts[0].activity, "A");
        assert_eq!(acts[0].event_count, 3);
        assert_eq!(acts[0].frequency, 1.0);
        assert_eq!(acts[1].case_count, 2);
    }
}

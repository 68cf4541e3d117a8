//! Flags aggregates (and optionally footprint instances) outside the population's
//! Tukey fences. Pure function of its input: same aggregates, same flags.

use super::{AnomalyFlag, AnomalyReason, Thresholds};
use crate::aggregate::{field_exists, AggregatedFootprint, FootprintKey};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::footprints::Footprint;
use crate::kpi::KpiField;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Flags keyed by the identity of what they describe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Fences over the aggregated metric values
    pub thresholds: Option<Thresholds>,
    #[serde(with = "keyed_flags")]
    pub flags: BTreeMap<FootprintKey, AnomalyFlag>,
    /// Fences over all footprint instance durations
    pub instance_thresholds: Option<Thresholds>,
    /// Parallel to the footprint sequence; empty when instance detection is off
    pub instance_flags: Vec<AnomalyFlag>,
}

/// JSON maps need string keys; flags travel as `[key, flag]` pairs instead.
mod keyed_flags {
    use super::{AnomalyFlag, FootprintKey};
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(
        flags: &BTreeMap<FootprintKey, AnomalyFlag>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        s.collect_seq(flags.iter())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<BTreeMap<FootprintKey, AnomalyFlag>, D::Error> {
        let pairs: Vec<(FootprintKey, AnomalyFlag)> = Vec::deserialize(d)?;
        Ok(pairs.into_iter().collect())
    }
}

impl Detection {
    pub fn flag(&self, key: &FootprintKey) -> Option<&AnomalyFlag> {
        self.flags.get(key)
    }

    pub fn anomalous_count(&self) -> usize {
        self.flags.values().filter(|f| f.is_anomalous).count()
    }
}

pub struct AnomalyDetector {
    metric: KpiField,
    k: f64,
    min_samples: usize,
}

impl AnomalyDetector {
    pub fn new(metric: KpiField, k: f64, min_samples: usize) -> Self {
        Self { metric, k, min_samples }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.anomaly_metric.clone(), config.anomaly_k, config.min_samples)
    }

    pub fn metric(&self) -> &KpiField {
        &self.metric
    }

    /// Aggregate-level flags. The population is every aggregate's metric value;
    /// groups with fewer than `min_samples` observations of the metric are
    /// reported but never flagged. Fails only for an attribute no record has.
    pub fn detect_aggregates(
        &self,
        aggregates: &[AggregatedFootprint],
    ) -> Result<(Option<Thresholds>, BTreeMap<FootprintKey, AnomalyFlag>)> {
        if let Some(first) = aggregates.first() {
            if !field_exists(aggregates, &self.metric) {
                return Err(AnalysisError::MissingMetric {
                    field: self.metric.to_string(),
                    label: first.label(),
                });
            }
        }
        let values: Vec<f64> = aggregates.iter().filter_map(|a| a.metric(&self.metric)).collect();
        let thresholds = Thresholds::from_population(&values, self.k);

        let flags = aggregates
            .iter()
            .map(|a| {
                let flag = match (a.metric(&self.metric), thresholds) {
                    _ if a.count() < self.min_samples => {
                        AnomalyFlag::clear(AnomalyReason::InsufficientSamples)
                    }
                    (None, _) => AnomalyFlag::clear(AnomalyReason::MetricUnavailable),
                    _ if a.kpis.samples(&self.metric) < self.min_samples => {
                        AnomalyFlag::clear(AnomalyReason::InsufficientSamples)
                    }
                    (Some(v), Some(t)) => t.classify(v),
                    _ => AnomalyFlag::clear(AnomalyReason::MetricUnavailable),
                };
                (a.key.clone(), flag)
            })
            .collect();
        Ok((thresholds, flags))
    }

    /// Instance-level flags on footprint durations. The population is every
    /// positive duration in the log; `min_samples` applies to the positive
    /// durations of the instance's activity pair.
    pub fn detect_instances(&self, footprints: &[Footprint]) -> (Option<Thresholds>, Vec<AnomalyFlag>) {
        let mut group_sizes: HashMap<(&str, &str), usize> = HashMap::new();
        for fp in footprints.iter().filter(|f| f.has_valid_duration()) {
            *group_sizes
                .entry((fp.from_activity.as_str(), fp.to_activity.as_str()))
                .or_default() += 1;
        }
        let durations: Vec<f64> = footprints
            .iter()
            .filter(|f| f.has_valid_duration())
            .map(|f| f.duration_secs)
            .collect();
        let thresholds = Thresholds::from_population(&durations, self.k);

        let flags = footprints
            .iter()
            .map(|fp| {
                let size = group_sizes
                    .get(&(fp.from_activity.as_str(), fp.to_activity.as_str()))
                    .copied()
                    .unwrap_or(0);
                match thresholds {
                    _ if !fp.has_valid_duration() => AnomalyFlag::clear(AnomalyReason::NonPositiveDuration),
                    _ if size < self.min_samples => AnomalyFlag::clear(AnomalyReason::InsufficientSamples),
                    Some(t) => t.classify(fp.duration_secs),
                    None => AnomalyFlag::clear(AnomalyReason::MetricUnavailable),
                }
            })
            .collect();
        (thresholds, flags)
    }

    pub fn detect(
        &self,
        aggregates: &[AggregatedFootprint],
        instances: Option<&[Footprint]>,
    ) -> Result<Detection> {
        let (thresholds, flags) = self.detect_aggregates(aggregates)?;
        let (instance_thresholds, instance_flags) = match instances {
            Some(fps) => self.detect_instances(fps),
            None => (None, Vec::new()),
        };
        let detection = Detection {
            thresholds,
            flags,
            instance_thresholds,
            instance_flags,
        };
        debug!(
            metric = %self.metric,
            anomalous = detection.anomalous_count(),
            anomalous_instances = detection.instance_flags.iter().filter(|f| f.is_anomalous).count(),
            "anomaly detection complete"
        );
        Ok(detection)
    }
}

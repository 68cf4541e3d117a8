//! (x, y, anomaly) points, one per aggregated footprint.

use crate::aggregate::{field_exists, AggregatedFootprint};
use crate::anomaly::Detection;
use crate::error::{AnalysisError, Result};
use crate::kpi::KpiField;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    pub label: String,
    pub is_anomalous: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterView {
    pub x_field: KpiField,
    pub y_field: KpiField,
    pub points: Vec<ScatterPoint>,
    /// Labels of records with no value on either axis; they have no point
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unavailable: Vec<String>,
    /// Reference lines, present when `y_field` is the detected metric
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_lower: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_upper: Option<f64>,
}

pub struct ScatterViewBuilder {
    x: KpiField,
    y: KpiField,
}

impl ScatterViewBuilder {
    pub fn new(x: KpiField, y: KpiField) -> Self {
        Self { x, y }
    }

    fn check_field(field: &KpiField, aggregates: &[AggregatedFootprint]) -> Result<()> {
        match aggregates.first() {
            Some(first) if !field_exists(aggregates, field) => Err(AnalysisError::MissingMetric {
                field: field.to_string(),
                label: first.label(),
            }),
            _ => Ok(()),
        }
    }

    /// Fails when an axis names an attribute no record carries. Records lacking
    /// a value on either axis are listed in `unavailable`; never substitutes zero.
    /// `detected_metric` is the field the detection thresholds were computed on.
    pub fn build(
        &self,
        aggregates: &[AggregatedFootprint],
        detection: &Detection,
        detected_metric: &KpiField,
    ) -> Result<ScatterView> {
        Self::check_field(&self.x, aggregates)?;
        Self::check_field(&self.y, aggregates)?;

        let mut points = Vec::with_capacity(aggregates.len());
        let mut unavailable = Vec::new();
        for a in aggregates {
            match (a.metric(&self.x), a.metric(&self.y)) {
                (Some(x), Some(y)) => points.push(ScatterPoint {
                    x,
                    y,
                    label: a.label(),
                    is_anomalous: detection.flag(&a.key).is_some_and(|f| f.is_anomalous),
                }),
                _ => unavailable.push(a.label()),
            }
        }
        if !unavailable.is_empty() {
            debug!(skipped = unavailable.len(), x = %self.x, y = %self.y, "scatter records without a value");
        }

        let reference = detection.thresholds.filter(|_| &self.y == detected_metric);
        Ok(ScatterView {
            x_field: self.x.clone(),
            y_field: self.y.clone(),
            points,
            unavailable,
            y_mean: reference.map(|t| t.mean),
            y_lower: reference.map(|t| t.lower),
            y_upper: reference.map(|t| t.upper),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{FootprintKey, GroupValue};
    use crate::anomaly::Thresholds;
    use crate::kpi::{DurationStats, GroupKpis};
    use std::collections::BTreeMap;

    fn agg(from: &str, mean: f64, oee: Option<f64>) -> AggregatedFootprint {
        AggregatedFootprint {
            key: FootprintKey {
                from_activity: from.into(),
                to_activity: "Z".into(),
                group: GroupValue::All,
            },
            kpis: GroupKpis {
                count: 2,
                duration_exceptions: 0,
                duration: DurationStats::from_samples(&[mean]),
                frequency: 0.5,
                throughput: None,
                cases: Vec::new(),
                attributes: oee.map(|v| BTreeMap::from([("OEE".to_string(), v)])).unwrap_or_default(),
            },
        }
    }

    #[test]
    fn projects_default_fields_with_reference_lines() {
        let aggs = vec![agg("A", 10.0, None), agg("B", 20.0, None)];
        let detection = Detection {
            thresholds: Thresholds::from_population(&[10.0, 20.0], 1.5),
            ..Detection::default()
        };
        let view = ScatterViewBuilder::new(KpiField::Frequency, KpiField::DurationMean)
            .build(&aggs, &detection, &KpiField::DurationMean)
            .unwrap();
        assert_eq!(view.points.len(), 2);
        assert_eq!((view.points[1].x, view.points[1].y), (0.5, 20.0));
        assert_eq!(view.points[1].label, "B -> Z");
        assert_eq!(view.y_mean, Some(15.0));

        let other = ScatterViewBuilder::new(KpiField::Frequency, KpiField::Count)
            .build(&aggs, &detection, &KpiField::DurationMean)
            .unwrap();
        assert!(other.y_upper.is_none());
    }

    #[test]
    fn records_without_a_value_are_listed_not_zeroed() {
        let mut empty = agg("C", 0.0, Some(0.7));
        empty.kpis.duration = None;
        let aggs = vec![agg("A", 10.0, Some(0.8)), agg("B", 20.0, None), empty];
        let view = ScatterViewBuilder::new(KpiField::DurationMean, KpiField::Attribute("OEE".into()))
            .build(&aggs, &Detection::default(), &KpiField::DurationMean)
            .unwrap();
        assert_eq!(view.points.len(), 1);
        assert_eq!(view.points[0].label, "A -> Z");
        assert_eq!(view.unavailable, vec!["B -> Z".to_string(), "C -> Z".to_string()]);
    }

    #[test]
    fn attribute_on_no_record_fails() {
        let aggs = vec![agg("A", 10.0, None), agg("B", 20.0, None)];
        let err = ScatterViewBuilder::new(KpiField::Frequency, KpiField::Attribute("OEE".into()))
            .build(&aggs, &Detection::default(), &KpiField::DurationMean)
            .unwrap_err();
        match err {
            AnalysisError::MissingMetric { field, label } => {
                assert_eq!(field, "attr:OEE");
                assert_eq!(label, "A -> Z");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(ScatterViewBuilder::new(KpiField::Frequency, KpiField::Attribute("OEE".into()))
            .build(&[], &Detection::default(), &KpiField::DurationMean)
            .unwrap()
            .points
            .is_empty());
    }
}

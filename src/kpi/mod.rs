//! Footprint and activity KPIs.

mod calculator;
mod stats;

pub use calculator::{ActivityKpi, KpiCalculator};
pub use stats::{quantile_sorted, DurationStats};

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A scalar field of an aggregated footprint that can be projected or tested.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum KpiField {
    Count,
    Frequency,
    Throughput,
    UniqueCases,
    DurationMean,
    DurationMedian,
    DurationStd,
    DurationMin,
    DurationMax,
    /// Mean of a numeric event attribute over the cases containing the footprint
    Attribute(String),
}

const ATTR_PREFIX: &str = "attr:";

impl KpiField {
    pub fn as_str(&self) -> &str {
        match self {
            KpiField::Count => "count",
            KpiField::Frequency => "frequency",
            KpiField::Throughput => "throughput",
            KpiField::UniqueCases => "unique_cases",
            KpiField::DurationMean => "duration_mean",
            KpiField::DurationMedian => "duration_median",
            KpiField::DurationStd => "duration_std",
            KpiField::DurationMin => "duration_min",
            KpiField::DurationMax => "duration_max",
            KpiField::Attribute(name) => name,
        }
    }
}

impl fmt::Display for KpiField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KpiField::Attribute(name) => write!(f, "{}{}", ATTR_PREFIX, name),
            other => f.write_str(other.as_str()),
        }
    }
}

impl FromStr for KpiField {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let field = match s {
            "count" => KpiField::Count,
            "frequency" => KpiField::Frequency,
            "throughput" => KpiField::Throughput,
            "unique_cases" => KpiField::UniqueCases,
            "duration" | "duration_mean" => KpiField::DurationMean,
            "duration_median" => KpiField::DurationMedian,
            "duration_std" => KpiField::DurationStd,
            "duration_min" => KpiField::DurationMin,
            "duration_max" => KpiField::DurationMax,
            other => match other.strip_prefix(ATTR_PREFIX) {
                Some(name) if !name.is_empty() => KpiField::Attribute(name.to_string()),
                _ => {
                    return Err(ConfigError::UnknownField {
                        name: other.to_string(),
                    })
                }
            },
        };
        Ok(field)
    }
}

impl TryFrom<String> for KpiField {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KpiField> for String {
    fn from(field: KpiField) -> Self {
        field.to_string()
    }
}

/// Metrics of one footprint group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupKpis {
    /// All footprints in the group, including duration exceptions
    pub count: usize,
    /// Footprints whose duration was `<= 0`
    pub duration_exceptions: usize,
    /// Absent when no footprint had a positive duration
    pub duration: Option<DurationStats>,
    /// count / total case count
    pub frequency: f64,
    /// count per hour of observed log span
    pub throughput: Option<f64>,
    /// Sorted ids of the cases containing this footprint
    pub cases: Vec<String>,
    /// Mean of each numeric attribute over `cases`
    pub attributes: BTreeMap<String, f64>,
}

impl GroupKpis {
    pub fn unique_cases(&self) -> usize {
        self.cases.len()
    }

    /// Value of `field`, or None when the group has no such value.
    pub fn value(&self, field: &KpiField) -> Option<f64> {
        match field {
            KpiField::Count => Some(self.count as f64),
            KpiField::Frequency => Some(self.frequency),
            KpiField::Throughput => self.throughput,
            KpiField::UniqueCases => Some(self.cases.len() as f64),
            KpiField::DurationMean => self.duration.map(|d| d.mean),
            KpiField::DurationMedian => self.duration.map(|d| d.median),
            KpiField::DurationStd => self.duration.map(|d| d.std),
            KpiField::DurationMin => self.duration.map(|d| d.min),
            KpiField::DurationMax => self.duration.map(|d| d.max),
            KpiField::Attribute(name) => self.attributes.get(name).copied(),
        }
    }

    /// Observations behind `field`: positive durations for the duration
    /// fields, `count` otherwise.
    pub fn samples(&self, field: &KpiField) -> usize {
        match field {
            KpiField::DurationMean
            | KpiField::DurationMedian
            | KpiField::DurationStd
            | KpiField::DurationMin
            | KpiField::DurationMax => self.duration.map_or(0, |d| d.samples),
            _ => self.count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_parse_and_print() {
        for name in ["count", "frequency", "duration_mean", "duration_std", "attr:OEE"] {
            let f: KpiField = name.parse().unwrap();
            assert_eq!(f.to_string(), name);
        }
        assert_eq!("duration".parse::<KpiField>().unwrap(), KpiField::DurationMean);
        assert!("attr:".parse::<KpiField>().is_err());
        assert!("speed".parse::<KpiField>().is_err());
    }

    #[test]
    fn serde_uses_string_form() {
        let json = serde_json::to_string(&KpiField::Attribute("Lead Time".into())).unwrap();
        assert_eq!(json, r#""attr:Lead Time""#);
        let back: KpiField = serde_json::from_str(r#""duration_median""#).unwrap();
        assert_eq!(back, KpiField::DurationMedian);
    }

    #[test]
    fn duration_samples_exclude_exceptions() {
        let kpis = GroupKpis {
            count: 2,
            duration_exceptions: 1,
            duration: DurationStats::from_samples(&[30.0]),
            frequency: 1.0,
            throughput: None,
            cases: vec!["c1".into(), "c2".into()],
            attributes: BTreeMap::new(),
        };
        assert_eq!(kpis.samples(&KpiField::DurationMean), 1);
        assert_eq!(kpis.samples(&KpiField::DurationMax), 1);
        assert_eq!(kpis.samples(&KpiField::Count), 2);
    }
}

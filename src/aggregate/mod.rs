//! Grouping of footprints into aggregated records.

mod aggregator;

pub use aggregator::Aggregator;

use crate::kpi::{GroupKpis, KpiField};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Extra grouping dimension beyond the activity pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    #[default]
    None,
    Resource,
    TimeBucket,
}

/// Value of the extra grouping dimension for one footprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum GroupValue {
    All,
    /// None collects footprints without a resource
    Resource(Option<String>),
    /// Bucket start
    TimeBucket(DateTime<Utc>),
}

impl fmt::Display for GroupValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupValue::All => Ok(()),
            GroupValue::Resource(Some(r)) => f.write_str(r),
            GroupValue::Resource(None) => f.write_str("unassigned"),
            GroupValue::TimeBucket(start) => write!(f, "{}", start.to_rfc3339()),
        }
    }
}

/// Identity of an aggregated footprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FootprintKey {
    pub from_activity: String,
    pub to_activity: String,
    pub group: GroupValue,
}

impl FootprintKey {
    /// "from -> to", suffixed with the group value when grouped.
    pub fn label(&self) -> String {
        match self.group {
            GroupValue::All => format!("{} -> {}", self.from_activity, self.to_activity),
            ref g => format!("{} -> {} [{}]", self.from_activity, self.to_activity, g),
        }
    }
}

/// One record per observed group key. Immutable once computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedFootprint {
    pub key: FootprintKey,
    #[serde(flatten)]
    pub kpis: GroupKpis,
}

impl AggregatedFootprint {
    pub fn count(&self) -> usize {
        self.kpis.count
    }

    pub fn label(&self) -> String {
        self.key.label()
    }

    pub fn metric(&self, field: &KpiField) -> Option<f64> {
        self.kpis.value(field)
    }
}

/// Whether `field` names something these records carry. Built-in KPIs always
/// exist even when a record has no value for them; an attribute exists once
/// any record has it.
pub fn field_exists(aggregates: &[AggregatedFootprint], field: &KpiField) -> bool {
    match field {
        KpiField::Attribute(name) => aggregates.iter().any(|a| a.kpis.attributes.contains_key(name)),
        _ => true,
    }
}

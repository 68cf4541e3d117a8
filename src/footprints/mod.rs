//! Directly-follows footprints derived from traces.

mod extractor;

pub use extractor::{Extraction, FootprintExtractor};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observed transition between two adjacent events of a case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pub from_activity: String,
    pub to_activity: String,
    /// Seconds between the two events; `<= 0` is a data-quality exception
    pub duration_secs: f64,
    pub case_id: String,
    /// Timestamp of the `from` event
    pub start: DateTime<Utc>,
    /// Resource of the `to` event
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
}

impl Footprint {
    /// Whether the duration may enter duration statistics.
    pub fn has_valid_duration(&self) -> bool {
        self.duration_secs > 0.0
    }

    pub fn label(&self) -> String {
        format!("{} -> {}", self.from_activity, self.to_activity)
    }
}

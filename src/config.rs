//! Analyzer configuration. The core only sees [`AnalysisConfig`] and [`IngestConfig`];
//! the rest drives the binary.

use crate::aggregate::GroupBy;
use crate::error::ConfigError;
use crate::kpi::KpiField;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// JSON array of raw log records
    pub input_path: PathBuf,
    /// Record decoding
    pub ingest: IngestConfig,
    /// Pipeline options
    pub analysis: AnalysisConfig,
    /// Re-analysis interval in seconds; 0 runs once
    pub watch_interval_secs: u64,
    /// Logging
    pub log: LogConfig,
}

/// Names of the raw record fields the core reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub case_id: String,
    pub activity: String,
    pub timestamp: String,
    pub resource: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub columns: ColumnMapping,
    /// strftime patterns tried after RFC 3339; interpreted as UTC
    pub timestamp_formats: Vec<String>,
    /// Activities starting with any of these are dropped before extraction
    pub exclude_activity_prefixes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// KPI field anomaly detection targets
    pub anomaly_metric: KpiField,
    /// IQR multiplier
    pub anomaly_k: f64,
    /// Minimum group size before a record can be flagged
    pub min_samples: usize,
    /// Additional grouping dimension
    pub group_by: GroupBy,
    /// Bucket width for `group_by = time_bucket`
    pub time_bucket_secs: i64,
    /// Also flag individual footprint instances
    pub instance_detection: bool,
    pub scatter_x: KpiField,
    pub scatter_y: KpiField,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            case_id: "case_id".to_string(),
            activity: "activity".to_string(),
            timestamp: "timestamp".to_string(),
            resource: "resource".to_string(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            columns: ColumnMapping::default(),
            timestamp_formats: vec![
                "%d/%m/%Y %H:%M:%S".to_string(),
                "%Y-%m-%d %H:%M:%S".to_string(),
            ],
            exclude_activity_prefixes: Vec::new(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            anomaly_metric: KpiField::DurationMean,
            anomaly_k: 1.5,
            min_samples: 2,
            group_by: GroupBy::None,
            time_bucket_secs: 3600,
            instance_detection: true,
            scatter_x: KpiField::Frequency,
            scatter_y: KpiField::DurationMean,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.anomaly_k.is_finite() || self.anomaly_k < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "anomaly_k".into(),
                reason: format!("must be a finite non-negative number, got {}", self.anomaly_k),
            });
        }
        if self.min_samples == 0 {
            return Err(ConfigError::InvalidValue {
                key: "min_samples".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.time_bucket_secs <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "time_bucket_secs".into(),
                reason: format!("must be positive, got {}", self.time_bucket_secs),
            });
        }
        Ok(())
    }
}

impl AnalyzerConfig {
    /// Load from JSON file if present; otherwise return default. A file that exists
    /// but does not parse is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            message: format!("{}: {}", path.display(), e),
        })?;
        let config: AnalyzerConfig =
            serde_json::from_str(&data).map_err(|e| ConfigError::Parse {
                message: format!("{}: {}", path.display(), e),
            })?;
        config.analysis.validate()?;
        Ok(config)
    }
}

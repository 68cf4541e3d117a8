//! Error taxonomy for the analysis core.

use serde::{Deserialize, Serialize};

/// Errors surfaced to the caller of the pipeline. Malformed records are not
/// among them: those are recovered per record and reported in the extraction.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("event log contains no usable events ({rejected} rejected, {filtered} filtered)")]
    EmptyLog { rejected: usize, filtered: usize },

    #[error("metric '{field}' is not available on record '{label}'")]
    MissingMetric { field: String, label: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Invalid configuration. Never recovered inside the core.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown KPI field: {name}")]
    UnknownField { name: String },

    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("failed to parse config file: {message}")]
    Parse { message: String },
}

/// Why a raw record was excluded from extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum MalformedEventError {
    #[error("record {index}: missing field '{field}'")]
    MissingField { index: usize, field: String },

    #[error("record {index}: field '{field}' holds a {found}, expected a string or number")]
    InvalidField {
        index: usize,
        field: String,
        found: String,
    },

    #[error("record {index}: unparseable timestamp '{raw}'")]
    UnparseableTimestamp { index: usize, raw: String },
}

impl MalformedEventError {
    /// Position of the rejected record in the raw input.
    pub fn index(&self) -> usize {
        match self {
            MalformedEventError::MissingField { index, .. }
            | MalformedEventError::InvalidField { index, .. }
            | MalformedEventError::UnparseableTimestamp { index, .. } => *index,
        }
    }
}

pub type Result<T, E = AnalysisError> = std::result::Result<T, E>;
